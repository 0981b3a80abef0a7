//! `#+BEGIN_…`/`#+END_…` blocks and `#+BEGIN:` dynamic blocks.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Affiliated, ExampleBlock, Node, NodeData, SrcBlock};
use crate::buffer::Buffer;
use crate::parse::elements::finish_element;
use crate::syntax::{BLOCK_BEGIN_RE, DYN_BLOCK_BEGIN_RE};

static BLOCK_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[ \t]*#\+END_(\S+)[ \t]*$").unwrap());
static DYN_BLOCK_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[ \t]*#\+END:?[ \t]*$").unwrap());

/// Line start of the matching `#+END_name` line, if any.
pub(crate) fn find_block_end(buf: &Buffer, name: &str, from: usize, limit: usize) -> Option<usize> {
    let mut cur = from;
    while cur < limit {
        let line = buf.line_str(cur);
        if let Some(caps) = BLOCK_END_RE.captures(&line)
            && caps[1].eq_ignore_ascii_case(name)
        {
            return Some(cur);
        }
        cur = buf.next_line_start(cur);
    }
    None
}

pub(crate) fn find_dynamic_end(buf: &Buffer, from: usize, limit: usize) -> Option<usize> {
    let mut cur = from;
    while cur < limit {
        if DYN_BLOCK_END_RE.is_match(&buf.line_str(cur)) {
            return Some(cur);
        }
        cur = buf.next_line_start(cur);
    }
    None
}

/// Split a `#+BEGIN_SRC` argument line into language, switches, parameters.
fn split_src_args(args: &str) -> (Option<String>, Option<String>, Option<String>) {
    let mut rest = args.trim();
    let mut language = None;
    if !rest.is_empty() && !rest.starts_with([':', '-', '+']) {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        language = Some(rest[..end].to_owned());
        rest = rest[end..].trim_start();
    }
    let mut switches: Vec<String> = Vec::new();
    while rest.starts_with(['-', '+']) {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let mut switch = rest[..end].to_owned();
        rest = rest[end..].trim_start();
        // A quoted switch argument, as in `-l "fmt"`.
        if rest.starts_with('"')
            && let Some(close) = rest[1..].find('"')
        {
            switch.push(' ');
            switch.push_str(&rest[..close + 2]);
            rest = rest[close + 2..].trim_start();
        }
        switches.push(switch);
    }
    let switches_str = (!switches.is_empty()).then(|| switches.join(" "));
    let parameters = (!rest.is_empty()).then(|| rest.to_owned());
    (language, switches_str, parameters)
}

/// All `#+BEGIN_NAME` blocks. Declines when the closing line is missing.
pub(crate) fn block(
    buf: &Buffer,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
) -> Option<Node> {
    let line = buf.line_str(pos);
    let caps = BLOCK_BEGIN_RE.captures(&line)?;
    let name = caps[1].to_owned();
    let args = caps.get(2).map(|m| m.as_str().trim().to_owned()).filter(|a| !a.is_empty());
    let contents_begin = buf.next_line_start(pos);
    let end_line = find_block_end(buf, &name, contents_begin, limit)?;
    let contents_end = end_line;
    let after = buf.next_line_start(end_line);

    let value = || buf.slice(contents_begin, contents_end).into_owned();
    let upper = name.to_uppercase();
    let data = match upper.as_str() {
        "CENTER" => NodeData::CenterBlock,
        "QUOTE" => NodeData::QuoteBlock,
        "VERSE" => NodeData::VerseBlock,
        "COMMENT" => NodeData::CommentBlock { value: value() },
        "EXAMPLE" => NodeData::ExampleBlock(ExampleBlock { switches: args.clone(), value: value() }),
        "EXPORT" => NodeData::ExportBlock {
            backend: args.clone().unwrap_or_default(),
            value: value(),
        },
        "SRC" => {
            let (language, switches, parameters) = split_src_args(args.as_deref().unwrap_or(""));
            NodeData::SrcBlock(SrcBlock { language, switches, parameters, value: value() })
        }
        _ => NodeData::SpecialBlock { block_type: name, parameters: args },
    };

    let with_contents = matches!(
        data,
        NodeData::CenterBlock
            | NodeData::QuoteBlock
            | NodeData::VerseBlock
            | NodeData::SpecialBlock { .. }
    );
    let mut node = finish_element(buf, data, begin, after, limit);
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    if with_contents && contents_end > contents_begin {
        node.contents_begin = Some(contents_begin);
        node.contents_end = Some(contents_end);
    }
    Some(node)
}

/// `#+BEGIN: name args` dynamic block. Declines without `#+END:`.
pub(crate) fn dynamic_block(
    buf: &Buffer,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
) -> Option<Node> {
    let line = buf.line_str(pos);
    let caps = DYN_BLOCK_BEGIN_RE.captures(&line)?;
    let block_name = caps.get(1)?.as_str().to_owned();
    let arguments = caps.get(2).map(|m| m.as_str().trim().to_owned()).filter(|a| !a.is_empty());
    let contents_begin = buf.next_line_start(pos);
    let end_line = find_dynamic_end(buf, contents_begin, limit)?;
    let after = buf.next_line_start(end_line);

    let mut node = finish_element(
        buf,
        NodeData::DynamicBlock { block_name, arguments },
        begin,
        after,
        limit,
    );
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    if end_line > contents_begin {
        node.contents_begin = Some(contents_begin);
        node.contents_end = Some(end_line);
    }
    Some(node)
}
