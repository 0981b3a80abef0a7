//! Line-shaped leaf elements: keywords, babel calls, comments, fixed-width
//! areas, horizontal rules and diary sexps.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Affiliated, BabelCall, Node, NodeData};
use crate::buffer::Buffer;
use crate::parse::elements::finish_element;
use crate::syntax::{BABEL_CALL_RE, COMMENT_RE, FIXED_WIDTH_RE, KEYWORD_RE};

static CALL_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^\s()\[\]]+)(?:\[[^\]]*\])?(?:\(([^)]*)\))?").unwrap());

/// `#+KEY: value` (non-affiliated, non-block).
pub(crate) fn keyword(
    buf: &Buffer,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
) -> Option<Node> {
    let line = buf.line_str(pos);
    let caps = KEYWORD_RE.captures(&line)?;
    let key = caps[1].to_uppercase();
    let value = caps.get(2).map(|m| m.as_str().to_owned()).unwrap_or_default();
    let after = buf.next_line_start(pos);
    let mut node = finish_element(buf, NodeData::Keyword { key, value }, begin, after, limit);
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    Some(node)
}

/// `#+CALL: name(args)`.
pub(crate) fn babel_call(
    buf: &Buffer,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
) -> Option<Node> {
    let line = buf.line_str(pos);
    let caps = BABEL_CALL_RE.captures(&line)?;
    let value = caps[1].to_owned();
    let (call, arguments) = match CALL_SHAPE_RE.captures(&value) {
        Some(shape) => (
            shape.get(1).map(|m| m.as_str().to_owned()).unwrap_or_default(),
            shape.get(2).map(|m| m.as_str().to_owned()),
        ),
        None => (value.clone(), None),
    };
    let after = buf.next_line_start(pos);
    let mut node = finish_element(
        buf,
        NodeData::BabelCall(BabelCall { call, arguments, value }),
        begin,
        after,
        limit,
    );
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    Some(node)
}

/// Drop the leading `#`/`:` marker and one following space.
fn strip_prefix_line(line: &str) -> String {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let rest = &trimmed[1..];
    rest.strip_prefix(' ').unwrap_or(rest).to_owned()
}

/// One or more `# …` lines.
pub(crate) fn comment(
    buf: &Buffer,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
) -> Node {
    let mut lines = Vec::new();
    let mut cur = pos;
    while cur < limit {
        let line = buf.line_str(cur);
        if !COMMENT_RE.is_match(&line) {
            break;
        }
        lines.push(strip_prefix_line(&line));
        cur = buf.next_line_start(cur);
    }
    let mut node =
        finish_element(buf, NodeData::Comment { value: lines.join("\n") }, begin, cur, limit);
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    node
}

/// One or more `: …` lines.
pub(crate) fn fixed_width(
    buf: &Buffer,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
) -> Node {
    let mut lines = Vec::new();
    let mut cur = pos;
    while cur < limit {
        let line = buf.line_str(cur);
        if !FIXED_WIDTH_RE.is_match(&line) {
            break;
        }
        lines.push(strip_prefix_line(&line));
        cur = buf.next_line_start(cur);
    }
    let mut node =
        finish_element(buf, NodeData::FixedWidth { value: lines.join("\n") }, begin, cur, limit);
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    node
}

/// Five or more dashes on their own line.
pub(crate) fn horizontal_rule(
    buf: &Buffer,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
) -> Node {
    let after = buf.next_line_start(pos);
    let mut node = finish_element(buf, NodeData::HorizontalRule, begin, after, limit);
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    node
}

/// `%%(…)` diary line.
pub(crate) fn diary_sexp(
    buf: &Buffer,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
) -> Node {
    let value = buf.line_str(pos).into_owned();
    let after = buf.next_line_start(pos);
    let mut node = finish_element(buf, NodeData::DiarySexp { value }, begin, after, limit);
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    node
}
