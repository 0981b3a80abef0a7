//! Small single-token objects: export snippets, macros, statistics cookies
//! and line breaks.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{MacroObject, Node, NodeData};

static SNIPPET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@@([A-Za-z0-9-]+):").unwrap());
static COOKIE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(?:\d*%|\d*/\d*)\]").unwrap());
static MACRO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{\{\{([A-Za-z][-A-Za-z0-9_]*)(?:\((.*?)\))?\}\}\}").unwrap()
});

/// `@@backend:value@@`.
pub(crate) fn export_snippet(s: &str, pos: usize, base: usize) -> Option<Node> {
    let rest = &s[pos..];
    let caps = SNIPPET_RE.captures(rest)?;
    let value_start = caps.get(0).map_or(0, |m| m.end());
    let close = rest[value_start..].find("@@")?;
    let data = NodeData::ExportSnippet {
        backend: caps[1].to_owned(),
        value: rest[value_start..value_start + close].to_owned(),
    };
    Some(Node::new(data, base + pos, base + pos + value_start + close + 2))
}

/// `{{{name}}}` or `{{{name(arg1,arg2)}}}`.
pub(crate) fn macro_object(s: &str, pos: usize, base: usize) -> Option<Node> {
    let rest = &s[pos..];
    let caps = MACRO_RE.captures(rest)?;
    let whole = caps.get(0)?;
    if whole.as_str().contains('\n') {
        return None;
    }
    let args = match caps.get(2) {
        Some(a) if !a.as_str().is_empty() => {
            a.as_str().split(',').map(|x| x.trim().to_owned()).collect()
        }
        _ => Vec::new(),
    };
    let data = NodeData::Macro(MacroObject {
        key: caps[1].to_lowercase(),
        args,
        value: whole.as_str().to_owned(),
    });
    Some(Node::new(data, base + pos, base + pos + whole.end()))
}

/// `[37%]` or `[2/5]`.
pub(crate) fn statistics_cookie(s: &str, pos: usize, base: usize) -> Option<Node> {
    let m = COOKIE_RE.find(&s[pos..])?;
    let data = NodeData::StatisticsCookie { value: m.as_str().to_owned() };
    Some(Node::new(data, base + pos, base + pos + m.end()))
}

/// `\\` at end of line; the newline is consumed.
pub(crate) fn line_break(s: &str, pos: usize, base: usize) -> Option<Node> {
    let rest = &s[pos..];
    if !rest.starts_with("\\\\") {
        return None;
    }
    let tail = &rest[2..];
    let spaces = tail.bytes().take_while(|b| matches!(b, b' ' | b'\t')).count();
    let after = &tail[spaces..];
    let len = if after.starts_with('\n') {
        2 + spaces + 1
    } else if after.is_empty() {
        2 + spaces
    } else {
        return None;
    };
    Some(Node::new(NodeData::LineBreak, base + pos, base + pos + len))
}
