//! Inline babel call and inline source block recognizers.
//!
//! `call_name(args)`, `call_name[h](args)[h]`, `src_lang{body}`,
//! `src_lang[opts]{body}`. All on a single line.

use crate::ast::{InlineBabelCall, InlineSrcBlock, Node, NodeData};

fn word_boundary_before(s: &str, pos: usize) -> bool {
    !s[..pos].chars().next_back().is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Consume `[...]` (single line, no nesting) returning (inner, consumed).
fn optional_bracket(s: &str) -> (Option<&str>, usize) {
    if s.starts_with('[')
        && let Some(i) = s.find(']')
        && !s[..i].contains('\n')
    {
        (Some(&s[1..i]), i + 1)
    } else {
        (None, 0)
    }
}

fn delimited(s: &str, open: char, close: char) -> Option<(&str, usize)> {
    if !s.starts_with(open) {
        return None;
    }
    let i = s.find(close)?;
    if s[..i].contains('\n') {
        return None;
    }
    Some((&s[1..i], i + 1))
}

pub(crate) fn inline_babel_call(s: &str, pos: usize, base: usize) -> Option<Node> {
    let rest = &s[pos..];
    if !rest.starts_with("call_") || !word_boundary_before(s, pos) {
        return None;
    }
    let name_len = rest[5..]
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_'))
        .count();
    if name_len == 0 {
        return None;
    }
    let mut i = 5 + name_len;
    let (inside, n) = optional_bracket(&rest[i..]);
    i += n;
    let (args, n) = delimited(&rest[i..], '(', ')')?;
    let args = args.to_owned();
    i += n;
    let (end_header, n) = optional_bracket(&rest[i..]);
    i += n;
    let data = NodeData::InlineBabelCall(InlineBabelCall {
        call: rest[5..5 + name_len].to_owned(),
        inside_header: inside.map(str::to_owned),
        arguments: args,
        end_header: end_header.map(str::to_owned),
        value: rest[..i].to_owned(),
    });
    Some(Node::new(data, base + pos, base + pos + i))
}

pub(crate) fn inline_src_block(s: &str, pos: usize, base: usize) -> Option<Node> {
    let rest = &s[pos..];
    if !rest.starts_with("src_") || !word_boundary_before(s, pos) {
        return None;
    }
    let lang_len = rest[4..]
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'+'))
        .count();
    if lang_len == 0 {
        return None;
    }
    let mut i = 4 + lang_len;
    let (params, n) = optional_bracket(&rest[i..]);
    i += n;
    let (body, n) = delimited(&rest[i..], '{', '}')?;
    let body = body.to_owned();
    i += n;
    let data = NodeData::InlineSrcBlock(InlineSrcBlock {
        language: rest[4..4 + lang_len].to_owned(),
        parameters: params.map(str::to_owned),
        value: body,
    });
    Some(Node::new(data, base + pos, base + pos + i))
}
