//! Emphasis recognizers: bold, italic, underline, strike-through (recursive)
//! and code, verbatim (raw values).
//!
//! A span opens at a marker whose left neighbour is a valid PRE character
//! and whose first content character is not whitespace; it closes at the
//! same marker with non-whitespace before it and a valid POST character
//! after. Content may cross at most one newline.

use crate::ast::{Node, NodeData, NodeKind};

const PRE: &[char] = &[' ', '\t', '\n', '-', '(', '\'', '"', '{'];
const POST: &[char] = &[
    ' ', '\t', '\n', '-', '.', ',', ';', ':', '!', '?', '\'', ')', '}', '"', '[', '\\',
];

pub(crate) fn marker_kind(marker: u8) -> Option<NodeKind> {
    match marker {
        b'*' => Some(NodeKind::Bold),
        b'/' => Some(NodeKind::Italic),
        b'_' => Some(NodeKind::Underline),
        b'+' => Some(NodeKind::StrikeThrough),
        b'~' => Some(NodeKind::Code),
        b'=' => Some(NodeKind::Verbatim),
        _ => None,
    }
}

fn pre_ok(s: &str, pos: usize) -> bool {
    if pos == 0 {
        return true;
    }
    s[..pos].chars().next_back().is_some_and(|c| PRE.contains(&c))
}

fn post_ok(s: &str, after: usize) -> bool {
    match s[after..].chars().next() {
        None => true,
        Some(c) => POST.contains(&c),
    }
}

/// Find the closing marker for a span opened at `pos`. Returns the byte
/// index of the closing marker.
fn find_close(s: &str, pos: usize, marker: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut newlines = 0;
    let mut j = pos + 1;
    // First content byte must not be whitespace (or a blank span).
    match bytes.get(j) {
        Some(b' ') | Some(b'\t') | Some(b'\n') | None => return None,
        _ => {}
    }
    while j < bytes.len() {
        let b = bytes[j];
        if b == b'\n' {
            newlines += 1;
            if newlines > 1 {
                return None;
            }
        } else if b == marker
            && j > pos + 1
            && !matches!(bytes[j - 1], b' ' | b'\t' | b'\n')
            && post_ok(s, j + 1)
        {
            return Some(j);
        }
        j += 1;
    }
    None
}

/// Recognize an emphasis span at `pos`. The returned node carries absolute
/// positions; recursive kinds get their contents span set for the lexer to
/// descend into.
pub(crate) fn emphasis(s: &str, pos: usize, base: usize) -> Option<Node> {
    let marker = *s.as_bytes().get(pos)?;
    let kind = marker_kind(marker)?;
    if !pre_ok(s, pos) {
        return None;
    }
    let close = find_close(s, pos, marker)?;
    let begin = base + pos;
    let end = base + close + 1;
    let mut node = match kind {
        NodeKind::Bold => Node::new(NodeData::Bold, begin, end),
        NodeKind::Italic => Node::new(NodeData::Italic, begin, end),
        NodeKind::Underline => Node::new(NodeData::Underline, begin, end),
        NodeKind::StrikeThrough => Node::new(NodeData::StrikeThrough, begin, end),
        NodeKind::Code => Node::new(
            NodeData::Code { value: s[pos + 1..close].to_owned() },
            begin,
            end,
        ),
        _ => Node::new(
            NodeData::Verbatim { value: s[pos + 1..close].to_owned() },
            begin,
            end,
        ),
    };
    if kind.is_recursive_object() {
        node.contents_begin = Some(base + pos + 1);
        node.contents_end = Some(base + close);
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_at_start() {
        let node = emphasis("*word*", 0, 0).unwrap();
        assert_eq!(node.kind(), NodeKind::Bold);
        assert_eq!((node.begin, node.end), (0, 6));
        assert_eq!(node.contents_span().unwrap().start, 1);
        assert_eq!(node.contents_span().unwrap().end, 5);
    }

    #[test]
    fn bold_mid_text_needs_pre_char() {
        let s = "ab*cd*";
        assert!(emphasis(s, 2, 0).is_none());
        let s = "a *cd* b";
        assert!(emphasis(s, 2, 0).is_some());
    }

    #[test]
    fn post_char_must_qualify() {
        assert!(emphasis("*a*b", 0, 0).is_none());
        assert!(emphasis("*a*.", 0, 0).is_some());
        assert!(emphasis("*a* b", 0, 0).is_some());
    }

    #[test]
    fn no_whitespace_borders() {
        assert!(emphasis("* a*", 0, 0).is_none());
        assert!(emphasis("*a *", 0, 0).is_none());
        assert!(emphasis("**", 0, 0).is_none());
    }

    #[test]
    fn code_and_verbatim_capture_value() {
        let node = emphasis("~f(x)~", 0, 0).unwrap();
        let NodeData::Code { value } = &node.data else { panic!() };
        assert_eq!(value, "f(x)");
        assert!(node.contents_begin.is_none(), "code is not recursive");

        let node = emphasis("=raw *text*=", 0, 0).unwrap();
        let NodeData::Verbatim { value } = &node.data else { panic!() };
        assert_eq!(value, "raw *text*");
    }

    #[test]
    fn single_newline_allowed_two_rejected() {
        assert!(emphasis("*a\nb*", 0, 0).is_some());
        assert!(emphasis("*a\nb\nc*", 0, 0).is_none());
    }

    #[test]
    fn tabs_kept_raw_inside_value() {
        let node = emphasis("=a\tb=", 0, 0).unwrap();
        let NodeData::Verbatim { value } = &node.data else { panic!() };
        assert_eq!(value, "a\tb");
    }
}
