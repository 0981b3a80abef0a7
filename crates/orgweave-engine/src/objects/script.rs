//! Subscript and superscript recognizers.
//!
//! `x_i`, `x_{long form}`, `x^2`, `x^{2n}`. The marker must follow a
//! non-whitespace character.

use crate::ast::{Node, NodeData};

fn balanced_braces(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            b'\n' => return None,
            _ => {}
        }
    }
    None
}

fn plain_run(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i = 1;
    }
    let run = bytes[i..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    if run == 0 {
        return None;
    }
    Some(i + run)
}

pub(crate) fn script(s: &str, pos: usize, base: usize) -> Option<Node> {
    let marker = *s.as_bytes().get(pos)?;
    let superscript = match marker {
        b'^' => true,
        b'_' => false,
        _ => return None,
    };
    // The marker must be glued to the previous character.
    let prev = s[..pos].chars().next_back()?;
    if prev.is_whitespace() {
        return None;
    }
    let rest = &s[pos + 1..];
    let (len, use_brackets) = match balanced_braces(rest) {
        Some(n) => (n, true),
        None => (plain_run(rest)?, false),
    };
    let data = if superscript {
        NodeData::Superscript { use_brackets }
    } else {
        NodeData::Subscript { use_brackets }
    };
    let mut node = Node::new(data, base + pos, base + pos + 1 + len);
    let (cb, ce) = if use_brackets {
        (pos + 2, pos + 1 + len - 1)
    } else {
        (pos + 1, pos + 1 + len)
    };
    node.contents_begin = Some(base + cb);
    node.contents_end = Some(base + ce);
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    #[test]
    fn plain_subscript() {
        let node = script("x_i rest", 1, 0).unwrap();
        assert_eq!(node.kind(), NodeKind::Subscript);
        assert_eq!((node.begin, node.end), (1, 3));
        assert_eq!(node.contents_begin, Some(2));
    }

    #[test]
    fn braced_superscript() {
        let node = script("x^{2n}", 1, 0).unwrap();
        assert_eq!(node.kind(), NodeKind::Superscript);
        assert_eq!(node.end, 6);
        assert_eq!(node.contents_begin, Some(3));
        assert_eq!(node.contents_end, Some(5));
        let NodeData::Superscript { use_brackets } = node.data else { panic!() };
        assert!(use_brackets);
    }

    #[test]
    fn needs_attached_base() {
        assert!(script("x _i", 2, 0).is_none());
        assert!(script("_i", 0, 0).is_none());
    }

    #[test]
    fn signed_run() {
        let node = script("x_-1", 1, 0).unwrap();
        assert_eq!(node.end, 4);
    }

    #[test]
    fn nested_braces_balance() {
        let node = script("x_{a{b}c}", 1, 0).unwrap();
        assert_eq!(node.end, 9);
    }
}
