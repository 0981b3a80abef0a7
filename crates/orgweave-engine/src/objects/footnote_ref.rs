//! Footnote reference recognizer: `[fn:label]`, `[fn:label:definition]`,
//! `[fn::anonymous definition]`.

use crate::ast::{FootnoteRefType, FootnoteReference, Node, NodeData};
use crate::buffer::Span;

pub(crate) fn footnote_reference(s: &str, pos: usize, base: usize) -> Option<Node> {
    let rest = &s[pos..];
    if !rest.starts_with("[fn:") {
        return None;
    }
    let label_len = rest[4..]
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_'))
        .count();
    let label = (label_len > 0).then(|| rest[4..4 + label_len].to_owned());
    let mut i = 4 + label_len;

    if rest[i..].starts_with(']') {
        // Standard reference needs a label.
        let label = label?;
        let data = NodeData::FootnoteReference(FootnoteReference {
            label: Some(label),
            reference_type: FootnoteRefType::Standard,
            definition_span: None,
            inline_definition: Vec::new(),
        });
        return Some(Node::new(data, base + pos, base + pos + i + 1));
    }
    if !rest[i..].starts_with(':') {
        return None;
    }
    i += 1;
    // Inline definition: scan to the matching bracket, tolerating nesting.
    let bytes = rest.as_bytes();
    let def_start = i;
    let mut depth = 1usize;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            b'\n' if bytes.get(i + 1) == Some(&b'\n') => return None,
            _ => {}
        }
        i += 1;
    }
    if depth != 0 {
        return None;
    }
    let data = NodeData::FootnoteReference(FootnoteReference {
        label,
        reference_type: FootnoteRefType::Inline,
        definition_span: Some(Span::new(base + pos + def_start, base + pos + i)),
        inline_definition: Vec::new(),
    });
    Some(Node::new(data, base + pos, base + pos + i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_reference() {
        let node = footnote_reference("[fn:1] rest", 0, 0).unwrap();
        let NodeData::FootnoteReference(f) = &node.data else { panic!() };
        assert_eq!(f.label.as_deref(), Some("1"));
        assert_eq!(f.reference_type, FootnoteRefType::Standard);
        assert_eq!(node.end, 6);
    }

    #[test]
    fn inline_with_label() {
        let node = footnote_reference("[fn:note:the definition]", 0, 10).unwrap();
        let NodeData::FootnoteReference(f) = &node.data else { panic!() };
        assert_eq!(f.label.as_deref(), Some("note"));
        assert_eq!(f.reference_type, FootnoteRefType::Inline);
        let span = f.definition_span.unwrap();
        assert_eq!((span.start, span.end), (19, 33));
    }

    #[test]
    fn anonymous_inline() {
        let node = footnote_reference("[fn::def here]", 0, 0).unwrap();
        let NodeData::FootnoteReference(f) = &node.data else { panic!() };
        assert!(f.label.is_none());
        assert_eq!(f.reference_type, FootnoteRefType::Inline);
    }

    #[test]
    fn nested_brackets_in_definition() {
        let node = footnote_reference("[fn::see [1]]", 0, 0).unwrap();
        assert_eq!(node.end, 13);
    }

    #[test]
    fn bare_fn_declines() {
        assert!(footnote_reference("[fn:]", 0, 0).is_none());
        assert!(footnote_reference("[fn:unclosed", 0, 0).is_none());
    }
}
