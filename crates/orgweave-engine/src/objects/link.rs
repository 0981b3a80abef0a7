//! Link recognizers (bracket, angle, plain, radio) plus `<<target>>` and
//! `<<<radio target>>>`.

use crate::ast::{Link, LinkFormat, Node, NodeData};
use crate::syntax::Syntax;

fn split_scheme<'a>(inner: &'a str, syntax: &Syntax) -> Option<(&'a str, &'a str)> {
    let colon = inner.find(':')?;
    let scheme = &inner[..colon];
    syntax
        .options()
        .link_schemes
        .iter()
        .any(|s| s == scheme)
        .then(|| (scheme, &inner[colon + 1..]))
}

/// `[[path]]` or `[[path][description]]`.
pub(crate) fn bracket_link(s: &str, pos: usize, base: usize, syntax: &Syntax) -> Option<Node> {
    let rest = &s[pos..];
    if !rest.starts_with("[[") {
        return None;
    }
    // Path runs to the first unescaped `]`.
    let bytes = rest.as_bytes();
    let mut i = 2;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => i += 2,
            b']' | b'\n' => break,
            _ => i += 1,
        }
    }
    if !rest[i..].starts_with(']') {
        return None;
    }
    let path_raw = &rest[2..i];
    let mut end = i + 1;
    let mut description = None;
    if rest[end..].starts_with('[') {
        // Description may hold nested brackets; close at `]]`.
        let close = rest[end..].find("]]")?;
        description = Some((pos + end + 1, pos + end + close));
        end += close + 1;
    }
    if !rest[end..].starts_with(']') {
        return None;
    }
    end += 1;

    let (link_type, path) = match split_scheme(path_raw, syntax) {
        Some((scheme, p)) => (scheme.to_owned(), p.to_owned()),
        None if path_raw.starts_with('#') => ("custom-id".to_owned(), path_raw[1..].to_owned()),
        None => ("fuzzy".to_owned(), path_raw.trim_start_matches('*').to_owned()),
    };
    let mut node = Node::new(
        NodeData::Link(Link {
            link_type,
            path,
            format: LinkFormat::Bracket,
            raw_link: path_raw.to_owned(),
        }),
        base + pos,
        base + pos + end,
    );
    if let Some((cb, ce)) = description {
        node.contents_begin = Some(base + cb);
        node.contents_end = Some(base + ce);
    }
    Some(node)
}

/// `<scheme:path>` with a known scheme.
pub(crate) fn angle_link(s: &str, pos: usize, base: usize, syntax: &Syntax) -> Option<Node> {
    let rest = &s[pos..];
    if !rest.starts_with('<') {
        return None;
    }
    let close = rest.find('>')?;
    let inner = &rest[1..close];
    if inner.contains('\n') {
        return None;
    }
    let (scheme, path) = split_scheme(inner, syntax)?;
    Some(Node::new(
        NodeData::Link(Link {
            link_type: scheme.to_owned(),
            path: path.to_owned(),
            format: LinkFormat::Angle,
            raw_link: inner.to_owned(),
        }),
        base + pos,
        base + pos + close + 1,
    ))
}

/// `scheme:path` in running text.
pub(crate) fn plain_link(s: &str, pos: usize, base: usize, syntax: &Syntax) -> Option<Node> {
    // Word boundary on the left.
    if s[..pos].chars().next_back().is_some_and(|c| c.is_alphanumeric()) {
        return None;
    }
    let m = syntax.plain_link_re().find(&s[pos..])?;
    if m.start() != 0 {
        return None;
    }
    let inner = m.as_str();
    let (scheme, path) = split_scheme(inner, syntax)?;
    Some(Node::new(
        NodeData::Link(Link {
            link_type: scheme.to_owned(),
            path: path.to_owned(),
            format: LinkFormat::Plain,
            raw_link: inner.to_owned(),
        }),
        base + pos,
        base + pos + m.end(),
    ))
}

/// A radio link: plain text matching a declared radio target.
pub(crate) fn radio_link(matched: &str, pos: usize, base: usize) -> Node {
    Node::new(
        NodeData::Link(Link {
            link_type: "radio".to_owned(),
            path: matched.to_owned(),
            format: LinkFormat::Radio,
            raw_link: matched.to_owned(),
        }),
        base + pos,
        base + pos + matched.len(),
    )
}

/// `<<target>>`: link target, no contents.
pub(crate) fn target(s: &str, pos: usize, base: usize) -> Option<Node> {
    let rest = &s[pos..];
    if !rest.starts_with("<<") || rest.starts_with("<<<") {
        return None;
    }
    let close = rest.find(">>")?;
    let value = &rest[2..close];
    if value.is_empty()
        || value.contains('\n')
        || value.contains('<')
        || value.contains('>')
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
    {
        return None;
    }
    Some(Node::new(
        NodeData::Target { value: value.to_owned() },
        base + pos,
        base + pos + close + 2,
    ))
}

/// `<<<radio target>>>`: contents are objects under the minimal restriction.
pub(crate) fn radio_target(s: &str, pos: usize, base: usize) -> Option<Node> {
    let rest = &s[pos..];
    if !rest.starts_with("<<<") {
        return None;
    }
    let close = rest.find(">>>")?;
    let value = &rest[3..close];
    if value.is_empty()
        || value.contains('\n')
        || value.contains('<')
        || value.contains('>')
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
    {
        return None;
    }
    let mut node = Node::new(NodeData::RadioTarget, base + pos, base + pos + close + 3);
    node.contents_begin = Some(base + pos + 3);
    node.contents_end = Some(base + pos + close);
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    fn syntax() -> Syntax {
        Syntax::default()
    }

    #[test]
    fn bracket_without_description() {
        let node = bracket_link("[[https://example.org]]", 0, 0, &syntax()).unwrap();
        let NodeData::Link(l) = &node.data else { panic!() };
        assert_eq!(l.link_type, "https");
        assert_eq!(l.path, "//example.org");
        assert_eq!(l.format, LinkFormat::Bracket);
        assert_eq!(node.end, 23);
        assert!(node.contents_begin.is_none());
    }

    #[test]
    fn bracket_with_description() {
        let s = "[[file:notes.org][my notes]]";
        let node = bracket_link(s, 0, 0, &syntax()).unwrap();
        assert_eq!(node.end, s.len());
        assert_eq!(node.contents_begin, Some(18));
        assert_eq!(node.contents_end, Some(26));
        assert_eq!(&s[18..26], "my notes");
    }

    #[test]
    fn fuzzy_and_custom_id() {
        let node = bracket_link("[[some heading]]", 0, 0, &syntax()).unwrap();
        let NodeData::Link(l) = &node.data else { panic!() };
        assert_eq!(l.link_type, "fuzzy");
        assert_eq!(l.path, "some heading");

        let node = bracket_link("[[#custom]]", 0, 0, &syntax()).unwrap();
        let NodeData::Link(l) = &node.data else { panic!() };
        assert_eq!(l.link_type, "custom-id");
        assert_eq!(l.path, "custom");
    }

    #[test]
    fn unclosed_bracket_declines() {
        assert!(bracket_link("[[unclosed", 0, 0, &syntax()).is_none());
        assert!(bracket_link("[[a][b]", 0, 0, &syntax()).is_none());
    }

    #[test]
    fn angle_needs_known_scheme() {
        assert!(angle_link("<https://e.org/a b>", 0, 0, &syntax()).is_some());
        assert!(angle_link("<nope:x>", 0, 0, &syntax()).is_none());
    }

    #[test]
    fn plain_link_word_boundary() {
        let s = "xhttps://e.org";
        assert!(plain_link(s, 1, 0, &syntax()).is_none());
        let s = "see https://e.org/x now";
        let node = plain_link(s, 4, 0, &syntax()).unwrap();
        let NodeData::Link(l) = &node.data else { panic!() };
        assert_eq!(l.raw_link, "https://e.org/x");
    }

    #[test]
    fn target_shapes() {
        let node = target("<<here>>", 0, 0).unwrap();
        assert_eq!(node.kind(), NodeKind::Target);
        assert!(target("<< bad>>", 0, 0).is_none());
        assert!(target("<<<radio>>>", 0, 0).is_none());
    }

    #[test]
    fn radio_target_has_contents() {
        let node = radio_target("<<<radio text>>>", 0, 0).unwrap();
        assert_eq!(node.kind(), NodeKind::RadioTarget);
        assert_eq!(node.contents_begin, Some(3));
        assert_eq!(node.contents_end, Some(13));
    }
}
