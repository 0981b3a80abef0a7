//! Universal invariants over a document exercising every element family.

use orgweave_engine::{
    Buffer, Document, NodeId, NodeKind, ParseOptions, Syntax, Tree, object_restriction,
    parse_buffer,
};

const KITCHEN_SINK: &str = "\
#+TITLE: Kitchen sink

Intro paragraph with *bold*, /italic/, =verb=, ~code~, a [[https://e.org][link]],
a footnote[fn:1], x_2 and y^{2}, \\alpha{} and $x+y$, a <<target>>,
and a stamp <2024-01-02 Tue 10:00>.

- item one
- item two [X]
  - nested
- term :: def

| a | b |
|-
| 1 | 2 |

#+NAME: example
#+BEGIN_SRC rust -n
fn main() {}
#+END_SRC

#+BEGIN_QUOTE
Quoted *text*.
#+END_QUOTE

: fixed width
# a comment
-----
%%(diary-date 1 2 2024)

\\begin{align}
x = 1
\\end{align}

[fn:1] The note.

* TODO [#A] Heading :tag:
SCHEDULED: <2024-01-02 Tue>
:PROPERTIES:
:ID: abc
:END:
CLOCK: [2024-01-02 Tue 09:00]--[2024-01-02 Tue 10:00] => 1:00
Body text.
** DONE Child
Final words.
";

fn full_tree() -> (Buffer, Tree) {
    let buf = Buffer::from_str(KITCHEN_SINK);
    let syntax = Syntax::default();
    let tree = parse_buffer(&buf, &syntax, &ParseOptions::default());
    (buf, tree)
}

fn walk(tree: &Tree, id: NodeId, f: &mut impl FnMut(&Tree, NodeId)) {
    f(tree, id);
    let node = &tree[id];
    let mut pending: Vec<NodeId> = Vec::new();
    for list in node.data.secondary() {
        pending.extend(list.iter().copied());
    }
    pending.extend(node.children.iter().copied());
    for child in pending {
        walk(tree, child, f);
    }
}

#[test]
fn coverage_every_position_has_an_element() {
    let mut doc = Document::from_str(KITCHEN_SINK);
    for pos in 0..doc.len() {
        let id = doc.element_at(pos);
        let node = doc.node(id).unwrap();
        assert!(
            node.kind() == NodeKind::Document || (node.begin <= pos && pos < node.end),
            "position {pos} not covered by {:?} [{}, {})",
            node.kind(),
            node.begin,
            node.end,
        );
    }
}

#[test]
fn containment_ordering() {
    let (buf, tree) = full_tree();
    walk(&tree, tree.root(), &mut |t, id| {
        let n = &t[id];
        assert!(n.begin <= n.end);
        assert!(n.end <= buf.len());
        if let (Some(cb), Some(ce)) = (n.contents_begin, n.contents_end) {
            assert!(n.begin <= cb && cb <= ce && ce <= n.end, "{:?}", n.kind());
        }
    });
}

#[test]
fn parent_consistency_both_ways() {
    let (_, tree) = full_tree();
    walk(&tree, tree.root(), &mut |t, id| {
        let n = &t[id];
        for child in &n.children {
            assert_eq!(t[*child].parent, Some(id), "child backlink broken");
        }
        for list in n.data.secondary() {
            for member in list {
                assert_eq!(t[*member].parent, Some(id), "secondary backlink broken");
            }
        }
        if let Some(parent) = n.parent {
            let p = &t[parent];
            let in_contents = p.children.contains(&id);
            let in_secondary = p
                .data
                .secondary()
                .into_iter()
                .any(|l| l.contains(&id));
            assert!(in_contents || in_secondary, "{:?} not under its parent", n.kind());
        }
    });
}

#[test]
fn greater_elements_contain_only_elements() {
    let (_, tree) = full_tree();
    walk(&tree, tree.root(), &mut |t, id| {
        let n = &t[id];
        if n.kind().is_greater_element() {
            for child in &n.children {
                assert!(
                    t[*child].kind().is_element(),
                    "{:?} directly contains {:?}",
                    n.kind(),
                    t[*child].kind(),
                );
            }
        }
    });
}

#[test]
fn object_restrictions_hold() {
    let (_, tree) = full_tree();
    walk(&tree, tree.root(), &mut |t, id| {
        let n = &t[id];
        let Some(parent) = n.parent else { return };
        let kind = n.kind();
        if !kind.is_object() || kind == NodeKind::PlainText {
            return;
        }
        let parent_kind = t[parent].kind();
        assert!(
            object_restriction(parent_kind).allows(kind),
            "{kind:?} not permitted inside {parent_kind:?}",
        );
    });
}

#[test]
fn no_same_kind_direct_nesting() {
    let (_, tree) = full_tree();
    walk(&tree, tree.root(), &mut |t, id| {
        let n = &t[id];
        if !n.kind().is_greater_element() {
            return;
        }
        if let Some(parent) = n.parent
            && t[parent].kind() == n.kind()
        {
            assert_eq!(
                n.kind(),
                NodeKind::Headline,
                "only headlines nest directly in their own kind",
            );
        }
    });
}

#[test]
fn context_queries_reach_objects() {
    let mut doc = Document::from_str(KITCHEN_SINK);
    let bold_pos = KITCHEN_SINK.find("*bold*").unwrap() + 2;
    let id = doc.context_at(bold_pos);
    assert_eq!(doc.node(id).unwrap().kind(), NodeKind::Bold);

    let stamp_pos = KITCHEN_SINK.find("<2024-01-02 Tue 10:00>").unwrap() + 3;
    let id = doc.context_at(stamp_pos);
    assert_eq!(doc.node(id).unwrap().kind(), NodeKind::Timestamp);

    let title_pos = KITCHEN_SINK.find("Heading").unwrap() + 2;
    let id = doc.context_at(title_pos);
    assert_eq!(doc.node(id).unwrap().kind(), NodeKind::PlainText);
    let owner = doc.node(id).unwrap().parent.unwrap();
    assert_eq!(doc.node(owner).unwrap().kind(), NodeKind::Headline);
}

#[test]
fn element_at_inside_nested_item() {
    // The innermost elements inside "- b\n  - c\n" resolve through the
    // nested item chain.
    let mut doc = Document::from_str("- a\n- b\n  - c\n");
    let id = doc.element_at(12);
    let node = doc.node(id).unwrap();
    assert_eq!(node.kind(), NodeKind::Paragraph);
    let item = doc.node(id).unwrap().parent.unwrap();
    let item_node = doc.node(item).unwrap();
    assert_eq!(item_node.kind(), NodeKind::Item);
    assert_eq!(item_node.begin, 8, "resolves through the innermost item");
}

#[test]
fn kitchen_sink_roundtrips() {
    let doc = Document::from_str(KITCHEN_SINK);
    assert_eq!(doc.render(), KITCHEN_SINK);
}
