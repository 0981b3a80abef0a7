//! Recursive parser: drives the element dispatcher over a range, descends
//! into container contents and lexes objects where the granularity allows.

pub(crate) mod affiliated;
pub(crate) mod elements;

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{NodeData, NodeId, NodeKind, Tree, object_restriction};
use crate::buffer::Buffer;
use crate::host::VisibilityMask;
use crate::objects::ObjectLexer;
use crate::syntax::{Syntax, heading_stars};

/// How deep a parse descends, coarse to fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Granularity {
    Headline,
    GreaterElement,
    Element,
    Object,
}

/// Dispatcher hint describing what may appear at the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    None,
    FirstSection,
    Section,
    Item,
    NodeProperty,
    TableRow,
}

/// The mode governing the first child of a container.
pub(crate) fn first_child_mode(kind: NodeKind) -> Mode {
    match kind {
        NodeKind::Document => Mode::FirstSection,
        NodeKind::Headline => Mode::Section,
        NodeKind::PlainList => Mode::Item,
        NodeKind::PropertyDrawer => Mode::NodeProperty,
        NodeKind::Table => Mode::TableRow,
        _ => Mode::None,
    }
}

/// The mode governing the sibling after an element of `kind`.
pub(crate) fn mode_after(kind: NodeKind) -> Mode {
    match kind {
        NodeKind::Item => Mode::Item,
        NodeKind::NodeProperty => Mode::NodeProperty,
        NodeKind::TableRow => Mode::TableRow,
        _ => Mode::None,
    }
}

/// Options for a full parse.
pub struct ParseOptions<'a> {
    pub granularity: Granularity,
    /// Skip invisible regions, consulting `mask`.
    pub visible_only: bool,
    pub mask: Option<&'a dyn VisibilityMask>,
}

impl Default for ParseOptions<'_> {
    fn default() -> Self {
        ParseOptions { granularity: Granularity::Object, visible_only: false, mask: None }
    }
}

static RADIO_TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<<<([^<>\n]+)>>>").unwrap());

/// Collect the texts of every `<<<radio target>>>` in the buffer.
pub(crate) fn scan_radio_targets(buf: &Buffer) -> Vec<String> {
    let text = buf.text();
    RADIO_TARGET_RE
        .captures_iter(&text)
        .map(|c| c[1].trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse the whole buffer into a fresh tree.
pub fn parse_buffer(buf: &Buffer, syntax: &Syntax, options: &ParseOptions) -> Tree {
    let radio_targets = if options.granularity == Granularity::Object {
        scan_radio_targets(buf)
    } else {
        Vec::new()
    };
    let lexer = ObjectLexer::new(syntax, &radio_targets);
    let walker = Walker {
        buf,
        syntax,
        granularity: options.granularity,
        visible_only: options.visible_only,
        mask: options.mask,
        lexer,
    };
    let mut tree = Tree::new(buf.len());
    let root = tree.root();
    if walker.granularity == Granularity::Headline {
        walker.walk_headlines(&mut tree, root, 0, buf.len());
    } else {
        walker.walk(&mut tree, root, 0, buf.len(), Mode::FirstSection);
    }
    tree
}

pub(crate) struct Walker<'a> {
    pub buf: &'a Buffer,
    pub syntax: &'a Syntax,
    pub granularity: Granularity,
    pub visible_only: bool,
    pub mask: Option<&'a dyn VisibilityMask>,
    pub lexer: ObjectLexer<'a>,
}

impl<'a> Walker<'a> {
    /// Parse elements in `[beg, end)` as children of `parent`.
    pub(crate) fn walk(
        &self,
        tree: &mut Tree,
        parent: NodeId,
        beg: usize,
        end: usize,
        mut mode: Mode,
    ) {
        let mut cursor = beg;
        loop {
            if self.visible_only
                && let Some(mask) = self.mask
                && cursor < end
                && mask.invisible_at(cursor)
            {
                cursor = mask.find_visible(cursor).max(cursor + 1);
                continue;
            }
            let (pos, _) = self.buf.skip_blank_lines(cursor, end);
            if pos >= end {
                break;
            }
            let structure = match (mode, tree.get(parent).map(|n| &n.data)) {
                (Mode::Item, Some(NodeData::PlainList(list))) => Some(list.structure.clone()),
                _ => None,
            };
            let node =
                elements::element_at(self.buf, self.syntax, pos, end, mode, structure.as_deref());
            let el_end = node.end;
            let kind = node.kind();
            let id = tree.alloc(node);
            tree.adopt(parent, id);
            self.descend(tree, id);
            if el_end <= pos {
                break;
            }
            mode = mode_after(kind);
            cursor = el_end;
        }
    }

    /// Headline-granularity walk: only headings are materialized.
    fn walk_headlines(&self, tree: &mut Tree, parent: NodeId, beg: usize, end: usize) {
        let mut cursor = beg;
        while cursor < end {
            let line = self.buf.line_str(cursor);
            if let Some(stars) = heading_stars(&line)
                && self.syntax.headline_level_ok(stars)
            {
                if let Some(node) =
                    elements::headline::headline(self.buf, self.syntax, cursor, end)
                {
                    let contents = node.contents_span();
                    let el_end = node.end;
                    let id = tree.alloc(node);
                    tree.adopt(parent, id);
                    if let Some(span) = contents {
                        self.walk_headlines(tree, id, span.start, span.end);
                    }
                    cursor = el_end;
                    continue;
                }
            }
            cursor = self.buf.next_line_start(cursor);
        }
    }

    /// Recurse into `id`'s contents per granularity, then lex objects.
    pub(crate) fn descend(&self, tree: &mut Tree, id: NodeId) {
        let Some(node) = tree.get(id) else { return };
        let kind = node.kind();
        let contents = node.contents_span();

        if kind.is_greater_element() {
            let recurse = match self.granularity {
                Granularity::Headline => false,
                Granularity::GreaterElement => {
                    matches!(kind, NodeKind::Headline | NodeKind::Section | NodeKind::Inlinetask)
                }
                _ => true,
            };
            if recurse && let Some(span) = contents {
                self.walk(tree, id, span.start, span.end, first_child_mode(kind));
            }
        } else if self.granularity == Granularity::Object
            && kind.element_admits_objects()
            && let Some(span) = contents
        {
            let children = self.lexer.lex_region(
                tree,
                self.buf,
                span.start,
                span.end,
                object_restriction(kind),
            );
            for child in children {
                tree.adopt(id, child);
            }
        }

        if self.granularity == Granularity::Object {
            self.parse_secondary(tree, id);
        }
    }

    /// Parse secondary strings (titles, item tags) into objects.
    fn parse_secondary(&self, tree: &mut Tree, id: NodeId) {
        let Some(node) = tree.get(id) else { return };
        let span = match &node.data {
            NodeData::Headline(h) | NodeData::Inlinetask(h) => h.title_span,
            NodeData::Item(i) => i.tag_span,
            _ => None,
        };
        let kind = node.kind();
        if let Some(span) = span {
            let children = self.lexer.lex_region(
                tree,
                self.buf,
                span.start,
                span.end,
                object_restriction(kind),
            );
            tree.adopt_secondary(id, 0, children);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    fn parse(text: &str) -> (Buffer, Tree) {
        let buf = Buffer::from_str(text);
        let syntax = Syntax::default();
        let tree = parse_buffer(&buf, &syntax, &ParseOptions::default());
        (buf, tree)
    }

    fn child_kinds(tree: &Tree, id: NodeId) -> Vec<NodeKind> {
        tree[id].children.iter().map(|c| tree[*c].kind()).collect()
    }

    #[test]
    fn paragraph_with_bold() {
        let (_, tree) = parse("Hello *world*.\n");
        let root = tree.root();
        assert_eq!(child_kinds(&tree, root), vec![NodeKind::Section]);
        let section = tree[root].children[0];
        assert_eq!(child_kinds(&tree, section), vec![NodeKind::Paragraph]);
        let para = tree[section].children[0];
        assert_eq!(
            child_kinds(&tree, para),
            vec![NodeKind::PlainText, NodeKind::Bold, NodeKind::PlainText]
        );
    }

    #[test]
    fn headline_section_structure() {
        let (_, tree) = parse("intro\n* One\nbody\n** Sub\n* Two\n");
        let root = tree.root();
        assert_eq!(
            child_kinds(&tree, root),
            vec![NodeKind::Section, NodeKind::Headline, NodeKind::Headline]
        );
        let one = tree[root].children[1];
        assert_eq!(
            child_kinds(&tree, one),
            vec![NodeKind::Section, NodeKind::Headline]
        );
    }

    #[test]
    fn headline_title_secondary_string() {
        let (_, tree) = parse("* A *bold* title\n");
        let root = tree.root();
        let head = tree[root].children[0];
        let NodeData::Headline(h) = &tree[head].data else { panic!() };
        let kinds: Vec<NodeKind> = h.title.iter().map(|t| tree[*t].kind()).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::PlainText, NodeKind::Bold, NodeKind::PlainText]
        );
        for t in &h.title {
            assert_eq!(tree[*t].parent, Some(head));
        }
    }

    #[test]
    fn list_structure_s3() {
        let (_, tree) = parse("- a\n- b\n  - c\n");
        let root = tree.root();
        let section = tree[root].children[0];
        let list = tree[section].children[0];
        assert_eq!(tree[list].kind(), NodeKind::PlainList);
        let items = &tree[list].children;
        assert_eq!(items.len(), 2);
        // Second item contains a paragraph and a nested list.
        let b = items[1];
        let kinds = child_kinds(&tree, b);
        assert_eq!(kinds, vec![NodeKind::Paragraph, NodeKind::PlainList]);
        let nested = tree[b].children[1];
        assert_eq!(child_kinds(&tree, nested), vec![NodeKind::Item]);
    }

    #[test]
    fn property_drawer_members() {
        let (_, tree) = parse(":PROPERTIES:\n:ID: 1\n:OTHER: 2\n:END:\n");
        let root = tree.root();
        let section = tree[root].children[0];
        let pd = tree[section].children[0];
        assert_eq!(tree[pd].kind(), NodeKind::PropertyDrawer);
        assert_eq!(
            child_kinds(&tree, pd),
            vec![NodeKind::NodeProperty, NodeKind::NodeProperty]
        );
    }

    #[test]
    fn table_rows_and_cells() {
        let (_, tree) = parse("| a | b |\n|---|\n| c |\n");
        let root = tree.root();
        let section = tree[root].children[0];
        let table = tree[section].children[0];
        let rows = child_kinds(&tree, table);
        assert_eq!(
            rows,
            vec![NodeKind::TableRow, NodeKind::TableRow, NodeKind::TableRow]
        );
        let first = tree[table].children[0];
        assert_eq!(
            child_kinds(&tree, first),
            vec![NodeKind::TableCell, NodeKind::TableCell]
        );
    }

    #[test]
    fn granularity_element_skips_objects() {
        let buf = Buffer::from_str("Hello *world*.\n");
        let syntax = Syntax::default();
        let options =
            ParseOptions { granularity: Granularity::Element, ..ParseOptions::default() };
        let tree = parse_buffer(&buf, &syntax, &options);
        let section = tree[tree.root()].children[0];
        let para = tree[section].children[0];
        assert!(tree[para].children.is_empty());
    }

    #[test]
    fn granularity_headline_only_headlines() {
        let buf = Buffer::from_str("intro\n* One\nbody\n** Sub\n");
        let syntax = Syntax::default();
        let options =
            ParseOptions { granularity: Granularity::Headline, ..ParseOptions::default() };
        let tree = parse_buffer(&buf, &syntax, &options);
        let kinds = child_kinds(&tree, tree.root());
        assert_eq!(kinds, vec![NodeKind::Headline]);
        let one = tree[tree.root()].children[0];
        assert_eq!(child_kinds(&tree, one), vec![NodeKind::Headline]);
    }

    #[test]
    fn radio_targets_link_matches() {
        let (_, tree) = parse("<<<meta>>> data\n\nsee meta here\n");
        let root = tree.root();
        let section = tree[root].children[0];
        let second_para = tree[section].children[1];
        let kinds = child_kinds(&tree, second_para);
        assert!(kinds.contains(&NodeKind::Link), "{kinds:?}");
    }

    #[test]
    fn inlinetask_sits_inside_the_section() {
        let stars = "*".repeat(15);
        let (_, tree) = parse(&format!("* Head\n{stars} Inline task\nbody\n"));
        let root = tree.root();
        let head = tree[root].children[0];
        assert_eq!(child_kinds(&tree, head), vec![NodeKind::Section]);
        let section = tree[head].children[0];
        assert_eq!(
            child_kinds(&tree, section),
            vec![NodeKind::Inlinetask, NodeKind::Paragraph]
        );
    }

    #[test]
    fn planning_element_after_headline() {
        let (_, tree) = parse("* TODO Task :work:\nSCHEDULED: <2024-01-02 Tue>\n");
        let root = tree.root();
        let head = tree[root].children[0];
        let section = tree[head].children[0];
        assert_eq!(child_kinds(&tree, section), vec![NodeKind::Planning]);
    }

    #[test]
    fn every_position_is_covered() {
        let (buf, tree) = parse("* A\ntext *b*\n\n- item\n");
        // Walk: every child's span lies within its parent's contents.
        tree.map(tree.root(), &mut |t, id| {
            let node = &t[id];
            if let Some(parent) = node.parent {
                let p = &t[parent];
                assert!(p.begin <= node.begin && node.end <= p.end, "{:?}", node.kind());
            }
            assert!(node.end <= buf.len() + 1);
        });
    }
}
