//! Nodes and the arena that owns them.
//!
//! `parent` is a navigation link, never an ownership edge: the arena owns
//! every node, parents refer to children by id, and ids are generational so
//! a stale handle can be detected instead of resolving to a recycled slot.

use std::fmt::Write as _;
use std::ops::Index;

use crate::ast::{NodeData, NodeKind};
use crate::buffer::Span;

/// Generational handle to a node in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    idx: u32,
    generation: u32,
}

/// A parsed construct with its universal fields and per-kind payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub begin: usize,
    pub end: usize,
    pub contents_begin: Option<usize>,
    pub contents_end: Option<usize>,
    /// Trailing blank lines for elements, trailing spaces for objects.
    pub post_blank: usize,
    /// Position after the affiliated-metadata block, when one was collected.
    pub post_affiliated: Option<usize>,
    pub affiliated: Option<Box<crate::ast::Affiliated>>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub fn new(data: NodeData, begin: usize, end: usize) -> Self {
        Node {
            begin,
            end,
            contents_begin: None,
            contents_end: None,
            post_blank: 0,
            post_affiliated: None,
            affiliated: None,
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn span(&self) -> Span {
        Span::new(self.begin, self.end)
    }

    pub fn contents_span(&self) -> Option<Span> {
        match (self.contents_begin, self.contents_end) {
            (Some(a), Some(b)) => Some(Span::new(a, b)),
            _ => None,
        }
    }

    /// Shift every position-bearing field by `offset`.
    pub(crate) fn shift(&mut self, offset: isize) {
        fn mv(pos: &mut usize, offset: isize) {
            *pos = pos.saturating_add_signed(offset);
        }
        fn mv_span(span: &mut Span, offset: isize) {
            mv(&mut span.start, offset);
            mv(&mut span.end, offset);
        }
        fn mv_ts(ts: &mut crate::ast::Timestamp, offset: isize) {
            mv_span(&mut ts.span, offset);
        }

        mv(&mut self.begin, offset);
        mv(&mut self.end, offset);
        if let Some(p) = self.contents_begin.as_mut() {
            mv(p, offset);
        }
        if let Some(p) = self.contents_end.as_mut() {
            mv(p, offset);
        }
        if let Some(p) = self.post_affiliated.as_mut() {
            mv(p, offset);
        }
        if let Some(aff) = self.affiliated.as_mut() {
            for entry in &mut aff.entries {
                mv_span(&mut entry.value_span, offset);
            }
        }
        match &mut self.data {
            NodeData::Headline(h) | NodeData::Inlinetask(h) => {
                if let Some(span) = h.title_span.as_mut() {
                    mv_span(span, offset);
                }
                for ts in [&mut h.scheduled, &mut h.deadline, &mut h.closed]
                    .into_iter()
                    .flatten()
                {
                    mv_ts(ts, offset);
                }
            }
            NodeData::Item(item) => {
                if let Some(span) = item.tag_span.as_mut() {
                    mv_span(span, offset);
                }
            }
            NodeData::PlainList(list) => {
                for record in &mut list.structure {
                    mv(&mut record.begin, offset);
                    mv(&mut record.contents_begin, offset);
                    mv(&mut record.end, offset);
                    if let Some(span) = record.tag_span.as_mut() {
                        mv_span(span, offset);
                    }
                }
            }
            NodeData::Planning(p) => {
                for ts in [&mut p.scheduled, &mut p.deadline, &mut p.closed]
                    .into_iter()
                    .flatten()
                {
                    mv_ts(ts, offset);
                }
            }
            NodeData::Clock(c) => {
                if let Some(ts) = c.timestamp.as_mut() {
                    mv_ts(ts, offset);
                }
            }
            NodeData::FootnoteReference(f) => {
                if let Some(span) = f.definition_span.as_mut() {
                    mv_span(span, offset);
                }
            }
            NodeData::Timestamp(ts) => mv_ts(ts, offset),
            _ => {}
        }
    }
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena owning a forest of nodes rooted at a `Document` sentinel.
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Tree {
    /// A tree whose root document node spans `[0, len)`.
    pub fn new(len: usize) -> Self {
        let mut root_node = Node::new(NodeData::Document, 0, len);
        root_node.contents_begin = Some(0);
        root_node.contents_end = Some(len);
        let mut tree = Tree {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId { idx: 0, generation: 0 },
        };
        tree.root = tree.alloc(root_node);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation += 1;
            slot.node = Some(node);
            NodeId { idx, generation: slot.generation }
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, node: Some(node) });
            NodeId { idx, generation: 0 }
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.idx as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.idx as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    /// Free one node. The caller is responsible for detaching it first.
    pub(crate) fn free(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.idx as usize)
            && slot.generation == id.generation
            && slot.node.take().is_some()
        {
            self.free.push(id.idx);
        }
    }

    /// Free a node together with its children and secondary strings.
    pub fn free_subtree(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else { return };
        let mut pending: Vec<NodeId> = node.children.clone();
        for list in node.data.secondary() {
            pending.extend(list.iter().copied());
        }
        self.free(id);
        for child in pending {
            self.free_subtree(child);
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind of the node behind `id`, for terse call sites.
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(Node::kind)
    }

    /// Chain of ancestors from `id` (excluded) to the root (included).
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.get(id).and_then(|n| n.parent);
        while let Some(p) = cur {
            out.push(p);
            cur = self.get(p).and_then(|n| n.parent);
        }
        out
    }

    /// Position-normalized s-expression dump of the subtree at `id`.
    ///
    /// Two trees are structurally equal exactly when their dumps match:
    /// kinds, payload properties and `post-blank` are included, buffer
    /// positions are not.
    pub fn sexp(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_sexp(id, 0, &mut out, false);
        out
    }

    /// Like [`Tree::sexp`] but restricted to the element layer: objects,
    /// secondary strings and object-level properties are omitted, so a
    /// lazily filled cache dump compares against an element-granularity
    /// parse.
    pub fn sexp_elements(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_sexp(id, 0, &mut out, true);
        out
    }

    fn write_sexp(&self, id: NodeId, depth: usize, out: &mut String, elements_only: bool) {
        let Some(node) = self.get(id) else {
            let _ = write!(out, "{:indent$}(stale)", "", indent = depth * 2);
            return;
        };
        let _ = write!(out, "{:indent$}({}", "", node.kind().name(), indent = depth * 2);
        let props = sexp_props(node);
        if !props.is_empty() {
            let _ = write!(out, " {props}");
        }
        if let Some(aff) = &node.affiliated
            && !aff.is_empty()
        {
            let _ = write!(out, " :affiliated (");
            for (i, e) in aff.entries.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                match &e.dual {
                    Some(d) => {
                        let _ = write!(out, "({} [{}] {:?})", e.key, d, e.value);
                    }
                    None => {
                        let _ = write!(out, "({} {:?})", e.key, e.value);
                    }
                }
            }
            out.push(')');
        }
        if !elements_only {
            for (label, list) in secondary_labels(node) {
                if list.is_empty() {
                    continue;
                }
                let _ = write!(out, "\n{:indent$}:{label}", "", indent = (depth + 1) * 2);
                for child in list {
                    out.push('\n');
                    self.write_sexp(*child, depth + 2, out, elements_only);
                }
            }
        }
        for child in &node.children {
            if elements_only && self.get(*child).is_some_and(|n| !n.kind().is_element()) {
                continue;
            }
            out.push('\n');
            self.write_sexp(*child, depth + 1, out, elements_only);
        }
        out.push(')');
    }
}

fn secondary_labels(node: &Node) -> Vec<(&'static str, &Vec<NodeId>)> {
    match &node.data {
        NodeData::Headline(h) | NodeData::Inlinetask(h) => vec![("title", &h.title)],
        NodeData::Item(i) => vec![("tag", &i.tag)],
        NodeData::FootnoteReference(f) => vec![("inline-definition", &f.inline_definition)],
        _ => Vec::new(),
    }
}

fn sexp_props(node: &Node) -> String {
    use crate::ast::NodeData as D;
    let mut s = String::new();
    let mut prop = |name: &str, value: String| {
        if !s.is_empty() {
            s.push(' ');
        }
        let _ = write!(s, ":{name} {value}");
    };
    match &node.data {
        D::PlainText { value } => prop("value", format!("{value:?}")),
        D::Drawer { name } => prop("name", format!("{name:?}")),
        D::DynamicBlock { block_name, arguments } => {
            prop("block-name", format!("{block_name:?}"));
            if let Some(a) = arguments {
                prop("arguments", format!("{a:?}"));
            }
        }
        D::FootnoteDefinition { label } => prop("label", format!("{label:?}")),
        D::Headline(h) | D::Inlinetask(h) => {
            prop("level", h.level.to_string());
            if let Some(kw) = &h.todo_keyword {
                prop("todo-keyword", format!("{kw:?}"));
            }
            if let Some(p) = h.priority {
                prop("priority", format!("{p:?}"));
            }
            if h.commented {
                prop("commentedp", "t".into());
            }
            if h.archived {
                prop("archivedp", "t".into());
            }
            if h.footnote_section {
                prop("footnote-section-p", "t".into());
            }
            prop("raw-value", format!("{:?}", h.raw_value));
            if !h.tags.is_empty() {
                prop("tags", format!("({})", h.tags.join(" ")));
            }
            for (name, ts) in [
                ("scheduled", &h.scheduled),
                ("deadline", &h.deadline),
                ("closed", &h.closed),
            ] {
                if let Some(ts) = ts {
                    prop(name, format!("{:?}", ts.raw_value));
                }
            }
        }
        D::Item(i) => {
            prop("bullet", format!("{:?}", i.bullet));
            if let Some(c) = i.counter {
                prop("counter", c.to_string());
            }
            if let Some(c) = i.checkbox {
                prop("checkbox", format!("{c:?}").to_lowercase());
            }
        }
        D::PlainList(l) => prop("type", format!("{:?}", l.list_type).to_lowercase()),
        D::SpecialBlock { block_type, parameters } => {
            prop("type", format!("{block_type:?}"));
            if let Some(p) = parameters {
                prop("parameters", format!("{p:?}"));
            }
        }
        D::Table(t) => {
            prop("type", format!("{:?}", t.table_type).to_lowercase());
            if !t.tblfm.is_empty() {
                prop("tblfm", format!("{:?}", t.tblfm));
            }
        }
        D::BabelCall(b) => prop("call", format!("{:?}", b.call)),
        D::Clock(c) => {
            prop("status", format!("{:?}", c.status).to_lowercase());
            if let Some(ts) = &c.timestamp {
                prop("value", format!("{:?}", ts.raw_value));
            }
            if let Some(d) = &c.duration {
                prop("duration", format!("{d:?}"));
            }
        }
        D::Comment { value }
        | D::CommentBlock { value }
        | D::DiarySexp { value }
        | D::FixedWidth { value }
        | D::LatexEnvironment { value } => prop("value", format!("{value:?}")),
        D::ExampleBlock(e) => {
            if let Some(sw) = &e.switches {
                prop("switches", format!("{sw:?}"));
            }
            prop("value", format!("{:?}", e.value));
        }
        D::ExportBlock { backend, value } => {
            prop("backend", format!("{backend:?}"));
            prop("value", format!("{value:?}"));
        }
        D::Keyword { key, value } => {
            prop("key", format!("{key:?}"));
            prop("value", format!("{value:?}"));
        }
        D::NodeProperty { key, value } => {
            prop("key", format!("{key:?}"));
            prop("value", format!("{value:?}"));
        }
        D::Planning(p) => {
            for (name, ts) in [
                ("scheduled", &p.scheduled),
                ("deadline", &p.deadline),
                ("closed", &p.closed),
            ] {
                if let Some(ts) = ts {
                    prop(name, format!("{:?}", ts.raw_value));
                }
            }
        }
        D::SrcBlock(b) => {
            if let Some(l) = &b.language {
                prop("language", format!("{l:?}"));
            }
            if let Some(sw) = &b.switches {
                prop("switches", format!("{sw:?}"));
            }
            if let Some(p) = &b.parameters {
                prop("parameters", format!("{p:?}"));
            }
            prop("value", format!("{:?}", b.value));
        }
        D::TableRow { rule } => {
            if *rule {
                prop("type", "rule".into());
            }
        }
        D::Code { value } | D::Verbatim { value } | D::LatexFragment { value } => {
            prop("value", format!("{value:?}"));
        }
        D::Entity(e) => prop("name", format!("{:?}", e.name)),
        D::ExportSnippet { backend, value } => {
            prop("backend", format!("{backend:?}"));
            prop("value", format!("{value:?}"));
        }
        D::FootnoteReference(f) => {
            if let Some(l) = &f.label {
                prop("label", format!("{l:?}"));
            }
            prop("type", format!("{:?}", f.reference_type).to_lowercase());
        }
        D::InlineBabelCall(c) => prop("call", format!("{:?}", c.call)),
        D::InlineSrcBlock(b) => {
            prop("language", format!("{:?}", b.language));
            prop("value", format!("{:?}", b.value));
        }
        D::Link(l) => {
            prop("type", format!("{:?}", l.link_type));
            prop("path", format!("{:?}", l.path));
            prop("format", format!("{:?}", l.format).to_lowercase());
        }
        D::Macro(m) => {
            prop("key", format!("{:?}", m.key));
            if !m.args.is_empty() {
                prop("args", format!("{:?}", m.args));
            }
        }
        D::StatisticsCookie { value } | D::Target { value } => {
            prop("value", format!("{value:?}"));
        }
        D::Subscript { use_brackets } | D::Superscript { use_brackets } => {
            if *use_brackets {
                prop("use-brackets-p", "t".into());
            }
        }
        D::Timestamp(ts) => {
            prop("type", format!("{:?}", ts.kind).to_lowercase());
            prop("raw-value", format!("{:?}", ts.raw_value));
        }
        _ => {}
    }
    if node.post_blank > 0 {
        prop("post-blank", node.post_blank.to_string());
    }
    s
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.get(id).expect("stale node handle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeData;

    #[test]
    fn alloc_and_get() {
        let mut tree = Tree::new(10);
        let id = tree.alloc(Node::new(NodeData::Paragraph, 0, 10));
        assert_eq!(tree[id].kind(), NodeKind::Paragraph);
        assert_eq!(tree.len(), 2); // root + paragraph
    }

    #[test]
    fn freed_slot_detects_stale_handle() {
        let mut tree = Tree::new(10);
        let id = tree.alloc(Node::new(NodeData::Paragraph, 0, 10));
        tree.free(id);
        assert!(tree.get(id).is_none());
        let reused = tree.alloc(Node::new(NodeData::Comment { value: String::new() }, 0, 5));
        assert!(tree.get(id).is_none(), "old handle must not see the new node");
        assert!(tree.get(reused).is_some());
    }

    #[test]
    fn shift_moves_all_positions() {
        let mut node = Node::new(NodeData::Paragraph, 10, 20);
        node.contents_begin = Some(10);
        node.contents_end = Some(19);
        node.post_affiliated = Some(10);
        node.shift(5);
        assert_eq!(node.begin, 15);
        assert_eq!(node.end, 25);
        assert_eq!(node.contents_begin, Some(15));
        assert_eq!(node.contents_end, Some(24));
        assert_eq!(node.post_affiliated, Some(15));
        node.shift(-5);
        assert_eq!(node.begin, 10);
    }

    #[test]
    fn sexp_ignores_positions() {
        let mut a = Tree::new(100);
        let mut b = Tree::new(50);
        let pa = a.alloc(Node::new(NodeData::Paragraph, 0, 10));
        let root_a = a.root();
        a.get_mut(root_a).unwrap().children.push(pa);
        let pb = b.alloc(Node::new(NodeData::Paragraph, 40, 50));
        let root_b = b.root();
        b.get_mut(root_b).unwrap().children.push(pb);
        assert_eq!(a.sexp(a.root()), b.sexp(b.root()));
    }
}
