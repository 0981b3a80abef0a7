//! Incremental element cache: a totally-ordered index of parsed elements
//! keyed by synthetic keys, filled lazily by a parse-to-position walk.

pub(crate) mod key;
pub(crate) mod sync;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;

pub use key::CacheKey;
pub(crate) use sync::{ChangeWarning, SyncRequest};

use crate::ast::{Node, NodeData, NodeId, NodeKind, Restriction, Tree, object_restriction};
use crate::buffer::{Buffer, Span};
use crate::objects::ObjectLexer;
use crate::parse::{Mode, first_child_mode, mode_after};
use crate::parse::{elements, scan_radio_targets};
use crate::syntax::Syntax;

/// Incremental state of object parsing within one element.
#[derive(Debug, Default)]
pub(crate) struct ObjectCache {
    /// Top-level objects found so far, in buffer order.
    pub objects: Vec<NodeId>,
    /// Next scan position inside the element's object region.
    pub next: usize,
    /// Set once the element's object stream is fully enumerated.
    pub complete: bool,
}

/// The cache: an arena of element nodes, the ordered index over them, the
/// per-element object sub-cache and the pending synchronization requests.
pub struct ElementCache {
    pub(crate) tree: Tree,
    pub(crate) index: BTreeMap<CacheKey, NodeId>,
    pub(crate) keys: HashMap<NodeId, CacheKey>,
    pub(crate) objects: HashMap<NodeId, ObjectCache>,
    pub(crate) requests: VecDeque<SyncRequest>,
    pub(crate) warning: ChangeWarning,
    pub(crate) radio_targets: Vec<String>,
}

impl ElementCache {
    pub fn new(len: usize) -> Self {
        ElementCache {
            tree: Tree::new(len),
            index: BTreeMap::new(),
            keys: HashMap::new(),
            objects: HashMap::new(),
            requests: VecDeque::new(),
            warning: ChangeWarning::None,
            radio_targets: Vec::new(),
        }
    }

    /// Drop every cached element; a subsequent query reparses from scratch.
    pub fn reset(&mut self, len: usize) {
        *self = ElementCache::new(len);
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Deepest cached element whose `begin` is at or before `pos`, stepping
    /// back over entries whose positions have drifted ahead of their keys.
    pub(crate) fn find_start(&self, pos: usize) -> Option<(CacheKey, NodeId)> {
        self.find_start_bounded(pos, None)
    }

    /// `find_start` restricted to keys strictly below `frontier`: entries
    /// at or past a pending request's cursor carry stale positions.
    fn find_start_bounded(
        &self,
        pos: usize,
        frontier: Option<&CacheKey>,
    ) -> Option<(CacheKey, NodeId)> {
        let natural_upper = CacheKey::upper_bound(pos);
        let mut upper = match frontier {
            Some(f) if *f <= natural_upper => Bound::Excluded(f.clone()),
            _ => Bound::Included(natural_upper),
        };
        loop {
            let (k, id) = self
                .index
                .range::<CacheKey, _>((Bound::Unbounded, upper))
                .next_back()?;
            if self.tree[*id].begin <= pos {
                return Some((k.clone(), *id));
            }
            upper = Bound::Excluded(k.clone());
        }
    }

    fn next_cached_after(
        &self,
        key: Option<&CacheKey>,
        frontier: Option<&CacheKey>,
    ) -> Option<(CacheKey, NodeId)> {
        let range = match key {
            Some(k) => self.index.range((Bound::Excluded(k), Bound::Unbounded)),
            None => self
                .index
                .range::<CacheKey, _>((Bound::<&CacheKey>::Unbounded, Bound::<&CacheKey>::Unbounded)),
        };
        range
            .map(|(k, id)| (k.clone(), *id))
            .next()
            .filter(|(k, _)| frontier.is_none_or(|f| *k < *f))
    }

    /// Insert a freshly parsed element between its position-wise
    /// neighbours. `prev_key` is the key of the latest element at or before
    /// it in walk order (its parent when descending); the natural
    /// position-derived key is used whenever it still fits between the
    /// neighbours, otherwise one is generated.
    pub(crate) fn cache_element(
        &mut self,
        node: Node,
        parent: NodeId,
        prev_key: Option<&CacheKey>,
    ) -> NodeId {
        // A child sharing its container's begin (the first item of a list,
        // the first row of a table, a section's first element) keys off
        // begin + 1 so the parent sorts strictly before it.
        let child_adjust = self.tree.get(parent).is_some_and(|p| p.begin == node.begin);
        let begin = node.begin;
        let id = self.tree.alloc(node);
        self.tree.adopt(parent, id);

        let natural = CacheKey::natural(begin, child_adjust);
        let next = self.next_cached_after(prev_key, None);
        let next_key = next.as_ref().map(|(k, _)| k);
        let key = match (prev_key, next_key) {
            (None, None) => natural,
            (Some(p), None) if natural > *p => natural,
            (Some(p), Some(n)) if natural > *p && natural < *n => natural,
            (None, Some(n)) if natural < *n => natural,
            _ => key::generate(prev_key, next_key),
        };
        self.index.insert(key.clone(), id);
        self.keys.insert(id, key);
        id
    }

    /// Remove one element from the index. Cached element children stay
    /// behind for the orphan sweep (their keys sort after the parent's);
    /// object children and secondary strings are freed with the node.
    pub(crate) fn remove_element(&mut self, id: NodeId) {
        if let Some(key) = self.keys.remove(&id) {
            self.index.remove(&key);
        }
        self.objects.remove(&id);
        let Some(node) = self.tree.get(id) else { return };
        let parent = node.parent;
        let object_children: Vec<NodeId> = node
            .children
            .iter()
            .copied()
            .filter(|c| !self.keys.contains_key(c))
            .chain(node.data.secondary().into_iter().flatten().copied())
            .collect();
        if let Some(parent) = parent
            && let Some(p) = self.tree.get_mut(parent)
        {
            p.children.retain(|c| *c != id);
        }
        for child in object_children {
            self.tree.free_subtree(child);
        }
        self.tree.free(id);
    }

    fn contains_pos(&self, id: NodeId, pos: usize, eob: usize) -> bool {
        let node = &self.tree[id];
        node.begin <= pos && (pos < node.end || (pos == eob && node.end == eob))
    }

    /// Limit of `parent`'s child region.
    fn parent_limit(&self, parent: NodeId, eob: usize) -> usize {
        let node = &self.tree[parent];
        node.contents_end.unwrap_or(node.end).min(eob)
    }

    /// Parse lazily up to `pos` and return the deepest element containing
    /// it. Pending requests at or before `pos` must be processed first.
    pub(crate) fn parse_to(&mut self, buf: &Buffer, syntax: &Syntax, pos: usize) -> NodeId {
        let frontier = self.frontier();
        self.parse_to_bounded(buf, syntax, pos, frontier.as_ref())
    }

    /// `parse_to` ignoring cached entries at or past `frontier`.
    pub(crate) fn parse_to_bounded(
        &mut self,
        buf: &Buffer,
        syntax: &Syntax,
        pos: usize,
        frontier: Option<&CacheKey>,
    ) -> NodeId {
        let eob = buf.len();
        let pos = pos.min(eob);
        let root = self.tree.root();

        let mut parent = root;
        let mut mode = Mode::FirstSection;
        let mut cursor = 0usize;
        let mut cur_key: Option<CacheKey> = None;
        let mut best = root;

        if let Some((mut k, mut id)) = self.find_start_bounded(pos, frontier) {
            // At the shared start position, the list or table wins over its
            // first item or row.
            if pos == self.tree[id].begin
                && matches!(self.tree[id].kind(), NodeKind::Item | NodeKind::TableRow)
                && let Some(p) = self.tree[id].parent
                && self.tree.get(p).is_some_and(|n| n.begin == pos)
                && let Some(pk) = self.keys.get(&p)
            {
                id = p;
                k = pk.clone();
            }
            if self.contains_pos(id, pos, eob) {
                let node = &self.tree[id];
                let kind = node.kind();
                let cb = node.contents_begin;
                let ce = node.contents_end.unwrap_or(node.end);
                if kind.is_greater_element()
                    && let Some(cb) = cb
                    && pos >= cb
                    && (pos < ce || (pos == eob && ce == eob))
                    && !(matches!(kind, NodeKind::PlainList | NodeKind::Table)
                        && pos == node.begin)
                {
                    best = id;
                    parent = id;
                    cursor = cb;
                    mode = first_child_mode(kind);
                    cur_key = Some(k);
                } else {
                    return id;
                }
            } else {
                // Continue after this element, climbing to the ancestor
                // whose contents still reach past the cursor.
                cursor = self.tree[id].end;
                cur_key = Some(k);
                mode = mode_after(self.tree[id].kind());
                parent = self.tree[id].parent.unwrap_or(root);
                while parent != root {
                    if self.contains_pos(parent, pos, eob) {
                        if cursor < self.parent_limit(parent, eob) {
                            break;
                        }
                        // The position sits in the parent's tail region,
                        // past its contents (a closing line, post-blank).
                        return parent;
                    }
                    cursor = cursor.max(self.tree[parent].end);
                    mode = mode_after(self.tree[parent].kind());
                    parent = self.tree[parent].parent.unwrap_or(root);
                }
            }
        }

        loop {
            let limit = self.parent_limit(parent, eob);
            if cursor >= limit {
                if parent == root {
                    return best;
                }
                cursor = cursor.max(self.tree[parent].end);
                mode = mode_after(self.tree[parent].kind());
                parent = self.tree[parent].parent.unwrap_or(root);
                continue;
            }
            let (next_pos, _) = buf.skip_blank_lines(cursor, limit);
            if next_pos > pos {
                // The position sits in leading blank lines of the parent.
                return if parent == root { best } else { parent };
            }
            if next_pos >= limit {
                cursor = limit;
                continue;
            }
            cursor = next_pos;

            // Reuse the cached element at this position when one exists.
            let reuse = self
                .next_cached_after(cur_key.as_ref(), frontier)
                .filter(|(_, id)| self.tree[*id].begin == cursor);
            let id = match reuse {
                Some((k, id)) => {
                    if self.tree[id].parent != Some(parent) {
                        let _ = self.tree.extract(id);
                        self.tree.adopt(parent, id);
                    }
                    cur_key = Some(k);
                    id
                }
                None => {
                    let structure = match (mode, self.tree.get(parent).map(|n| &n.data)) {
                        (Mode::Item, Some(NodeData::PlainList(l))) => Some(l.structure.clone()),
                        _ => None,
                    };
                    let node = elements::element_at(
                        buf,
                        syntax,
                        cursor,
                        limit,
                        mode,
                        structure.as_deref(),
                    );
                    let prev = cur_key
                        .clone()
                        .or_else(|| self.keys.get(&parent).cloned());
                    let id = self.cache_element(node, parent, prev.as_ref());
                    cur_key = self.keys.get(&id).cloned();
                    id
                }
            };

            if self.contains_pos(id, pos, eob) {
                best = id;
                let node = &self.tree[id];
                let kind = node.kind();
                let ce = node.contents_end.unwrap_or(node.end);
                if kind.is_greater_element()
                    && let Some(cb) = node.contents_begin
                    && pos >= cb
                    && (pos < ce || (pos == eob && ce == eob))
                    && !(matches!(kind, NodeKind::PlainList | NodeKind::Table)
                        && pos == node.begin)
                {
                    parent = id;
                    cursor = cb;
                    mode = first_child_mode(kind);
                    continue;
                }
                return id;
            }
            mode = mode_after(self.tree[id].kind());
            cursor = self.tree[id].end;
        }
    }

    /// Object-bearing regions of an element, with their restriction sets.
    fn object_regions(&self, buf: &Buffer, id: NodeId) -> Vec<(Span, Restriction)> {
        let node = &self.tree[id];
        let mut regions = Vec::new();
        match &node.data {
            NodeData::Paragraph | NodeData::VerseBlock | NodeData::TableRow { .. } => {
                if let Some(span) = node.contents_span() {
                    regions.push((span, object_restriction(node.kind())));
                }
            }
            NodeData::Headline(h) | NodeData::Inlinetask(h) => {
                if let Some(span) = h.title_span {
                    regions.push((span, object_restriction(node.kind())));
                }
            }
            NodeData::Item(i) => {
                if let Some(span) = i.tag_span {
                    regions.push((span, object_restriction(NodeKind::Item)));
                }
            }
            NodeData::Keyword { key, value } => {
                if matches!(key.as_str(), "CAPTION" | "TITLE") && !value.is_empty() {
                    let line_end = buf.line_end_of(node.post_affiliated.unwrap_or(node.begin));
                    let span = Span::new(line_end - value.len(), line_end);
                    regions.push((span, object_restriction(NodeKind::Keyword)));
                }
            }
            _ => {}
        }
        if let Some(aff) = &node.affiliated {
            for entry in &aff.entries {
                if crate::parse::affiliated::is_parsed(&entry.key) && !entry.value_span.is_empty()
                {
                    regions.push((entry.value_span, Restriction::standard()));
                }
            }
        }
        regions
    }

    /// Timestamp property spans of planning and clock lines.
    fn timestamp_at(&mut self, id: NodeId, pos: usize) -> Option<NodeId> {
        let node = &self.tree[id];
        let stamps: Vec<crate::ast::Timestamp> = match &node.data {
            NodeData::Planning(p) => {
                [p.scheduled.as_ref(), p.deadline.as_ref(), p.closed.as_ref()]
                    .into_iter()
                    .flatten()
                    .cloned()
                    .collect()
            }
            NodeData::Clock(c) => c.timestamp.iter().cloned().collect(),
            _ => return None,
        };
        let hit = stamps.into_iter().find(|ts| ts.span.contains(pos))?;
        let span = hit.span;
        // Reuse a previously synthesized node for this stamp.
        if let Some(oc) = self.objects.get(&id)
            && let Some(existing) = oc
                .objects
                .iter()
                .find(|o| self.tree[**o].begin == span.start)
        {
            return Some(*existing);
        }
        let mut ts_node = Node::new(NodeData::Timestamp(hit), span.start, span.end);
        ts_node.parent = Some(id);
        let ts_id = self.tree.alloc(ts_node);
        let oc = self.objects.entry(id).or_default();
        oc.objects.push(ts_id);
        Some(ts_id)
    }

    /// Deepest node (element or object) at `pos`, lexing objects on demand
    /// through the per-element sub-cache.
    pub(crate) fn context_at(&mut self, buf: &Buffer, syntax: &Syntax, pos: usize) -> NodeId {
        let el = self.parse_to(buf, syntax, pos);
        if let Some(ts) = self.timestamp_at(el, pos) {
            return ts;
        }
        let regions = self.object_regions(buf, el);
        let Some((span, restriction)) = regions.into_iter().find(|(s, _)| s.contains(pos)) else {
            return el;
        };

        let complete = self.objects.get(&el).is_some_and(|oc| oc.complete);
        if !complete {
            if self.radio_targets.is_empty() {
                self.radio_targets = scan_radio_targets(buf);
            }
            let lexer = ObjectLexer::new(syntax, &self.radio_targets);
            let ids = lexer.lex_region(&mut self.tree, buf, span.start, span.end, restriction);
            let is_secondary = matches!(
                self.tree[el].data,
                NodeData::Headline(_) | NodeData::Inlinetask(_) | NodeData::Item(_)
            );
            if is_secondary {
                self.tree.adopt_secondary(el, 0, ids.clone());
            } else {
                for id in &ids {
                    self.tree.adopt(el, *id);
                }
            }
            let oc = self.objects.entry(el).or_default();
            oc.objects.extend(ids);
            oc.next = span.end;
            oc.complete = true;
        }

        let mut best = el;
        let Some(oc) = self.objects.get(&el) else { return el };
        let mut queue: Vec<NodeId> = oc.objects.clone();
        while let Some(id) = queue.pop() {
            let node = &self.tree[id];
            if node.kind() != NodeKind::PlainText && node.begin <= pos && pos < node.end {
                best = id;
                queue = node
                    .children
                    .iter()
                    .copied()
                    .chain(node.data.secondary().into_iter().flatten().copied())
                    .collect();
            }
        }
        best
    }

    /// Materialize every element in `[0, len)`; used by equivalence checks
    /// and the full-document dump.
    pub(crate) fn materialize(&mut self, buf: &Buffer, syntax: &Syntax) {
        // Every element begins at a line start, except the first content of
        // an item or footnote definition; those are reached through the
        // contents-begin positions of already-cached containers, repeated
        // until no new elements appear.
        let mut pos = 0;
        while pos < buf.len() {
            self.parse_to(buf, syntax, pos);
            pos = buf.next_line_start(pos).max(pos + 1);
        }
        loop {
            let before = self.len();
            let starts: Vec<usize> = self
                .keys
                .keys()
                .filter_map(|id| self.tree.get(*id))
                .filter(|n| n.kind().is_greater_element())
                .filter_map(|n| {
                    let cb = n.contents_begin?;
                    // Lists and tables share their begin with the first
                    // child; probe one byte in so the child materializes.
                    Some(if cb == n.begin { cb + 1 } else { cb })
                })
                .collect();
            for start in starts {
                self.parse_to(buf, syntax, start);
            }
            if self.len() == before {
                break;
            }
        }
        // Children may have been appended out of order by re-parenting.
        let ids: Vec<NodeId> = self.keys.keys().copied().chain([self.tree.root()]).collect();
        for id in ids {
            if self.tree.get(id).is_none() {
                continue;
            }
            let mut children = std::mem::take(&mut self.tree.get_mut(id).unwrap().children);
            children.sort_by_key(|c| self.tree[*c].begin);
            self.tree.get_mut(id).unwrap().children = children;
        }
    }
}
