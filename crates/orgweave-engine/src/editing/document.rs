//! The long-lived editing document: rope buffer plus incremental cache.
//!
//! The buffer is the single source of truth. Edits flow through
//! [`Document::edit`] (or the raw before/after change notifications when
//! the host owns the buffer mutation) and queue synchronization requests;
//! queries drive a bounded partial sync before answering.

use std::ops::Range;

use crate::ast::{Node, NodeId, Tree};
use crate::buffer::Buffer;
use crate::cache::ElementCache;
use crate::error::SyncStatus;
use crate::host::SyncBudget;
use crate::interpret;
use crate::parse::{Granularity, ParseOptions, parse_buffer};
use crate::syntax::Syntax;

pub struct Document {
    buf: Buffer,
    syntax: Syntax,
    cache: ElementCache,
    version: u64,
}

impl Document {
    pub fn new(text: &str, syntax: Syntax) -> Self {
        let buf = Buffer::from_str(text);
        let cache = ElementCache::new(buf.len());
        Document { buf, syntax, cache, version: 0 }
    }

    pub fn from_str(text: &str) -> Self {
        Document::new(text, Syntax::default())
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buf
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    pub fn text(&self) -> String {
        self.buf.text()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Incremented on every edit.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace `range` with `replacement`, driving both change
    /// notifications around the splice.
    pub fn edit(&mut self, range: Range<usize>, replacement: &str) {
        let pre_len = range.end - range.start;
        self.before_change(range.start, range.end);
        self.buf.edit(range.start, range.end, replacement);
        self.after_change(range.start, range.start + replacement.len(), pre_len);
    }

    /// Host notification: the region `[beg, end)` is about to change.
    pub fn before_change(&mut self, beg: usize, end: usize) {
        self.cache.before_change(&self.buf, beg, end);
    }

    /// Host notification: `[beg, end)` now holds the new text that replaced
    /// `pre_len` bytes.
    pub fn after_change(&mut self, beg: usize, end: usize, pre_len: usize) {
        self.version += 1;
        self.cache.after_change(&self.buf, beg, end, pre_len);
    }

    /// Drive pending synchronization within `budget`.
    pub fn sync(&mut self, budget: &SyncBudget) -> SyncStatus {
        self.cache.sync(&self.buf, &self.syntax, budget, None)
    }

    /// Whether edits are still waiting to be reconciled.
    pub fn sync_pending(&self) -> bool {
        !self.cache.requests.is_empty()
    }

    /// The innermost element containing `pos`. Performs the partial sync a
    /// query at `pos` requires, leaving the rest queued.
    pub fn element_at(&mut self, pos: usize) -> NodeId {
        let pos = pos.min(self.buf.len());
        self.cache
            .sync(&self.buf, &self.syntax, &SyncBudget::unbounded(), Some(pos));
        self.cache.parse_to(&self.buf, &self.syntax, pos)
    }

    /// The innermost node at `pos`, descending into objects on demand.
    pub fn context_at(&mut self, pos: usize) -> NodeId {
        let pos = pos.min(self.buf.len());
        self.cache
            .sync(&self.buf, &self.syntax, &SyncBudget::unbounded(), Some(pos));
        self.cache.context_at(&self.buf, &self.syntax, pos)
    }

    /// Read access to the cache's tree.
    pub fn tree(&self) -> &Tree {
        self.cache.tree()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.cache.tree().get(id)
    }

    /// Drop all cached state; the next query reparses from scratch.
    pub fn cache_reset(&mut self) {
        self.cache.reset(self.buf.len());
    }

    /// Fresh, cache-independent parse of the current buffer.
    pub fn parse(&self, granularity: Granularity) -> Tree {
        let options = ParseOptions { granularity, ..ParseOptions::default() };
        parse_buffer(&self.buf, &self.syntax, &options)
    }

    /// Interpret a fresh full parse back to markup text.
    pub fn render(&self) -> String {
        let tree = self.parse(Granularity::Object);
        interpret::interpret(&tree, &self.syntax, tree.root())
    }

    /// Fully synchronize and materialize the cache, then dump its element
    /// forest; equals the dump of a fresh element-granularity parse.
    pub fn cache_outline(&mut self) -> String {
        self.sync(&SyncBudget::unbounded());
        self.cache.materialize(&self.buf, &self.syntax);
        let tree = self.cache.tree();
        tree.sexp_elements(tree.root())
    }
}
