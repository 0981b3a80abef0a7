//! Staged synchronization of the cache with buffer edits.
//!
//! An edit produces one request processed in three phases: prune (drop
//! elements whose begin falls in the changed region, plus orphans), locate
//! (parse ahead to find the parent of the first surviving element) and
//! shift (move surviving positions by the edit's length delta and repair
//! parent links). Every phase checks the budget between elements and
//! stashes its cursor in the request, so work resumes where it stopped.

use std::ops::Bound;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::ast::{NodeId, NodeKind};
use crate::buffer::Buffer;
use crate::cache::key::CacheKey;
use crate::cache::ElementCache;
use crate::error::SyncStatus;
use crate::host::SyncBudget;
use crate::syntax::{Syntax, heading_stars};

/// Sensitivity recorded by the before-change observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum ChangeWarning {
    None,
    LineOnly,
    OutlineAffecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Prune,
    Locate,
    Shift,
}

/// One pending edit to reconcile, in stored (pre-shift) coordinates.
#[derive(Debug)]
pub(crate) struct SyncRequest {
    pub beg: usize,
    pub end: usize,
    pub offset: isize,
    pub phase: Phase,
    /// Resume cursor for the current phase's index walk; `None` once the
    /// walk ran off the end of the cache.
    pub next_key: Option<CacheKey>,
    /// Parent for the first surviving element, found in the locate phase.
    pub parent: Option<NodeId>,
    /// Robust wrappers whose ends were shifted at submit time, with the
    /// applied offset; the prune walk must not touch them, and a merge
    /// undoes the shift before recomputing.
    pub protected: Vec<(NodeId, isize)>,
    /// Strongest sensitivity seen across the merged edits.
    pub warning: ChangeWarning,
}

static SENSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^ (?: \*+[ \t]
                   | [ \t]*\#\+(?:BEGIN|END)
                   | [ \t]*:[A-Za-z0-9_-]+:[ \t]*$
                   | [ \t]*\\(?:begin|end)\{ )",
    )
    .unwrap()
});

fn line_warning(line: &str) -> ChangeWarning {
    if heading_stars(line).is_some() {
        ChangeWarning::OutlineAffecting
    } else if SENSITIVE_RE.is_match(line) {
        ChangeWarning::LineOnly
    } else {
        ChangeWarning::None
    }
}

fn scan_warning(buf: &Buffer, beg: usize, end: usize) -> ChangeWarning {
    let mut warning = ChangeWarning::None;
    let mut cur = buf.line_start_of(beg);
    let stop = buf.next_line_start(end.min(buf.len()));
    while cur < stop {
        warning = warning.max(line_warning(&buf.line_str(cur)));
        if warning == ChangeWarning::OutlineAffecting {
            break;
        }
        cur = buf.next_line_start(cur);
    }
    warning
}

/// Start of the nearest top-level heading at or before `pos`, or the
/// buffer start. Changing any heading line can change its ancestors'
/// subtree extents, so outline edits invalidate the whole enclosing
/// top-level subtree.
fn previous_top_heading_start(buf: &Buffer, pos: usize) -> usize {
    let mut cur = buf.line_start_of(pos.min(buf.len()));
    loop {
        if heading_stars(&buf.line_str(cur)) == Some(1) {
            return cur;
        }
        if cur == 0 {
            return 0;
        }
        cur = buf.line_start_of(cur - 1);
    }
}

fn next_heading_start(buf: &Buffer, pos: usize) -> usize {
    let mut cur = buf.next_line_start(pos.min(buf.len()));
    while cur < buf.len() {
        if heading_stars(&buf.line_str(cur)).is_some() {
            return cur;
        }
        cur = buf.next_line_start(cur);
    }
    buf.len()
}

impl ElementCache {
    /// Before-change observer: record how invalidating the edit can be,
    /// judged from the pre-change text.
    pub(crate) fn before_change(&mut self, buf: &Buffer, beg: usize, end: usize) {
        self.warning = self.warning.max(scan_warning(buf, beg, end));
    }

    /// After-change notification. `beg..end` is the new text's region,
    /// `pre_len` the replaced length. Expands the region, preserves robust
    /// wrappers and queues a request.
    pub(crate) fn after_change(&mut self, buf: &Buffer, beg: usize, end: usize, pre_len: usize) {
        let offset = (end - beg) as isize - pre_len as isize;
        let mut warning = std::mem::replace(&mut self.warning, ChangeWarning::None);
        warning = warning.max(scan_warning(buf, beg, end));

        let (b, e) = if warning == ChangeWarning::OutlineAffecting {
            (previous_top_heading_start(buf, beg), next_heading_start(buf, end))
        } else {
            (buf.line_start_of(beg), buf.next_line_start(end))
        };
        // Stored element positions predate the edit, so the prune region
        // must reach the pre-change end of the region as well (a deletion
        // leaves stored positions beyond the post-change bound).
        let pre_e = e.saturating_add_signed(-offset);
        let e_stored = e.max(pre_e);

        // The document sentinel always spans the whole buffer.
        let root = self.tree.root();
        if let Some(node) = self.tree.get_mut(root) {
            node.end = buf.len();
            node.contents_end = Some(buf.len());
        }

        debug!(beg = b, end = e_stored, offset, ?warning, "cache edit request");
        self.submit(b, e_stored, pre_e, offset, warning);
    }

    /// Walk cached ancestors around the change; robust containers that
    /// wrap `[beg, pre_end]` strictly inside their contents get their ends
    /// shifted now and are protected from pruning, anything else extends
    /// the prune region to its own begin. Returns the adjusted region
    /// start and the protected wrappers.
    fn preserve_robust_wrappers(
        &mut self,
        beg: usize,
        pre_end: usize,
        offset: isize,
        warning: ChangeWarning,
    ) -> (usize, Vec<(NodeId, isize)>) {
        let mut b = beg;
        let mut protected = Vec::new();
        let Some((_, deepest)) = self.find_start(b) else { return (b, protected) };
        let mut chain = vec![deepest];
        chain.extend(self.tree.ancestors(deepest));
        let root = self.tree.root();
        for id in chain {
            if id == root || !self.tree.contains(id) {
                continue;
            }
            let node = &self.tree[id];
            if node.end <= b {
                // A finished sibling, not a wrapper.
                continue;
            }
            let kind = node.kind();
            let wraps = node
                .contents_span()
                .is_some_and(|s| s.start <= b && pre_end <= s.end);
            let robust = match kind {
                NodeKind::Section | NodeKind::Headline => {
                    warning != ChangeWarning::OutlineAffecting
                }
                k if k.is_robust_container() => warning == ChangeWarning::None,
                _ => false,
            };
            if robust && wraps {
                trace!(?kind, "shifting robust wrapper");
                let node = self.tree.get_mut(id).unwrap();
                node.end = node.end.saturating_add_signed(offset);
                if let Some(ce) = node.contents_end.as_mut() {
                    *ce = ce.saturating_add_signed(offset);
                }
                protected.push((id, offset));
            } else {
                b = b.min(node.begin);
            }
        }
        (b, protected)
    }

    /// Queue a request, merging with the pending one when present.
    /// `end` bounds the prune region in stored coordinates; `pre_end` is
    /// the pre-change end used for wrapper containment checks.
    fn submit(
        &mut self,
        beg: usize,
        end: usize,
        pre_end: usize,
        offset: isize,
        warning: ChangeWarning,
    ) {
        // A partially shifted cache cannot absorb a merge; shifting is
        // cheap arithmetic, so finish it first.
        if self
            .requests
            .front()
            .is_some_and(|r| r.phase == Phase::Shift)
        {
            self.run_shift_to_completion();
        }

        if self.requests.is_empty() {
            let (b, protected) = self.preserve_robust_wrappers(beg, pre_end, offset, warning);
            let next_key = Some(self.prune_start_key(b));
            self.requests.push_back(SyncRequest {
                beg: b,
                end,
                offset,
                phase: Phase::Prune,
                next_key,
                parent: None,
                protected,
                warning,
            });
            return;
        }

        // Merge: undo earlier robust shifts so every stored position is
        // uniformly stale again, widen to a conservative hull in stored
        // coordinates, then redo the wrapper pass with the summed offset.
        let req = self.requests.front_mut().unwrap();
        for (id, applied) in req.protected.drain(..) {
            if let Some(node) = self.tree.get_mut(id) {
                node.end = node.end.saturating_add_signed(-applied);
                if let Some(ce) = node.contents_end.as_mut() {
                    *ce = ce.saturating_add_signed(-applied);
                }
            }
        }
        let (tb, te) = if beg >= req.end.saturating_add_signed(req.offset.max(0)) {
            (
                beg.saturating_add_signed(-req.offset),
                end.saturating_add_signed(-req.offset),
            )
        } else if end <= req.beg {
            (beg, end)
        } else {
            (
                beg.min(req.beg),
                end.max(req.end).saturating_add(req.offset.unsigned_abs()),
            )
        };
        let merged_beg = req.beg.min(tb);
        let merged_end = req.end.max(te);
        let merged_offset = req.offset + offset;
        let merged_warning = req.warning.max(warning);
        let (b, protected) =
            self.preserve_robust_wrappers(merged_beg, merged_end, merged_offset, merged_warning);
        let next_key = Some(self.prune_start_key(b));
        let req = self.requests.front_mut().unwrap();
        req.beg = b;
        req.end = merged_end;
        req.offset = merged_offset;
        req.phase = Phase::Prune;
        req.next_key = next_key;
        req.parent = None;
        req.protected = protected;
        req.warning = merged_warning;
        trace!(beg = req.beg, end = req.end, offset = req.offset, "merged request");
    }

    /// First index key the prune walk must visit for a region starting at
    /// `b`. Keys survive shifts while positions move, so this walks back
    /// from the last element positioned at or before `b` over any earlier
    /// entries that still begin inside the region.
    fn prune_start_key(&self, b: usize) -> CacheKey {
        let Some((mut key, _)) = self.find_start(b) else {
            return CacheKey::lower_bound(b);
        };
        loop {
            let prev = self
                .index
                .range((Bound::Unbounded, Bound::Excluded(&key)))
                .next_back();
            match prev {
                Some((pk, pid)) if self.tree[*pid].begin >= b => key = pk.clone(),
                _ => break,
            }
        }
        key
    }

    /// Key of the head request's resume cursor: cached entries at or past
    /// it carry stale positions and must not answer lookups.
    pub(crate) fn frontier(&self) -> Option<CacheKey> {
        self.requests.front().and_then(|r| r.next_key.clone())
    }

    /// Drive pending requests. `threshold` bounds the work to what a query
    /// at that position needs; the budget bounds wall-clock time.
    pub(crate) fn sync(
        &mut self,
        buf: &Buffer,
        syntax: &Syntax,
        budget: &SyncBudget,
        threshold: Option<usize>,
    ) -> SyncStatus {
        loop {
            let Some((phase, req_beg)) = self.requests.front().map(|r| (r.phase, r.beg)) else {
                return SyncStatus::Complete;
            };
            // Everything before the region is untouched; a query there can
            // proceed with the request still queued.
            if let Some(t) = threshold
                && t < req_beg
            {
                return SyncStatus::Pending;
            }
            // Budget checks sit between elements inside each phase, so a
            // slice always makes some progress even on a spent budget.
            match phase {
                Phase::Prune => {
                    if !self.run_prune(budget) {
                        return SyncStatus::Pending;
                    }
                    let req = self.requests.front_mut().unwrap();
                    req.phase = Phase::Locate;
                    trace!("prune complete");
                    if budget.expired() {
                        return SyncStatus::Pending;
                    }
                }
                Phase::Locate => {
                    self.run_locate(buf, syntax);
                    let req = self.requests.front_mut().unwrap();
                    req.phase = Phase::Shift;
                    trace!("locate complete");
                    if budget.expired() {
                        return SyncStatus::Pending;
                    }
                }
                Phase::Shift => {
                    if !self.run_shift(budget, threshold) {
                        return SyncStatus::Pending;
                    }
                    self.requests.pop_front();
                    debug!("request complete");
                }
            }
        }
    }

    /// Phase 0: remove every element whose begin lies in the region, and
    /// orphans whose ancestors were removed. Returns false when the budget
    /// expired mid-walk.
    fn run_prune(&mut self, budget: &SyncBudget) -> bool {
        let root = self.tree.root();
        let (beg, end) = {
            let req = self.requests.front().unwrap();
            (req.beg, req.end)
        };
        let mut max_removed_end = beg;
        let mut cursor = self.requests.front().unwrap().next_key.clone();
        loop {
            let Some(cur) = cursor.clone() else {
                self.requests.front_mut().unwrap().next_key = None;
                return true;
            };
            let batch: Vec<(CacheKey, NodeId)> = self
                .index
                .range((Bound::Included(&cur), Bound::Unbounded))
                .take(32)
                .map(|(k, id)| (k.clone(), *id))
                .collect();
            if batch.is_empty() {
                self.requests.front_mut().unwrap().next_key = None;
                return true;
            }
            for (k, id) in &batch {
                let node = &self.tree[*id];
                let orphan = node
                    .parent
                    .is_some_and(|p| p != root && !self.keys.contains_key(&p));
                if node.begin > end && node.begin >= max_removed_end && !orphan {
                    self.requests.front_mut().unwrap().next_key = Some(k.clone());
                    return true;
                }
                let shielded = self
                    .requests
                    .front()
                    .is_some_and(|r| r.protected.iter().any(|(p, _)| p == id));
                if !shielded && (orphan || (node.begin >= beg && node.begin <= end)) {
                    max_removed_end = max_removed_end.max(node.end);
                    self.remove_element(*id);
                }
                if budget.expired() {
                    self.requests.front_mut().unwrap().next_key = Some(k.clone());
                    return false;
                }
            }
            cursor = batch.last().and_then(|(k, _)| {
                self.index
                    .range((Bound::Excluded(k), Bound::Unbounded))
                    .next()
                    .map(|(k, _)| k.clone())
            });
            if cursor.is_none() {
                self.requests.front_mut().unwrap().next_key = None;
                return true;
            }
        }
    }

    /// Phase 1: parse ahead of the region to find the element that will be
    /// the parent of the first surviving element.
    fn run_locate(&mut self, buf: &Buffer, syntax: &Syntax) {
        let req = self.requests.front().unwrap();
        let target =
            usize::try_from(req.end as isize + req.offset).unwrap_or(0).min(buf.len());
        let frontier = req.next_key.clone();
        let el = self.parse_to_bounded(buf, syntax, target, frontier.as_ref());
        let root = self.tree.root();
        let mut parent = el;
        while parent != root {
            let node = &self.tree[parent];
            if node.kind().is_greater_element()
                && node
                    .contents_span()
                    .is_some_and(|s| s.start <= target && target <= s.end)
            {
                break;
            }
            parent = node.parent.unwrap_or(root);
        }
        self.requests.front_mut().unwrap().parent = Some(parent);
    }

    fn run_shift_to_completion(&mut self) {
        let done = self.run_shift(&SyncBudget::unbounded(), None);
        debug_assert!(done);
        self.requests.pop_front();
    }

    /// Phase 2: shift surviving positions by the offset and repair parent
    /// links. Returns false when interrupted by budget or threshold.
    fn run_shift(&mut self, budget: &SyncBudget, threshold: Option<usize>) -> bool {
        let root = self.tree.root();
        let (offset, parent_seed) = {
            let req = self.requests.front().unwrap();
            (req.offset, req.parent)
        };
        let Some(mut cursor) = self.requests.front().unwrap().next_key.clone() else {
            return true;
        };

        // Ancestor stack for elements whose parent was pruned.
        let mut stack: Vec<NodeId> = Vec::new();
        let mut p = parent_seed;
        while let Some(id) = p {
            if self.tree.contains(id) {
                stack.push(id);
            }
            p = self.tree.get(id).and_then(|n| n.parent);
        }
        stack.reverse();

        loop {
            let batch: Vec<(CacheKey, NodeId)> = self
                .index
                .range((Bound::Included(&cursor), Bound::Unbounded))
                .take(32)
                .map(|(k, id)| (k.clone(), *id))
                .collect();
            if batch.is_empty() {
                return true;
            }
            for (k, id) in &batch {
                let pre_begin = self.tree[*id].begin;
                if let Some(t) = threshold
                    && pre_begin > t
                    && pre_begin.saturating_add_signed(offset) > t
                {
                    self.requests.front_mut().unwrap().next_key = Some(k.clone());
                    return false;
                }
                let shielded = self
                    .requests
                    .front()
                    .is_some_and(|r| r.protected.iter().any(|(p, _)| p == id));
                if offset != 0 && !shielded {
                    self.tree.get_mut(*id).unwrap().shift(offset);
                    self.shift_object_cache(*id, offset);
                }
                let begin = self.tree[*id].begin;
                while let Some(&top) = stack.last() {
                    if top != root && self.tree.get(top).is_none_or(|n| n.end <= begin) {
                        stack.pop();
                    } else {
                        break;
                    }
                }
                let parent_ok = self.tree[*id]
                    .parent
                    .and_then(|p| self.tree.get(p))
                    .is_some_and(|p| p.end > begin || p.kind() == NodeKind::Document);
                if !parent_ok {
                    let new_parent = stack.last().copied().unwrap_or(root);
                    if let Some(old) = self.tree[*id].parent
                        && let Some(old_node) = self.tree.get_mut(old)
                    {
                        old_node.children.retain(|c| c != id);
                    }
                    self.tree.adopt(new_parent, *id);
                    trace!("re-parented surviving element");
                }
                if self.tree[*id].kind().is_greater_element() {
                    stack.push(*id);
                }
                if budget.expired() {
                    let next = self
                        .index
                        .range((Bound::Excluded(k), Bound::Unbounded))
                        .next()
                        .map(|(k, _)| k.clone());
                    match next {
                        Some(n) => {
                            self.requests.front_mut().unwrap().next_key = Some(n);
                            return false;
                        }
                        None => return true,
                    }
                }
            }
            match batch.last().and_then(|(k, _)| {
                self.index
                    .range((Bound::Excluded(k), Bound::Unbounded))
                    .next()
                    .map(|(k, _)| k.clone())
            }) {
                Some(next) => cursor = next,
                None => return true,
            }
        }
    }

    fn shift_object_cache(&mut self, id: NodeId, offset: isize) {
        let Some(oc) = self.objects.get_mut(&id) else { return };
        oc.next = oc.next.saturating_add_signed(offset);
        let mut pending: Vec<NodeId> = oc.objects.clone();
        while let Some(obj) = pending.pop() {
            if let Some(node) = self.tree.get_mut(obj) {
                node.shift(offset);
                pending.extend(node.children.iter().copied());
                for list in node.data.secondary() {
                    pending.extend(list.iter().copied());
                }
            }
        }
    }
}
