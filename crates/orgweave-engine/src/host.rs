//! Traits the embedding environment implements for the engine.
//!
//! The engine owns no event loop: change notifications arrive through
//! [`crate::Document::before_change`] / [`crate::Document::after_change`],
//! and idle-time resumption is collapsed into the deadline carried by
//! [`SyncBudget`]. The host re-arms its own timer after a
//! [`crate::SyncStatus::Pending`] result.

use std::time::Instant;

/// Fast probe for pending user input, used to yield mid-sync.
pub trait InputProbe {
    fn input_pending(&self) -> bool;
}

/// A probe that never reports pending input (batch contexts, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverPending;

impl InputProbe for NeverPending {
    fn input_pending(&self) -> bool {
        false
    }
}

/// Visibility mask consulted by the full parse in visible-only mode.
pub trait VisibilityMask {
    /// Whether the character at `pos` is hidden.
    fn invisible_at(&self, pos: usize) -> bool;
    /// First visible position at or after `pos`.
    fn find_visible(&self, pos: usize) -> usize;
}

/// Budget for one synchronizer slice: a wall-clock deadline and an
/// input-pending probe. Either may be absent, in which case the slice runs
/// to completion.
pub struct SyncBudget<'a> {
    pub deadline: Option<Instant>,
    pub probe: Option<&'a dyn InputProbe>,
}

impl<'a> SyncBudget<'a> {
    /// A budget that never interrupts.
    pub fn unbounded() -> Self {
        SyncBudget { deadline: None, probe: None }
    }

    /// A budget that expires at `deadline`.
    pub fn until(deadline: Instant) -> Self {
        SyncBudget { deadline: Some(deadline), probe: None }
    }

    /// True when the slice should yield.
    pub fn expired(&self) -> bool {
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return true;
        }
        if let Some(probe) = self.probe
            && probe.input_pending()
        {
            return true;
        }
        false
    }
}
