use thiserror::Error;

/// Failures raised by tree-algebra operations.
///
/// Recognizer declines and unclosed containers are not errors: they surface
/// as the fallback kind in the parse result instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("anchor node is not attached to a parent")]
    DetachedAnchor,
    #[error("anchor node not found among its parent's children")]
    MissingAnchor,
    #[error("stale node handle")]
    StaleHandle,
}

/// Outcome of driving the synchronizer for one budgeted slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// All pending requests were processed.
    Complete,
    /// The budget expired mid-phase; saved state resumes on the next call.
    Pending,
}

impl SyncStatus {
    pub fn is_complete(self) -> bool {
        matches!(self, SyncStatus::Complete)
    }
}
