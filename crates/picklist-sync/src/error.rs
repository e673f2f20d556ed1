// ── Sync error types ──
//
// What a UI sees when a mutation or poll fails. Optimistic state has
// already been rolled back by the time one of these is returned.

use thiserror::Error;

use picklist_core::CoreError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The engine refused the request (e.g. duplicate add).
    #[error(transparent)]
    Backend(#[from] CoreError),

    /// The transport collaborator could not deliver the call.
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Cannot move entry {from} to {to}: list has {len} entries")]
    InvalidMove { from: usize, to: usize, len: usize },

    #[error("Sync session closed")]
    Closed,
}

impl SyncError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_duplicate())
    }
}
