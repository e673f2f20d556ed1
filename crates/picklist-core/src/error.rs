// ── Core error types ──
//
// Errors surfaced to callers of the engine. Stale references found at
// flush time are not errors; the flush reports them as outcomes.

use strum::Display;
use thiserror::Error;

use crate::model::ItemId;

/// Why an add was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DuplicateReason {
    #[strum(to_string = "already exists")]
    AlreadyExists,
    #[strum(to_string = "is already queued")]
    AlreadyQueued,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Item with id {id} {reason}")]
    Duplicate { id: ItemId, reason: DuplicateReason },

    #[error("Invalid {kind} command: {reason}")]
    InvalidCommand { kind: String, reason: String },

    #[error("Engine has been shut down")]
    EngineStopped,
}

impl CoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}
