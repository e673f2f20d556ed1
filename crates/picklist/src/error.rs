//! CLI error types with miette diagnostics.
//!
//! Maps engine, session, and config errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use picklist_config::ConfigError;
use picklist_core::{CoreError, ItemId};
use picklist_sync::SyncError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFLICT: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Shell input ──────────────────────────────────────────────────

    #[error("Unrecognized command: {input}")]
    #[diagnostic(code(picklist::usage), help("Type 'help' to list shell commands."))]
    Usage { input: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(picklist::validation))]
    Validation { field: String, reason: String },

    // ── Catalog ──────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(
        code(picklist::conflict),
        help("Item ids are unique. Search for {id} to find the existing entry.")
    )]
    Conflict { id: ItemId, message: String },

    #[error("Engine request failed: {0}")]
    #[diagnostic(code(picklist::engine))]
    Engine(CoreError),

    #[error("Session request failed: {0}")]
    #[diagnostic(
        code(picklist::sync),
        help("The lists were resynchronized; retry the command.")
    )]
    Sync(SyncError),

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(picklist::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(picklist::config),
        help("Run: picklist config show, or fix the file at: picklist config path")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render TOML: {0}")]
    #[diagnostic(code(picklist::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage { .. } | Self::Validation { .. } => exit_code::USAGE,
            Self::Conflict { .. } | Self::ConfigExists { .. } => exit_code::CONFLICT,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Library error mapping ────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Duplicate { ref id, .. } => Self::Conflict {
                id: id.clone(),
                message: err.to_string(),
            },
            other => Self::Engine(other),
        }
    }
}

impl From<SyncError> for CliError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Backend(core) => core.into(),
            SyncError::InvalidMove { from, to, len } => Self::Validation {
                field: "move".into(),
                reason: format!(
                    "positions must be between 1 and {len} (got {} and {})",
                    from + 1,
                    to + 1
                ),
            },
            other => Self::Sync(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picklist_core::DuplicateReason;

    #[test]
    fn duplicate_add_maps_to_conflict() {
        let err: CliError = SyncError::Backend(CoreError::Duplicate {
            id: ItemId::from(7),
            reason: DuplicateReason::AlreadyExists,
        })
        .into();
        assert_eq!(err.exit_code(), exit_code::CONFLICT);
        assert_eq!(err.to_string(), "Item with id 7 already exists");
    }

    #[test]
    fn bad_move_is_a_usage_error() {
        let err: CliError = SyncError::InvalidMove {
            from: 4,
            to: 0,
            len: 2,
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert!(err.to_string().contains("between 1 and 2"));
    }
}
