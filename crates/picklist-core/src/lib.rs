//! Buffered catalog engine.
//!
//! Holds a large catalog of uniquely identified items split into two
//! disjoint views, *available* and *selected*, and serves paginated,
//! search-filtered reads of each. Mutations are not applied on arrival:
//!
//! - **[`Engine`]**: facade owning the repository, both write buffers,
//!   and their flush timers. Mutation calls return a [`Queued`]
//!   acknowledgment immediately; a timer later commits the batch.
//!
//! - **[`Repository`]**: source of truth (items, sorted id index,
//!   selection order). Each flush is one write-lock critical section, so
//!   queries see either the pre-flush or the post-flush state.
//!
//! - **Buffers** ([`buffer`]): the add buffer deduplicates by id and is
//!   committed every 10s by default; the action buffer replays select /
//!   unselect / reorder in arrival order every second by default.
//!
//! - **Queries** ([`PageRequest`]): offset pagination over the sorted
//!   index (available) or the selection order (selected), with substring
//!   search on the id's display form.

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::EngineConfig;
pub use engine::{CatalogStats, Engine};
pub use error::{CoreError, DuplicateReason};
pub use model::{Action, ActionKind, Item, ItemId, QueueStatus, Queued};
pub use store::{ActionOutcome, ActionReport, AddReport, PageRequest, Repository, is_last_page};
