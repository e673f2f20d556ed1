// ── Catalog storage ──
//
// The repository is the single source of truth. Flushes are its only
// writers; queries read a consistent snapshot under the same lock.

mod query;
mod repository;

pub use query::{PageRequest, is_last_page};
pub use repository::{ActionOutcome, ActionReport, AddReport, Repository};
