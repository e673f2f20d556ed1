//! Client-side reconciliation for the picklist catalog.
//!
//! A UI shows two lists, *available* and *selected*, whose authoritative
//! state lives in a [`picklist_core::Engine`] that applies mutations only
//! on its flush timers. This crate keeps the UI responsive anyway:
//!
//! - **[`ListReconciler`]**: pure merge of the last polled window with
//!   local optimistic marks and, for the selected list, a drag overlay.
//!
//! - **[`SyncSession`]**: owns both reconcilers, polls the backend on an
//!   interval, applies optimistic moves, and rolls them back when the
//!   backend refuses.
//!
//! - **[`CatalogBackend`]**: the seam to the engine. Implemented for
//!   `Engine` directly; remote transports implement it themselves.

pub mod backend;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod session;
pub mod stream;

pub use backend::CatalogBackend;
pub use config::SyncConfig;
pub use error::SyncError;
pub use reconcile::{ListReconciler, ListSide, PendingMarks, Snapshot};
pub use session::SyncSession;
pub use stream::{DisplayStream, DisplayWatchStream, DisplayedList};
