// ── Domain model ──
//
// Identifier, item, and mutation types shared by every layer.

pub mod ack;
pub mod action;
pub mod item;
pub mod item_id;

pub use ack::{QueueStatus, Queued};
pub use action::{Action, ActionKind};
pub(crate) use action::QueuedAction;
pub use item::Item;
pub use item_id::ItemId;
