// ── Write buffers ──
//
// Mutations are acknowledged immediately and parked here until the
// owning flush task drains them into the repository.

mod action;
mod add;

pub use action::ActionBuffer;
pub use add::AddBuffer;
