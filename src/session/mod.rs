//! Task session store, reconciliation engine, and transition controller.
//!
//! The session layer owns the authoritative local view of the task: identity,
//! plan, position, history, options. All mutation goes through the
//! `SessionController` transition API; the reconciliation engine decides how
//! a remote response maps onto local state.

mod controller;
mod reconcile;
mod types;

pub use controller::SessionController;
pub use types::{HistoryEntry, Outcome, TaskSession, ACTION_QUIT, ACTION_RESTART};
