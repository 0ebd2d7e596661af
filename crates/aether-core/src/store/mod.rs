// ── Reactive state store ──
//
// `Reconciler` owns and mutates the state; `DataStore` publishes
// snapshots of it to any number of subscribers via `watch` channels.

mod data_store;
mod history;
mod reconciler;
mod streams;

pub use data_store::{DataStore, StateSnapshot};
pub use history::BoundedHistory;
pub use reconciler::{ApplyOutcome, HydrationTicket, IgnoreReason, Reconciler};
