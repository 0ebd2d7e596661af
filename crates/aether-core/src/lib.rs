// aether-core: Reconciled live state between aether-api and consumers (CLI/panels).

pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ControllerConfig;
pub use controller::Controller;
pub use error::CoreError;
pub use store::{
    ApplyOutcome, DataStore, HydrationTicket, IgnoreReason, Reconciler, StateSnapshot,
};
pub use stream::Subscription;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ConfigDocument, ConnectionState, CoreState, LogEntry, LogLevel, MetricsSample, Session,
    StreamRecord, StreamState, TrafficTotals,
};

// Transport tuning passes straight through to the event channel.
pub use aether_api::ReconnectPolicy;
