// ── Domain model ──
//
// Read-side types published by the reconciler. Wire records from
// aether-api are converted into these at the edge; consumers never see
// optional/partial event fields.

pub mod metrics;
pub mod session;
pub mod stream;

pub use aether_api::{ConfigDocument, ConnectionState, CoreState, LogLevel, StreamState};
pub use metrics::{LogEntry, MetricsSample, TrafficTotals};
pub use session::Session;
pub use stream::StreamRecord;
