// aether-api: Async client for the Aether-Realist Core (control + events)

pub mod client;
pub mod error;
pub mod models;
pub mod transport;
pub mod websocket;

pub use client::{ControlCommand, CoreClient};
pub use error::Error;
pub use models::{
    ClientFrame, ConfigDocument, CoreEvent, CoreState, LogLevel, LogRecord, MetricsSnapshot,
    StatusResponse, StreamInfo, StreamState,
};
pub use transport::TransportConfig;
pub use websocket::{
    ConnectionState, DisconnectReason, EventStream, ReconnectPolicy, StreamConfig, TransportEvent,
};
