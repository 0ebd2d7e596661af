// Wire models for the Core API (v1).
//
// Request/response bodies of the control endpoint and the tagged event
// records pushed over the event channel. Field names follow the Core:
// stream and metrics records are camelCase, the status document is
// snake_case, operational states are PascalCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ── Operational state ───────────────────────────────────────────────

/// The Core's own lifecycle, independent of the client's channel state.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum CoreState {
    #[default]
    Idle,
    Starting,
    Active,
    Rotating,
    Error,
}

// ── Streams ─────────────────────────────────────────────────────────

/// Lifecycle of a single proxied stream.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StreamState {
    #[default]
    Opening,
    Active,
    Closing,
}

/// A stream as listed by `GET streams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub id: String,
    pub target_host: String,
    pub target_port: u16,
    #[serde(default)]
    pub state: Option<StreamState>,
    #[serde(default)]
    pub bytes_sent: u64,
    #[serde(default)]
    pub bytes_received: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub opened_at: DateTime<Utc>,
}

// ── Metrics ─────────────────────────────────────────────────────────

/// One traffic sample: bytes moved during the last reporting interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub upload: u64,
    pub download: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u32>,
}

// ── Status / config ─────────────────────────────────────────────────

/// Configuration document of the Core.
///
/// Opaque to the client: it is passed to and from the control endpoint
/// verbatim and never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument(serde_json::Value);

impl ConfigDocument {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    /// Look up a top-level key, for display only.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }
}

impl From<serde_json::Value> for ConfigDocument {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Response of `GET status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub state: CoreState,
    #[serde(default)]
    pub config: Option<ConfigDocument>,
    /// Seconds the Core has been active, if it is.
    #[serde(default)]
    pub uptime: Option<u64>,
    #[serde(default)]
    pub active_streams: usize,
}

/// Body of `POST system-proxy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemProxyRequest {
    pub enabled: bool,
}

// ── Logs ────────────────────────────────────────────────────────────

/// Severity of a Core log line. Unknown levels decode as `Info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase", from = "String")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<String> for LogLevel {
    fn from(level: String) -> Self {
        match level.to_ascii_lowercase().as_str() {
            "trace" | "debug" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" | "fatal" => Self::Error,
            _ => Self::Info,
        }
    }
}

/// A log line forwarded by the Core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default)]
    pub level: LogLevel,
    pub message: String,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

// ── Events ──────────────────────────────────────────────────────────

/// A server-pushed event record, tagged by `type`.
///
/// Kinds this client does not know decode to [`CoreEvent::Unrecognized`]
/// and are dropped by the transport rather than treated as malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CoreEvent {
    StreamOpened {
        id: String,
        target_host: String,
        target_port: u16,
        #[serde(
            default,
            with = "chrono::serde::ts_milliseconds_option",
            skip_serializing_if = "Option::is_none"
        )]
        opened_at: Option<DateTime<Utc>>,
    },
    StreamUpdated {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bytes_sent: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bytes_received: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<StreamState>,
    },
    StreamClosed {
        id: String,
    },
    MetricsSnapshot(MetricsSnapshot),
    StateChanged {
        state: CoreState,
        #[serde(
            default,
            with = "chrono::serde::ts_milliseconds_option",
            skip_serializing_if = "Option::is_none"
        )]
        timestamp: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Log(LogRecord),
    #[serde(other)]
    Unrecognized,
}

impl CoreEvent {
    /// Wire name of the event kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StreamOpened { .. } => "stream_opened",
            Self::StreamUpdated { .. } => "stream_updated",
            Self::StreamClosed { .. } => "stream_closed",
            Self::MetricsSnapshot(_) => "metrics_snapshot",
            Self::StateChanged { .. } => "state_changed",
            Self::Log(_) => "log",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Decode one inbound text frame into an event record.
pub fn decode_frame(text: &str) -> Result<CoreEvent, Error> {
    serde_json::from_str(text).map_err(|e| Error::MalformedFrame {
        message: e.to_string(),
    })
}

/// Client→server frames. The Core expects nothing but keep-alive pings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientFrame {
    Ping,
}

// ── Tests ───────────────────────────────────────────────────────────
