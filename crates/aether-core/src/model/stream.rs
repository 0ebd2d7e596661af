use chrono::{DateTime, Utc};
use serde::Serialize;

use aether_api::{StreamInfo, StreamState};

/// A live proxied stream as known to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    pub id: String,
    pub target_host: String,
    pub target_port: u16,
    pub state: StreamState,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub opened_at: DateTime<Utc>,
}

impl StreamRecord {
    pub fn new(
        id: impl Into<String>,
        target_host: impl Into<String>,
        target_port: u16,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            target_host: target_host.into(),
            target_port,
            state: StreamState::Opening,
            bytes_sent: 0,
            bytes_received: 0,
            opened_at,
        }
    }

    /// `host:port` for display.
    pub fn target(&self) -> String {
        format!("{}:{}", self.target_host, self.target_port)
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_sent.saturating_add(self.bytes_received)
    }
}

impl From<StreamInfo> for StreamRecord {
    fn from(info: StreamInfo) -> Self {
        Self {
            id: info.id,
            target_host: info.target_host,
            target_port: info.target_port,
            state: info.state.unwrap_or(StreamState::Active),
            bytes_sent: info.bytes_sent,
            bytes_received: info.bytes_received,
            opened_at: info.opened_at,
        }
    }
}
