use chrono::{DateTime, Utc};
use serde::Serialize;

use aether_api::{LogLevel, LogRecord, MetricsSnapshot};

/// One traffic sample in the bounded trend history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSample {
    pub timestamp: DateTime<Utc>,
    /// Bytes uploaded during the sample interval.
    pub upload: u64,
    /// Bytes downloaded during the sample interval.
    pub download: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u32>,
}

impl From<MetricsSnapshot> for MetricsSample {
    fn from(s: MetricsSnapshot) -> Self {
        Self {
            timestamp: s.timestamp,
            upload: s.upload,
            download: s.download,
            latency_ms: s.latency_ms,
        }
    }
}

/// Traffic accumulated from every sample seen, independent of the
/// history window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficTotals {
    pub total_upload: u64,
    pub total_download: u64,
}

impl TrafficTotals {
    pub fn add(&mut self, sample: &MetricsSample) {
        self.total_upload = self.total_upload.saturating_add(sample.upload);
        self.total_download = self.total_download.saturating_add(sample.download);
    }
}

/// A Core log line as retained by the log sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Stamp with `received_at` when the Core sent no timestamp.
    pub fn from_record(record: LogRecord, received_at: DateTime<Utc>) -> Self {
        Self {
            level: record.level,
            message: record.message,
            timestamp: record.timestamp.unwrap_or(received_at),
        }
    }
}
