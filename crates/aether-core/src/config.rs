// ── Runtime controller configuration ──
//
// Describes *where* the Core lives and how the sync engine is tuned.
// Never touches disk: the CLI resolves profiles and hands one of these in.

use std::time::Duration;

use aether_api::websocket::{DEFAULT_HEARTBEAT_INTERVAL, StreamConfig};
use aether_api::{ReconnectPolicy, TransportConfig};
use url::Url;

use crate::error::CoreError;

pub const DEFAULT_METRICS_CAPACITY: usize = 60;
pub const DEFAULT_LOG_CAPACITY: usize = 500;
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for one Core connection.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Control endpoint base, e.g. `http://127.0.0.1:9880/api/v1`.
    pub api_url: Url,
    /// Event endpoint, e.g. `ws://127.0.0.1:9880/api/v1/events`.
    pub events_url: Url,
    /// Per-request timeout on the control endpoint.
    pub timeout: Duration,
    /// Keep-alive ping interval on the event channel.
    pub heartbeat_interval: Duration,
    pub reconnect: ReconnectPolicy,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
    /// Metrics samples kept for trend display. Must be at least 1.
    pub metrics_capacity: usize,
    /// Log lines kept. Must be at least 1.
    pub log_capacity: usize,
    /// Periodic re-hydration while connected. `Duration::ZERO` disables it.
    pub refresh_interval: Duration,
    /// Zero the traffic totals on every reconnect, not only on `connect()`.
    pub reset_totals_on_reconnect: bool,
}

impl ControllerConfig {
    /// Configuration with default tuning for the given endpoints.
    pub fn new(api_url: Url, events_url: Url) -> Self {
        Self {
            api_url,
            events_url,
            timeout: Duration::from_secs(10),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect: ReconnectPolicy::default(),
            max_retries: None,
            metrics_capacity: DEFAULT_METRICS_CAPACITY,
            log_capacity: DEFAULT_LOG_CAPACITY,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            reset_totals_on_reconnect: false,
        }
    }

    /// Derive the event endpoint (`<api>/events` over ws/wss) from the
    /// control endpoint.
    pub fn from_api_url(api_url: Url) -> Result<Self, CoreError> {
        let events_url = events_url_for(&api_url)?;
        Ok(Self::new(api_url, events_url))
    }

    /// Reject settings the sync engine cannot honor.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.metrics_capacity == 0 {
            return Err(CoreError::Config {
                message: "metrics capacity must be at least 1".into(),
            });
        }
        if self.log_capacity == 0 {
            return Err(CoreError::Config {
                message: "log capacity must be at least 1".into(),
            });
        }
        if self.heartbeat_interval.is_zero() {
            return Err(CoreError::Config {
                message: "heartbeat interval must be non-zero".into(),
            });
        }
        Ok(())
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig::default().with_timeout(self.timeout)
    }

    pub(crate) fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            heartbeat_interval: self.heartbeat_interval,
            reconnect: self.reconnect,
            max_retries: self.max_retries,
        }
    }
}

fn events_url_for(api_url: &Url) -> Result<Url, CoreError> {
    let mut base = api_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let mut url = base.join("events").map_err(|e| CoreError::Config {
        message: format!("Invalid URL: {e}"),
    })?;

    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(CoreError::Config {
                message: format!("unsupported control endpoint scheme: {other}"),
            });
        }
    };
    url.set_scheme(scheme).map_err(|()| CoreError::Config {
        message: format!("cannot derive event endpoint from {api_url}"),
    })?;
    Ok(url)
}
