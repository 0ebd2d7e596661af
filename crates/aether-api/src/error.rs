use thiserror::Error;

/// Top-level error type for the `aether-api` crate.
///
/// Covers both surfaces of the Core: the request/response control endpoint
/// and the persistent event channel. `aether-core` maps these into the
/// consumer-facing taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Control endpoint ────────────────────────────────────────────
    /// The Core answered with a non-2xx status. No structured error body
    /// is assumed, so the status and URL are all we carry.
    #[error("Request to {url} failed with HTTP {status}")]
    RequestFailed { status: u16, url: String },

    /// HTTP transport error (connection refused, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The `reqwest::Client` could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Event channel ───────────────────────────────────────────────
    /// WebSocket handshake or I/O failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// The event channel was closed by the peer.
    #[error("Event channel closed: {reason}")]
    TransportClosed { reason: String },

    /// An inbound frame could not be decoded into an event record.
    #[error("Malformed event frame: {message}")]
    MalformedFrame { message: String },
}

impl Error {
    /// HTTP status carried by the failure, if the Core answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` for failures of the request/response surface.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed { .. }
                | Self::Transport(_)
                | Self::Deserialization { .. }
                | Self::InvalidUrl(_)
                | Self::HttpClient(_)
        )
    }
}
