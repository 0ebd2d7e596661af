// ── Core error types ──
//
// Consumer-facing errors from aether-core. Transport-layer failures are
// folded into this taxonomy by the `From<aether_api::Error>` impl below;
// stream-level gaps never surface as errors at all (see `ApplyOutcome`).

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Control endpoint ─────────────────────────────────────────────
    /// A control/query call failed. State is unknown; nothing was applied.
    #[error("Request failed: {message}")]
    RequestFailed {
        /// HTTP status, if the Core answered at all.
        status: Option<u16>,
        message: String,
    },

    // ── Event channel ────────────────────────────────────────────────
    #[error("Cannot connect to Core at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Event channel closed: {reason}")]
    TransportClosed { reason: String },

    #[error("Malformed event frame: {message}")]
    MalformedFrame { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP status of a failed control call.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => *status,
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<aether_api::Error> for CoreError {
    fn from(err: aether_api::Error) -> Self {
        match err {
            aether_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            aether_api::Error::HttpClient(message) => CoreError::Config { message },
            aether_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            aether_api::Error::TransportClosed { reason } => CoreError::TransportClosed { reason },
            aether_api::Error::MalformedFrame { message } => CoreError::MalformedFrame { message },
            err @ (aether_api::Error::RequestFailed { .. }
            | aether_api::Error::Transport(_)
            | aether_api::Error::Deserialization { .. }) => CoreError::RequestFailed {
                status: err.status(),
                message: err.to_string(),
            },
        }
    }
}
