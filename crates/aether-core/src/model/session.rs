use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One continuous `Active` period of the Core.
///
/// Uptime is derived, never stored: it is measured against a monotonic
/// anchor so wall-clock jumps cannot make it go backwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    started_at: DateTime<Utc>,
    #[serde(skip)]
    anchor: Instant,
}

impl Session {
    /// Open a session that began at `started_at`, observed at `observed_at`.
    ///
    /// The monotonic anchor is placed as far before "now" as `started_at`
    /// precedes `observed_at`.
    pub fn open(started_at: DateTime<Utc>, observed_at: DateTime<Utc>) -> Self {
        let now = Instant::now();
        let elapsed = (observed_at - started_at).to_std().unwrap_or(Duration::ZERO);
        Self {
            started_at,
            anchor: now.checked_sub(elapsed).unwrap_or(now),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn uptime(&self) -> Duration {
        self.anchor.elapsed()
    }
}
