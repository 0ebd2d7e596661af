//! Event channel to the Core with heartbeat and auto-reconnect.
//!
//! [`EventStream`] owns one duplex WebSocket connection to the Core's event
//! endpoint. Inbound frames are decoded into [`CoreEvent`]s and delivered,
//! together with connect/disconnect notifications, over a single ordered
//! channel of [`TransportEvent`]s. Connection state is observable through a
//! [`tokio::sync::watch`] channel.
//!
//! # Example
//!
//! ```rust,ignore
//! use aether_api::websocket::{EventStream, StreamConfig, TransportEvent};
//! use url::Url;
//!
//! let url = Url::parse("ws://127.0.0.1:9880/api/v1/events")?;
//! let (stream, mut rx) = EventStream::new(url, StreamConfig::default());
//! stream.connect();
//!
//! while let Some(event) = rx.recv().await {
//!     match event {
//!         TransportEvent::Connected => println!("connected"),
//!         TransportEvent::Disconnected { reason } => println!("lost: {reason}"),
//!         TransportEvent::Event(event) => println!("{}", event.kind()),
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{FutureExt, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::models::{ClientFrame, CoreEvent, decode_frame};

// ── Defaults ─────────────────────────────────────────────────────────

/// Default event endpoint of a locally running Core.
pub const DEFAULT_EVENTS_URL: &str = "ws://127.0.0.1:9880/api/v1/events";

/// Keep-alive ping interval.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Fixed delay before a reconnection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Upper bound on how long a close frame may take on teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// ── ConnectionState ──────────────────────────────────────────────────

/// State of the client↔Core event channel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

// ── Reconnect policy ─────────────────────────────────────────────────

/// Delay schedule between reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Same delay before every attempt. The Core is on loopback and is
    /// expected back quickly.
    Fixed { delay: Duration },
    /// Doubling delay starting at `initial`, capped at `max`.
    Backoff { initial: Duration, max: Duration },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Fixed {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (0-based) since the last
    /// successful connection.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay } => delay,
            Self::Backoff { initial, max } => {
                let factor = 2_u32.saturating_pow(attempt.min(16));
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

/// Tuning for an [`EventStream`].
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Interval between keep-alive pings while connected.
    pub heartbeat_interval: Duration,
    /// Delay schedule between reconnection attempts.
    pub reconnect: ReconnectPolicy,
    /// Consecutive reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect: ReconnectPolicy::default(),
            max_retries: None,
        }
    }
}

// ── TransportEvent ───────────────────────────────────────────────────

/// Why the channel went down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// [`EventStream::disconnect`] was called.
    Requested,
    /// The channel closed or failed; a reconnection is scheduled.
    Lost(String),
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested => f.write_str("disconnect requested"),
            Self::Lost(reason) => write!(f, "connection lost: {reason}"),
        }
    }
}

/// Everything the transport reports, in channel order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected { reason: DisconnectReason },
    Event(CoreEvent),
}

// ── EventStream ──────────────────────────────────────────────────────

/// Client for the Core's event endpoint.
///
/// `connect` and `disconnect` return immediately; the handshake and all
/// I/O happen on a background task whose progress is observed through the
/// [`TransportEvent`] receiver returned by [`new`](Self::new). Both must be
/// called from within a Tokio runtime.
pub struct EventStream {
    inner: Arc<Inner>,
}

struct Inner {
    url: Url,
    config: StreamConfig,
    state: watch::Sender<ConnectionState>,
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: Mutex<Option<mpsc::UnboundedSender<ClientFrame>>>,
    /// The running connection loop. Its lock doubles as the teardown gate:
    /// every notification is checked against cancellation under it.
    link: Mutex<Option<Link>>,
    retry_now: Notify,
    attempts: AtomicU64,
}

struct Link {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Link {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }
}

impl EventStream {
    /// Create a stream for `url`. Nothing connects until [`connect`](Self::connect).
    pub fn new(url: Url, config: StreamConfig) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        let inner = Arc::new(Inner {
            url,
            config,
            state,
            events,
            outbound: Mutex::new(None),
            link: Mutex::new(None),
            retry_now: Notify::new(),
            attempts: AtomicU64::new(0),
        });

        (Self { inner }, events_rx)
    }

    /// Open the channel. Idempotent: a no-op while connected or connecting.
    ///
    /// If the loop is waiting out a reconnection delay, the wait is cut
    /// short and the attempt happens now.
    pub fn connect(&self) {
        let mut link = lock(&self.inner.link);

        if let Some(existing) = link.as_ref() {
            if existing.is_live() {
                if *self.inner.state.borrow() == ConnectionState::Disconnected {
                    tracing::debug!("connect requested during reconnect delay, retrying now");
                    self.inner.retry_now.notify_one();
                }
                return;
            }
        }

        self.inner.state.send_replace(ConnectionState::Connecting);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(connection_loop(Arc::clone(&self.inner), cancel.clone()));
        *link = Some(Link { cancel, task });
    }

    /// Tear the channel down. Idempotent.
    ///
    /// Cancels any pending reconnection and the heartbeat, closes the
    /// socket, and emits a final [`TransportEvent::Disconnected`]. Nothing
    /// else is emitted afterwards until the next [`connect`](Self::connect).
    pub fn disconnect(&self) {
        let mut link = lock(&self.inner.link);
        let Some(active) = link.take() else {
            return;
        };

        active.cancel.cancel();
        *lock(&self.inner.outbound) = None;
        self.inner.state.send_replace(ConnectionState::Disconnected);
        let _ = self.inner.events.send(TransportEvent::Disconnected {
            reason: DisconnectReason::Requested,
        });
        tracing::info!("event channel disconnected on request");
    }

    /// Best-effort send. Silently dropped unless the channel is open.
    pub fn send(&self, frame: ClientFrame) {
        if let Some(tx) = lock(&self.inner.outbound).as_ref() {
            let _ = tx.send(frame);
        }
    }

    /// Current channel state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Subscribe to channel state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Total connection attempts made since construction.
    pub fn connection_attempts(&self) -> u64 {
        self.inner.attempts.load(Ordering::Relaxed)
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(active) = lock(&self.inner.link).take() {
            active.cancel.cancel();
        }
    }
}

// ── Gated notifications ──────────────────────────────────────────────

impl Inner {
    /// Run `f` only if `cancel` has not fired, holding the teardown gate.
    fn gated(&self, cancel: &CancellationToken, f: impl FnOnce(&Self)) -> bool {
        let _gate = lock(&self.link);
        if cancel.is_cancelled() {
            return false;
        }
        f(self);
        true
    }

    fn set_state(&self, cancel: &CancellationToken, state: ConnectionState) -> bool {
        self.gated(cancel, |inner| {
            inner.state.send_replace(state);
        })
    }

    fn emit(&self, cancel: &CancellationToken, event: TransportEvent) -> bool {
        self.gated(cancel, |inner| {
            let _ = inner.events.send(event);
        })
    }

    fn mark_connected(
        &self,
        cancel: &CancellationToken,
        outbound: mpsc::UnboundedSender<ClientFrame>,
    ) -> bool {
        self.gated(cancel, |inner| {
            *lock(&inner.outbound) = Some(outbound);
            inner.state.send_replace(ConnectionState::Connected);
            let _ = inner.events.send(TransportEvent::Connected);
        })
    }

    fn mark_lost(&self, cancel: &CancellationToken, reason: String) -> bool {
        self.gated(cancel, |inner| {
            *lock(&inner.outbound) = None;
            inner.state.send_replace(ConnectionState::Disconnected);
            let _ = inner.events.send(TransportEvent::Disconnected {
                reason: DisconnectReason::Lost(reason),
            });
        })
    }

    /// Decode one text frame and forward it. Malformed input never escapes.
    fn dispatch(&self, cancel: &CancellationToken, text: &str) {
        match decode_frame(text) {
            Ok(CoreEvent::Unrecognized) => {
                tracing::debug!("dropping event of unrecognized kind");
            }
            Ok(event) => {
                tracing::trace!(kind = event.kind(), "event received");
                self.emit(cancel, TransportEvent::Event(event));
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed event frame");
            }
        }
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on close, wait → reconnect.
///
/// Exactly one instance runs per live [`Link`], so at most one reconnection
/// delay is ever pending.
async fn connection_loop(inner: Arc<Inner>, cancel: CancellationToken) {
    let mut retries: u32 = 0;

    loop {
        if !inner.set_state(&cancel, ConnectionState::Connecting) {
            break;
        }
        inner.attempts.fetch_add(1, Ordering::Relaxed);
        // a retry request that raced the end of the last delay is spent
        let _ = inner.retry_now.notified().now_or_never();

        let outcome = run_session(&inner, &cancel).await;

        match outcome {
            Ok(reason) => {
                tracing::info!(%reason, "event channel closed");
                retries = 0;
                if !inner.mark_lost(&cancel, reason) {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, retries, "event channel connection failed");
                if !inner.set_state(&cancel, ConnectionState::Disconnected) {
                    break;
                }
            }
        }

        if let Some(max) = inner.config.max_retries {
            if retries >= max {
                tracing::error!(max_retries = max, "reconnection limit reached, giving up");
                break;
            }
        }

        let delay = inner.config.reconnect.delay_for(retries);
        retries = retries.saturating_add(1);
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            retries,
            "waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = inner.retry_now.notified() => {}
            () = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!("event channel loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one connection and pump it until it drops.
///
/// Returns `Err` if the handshake failed, otherwise the reason the
/// established channel closed. Cancellation is handled here so an open
/// channel gets a close frame.
async fn run_session(inner: &Inner, cancel: &CancellationToken) -> Result<String, Error> {
    tracing::info!(url = %inner.url, "connecting to event channel");

    let handshake = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok("disconnect requested".into()),
        result = tokio_tungstenite::connect_async(inner.url.as_str()) => result,
    };
    let (ws_stream, _response) = handshake.map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    let (mut write, mut read) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

    if !inner.mark_connected(cancel, outbound_tx) {
        let _ = tokio::time::timeout(CLOSE_TIMEOUT, write.send(Message::Close(None))).await;
        return Ok("disconnect requested".into());
    }
    tracing::info!("event channel connected");

    let period = inner.config.heartbeat_interval;
    let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = tokio::time::timeout(CLOSE_TIMEOUT, write.send(Message::Close(None))).await;
                break "disconnect requested".to_string();
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => inner.dispatch(cancel, text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    break frame.map_or_else(
                        || "close frame".to_string(),
                        |cf| format!("close frame ({}): {}", cf.code, cf.reason.as_str()),
                    );
                }
                Some(Ok(Message::Binary(_))) => tracing::trace!("ignoring binary frame"),
                // tungstenite answers pings itself
                Some(Ok(_)) => {}
                Some(Err(e)) => break Error::TransportClosed { reason: e.to_string() }.to_string(),
                None => break "stream ended".to_string(),
            },
            Some(frame) = outbound_rx.recv() => {
                if let Err(reason) = send_frame(&mut write, frame).await {
                    break reason;
                }
            }
            _ = heartbeat.tick() => {
                tracing::trace!("sending heartbeat");
                if let Err(reason) = send_frame(&mut write, ClientFrame::Ping).await {
                    break reason;
                }
            }
        }
    };

    Ok(reason)
}

async fn send_frame<S>(write: &mut S, frame: ClientFrame) -> Result<(), String>
where
    S: futures_util::Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let payload = serde_json::to_string(&frame).map_err(|e| e.to_string())?;
    write
        .send(Message::Text(payload.into()))
        .await
        .map_err(|e| format!("send failed: {e}"))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Tests ────────────────────────────────────────────────────────────
