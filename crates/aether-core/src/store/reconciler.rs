// ── State reconciler ──
//
// The single mutable source of truth. Pushed events and control-endpoint
// responses are merged here; everything else reads snapshots.
//
// Application never fails: out-of-order, duplicate, or gap-induced events
// degrade to `ApplyOutcome::Ignored` rather than errors.

use std::collections::HashSet;

use chrono::{DateTime, Duration as TimeDelta, Utc};
use tracing::{debug, trace};

use aether_api::{
    ConfigDocument, ConnectionState, CoreEvent, CoreState, StatusResponse, StreamInfo,
};

use super::history::BoundedHistory;
use super::streams::{OpenResult, StreamRegistry};
use crate::config::{DEFAULT_LOG_CAPACITY, DEFAULT_METRICS_CAPACITY};
use crate::model::{LogEntry, MetricsSample, Session, StreamRecord, TrafficTotals};

/// Event timestamps further ahead of reception than this are not trusted.
const MAX_CLOCK_SKEW_MS: i64 = 5_000;

// ── Outcomes ─────────────────────────────────────────────────────────

/// What an application did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Ignored(IgnoreReason),
}

impl ApplyOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum IgnoreReason {
    /// The event references a stream id that is not present.
    UnknownStream,
    /// `stream_opened` for an id that is already live, with nothing new.
    DuplicateStream,
    /// An event kind this client does not understand.
    Unrecognized,
    /// A hydration result superseded by a newer hydration.
    StaleHydration,
}

/// Token linking a hydration result to the moment its fetch started.
///
/// Events applied after the ticket was issued take precedence over the
/// snapshot it brings back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HydrationTicket {
    epoch: u64,
}

#[derive(Debug, Default)]
struct HydrationTracker {
    epoch: u64,
    pending: Option<u64>,
    touched_streams: HashSet<String>,
    touched_state: bool,
}

impl HydrationTracker {
    fn touch_stream(&mut self, id: &str) {
        if self.pending.is_some() {
            self.touched_streams.insert(id.to_owned());
        }
    }

    fn touch_state(&mut self) {
        if self.pending.is_some() {
            self.touched_state = true;
        }
    }
}

// ── Reconciler ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Reconciler {
    connection: ConnectionState,
    core_state: CoreState,
    streams: StreamRegistry,
    metrics: BoundedHistory<MetricsSample>,
    totals: TrafficTotals,
    session: Option<Session>,
    logs: BoundedHistory<LogEntry>,
    system_proxy_enabled: bool,
    config: Option<ConfigDocument>,
    last_error: Option<String>,
    last_event_at: Option<DateTime<Utc>>,
    last_hydrated_at: Option<DateTime<Utc>>,
    hydration: HydrationTracker,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_METRICS_CAPACITY, DEFAULT_LOG_CAPACITY)
    }
}

impl Reconciler {
    pub fn new(metrics_capacity: usize, log_capacity: usize) -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            core_state: CoreState::Idle,
            streams: StreamRegistry::default(),
            metrics: BoundedHistory::new(metrics_capacity),
            totals: TrafficTotals::default(),
            session: None,
            logs: BoundedHistory::new(log_capacity),
            system_proxy_enabled: false,
            config: None,
            last_error: None,
            last_event_at: None,
            last_hydrated_at: None,
            hydration: HydrationTracker::default(),
        }
    }

    // ── Event feed ───────────────────────────────────────────────────

    /// Apply one pushed event, stamped with the current time.
    pub fn apply_event(&mut self, event: CoreEvent) -> ApplyOutcome {
        self.apply_event_at(event, Utc::now())
    }

    /// Apply one pushed event received at `received_at`.
    pub fn apply_event_at(&mut self, event: CoreEvent, received_at: DateTime<Utc>) -> ApplyOutcome {
        if !matches!(event, CoreEvent::Unrecognized) {
            self.last_event_at = Some(received_at);
        }

        let outcome = match event {
            CoreEvent::StreamOpened {
                id,
                target_host,
                target_port,
                opened_at,
            } => {
                self.hydration.touch_stream(&id);
                let opened_at = opened_at.unwrap_or(received_at);
                match self.streams.open(id, target_host, target_port, opened_at) {
                    OpenResult::Inserted | OpenResult::Refreshed => ApplyOutcome::Applied,
                    OpenResult::Unchanged => ApplyOutcome::Ignored(IgnoreReason::DuplicateStream),
                }
            }
            CoreEvent::StreamUpdated {
                id,
                bytes_sent,
                bytes_received,
                state,
            } => {
                if self.streams.update(&id, bytes_sent, bytes_received, state) {
                    self.hydration.touch_stream(&id);
                    ApplyOutcome::Applied
                } else {
                    ApplyOutcome::Ignored(IgnoreReason::UnknownStream)
                }
            }
            CoreEvent::StreamClosed { id } => self.remove_stream(&id),
            CoreEvent::MetricsSnapshot(snapshot) => {
                let sample = MetricsSample::from(snapshot);
                self.totals.add(&sample);
                self.metrics.push(sample);
                ApplyOutcome::Applied
            }
            CoreEvent::StateChanged {
                state,
                timestamp,
                error,
            } => {
                self.hydration.touch_state();
                if let Some(error) = error {
                    self.last_error = Some(error);
                } else if state == CoreState::Active {
                    self.last_error = None;
                }
                let started_at = trusted_timestamp(timestamp, received_at);
                self.transition(state, started_at, received_at);
                ApplyOutcome::Applied
            }
            CoreEvent::Log(record) => {
                self.logs.push(LogEntry::from_record(record, received_at));
                ApplyOutcome::Applied
            }
            CoreEvent::Unrecognized => ApplyOutcome::Ignored(IgnoreReason::Unrecognized),
        };

        trace!(?outcome, "event applied");
        outcome
    }

    /// Drop a stream closed through the control endpoint.
    pub fn stream_closed_locally(&mut self, id: &str) -> ApplyOutcome {
        self.remove_stream(id)
    }

    fn remove_stream(&mut self, id: &str) -> ApplyOutcome {
        // tombstone even if unknown, so an in-flight snapshot cannot revive it
        self.hydration.touch_stream(id);
        if self.streams.close(id) {
            ApplyOutcome::Applied
        } else {
            ApplyOutcome::Ignored(IgnoreReason::UnknownStream)
        }
    }

    /// Core lifecycle transition with its session rules.
    ///
    /// A session opens on entering `Active` or `Rotating` without one (a
    /// rotation is only reachable from an active tunnel) and ends on
    /// `Idle`, `Starting`, or `Error`.
    fn transition(&mut self, next: CoreState, started_at: DateTime<Utc>, observed_at: DateTime<Utc>) {
        let previous = self.core_state;
        self.core_state = next;

        match next {
            CoreState::Active | CoreState::Rotating => {
                if self.session.is_none() {
                    debug!(%previous, %next, %started_at, "session opened");
                    self.session = Some(Session::open(started_at, observed_at));
                }
            }
            CoreState::Idle | CoreState::Starting | CoreState::Error => {
                if self.session.take().is_some() {
                    debug!(%previous, %next, "session closed");
                }
            }
        }
    }

    // ── Hydration ────────────────────────────────────────────────────

    /// Mark the start of a hydration fetch. Any earlier ticket becomes stale.
    pub fn begin_hydration(&mut self) -> HydrationTicket {
        self.hydration.epoch += 1;
        self.hydration.pending = Some(self.hydration.epoch);
        self.hydration.touched_streams.clear();
        self.hydration.touched_state = false;
        HydrationTicket {
            epoch: self.hydration.epoch,
        }
    }

    /// Forget a hydration whose fetch failed.
    pub fn abandon_hydration(&mut self, ticket: HydrationTicket) {
        if self.hydration.pending == Some(ticket.epoch) {
            self.hydration.pending = None;
            self.hydration.touched_streams.clear();
            self.hydration.touched_state = false;
        }
    }

    /// Seed state from a status snapshot and stream list.
    pub fn hydrate(
        &mut self,
        ticket: HydrationTicket,
        status: StatusResponse,
        streams: Vec<StreamInfo>,
    ) -> ApplyOutcome {
        self.hydrate_at(ticket, status, streams, Utc::now())
    }

    /// [`hydrate`](Self::hydrate) with an explicit clock.
    ///
    /// Only ids and state left untouched by events since `ticket` are taken
    /// from the snapshot; untouched streams it no longer lists are removed.
    pub fn hydrate_at(
        &mut self,
        ticket: HydrationTicket,
        status: StatusResponse,
        streams: Vec<StreamInfo>,
        now: DateTime<Utc>,
    ) -> ApplyOutcome {
        if self.hydration.pending != Some(ticket.epoch) {
            debug!(epoch = ticket.epoch, "discarding stale hydration");
            return ApplyOutcome::Ignored(IgnoreReason::StaleHydration);
        }

        let snapshot = streams.into_iter().map(StreamRecord::from).collect();
        self.streams
            .merge_snapshot(snapshot, &self.hydration.touched_streams);

        if self.hydration.touched_state {
            debug!("operational state changed during hydration, keeping event state");
        } else {
            let started_at = status
                .uptime
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(TimeDelta::try_seconds)
                .and_then(|uptime| now.checked_sub_signed(uptime))
                .unwrap_or(now);
            self.transition(status.state, started_at, now);
        }

        if let Some(config) = status.config {
            self.config = Some(config);
        }

        self.last_hydrated_at = Some(now);
        self.hydration.pending = None;
        self.hydration.touched_streams.clear();
        self.hydration.touched_state = false;

        debug!(
            streams = self.streams.len(),
            state = %self.core_state,
            "hydration applied"
        );
        ApplyOutcome::Applied
    }

    // ── Control-endpoint responses and transport state ──────────────

    pub fn set_connection_state(&mut self, state: ConnectionState) {
        self.connection = state;
    }

    pub fn set_system_proxy(&mut self, enabled: bool) {
        self.system_proxy_enabled = enabled;
    }

    pub fn set_config(&mut self, config: ConfigDocument) {
        self.config = Some(config);
    }

    pub fn reset_totals(&mut self) {
        self.totals = TrafficTotals::default();
    }

    // ── Read accessors ───────────────────────────────────────────────

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn core_state(&self) -> CoreState {
        self.core_state
    }

    pub fn streams(&self) -> Vec<StreamRecord> {
        self.streams.to_vec()
    }

    pub fn stream(&self, id: &str) -> Option<&StreamRecord> {
        self.streams.get(id)
    }

    pub fn active_stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Oldest to newest.
    pub fn metrics_history(&self) -> Vec<MetricsSample> {
        self.metrics.to_vec()
    }

    pub fn metrics_capacity(&self) -> usize {
        self.metrics.capacity()
    }

    pub fn totals(&self) -> TrafficTotals {
        self.totals
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Oldest to newest.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.logs.to_vec()
    }

    pub fn system_proxy_enabled(&self) -> bool {
        self.system_proxy_enabled
    }

    pub fn config(&self) -> Option<&ConfigDocument> {
        self.config.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        self.last_event_at
    }

    pub fn last_hydrated_at(&self) -> Option<DateTime<Utc>> {
        self.last_hydrated_at
    }
}

/// The event's own timestamp, unless missing or implausibly in the future.
fn trusted_timestamp(timestamp: Option<DateTime<Utc>>, received_at: DateTime<Utc>) -> DateTime<Utc> {
    match timestamp {
        Some(ts) if ts <= received_at + TimeDelta::milliseconds(MAX_CLOCK_SKEW_MS) => ts,
        _ => received_at,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aether_api::{LogLevel, LogRecord, MetricsSnapshot, StreamState};
    use pretty_assertions::assert_eq;

    use super::*;

    fn opened(id: &str, host: &str, port: u16) -> CoreEvent {
        CoreEvent::StreamOpened {
            id: id.into(),
            target_host: host.into(),
            target_port: port,
            opened_at: None,
        }
    }

    fn updated(id: &str, sent: u64) -> CoreEvent {
        CoreEvent::StreamUpdated {
            id: id.into(),
            bytes_sent: Some(sent),
            bytes_received: None,
            state: None,
        }
    }

    fn closed(id: &str) -> CoreEvent {
        CoreEvent::StreamClosed { id: id.into() }
    }

    fn state(state: CoreState) -> CoreEvent {
        CoreEvent::StateChanged {
            state,
            timestamp: None,
            error: None,
        }
    }

    fn sample(upload: u64, download: u64) -> CoreEvent {
        CoreEvent::MetricsSnapshot(MetricsSnapshot {
            timestamp: Utc::now(),
            upload,
            download,
            latency_ms: None,
        })
    }

    fn info(id: &str) -> StreamInfo {
        StreamInfo {
            id: id.into(),
            target_host: format!("{id}.example"),
            target_port: 443,
            state: Some(StreamState::Active),
            bytes_sent: 10,
            bytes_received: 20,
            opened_at: Utc::now(),
        }
    }

    fn status(state: CoreState, uptime: Option<u64>) -> StatusResponse {
        StatusResponse {
            state,
            config: None,
            uptime,
            active_streams: 0,
        }
    }

    // ── Streams ──────────────────────────────────────────────────────

    #[test]
    fn stream_lifecycle_scenario() {
        let mut r = Reconciler::default();

        assert_eq!(r.apply_event(opened("s1", "a.com", 443)), ApplyOutcome::Applied);
        let record = r.stream("s1").unwrap();
        assert_eq!(record.state, StreamState::Opening);
        assert_eq!(record.target(), "a.com:443");
        assert_eq!(r.active_stream_count(), 1);

        assert_eq!(r.apply_event(updated("s1", 1000)), ApplyOutcome::Applied);
        let record = r.stream("s1").unwrap();
        assert_eq!(record.state, StreamState::Active);
        assert_eq!(record.bytes_sent, 1000);

        assert_eq!(r.apply_event(closed("s1")), ApplyOutcome::Applied);
        assert!(r.stream("s1").is_none());
        assert_eq!(r.active_stream_count(), 0);
    }

    #[test]
    fn closing_twice_is_idempotent() {
        let mut r = Reconciler::default();
        r.apply_event(opened("s1", "a.com", 443));
        r.apply_event(opened("s2", "b.com", 80));

        r.apply_event(closed("s1"));
        let once = r.streams();
        assert_eq!(
            r.apply_event(closed("s1")),
            ApplyOutcome::Ignored(IgnoreReason::UnknownStream)
        );
        assert_eq!(r.streams(), once);
    }

    #[test]
    fn update_for_unknown_stream_creates_nothing() {
        let mut r = Reconciler::default();
        assert_eq!(
            r.apply_event(updated("ghost", 5)),
            ApplyOutcome::Ignored(IgnoreReason::UnknownStream)
        );
        assert!(r.streams().is_empty());
    }

    #[test]
    fn duplicate_open_keeps_one_record() {
        let mut r = Reconciler::default();
        r.apply_event(opened("s1", "a.com", 443));
        assert_eq!(
            r.apply_event(opened("s1", "a.com", 443)),
            ApplyOutcome::Ignored(IgnoreReason::DuplicateStream)
        );
        assert_eq!(r.active_stream_count(), 1);
    }

    #[test]
    fn unrecognized_event_is_ignored() {
        let mut r = Reconciler::default();
        assert_eq!(
            r.apply_event(CoreEvent::Unrecognized),
            ApplyOutcome::Ignored(IgnoreReason::Unrecognized)
        );
        assert!(r.last_event_at().is_none());
    }

    // ── Metrics ──────────────────────────────────────────────────────

    #[test]
    fn metrics_history_is_bounded_and_totals_accumulate() {
        let mut r = Reconciler::new(3, 10);
        for i in 1..=5 {
            r.apply_event(sample(i * 10, i));
        }

        let history = r.metrics_history();
        assert_eq!(history.len(), 3);
        assert_eq!(
            history.iter().map(|s| s.upload).collect::<Vec<_>>(),
            vec![30, 40, 50]
        );
        // totals cover samples already evicted from the window
        assert_eq!(
            r.totals(),
            TrafficTotals {
                total_upload: 150,
                total_download: 15,
            }
        );
    }

    #[test]
    fn totals_saturate() {
        let mut r = Reconciler::default();
        r.apply_event(sample(u64::MAX, 0));
        r.apply_event(sample(1, 0));
        assert_eq!(r.totals().total_upload, u64::MAX);

        r.reset_totals();
        assert_eq!(r.totals(), TrafficTotals::default());
    }

    // ── Session ──────────────────────────────────────────────────────

    #[test]
    fn active_then_idle_opens_and_closes_one_session() {
        let mut r = Reconciler::default();
        r.apply_event(state(CoreState::Starting));
        assert!(r.session().is_none());

        r.apply_event(state(CoreState::Active));
        let started = r.session().unwrap().started_at();
        let first = r.session().unwrap().uptime();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = r.session().unwrap().uptime();
        assert!(second > first);

        // repeated active keeps the same session
        r.apply_event(state(CoreState::Active));
        assert_eq!(r.session().unwrap().started_at(), started);

        r.apply_event(state(CoreState::Idle));
        assert!(r.session().is_none());
        assert_eq!(r.core_state(), CoreState::Idle);
    }

    #[test]
    fn session_survives_rotation() {
        let mut r = Reconciler::default();
        r.apply_event(state(CoreState::Active));
        let started = r.session().unwrap().started_at();

        r.apply_event(state(CoreState::Rotating));
        assert_eq!(r.session().unwrap().started_at(), started);
        r.apply_event(state(CoreState::Active));
        assert_eq!(r.session().unwrap().started_at(), started);
    }

    #[test]
    fn rotating_without_session_opens_one() {
        let mut r = Reconciler::default();
        let now = Utc::now();
        let ticket = r.begin_hydration();
        r.hydrate_at(ticket, status(CoreState::Rotating, Some(120)), Vec::new(), now);

        assert_eq!(r.core_state(), CoreState::Rotating);
        assert_eq!(r.session().unwrap().started_at(), now - TimeDelta::seconds(120));

        // a rotation seen first after a reconnect gap
        let mut r = Reconciler::default();
        r.apply_event(state(CoreState::Rotating));
        assert!(r.session().is_some());
    }

    #[test]
    fn error_state_clears_session_and_records_error() {
        let mut r = Reconciler::default();
        r.apply_event(state(CoreState::Active));
        r.apply_event(CoreEvent::StateChanged {
            state: CoreState::Error,
            timestamp: None,
            error: Some("upstream unreachable".into()),
        });

        assert!(r.session().is_none());
        assert_eq!(r.last_error(), Some("upstream unreachable"));

        r.apply_event(state(CoreState::Active));
        assert_eq!(r.last_error(), None);
    }

    #[test]
    fn future_timestamp_is_not_trusted() {
        let mut r = Reconciler::default();
        let received = Utc::now();
        r.apply_event_at(
            CoreEvent::StateChanged {
                state: CoreState::Active,
                timestamp: Some(received + TimeDelta::hours(1)),
                error: None,
            },
            received,
        );
        assert_eq!(r.session().unwrap().started_at(), received);
    }

    #[test]
    fn event_timestamp_is_used_when_plausible() {
        let mut r = Reconciler::default();
        let received = Utc::now();
        let sent = received - TimeDelta::milliseconds(300);
        r.apply_event_at(
            CoreEvent::StateChanged {
                state: CoreState::Active,
                timestamp: Some(sent),
                error: None,
            },
            received,
        );
        assert_eq!(r.session().unwrap().started_at(), sent);
    }

    // ── Logs ─────────────────────────────────────────────────────────

    #[test]
    fn log_sink_is_bounded() {
        let mut r = Reconciler::new(10, 2);
        for message in ["one", "two", "three"] {
            r.apply_event(CoreEvent::Log(LogRecord {
                level: LogLevel::Warn,
                message: message.into(),
                timestamp: None,
            }));
        }

        let logs = r.logs();
        assert_eq!(
            logs.iter().map(|l| l.message.as_str()).collect::<Vec<_>>(),
            vec!["two", "three"]
        );
    }

    // ── Hydration ────────────────────────────────────────────────────

    #[test]
    fn hydration_seeds_empty_state() {
        let mut r = Reconciler::default();
        let ticket = r.begin_hydration();

        let outcome = r.hydrate(ticket, status(CoreState::Active, Some(2)), vec![info("s1")]);

        assert_eq!(outcome, ApplyOutcome::Applied);
        assert_eq!(r.core_state(), CoreState::Active);
        assert_eq!(r.active_stream_count(), 1);
        assert!(r.session().unwrap().uptime() >= std::time::Duration::from_secs(2));
        assert!(r.last_hydrated_at().is_some());
    }

    #[test]
    fn close_event_during_hydration_wins_over_snapshot() {
        let mut r = Reconciler::default();
        r.apply_event(opened("s1", "a.com", 443));

        let ticket = r.begin_hydration();
        r.apply_event(closed("s1"));

        // snapshot was taken before the close and still lists s1
        r.hydrate(ticket, status(CoreState::Active, None), vec![info("s1")]);

        assert!(r.stream("s1").is_none());
    }

    #[test]
    fn close_of_unknown_stream_still_blocks_snapshot() {
        let mut r = Reconciler::default();
        let ticket = r.begin_hydration();
        r.apply_event(closed("s9"));

        r.hydrate(ticket, status(CoreState::Idle, None), vec![info("s9")]);

        assert!(r.stream("s9").is_none());
    }

    #[test]
    fn update_during_hydration_wins_over_snapshot_counters() {
        let mut r = Reconciler::default();
        r.apply_event(opened("s1", "a.com", 443));
        let ticket = r.begin_hydration();
        r.apply_event(updated("s1", 5000));

        r.hydrate(ticket, status(CoreState::Active, None), vec![info("s1")]);

        let record = r.stream("s1").unwrap();
        assert_eq!(record.bytes_sent, 5000);
        assert_eq!(record.target_host, "a.com");
    }

    #[test]
    fn untouched_streams_missing_from_snapshot_are_removed() {
        let mut r = Reconciler::default();
        r.apply_event(opened("stale", "a.com", 443));
        let ticket = r.begin_hydration();

        r.hydrate(ticket, status(CoreState::Active, None), vec![info("fresh")]);

        assert!(r.stream("stale").is_none());
        assert!(r.stream("fresh").is_some());
    }

    #[test]
    fn state_change_during_hydration_wins() {
        let mut r = Reconciler::default();
        let ticket = r.begin_hydration();
        r.apply_event(state(CoreState::Idle));

        r.hydrate(ticket, status(CoreState::Active, Some(10)), Vec::new());

        assert_eq!(r.core_state(), CoreState::Idle);
        assert!(r.session().is_none());
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut r = Reconciler::default();
        let old = r.begin_hydration();
        let current = r.begin_hydration();

        assert_eq!(
            r.hydrate(old, status(CoreState::Active, None), vec![info("s1")]),
            ApplyOutcome::Ignored(IgnoreReason::StaleHydration)
        );
        assert!(r.streams().is_empty());

        assert!(r.hydrate(current, status(CoreState::Active, None), vec![info("s1")]).is_applied());
        // a ticket can only be used once
        assert_eq!(
            r.hydrate(current, status(CoreState::Idle, None), Vec::new()),
            ApplyOutcome::Ignored(IgnoreReason::StaleHydration)
        );
    }

    #[test]
    fn abandoned_ticket_cannot_hydrate() {
        let mut r = Reconciler::default();
        let ticket = r.begin_hydration();
        r.abandon_hydration(ticket);

        assert_eq!(
            r.hydrate(ticket, status(CoreState::Active, None), Vec::new()),
            ApplyOutcome::Ignored(IgnoreReason::StaleHydration)
        );
    }

    #[test]
    fn hydration_keeps_existing_session() {
        let mut r = Reconciler::default();
        r.apply_event(state(CoreState::Active));
        let started = r.session().unwrap().started_at();

        let ticket = r.begin_hydration();
        r.hydrate(ticket, status(CoreState::Active, Some(9999)), Vec::new());

        assert_eq!(r.session().unwrap().started_at(), started);
    }

    #[test]
    fn hydration_stores_opaque_config() {
        let mut r = Reconciler::default();
        let ticket = r.begin_hydration();
        let document = ConfigDocument::new(serde_json::json!({ "url": "https://edge.example" }));

        r.hydrate(
            ticket,
            StatusResponse {
                config: Some(document.clone()),
                ..status(CoreState::Idle, None)
            },
            Vec::new(),
        );

        assert_eq!(r.config(), Some(&document));
    }
}
