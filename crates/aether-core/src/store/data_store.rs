// ── Published state ──
//
// Read side of the reconciler. Each view lives in its own `watch` channel
// so subscribers wake only for the part they render; unchanged views are
// never re-sent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use super::reconciler::Reconciler;
use crate::model::{
    ConfigDocument, ConnectionState, CoreState, LogEntry, MetricsSample, Session, StreamRecord,
    TrafficTotals,
};
use crate::stream::Subscription;

/// Fan-out point for reconciled state.
pub struct DataStore {
    connection: watch::Sender<ConnectionState>,
    core_state: watch::Sender<CoreState>,
    streams: watch::Sender<Arc<Vec<StreamRecord>>>,
    metrics: watch::Sender<Arc<Vec<MetricsSample>>>,
    totals: watch::Sender<TrafficTotals>,
    session: watch::Sender<Option<Session>>,
    logs: watch::Sender<Arc<Vec<LogEntry>>>,
    system_proxy: watch::Sender<bool>,
    config: watch::Sender<Option<ConfigDocument>>,
    last_error: watch::Sender<Option<String>>,
    last_event_at: watch::Sender<Option<DateTime<Utc>>>,
    last_hydrated_at: watch::Sender<Option<DateTime<Utc>>>,
}

/// Every view at one instant, for one-shot rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub connection: ConnectionState,
    pub core_state: CoreState,
    pub streams: Arc<Vec<StreamRecord>>,
    pub metrics: Arc<Vec<MetricsSample>>,
    pub totals: TrafficTotals,
    pub session: Option<Session>,
    pub system_proxy_enabled: bool,
    pub config: Option<ConfigDocument>,
    pub last_error: Option<String>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub last_hydrated_at: Option<DateTime<Utc>>,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    pub fn new() -> Self {
        Self {
            connection: watch::channel(ConnectionState::Disconnected).0,
            core_state: watch::channel(CoreState::Idle).0,
            streams: watch::channel(Arc::new(Vec::new())).0,
            metrics: watch::channel(Arc::new(Vec::new())).0,
            totals: watch::channel(TrafficTotals::default()).0,
            session: watch::channel(None).0,
            logs: watch::channel(Arc::new(Vec::new())).0,
            system_proxy: watch::channel(false).0,
            config: watch::channel(None).0,
            last_error: watch::channel(None).0,
            last_event_at: watch::channel(None).0,
            last_hydrated_at: watch::channel(None).0,
        }
    }

    /// Publish whatever changed in `reconciler` since the last call.
    pub fn publish(&self, reconciler: &Reconciler) {
        replace_if_changed(&self.connection, reconciler.connection_state());
        replace_if_changed(&self.core_state, reconciler.core_state());
        replace_if_changed(&self.totals, reconciler.totals());
        replace_if_changed(&self.session, reconciler.session().cloned());
        replace_if_changed(&self.system_proxy, reconciler.system_proxy_enabled());
        replace_if_changed(&self.config, reconciler.config().cloned());
        replace_if_changed(&self.last_error, reconciler.last_error().map(str::to_owned));
        replace_if_changed(&self.last_event_at, reconciler.last_event_at());
        replace_if_changed(&self.last_hydrated_at, reconciler.last_hydrated_at());
        replace_vec_if_changed(&self.streams, reconciler.streams());
        replace_vec_if_changed(&self.metrics, reconciler.metrics_history());
        replace_vec_if_changed(&self.logs, reconciler.logs());
    }

    /// Publish only a connection-state change.
    pub(crate) fn publish_connection(&self, state: ConnectionState) {
        replace_if_changed(&self.connection, state);
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            connection: *self.connection.borrow(),
            core_state: *self.core_state.borrow(),
            streams: self.streams_snapshot(),
            metrics: self.metrics_snapshot(),
            totals: *self.totals.borrow(),
            session: self.session.borrow().clone(),
            system_proxy_enabled: *self.system_proxy.borrow(),
            config: self.config.borrow().clone(),
            last_error: self.last_error.borrow().clone(),
            last_event_at: *self.last_event_at.borrow(),
            last_hydrated_at: *self.last_hydrated_at.borrow(),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    pub fn core_state(&self) -> CoreState {
        *self.core_state.borrow()
    }

    pub fn streams_snapshot(&self) -> Arc<Vec<StreamRecord>> {
        self.streams.borrow().clone()
    }

    pub fn stream_by_id(&self, id: &str) -> Option<StreamRecord> {
        self.streams.borrow().iter().find(|s| s.id == id).cloned()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.borrow().len()
    }

    pub fn metrics_snapshot(&self) -> Arc<Vec<MetricsSample>> {
        self.metrics.borrow().clone()
    }

    pub fn totals(&self) -> TrafficTotals {
        *self.totals.borrow()
    }

    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn logs_snapshot(&self) -> Arc<Vec<LogEntry>> {
        self.logs.borrow().clone()
    }

    pub fn system_proxy_enabled(&self) -> bool {
        *self.system_proxy.borrow()
    }

    pub fn config(&self) -> Option<ConfigDocument> {
        self.config.borrow().clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        *self.last_event_at.borrow()
    }

    pub fn last_hydrated_at(&self) -> Option<DateTime<Utc>> {
        *self.last_hydrated_at.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_connection(&self) -> Subscription<ConnectionState> {
        Subscription::new(self.connection.subscribe())
    }

    pub fn subscribe_core_state(&self) -> Subscription<CoreState> {
        Subscription::new(self.core_state.subscribe())
    }

    pub fn subscribe_streams(&self) -> Subscription<Arc<Vec<StreamRecord>>> {
        Subscription::new(self.streams.subscribe())
    }

    pub fn subscribe_metrics(&self) -> Subscription<Arc<Vec<MetricsSample>>> {
        Subscription::new(self.metrics.subscribe())
    }

    pub fn subscribe_totals(&self) -> Subscription<TrafficTotals> {
        Subscription::new(self.totals.subscribe())
    }

    pub fn subscribe_session(&self) -> Subscription<Option<Session>> {
        Subscription::new(self.session.subscribe())
    }

    pub fn subscribe_logs(&self) -> Subscription<Arc<Vec<LogEntry>>> {
        Subscription::new(self.logs.subscribe())
    }

    pub fn subscribe_system_proxy(&self) -> Subscription<bool> {
        Subscription::new(self.system_proxy.subscribe())
    }

    pub fn subscribe_config(&self) -> Subscription<Option<ConfigDocument>> {
        Subscription::new(self.config.subscribe())
    }
}

fn replace_if_changed<T: PartialEq>(tx: &watch::Sender<T>, next: T) {
    tx.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

fn replace_vec_if_changed<T: PartialEq>(tx: &watch::Sender<Arc<Vec<T>>>, next: Vec<T>) {
    tx.send_if_modified(|current| {
        if **current == next {
            false
        } else {
            *current = Arc::new(next);
            true
        }
    });
}
