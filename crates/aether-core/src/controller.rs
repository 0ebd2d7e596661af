// ── Controller abstraction ──
//
// Composition root for one Core connection. Owns the event transport, the
// control client, and the reconciler, and wires them together through a
// single sync task so every mutation is applied in arrival order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use aether_api::{
    ConfigDocument, ConnectionState, CoreClient, EventStream, StatusResponse, StreamInfo,
    TransportEvent,
};

use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::model::{
    CoreState, LogEntry, MetricsSample, Session, StreamRecord, TrafficTotals,
};
use crate::store::{ApplyOutcome, DataStore, HydrationTicket, Reconciler, StateSnapshot};
use crate::stream::Subscription;

// ── Sync inputs ──────────────────────────────────────────────────

/// Everything other than pushed events that mutates the reconciler.
#[derive(Debug)]
enum SyncInput {
    Hydrated {
        ticket: HydrationTicket,
        result: Result<(StatusResponse, Vec<StreamInfo>), CoreError>,
    },
    StreamClosed {
        id: String,
    },
    SystemProxy {
        enabled: bool,
    },
    Config(ConfigDocument),
    Refresh,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. State survives
/// disconnects: after [`disconnect`](Self::disconnect) the last-known
/// state stays readable and is picked up again by the next
/// [`connect`](Self::connect).
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    client: CoreClient,
    store: Arc<DataStore>,
    lifecycle: Mutex<Lifecycle>,
}

/// Exactly one of `parked`/`running` owns the reconciler at any time.
struct Lifecycle {
    parked: Option<Reconciler>,
    running: Option<Running>,
}

struct Running {
    transport: EventStream,
    cancel: CancellationToken,
    input_tx: mpsc::UnboundedSender<SyncInput>,
    task: JoinHandle<Reconciler>,
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        if let Some(running) = self.lifecycle.get_mut().running.take() {
            running.transport.disconnect();
            running.cancel.cancel();
        }
    }
}

impl Controller {
    /// Create a controller. Does NOT connect -- call
    /// [`connect()`](Self::connect) to open the event channel.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let client = CoreClient::new(config.api_url.clone(), &config.transport())?;
        let reconciler = Reconciler::new(config.metrics_capacity, config.log_capacity);

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                client,
                store: Arc::new(DataStore::new()),
                lifecycle: Mutex::new(Lifecycle {
                    parked: Some(reconciler),
                    running: None,
                }),
            }),
        })
    }

    /// Access the controller configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// Access the underlying DataStore.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    /// Direct access to the control endpoint, bypassing the reconciler.
    pub fn client(&self) -> &CoreClient {
        &self.inner.client
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Open the event channel and start syncing. Idempotent.
    ///
    /// Returns as soon as the background tasks are running; the handshake
    /// and the initial hydration are observed through
    /// [`connection_state`](Self::connection_state). Traffic totals restart
    /// from zero.
    ///
    /// While already running this re-arms the transport instead: a pending
    /// retry delay is cut short and a transport that hit its retry limit
    /// starts over.
    pub async fn connect(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if let Some(running) = lifecycle.running.as_ref() {
            debug!("connect requested while running, re-arming transport");
            running.transport.connect();
            return;
        }

        let config = &self.inner.config;
        let mut reconciler = lifecycle
            .parked
            .take()
            .unwrap_or_else(|| Reconciler::new(config.metrics_capacity, config.log_capacity));
        reconciler.reset_totals();

        let (transport, transport_rx) =
            EventStream::new(config.events_url.clone(), config.stream_config());
        let cancel = CancellationToken::new();
        let (input_tx, input_rx) = mpsc::unbounded_channel();

        let sync = SyncTask {
            client: self.inner.client.clone(),
            store: Arc::clone(&self.inner.store),
            cancel: cancel.clone(),
            input_tx: input_tx.clone(),
            refresh_interval: config.refresh_interval,
            reset_totals_on_reconnect: config.reset_totals_on_reconnect,
        };
        let task = tokio::spawn(sync.run(
            reconciler,
            transport_rx,
            transport.subscribe_state(),
            input_rx,
        ));

        transport.connect();
        info!(url = %config.events_url, "controller started");

        lifecycle.running = Some(Running {
            transport,
            cancel,
            input_tx,
            task,
        });
    }

    /// Stop syncing and close the event channel. Idempotent.
    ///
    /// Cancels any pending reconnection and heartbeat; the last-known
    /// state remains readable.
    pub async fn disconnect(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        let Some(running) = lifecycle.running.take() else {
            return;
        };

        running.transport.disconnect();
        running.cancel.cancel();

        let mut reconciler = match running.task.await {
            Ok(reconciler) => reconciler,
            Err(e) => {
                warn!(error = %e, "sync task ended abnormally, state reset");
                let config = &self.inner.config;
                Reconciler::new(config.metrics_capacity, config.log_capacity)
            }
        };
        reconciler.set_connection_state(ConnectionState::Disconnected);
        self.inner.store.publish(&reconciler);
        lifecycle.parked = Some(reconciler);
        debug!("disconnected");
    }

    /// Re-fetch status and streams and merge them in.
    ///
    /// While connected this only schedules a hydration on the sync task;
    /// otherwise it runs the fetch inline and reports its failure.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if let Some(running) = lifecycle.running.as_ref() {
            return running
                .input_tx
                .send(SyncInput::Refresh)
                .map_err(|_| CoreError::Internal("sync task is gone".into()));
        }

        let config = &self.inner.config;
        let reconciler = lifecycle
            .parked
            .get_or_insert_with(|| Reconciler::new(config.metrics_capacity, config.log_capacity));
        let ticket = reconciler.begin_hydration();

        let fetched = tokio::try_join!(
            self.inner.client.get_status(),
            self.inner.client.list_streams()
        );
        match fetched {
            Ok((status, streams)) => {
                reconciler.hydrate(ticket, status, streams);
                self.inner.store.publish(reconciler);
                Ok(())
            }
            Err(e) => {
                reconciler.abandon_hydration(ticket);
                Err(e.into())
            }
        }
    }

    /// One-shot: hydrate once without the event channel, run `f`.
    pub async fn oneshot<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let controller = Controller::new(config)?;
        controller.refresh().await?;
        f(controller).await
    }

    // ── Imperative actions ───────────────────────────────────────

    /// Ask the Core to close a stream; on success the record is dropped.
    pub async fn close_stream(&self, id: &str) -> Result<(), CoreError> {
        self.inner.client.close_stream(id).await?;
        self.route(SyncInput::StreamClosed { id: id.to_owned() })
            .await;
        Ok(())
    }

    pub async fn set_system_proxy(&self, enabled: bool) -> Result<(), CoreError> {
        self.inner.client.set_system_proxy(enabled).await?;
        self.route(SyncInput::SystemProxy { enabled }).await;
        Ok(())
    }

    /// Replace the Core's configuration with `config`, verbatim.
    pub async fn update_config(&self, config: ConfigDocument) -> Result<(), CoreError> {
        self.inner.client.update_config(&config).await?;
        self.route(SyncInput::Config(config)).await;
        Ok(())
    }

    /// The resulting state change arrives as an event.
    pub async fn start(&self) -> Result<(), CoreError> {
        Ok(self.inner.client.start().await?)
    }

    pub async fn stop(&self) -> Result<(), CoreError> {
        Ok(self.inner.client.stop().await?)
    }

    pub async fn rotate(&self) -> Result<(), CoreError> {
        Ok(self.inner.client.rotate().await?)
    }

    /// Fetch one metrics sample. Not added to the history or totals,
    /// which only follow pushed samples.
    pub async fn fetch_metrics(&self) -> Result<MetricsSample, CoreError> {
        Ok(self.inner.client.get_metrics().await?.into())
    }

    pub async fn fetch_config(&self) -> Result<ConfigDocument, CoreError> {
        let config = self.inner.client.get_config().await?;
        self.route(SyncInput::Config(config.clone())).await;
        Ok(config)
    }

    /// Hand a control-endpoint result to whichever side owns the reconciler.
    async fn route(&self, input: SyncInput) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if let Some(running) = lifecycle.running.as_ref() {
            if running.input_tx.send(input).is_err() {
                warn!("sync task is gone, dropping action result");
            }
            return;
        }

        if let Some(reconciler) = lifecycle.parked.as_mut() {
            apply_local(reconciler, input);
            self.inner.store.publish(reconciler);
        }
    }

    // ── State observation ────────────────────────────────────────

    pub fn connection_state(&self) -> Subscription<ConnectionState> {
        self.inner.store.subscribe_connection()
    }

    pub fn core_state(&self) -> Subscription<CoreState> {
        self.inner.store.subscribe_core_state()
    }

    pub fn streams(&self) -> Subscription<Arc<Vec<StreamRecord>>> {
        self.inner.store.subscribe_streams()
    }

    pub fn metrics(&self) -> Subscription<Arc<Vec<MetricsSample>>> {
        self.inner.store.subscribe_metrics()
    }

    pub fn totals(&self) -> Subscription<TrafficTotals> {
        self.inner.store.subscribe_totals()
    }

    pub fn session(&self) -> Subscription<Option<Session>> {
        self.inner.store.subscribe_session()
    }

    pub fn logs(&self) -> Subscription<Arc<Vec<LogEntry>>> {
        self.inner.store.subscribe_logs()
    }

    pub fn system_proxy(&self) -> Subscription<bool> {
        self.inner.store.subscribe_system_proxy()
    }

    pub fn core_config(&self) -> Subscription<Option<ConfigDocument>> {
        self.inner.store.subscribe_config()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.store.snapshot()
    }
}

// ── Background sync task ─────────────────────────────────────────

struct SyncTask {
    client: CoreClient,
    store: Arc<DataStore>,
    cancel: CancellationToken,
    input_tx: mpsc::UnboundedSender<SyncInput>,
    refresh_interval: Duration,
    reset_totals_on_reconnect: bool,
}

impl SyncTask {
    /// Sole owner of the reconciler while connected. Hands it back on exit.
    async fn run(
        self,
        mut reconciler: Reconciler,
        mut transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
        mut state_rx: watch::Receiver<ConnectionState>,
        mut input_rx: mpsc::UnboundedReceiver<SyncInput>,
    ) -> Reconciler {
        let refresh_enabled = !self.refresh_interval.is_zero();
        let period = if refresh_enabled {
            self.refresh_interval
        } else {
            Duration::from_secs(3600)
        };
        let mut refresh = tokio::time::interval_at(Instant::now() + period, period);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut connected_before = false;

        loop {
            let connected = reconciler.connection_state() == ConnectionState::Connected;

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *state_rx.borrow_and_update();
                    reconciler.set_connection_state(state);
                    self.store.publish_connection(state);
                }
                Some(event) = transport_rx.recv() => {
                    self.on_transport(&mut reconciler, event, &mut connected_before);
                }
                Some(input) = input_rx.recv() => {
                    if matches!(input, SyncInput::Refresh) {
                        self.start_hydration(&mut reconciler);
                    } else {
                        apply_local(&mut reconciler, input);
                    }
                }
                _ = refresh.tick(), if refresh_enabled && connected => {
                    debug!("periodic re-hydration");
                    self.start_hydration(&mut reconciler);
                }
            }

            self.store.publish(&reconciler);
        }

        debug!("sync task exiting");
        reconciler
    }

    fn on_transport(
        &self,
        reconciler: &mut Reconciler,
        event: TransportEvent,
        connected_before: &mut bool,
    ) {
        match event {
            TransportEvent::Connected => {
                reconciler.set_connection_state(ConnectionState::Connected);
                if *connected_before && self.reset_totals_on_reconnect {
                    reconciler.reset_totals();
                }
                *connected_before = true;
                info!("event channel connected, hydrating");
                self.start_hydration(reconciler);
            }
            TransportEvent::Disconnected { reason } => {
                reconciler.set_connection_state(ConnectionState::Disconnected);
                info!(%reason, "event channel down, keeping last-known state");
            }
            TransportEvent::Event(event) => {
                let kind = event.kind();
                if let ApplyOutcome::Ignored(reason) = reconciler.apply_event(event) {
                    debug!(kind, %reason, "event ignored");
                }
            }
        }
    }

    /// Fetch status and streams off the event path; the result comes back
    /// through the input channel.
    fn start_hydration(&self, reconciler: &mut Reconciler) {
        let ticket = reconciler.begin_hydration();
        let client = self.client.clone();
        let input_tx = self.input_tx.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let fetch = async { tokio::try_join!(client.get_status(), client.list_streams()) };
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                result = fetch => {
                    let result = result.map_err(CoreError::from);
                    let _ = input_tx.send(SyncInput::Hydrated { ticket, result });
                }
            }
        });
    }
}

/// Apply a non-event input. Shared by the sync task and the parked state.
fn apply_local(reconciler: &mut Reconciler, input: SyncInput) {
    match input {
        SyncInput::Hydrated { ticket, result } => match result {
            Ok((status, streams)) => {
                reconciler.hydrate(ticket, status, streams);
            }
            Err(e) => {
                warn!(error = %e, "hydration failed, keeping last-known state");
                reconciler.abandon_hydration(ticket);
            }
        },
        SyncInput::StreamClosed { id } => {
            reconciler.stream_closed_locally(&id);
        }
        SyncInput::SystemProxy { enabled } => reconciler.set_system_proxy(enabled),
        SyncInput::Config(config) => reconciler.set_config(config),
        SyncInput::Refresh => {}
    }
}
