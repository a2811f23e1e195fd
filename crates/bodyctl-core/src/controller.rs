// ── Controller abstraction ──
//
// Full lifecycle management for one body controller: push subscription,
// handler registration, poll refresh (on connect, on resume and
// periodically), command execution with optimistic apply, and reactive
// state access through the reconciler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use strum::IntoEnumIterator;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use bodyctl_api::models::{HealthStatus, LockCommand, Position, SystemInfo};
use bodyctl_api::{
    ConnectionState, Endpoint, EventHandler, EventKind, EventStreamClient, PushTransport,
    RequestClient, SseTransport, StreamNotice, TlsMode, TransportConfig,
};

use crate::command::{Command, CommandResult};
use crate::config::{ControllerConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::EntityKey;
use crate::store::{Change, StateReconciler, StateSnapshot, Subscription};
use crate::stream::StateStream;

// ── RefreshReport ────────────────────────────────────────────────

/// Outcome of a batch poll. A refresh never fails as a whole.
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Reads that succeeded and were applied.
    pub ok: usize,
    /// Of those, how many changed the stored state.
    pub changed: usize,
    pub failed: Vec<(EntityKey, CoreError)>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Nothing happens until
/// [`init()`](Self::init); [`dispose()`](Self::dispose) tears everything
/// down again and may be followed by another `init()`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    client: RequestClient,
    events: EventStreamClient,
    reconciler: Arc<StateReconciler>,
    cancel: CancellationToken,
    /// Child token for the current init cycle, cancelled on dispose and
    /// replaced on the next init.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    /// Handlers registered on `events` by `init`, removed by `dispose`.
    handlers: Mutex<Vec<(EventKind, EventHandler)>>,
    initialized: AtomicBool,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("url", &self.inner.config.url.as_str())
            .field("initialized", &self.is_initialized())
            .field("events", &self.inner.events)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Create a controller talking SSE to `config.url` + `config.events_path`.
    /// Does NOT connect; call [`init()`](Self::init).
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let client = build_client(&config)?;
        let events_url = client.url_for(&config.events_path)?;
        let transport = Arc::new(SseTransport::new(client.http().clone(), events_url));
        Ok(Self::assemble(config, client, transport))
    }

    /// Create a controller with a caller-supplied push transport.
    pub fn with_transport(
        config: ControllerConfig,
        transport: Arc<dyn PushTransport>,
    ) -> Result<Self, CoreError> {
        let client = build_client(&config)?;
        Ok(Self::assemble(config, client, transport))
    }

    fn assemble(
        config: ControllerConfig,
        client: RequestClient,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        let events = EventStreamClient::new(transport, config.reconnect.clone());
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(ControllerInner {
                config,
                client,
                events,
                reconciler: Arc::new(StateReconciler::new()),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
                handlers: Mutex::new(Vec::new()),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// The request/response client (shared, stateless).
    pub fn client(&self) -> &RequestClient {
        &self.inner.client
    }

    /// The push event client, for registering extra handlers.
    pub fn events(&self) -> &EventStreamClient {
        &self.inner.events
    }

    pub fn reconciler(&self) -> &Arc<StateReconciler> {
        &self.inner.reconciler
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Wire everything up.
    ///
    /// Registers a handler per known event kind feeding the reconciler,
    /// starts the notice bridge (full refresh on every `Connected`),
    /// performs an initial refresh, starts periodic refresh and connects
    /// the push stream. A failed initial refresh is logged, not returned.
    /// Calling `init` twice is a no-op.
    pub async fn init(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            debug!("controller already initialized");
            return;
        }

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        {
            let mut handlers = self.inner.handlers.lock().await;
            for kind in EventKind::KNOWN {
                let reconciler = Arc::clone(&self.inner.reconciler);
                let handler = self.inner.events.on(kind, move |envelope| {
                    reconciler.apply(envelope);
                    Ok(())
                });
                handlers.push((kind, handler));
            }
        }

        // Subscribe before connecting so the first `Connected` is seen.
        let notices = self.inner.events.notices();
        handles.push(tokio::spawn(notice_bridge_task(
            self.clone(),
            notices,
            child.clone(),
        )));

        if self.inner.config.refresh_on_init {
            let report = self.refresh_all().await;
            if report.is_complete() {
                info!(records = report.ok, "initial refresh complete");
            } else {
                warn!(
                    ok = report.ok,
                    failed = report.failed.len(),
                    "initial refresh incomplete (non-fatal)"
                );
            }
        }

        let interval_secs = self.inner.config.refresh_interval_secs;
        if interval_secs > 0 {
            handles.push(tokio::spawn(refresh_task(
                self.clone(),
                interval_secs,
                child.clone(),
            )));
        }

        if self.inner.config.events_enabled {
            self.inner.events.connect();
        }
        info!(url = %self.inner.config.url, "controller initialized");
    }

    /// Tear down: cancel background tasks, disconnect the push stream and
    /// unregister the handlers `init` added. Idempotent.
    pub async fn dispose(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if !self.inner.initialized.swap(false, Ordering::SeqCst) {
            debug!("controller not initialized, nothing to dispose");
            return;
        }

        // Cancel the child token (not the parent, so init can run again).
        self.inner.cancel_child.lock().await.cancel();
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.events.disconnect();

        for (kind, handler) in self.inner.handlers.lock().await.drain(..) {
            self.inner.events.off(kind, &handler);
        }
        debug!("controller disposed");
    }

    /// The page/app became visible again: reconnect if the push stream
    /// gave up, then re-poll everything.
    pub async fn resume(&self) -> RefreshReport {
        if self.is_initialized()
            && self.inner.config.events_enabled
            && self.inner.events.connection_state() == ConnectionState::Disconnected
        {
            info!("resuming: reconnecting event stream");
            self.inner.events.connect();
        }
        self.refresh_all().await
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Poll every door status and window position concurrently and apply
    /// the successes. Failures are counted and logged.
    pub async fn refresh_all(&self) -> RefreshReport {
        let (keys, endpoints): (Vec<EntityKey>, Vec<Endpoint>) = Position::iter()
            .map(EntityKey::Door)
            .chain(Position::iter().map(EntityKey::Window))
            .filter_map(|key| poll_endpoint(key).map(|ep| (key, ep)))
            .unzip();
        let results = self.inner.client.execute_all(&endpoints).await;

        let mut report = RefreshReport::default();
        for (key, result) in keys.into_iter().zip(results) {
            let applied = result
                .map_err(CoreError::from)
                .and_then(|resp| self.inner.reconciler.apply_poll(key, &resp.data));
            match applied {
                Ok(change) => {
                    report.ok += 1;
                    if change.is_some() {
                        report.changed += 1;
                    }
                }
                Err(e) => {
                    warn!(%key, error = %e, "refresh read failed");
                    report.failed.push((key, e));
                }
            }
        }
        debug!(ok = report.ok, changed = report.changed, failed = report.failed.len(), "refresh done");
        report
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command. On success the expected outcome is applied to
    /// the reconciler right away; the push echo (if any) then lands as a
    /// no-op or a correction.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if !self.is_initialized() {
            return Err(CoreError::NotInitialized);
        }
        cmd.validate()?;

        debug!(command = ?cmd, "executing command");
        let response = self.inner.client.execute(&cmd.endpoint()).await?;

        let change = cmd
            .optimistic_update()
            .and_then(|update| self.inner.reconciler.apply_command(&update));

        Ok(CommandResult {
            command: cmd,
            attempts: response.attempts,
            message: response.message,
            change,
        })
    }

    /// Send the same lock command to all four doors concurrently. Every
    /// door gets its own result.
    pub async fn set_all_locks(
        &self,
        command: LockCommand,
    ) -> Vec<(Position, Result<CommandResult, CoreError>)> {
        let doors: Vec<Position> = Position::iter().collect();
        let results = join_all(
            doors
                .iter()
                .map(|door| self.execute(Command::LockDoor { door: *door, command })),
        )
        .await;
        doors.into_iter().zip(results).collect()
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: init, run closure, dispose.
    ///
    /// Optimized for CLI: disables the push stream, the initial refresh
    /// and periodic refresh since a single request-response cycle is all
    /// that is needed.
    pub async fn oneshot<F, Fut, T, E>(config: ControllerConfig, f: F) -> Result<T, E>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: From<CoreError>,
    {
        let mut cfg = config;
        cfg.events_enabled = false;
        cfg.refresh_on_init = false;
        cfg.refresh_interval_secs = 0;

        let controller = Controller::new(cfg)?;
        controller.init().await;
        let result = f(controller.clone()).await;
        controller.dispose().await;
        result
    }

    // ── Ad-hoc queries ───────────────────────────────────────────

    pub async fn system_info(&self) -> Result<SystemInfo, CoreError> {
        Ok(self.inner.client.system_info().await?)
    }

    pub async fn health(&self) -> Result<HealthStatus, CoreError> {
        Ok(self.inner.client.health().await?)
    }

    // ── State observation ────────────────────────────────────────

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.events.connection_state()
    }

    /// Subscribe to push connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.events.state()
    }

    /// Subscribe to push lifecycle notices.
    pub fn notices(&self) -> broadcast::Receiver<StreamNotice> {
        self.inner.events.notices()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.reconciler.snapshot()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        self.inner.reconciler.subscribe(listener)
    }

    pub fn watch(&self) -> StateStream {
        self.inner.reconciler.watch()
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Forward push lifecycle notices into controller behavior: every
/// `Connected` (first connect and each reconnect) triggers a full refresh
/// to pick up changes missed while disconnected.
async fn notice_bridge_task(
    controller: Controller,
    mut notices: broadcast::Receiver<StreamNotice>,
    cancel: CancellationToken,
) {
    loop {
        let notice = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            notice = notices.recv() => notice,
        };

        let refresh = match notice {
            Ok(StreamNotice::Connected) => {
                info!("event stream connected, refreshing state");
                true
            }
            Ok(StreamNotice::Reconnecting { attempt, delay }) => {
                info!(attempt, delay = ?delay, "event stream reconnecting");
                false
            }
            Ok(StreamNotice::Disconnected) => {
                debug!("event stream disconnected");
                false
            }
            Ok(StreamNotice::Error(e)) => {
                debug!(error = %e, "event stream error");
                false
            }
            Err(RecvError::Lagged(n)) => {
                // A Connected may be among the skipped notices.
                warn!(skipped = n, "notice bridge lagged");
                true
            }
            Err(RecvError::Closed) => break,
        };

        if refresh {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                report = controller.refresh_all() => {
                    if !report.is_complete() {
                        warn!(failed = report.failed.len(), "refresh after connect incomplete");
                    }
                }
            }
        }
    }
}

async fn refresh_task(controller: Controller, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    report = controller.refresh_all() => {
                        if !report.is_complete() {
                            warn!(failed = report.failed.len(), "periodic refresh incomplete");
                        }
                    }
                }
            }
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn poll_endpoint(key: EntityKey) -> Option<Endpoint> {
    match key {
        EntityKey::Door(door) => Some(Endpoint::door_status(door)),
        EntityKey::Window(window) => Some(Endpoint::window_position(window)),
        EntityKey::Light(_) | EntityKey::Seat(_) | EntityKey::Memory(_) => None,
    }
}

fn build_client(config: &ControllerConfig) -> Result<RequestClient, CoreError> {
    let transport = TransportConfig {
        tls: tls_to_transport(&config.tls),
        connect_timeout: config.connect_timeout,
    };
    Ok(RequestClient::new(config.url.clone(), &transport)?.with_policy(config.retry.clone()))
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bodyctl_api::ChannelTransport;
    use bodyctl_api::models::HeadlightMode;
    use url::Url;

    use super::*;

    fn offline_config() -> ControllerConfig {
        let mut config = ControllerConfig::new(Url::parse("http://127.0.0.1:9/api").unwrap());
        config.refresh_on_init = false;
        config.events_enabled = false;
        config
    }

    fn controller() -> Controller {
        Controller::with_transport(offline_config(), Arc::new(ChannelTransport::new())).unwrap()
    }

    #[tokio::test]
    async fn execute_before_init_is_rejected() {
        let ctl = controller();
        let err = ctl
            .execute(Command::SetHeadlight(HeadlightMode::Low))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotInitialized));
    }

    #[tokio::test]
    async fn invalid_command_never_reaches_the_network() {
        let ctl = controller();
        ctl.init().await;
        let err = ctl
            .execute(Command::SetWindowPosition {
                window: Position::FrontLeft,
                position: 150,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
        ctl.dispose().await;
    }

    #[tokio::test]
    async fn init_registers_and_dispose_removes_handlers() {
        let ctl = controller();
        ctl.init().await;
        ctl.init().await;
        for kind in EventKind::KNOWN {
            assert_eq!(ctl.events().handler_count(kind), 1);
        }

        ctl.dispose().await;
        ctl.dispose().await;
        for kind in EventKind::KNOWN {
            assert_eq!(ctl.events().handler_count(kind), 0);
        }
        assert!(!ctl.is_initialized());
    }

    #[test]
    fn only_doors_and_windows_are_polled() {
        assert!(poll_endpoint(EntityKey::Door(Position::RearLeft)).is_some());
        assert_eq!(
            poll_endpoint(EntityKey::Window(Position::FrontRight)).unwrap().path,
            "window/1/position"
        );
        assert!(poll_endpoint(EntityKey::Memory(1)).is_none());
    }
}
