// ── Push event stream client ──
//
// Holds one logical subscription to the service's push channel. A
// background task drives the connection state machine:
//
//   Disconnected ──connect──► Connecting ──open ok──► Connected
//        ▲                        │                      │
//        │                    open failed            stream lost
//        │                        ▼                      ▼
//        └──disconnect/give up── Reconnecting ◄──────────┘
//
// Each session carries a generation number. `disconnect` bumps it under
// the dispatch gate, so once it returns no stale callback or notice from
// the old session can fire. Lock order everywhere is `gate` then `session`;
// callbacks already hold the gate and may re-enter `connect`/`disconnect`.

mod backoff;
mod envelope;
mod registry;
mod sse;
mod transport;

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use strum::Display;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Error;

pub use backoff::{ReconnectConfig, calculate_backoff};
pub use envelope::{EventEnvelope, EventKind};
pub use registry::{EventHandler, HandlerResult};
pub use sse::{PushFrame, SseDecoder};
pub use transport::{ChannelTransport, FrameStream, PushTransport, SseTransport};

use registry::{Registry, invoke};

const NOTICE_CHANNEL_SIZE: usize = 256;

/// Connection state of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Lifecycle notifications, delivered to every [`EventStreamClient::notices`]
/// subscriber.
#[derive(Debug, Clone)]
pub enum StreamNotice {
    Connected,
    Disconnected,
    /// A reconnect attempt is scheduled after `delay`.
    Reconnecting { attempt: u32, delay: Duration },
    /// Transport failure, malformed payload, or failing callback.
    Error(Arc<Error>),
}

thread_local! {
    // Address of the client currently dispatching on this thread, so that a
    // callback calling back into the same client does not re-take the gate.
    static DISPATCHING: Cell<usize> = const { Cell::new(0) };
}

struct DispatchScope {
    previous: usize,
}

impl DispatchScope {
    fn enter(inner: &Inner) -> Self {
        let previous = DISPATCHING.with(|d| d.replace(inner.addr()));
        Self { previous }
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        DISPATCHING.with(|d| d.set(self.previous));
    }
}

// ── Shared state ────────────────────────────────────────────────────

struct Inner {
    transport: Arc<dyn PushTransport>,
    config: ReconnectConfig,
    registry: Registry,
    state: watch::Sender<ConnectionState>,
    notices: broadcast::Sender<StreamNotice>,
    /// Bumped on every disconnect; sessions compare against their own.
    generation: AtomicU64,
    /// Cancellation token of the live session, if any. Lock order:
    /// `gate` before `session`.
    session: Mutex<Option<CancellationToken>>,
    /// Serializes state changes, notices and dispatch.
    gate: Mutex<()>,
    jitter_rng: Mutex<StdRng>,
}

impl Inner {
    fn addr(&self) -> usize {
        std::ptr::from_ref(self).addr()
    }

    fn enter_gate(&self) -> Option<MutexGuard<'_, ()>> {
        if DISPATCHING.with(Cell::get) == self.addr() {
            return None;
        }
        Some(self.gate.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        let mut rng = self.jitter_rng.lock().unwrap_or_else(PoisonError::into_inner);
        calculate_backoff(attempt, &self.config, &mut *rng)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Apply a state change and/or notice if `generation` is still live.
    fn transition(
        &self,
        generation: u64,
        state: Option<ConnectionState>,
        notices: &[StreamNotice],
    ) -> bool {
        let _gate = self.enter_gate();
        if !self.is_current(generation) {
            return false;
        }
        if let Some(state) = state {
            self.state.send_replace(state);
        }
        for notice in notices {
            let _ = self.notices.send(notice.clone());
        }
        true
    }

    /// Parse and dispatch one frame. Returns `false` once the session is
    /// stale.
    fn dispatch_frame(&self, generation: u64, frame: &PushFrame) -> bool {
        let _gate = self.enter_gate();
        if !self.is_current(generation) {
            return false;
        }
        let _scope = DispatchScope::enter(self);

        match EventEnvelope::from_frame(frame) {
            Ok(envelope) => self.dispatch(generation, &envelope),
            Err(e) => {
                warn!(error = %e, event = ?frame.event, "dropping malformed push message");
                let _ = self.notices.send(StreamNotice::Error(Arc::new(e)));
            }
        }
        self.is_current(generation)
    }

    /// Generic listeners first, then typed handlers, each isolated.
    fn dispatch(&self, generation: u64, envelope: &EventEnvelope) {
        debug!(event_type = %envelope.event_type, "dispatching push event");

        let generic = self.registry.generic();
        let typed = if envelope.kind.is_known() {
            self.registry.typed(envelope.kind)
        } else {
            Vec::new()
        };

        for handler in generic.iter().chain(typed.iter()) {
            if !self.is_current(generation) {
                return;
            }
            if let Err(message) = invoke(handler, envelope) {
                warn!(event_type = %envelope.event_type, %message, "event handler failed");
                if self.is_current(generation) {
                    let _ = self.notices.send(StreamNotice::Error(Arc::new(Error::Handler {
                        event_type: envelope.event_type.clone(),
                        message,
                    })));
                }
            }
        }
    }

    /// Give up after exhausting `max_retries`.
    fn give_up(&self, generation: u64, attempts: u32) {
        let _gate = self.enter_gate();
        {
            let mut session = self.lock_session();
            if !self.is_current(generation) {
                return;
            }
            *session = None;
            self.generation.fetch_add(1, Ordering::SeqCst);
        }

        self.state.send_replace(ConnectionState::Disconnected);
        let _ = self.notices.send(StreamNotice::Error(Arc::new(Error::StreamConnect(
            format!("giving up after {attempts} reconnect attempt(s)"),
        ))));
    }
}

// ── Public client ───────────────────────────────────────────────────

/// Client for the push event channel.
///
/// Cheap to clone; clones share the subscription, handlers and notices.
/// `connect` must be called from within a Tokio runtime. The background
/// task keeps the client alive until `disconnect` is called.
#[derive(Clone)]
pub struct EventStreamClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EventStreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStreamClient")
            .field("state", &*self.inner.state.borrow())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl EventStreamClient {
    pub fn new(transport: Arc<dyn PushTransport>, config: ReconnectConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_SIZE);
        let jitter_rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                registry: Registry::default(),
                state,
                notices,
                generation: AtomicU64::new(0),
                session: Mutex::new(None),
                gate: Mutex::new(()),
                jitter_rng: Mutex::new(jitter_rng),
            }),
        }
    }

    /// Start the subscription. No-op unless currently disconnected.
    pub fn connect(&self) {
        let _gate = self.inner.enter_gate();
        let cancel = {
            let mut session = self.inner.lock_session();
            if session.is_some() {
                debug!("event stream already active, ignoring connect");
                return;
            }
            let cancel = CancellationToken::new();
            *session = Some(cancel.clone());
            cancel
        };
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.inner.state.send_replace(ConnectionState::Connecting);

        tokio::spawn(run_session(Arc::clone(&self.inner), generation, cancel));
    }

    /// Stop the subscription and cancel any pending reconnect.
    ///
    /// Idempotent. After it returns no handler, listener or notice from
    /// the stopped session fires. Safe to call from inside a handler.
    pub fn disconnect(&self) {
        let _gate = self.inner.enter_gate();
        let cancel = {
            let mut session = self.inner.lock_session();
            let cancel = session.take();
            if cancel.is_some() {
                self.inner.generation.fetch_add(1, Ordering::SeqCst);
            }
            cancel
        };
        let Some(cancel) = cancel else {
            debug!("event stream already disconnected");
            return;
        };
        cancel.cancel();

        let previous = self.inner.state.send_replace(ConnectionState::Disconnected);
        if previous != ConnectionState::Disconnected {
            let _ = self.inner.notices.send(StreamNotice::Disconnected);
        }
        info!("event stream disconnected");
    }

    // ── Handlers ─────────────────────────────────────────────────────

    /// Register a typed handler; returns the reference needed by `off`.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> EventHandler
    where
        F: Fn(&EventEnvelope) -> HandlerResult + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(handler);
        self.on_handler(kind, Arc::clone(&handler));
        handler
    }

    /// Register an existing handler reference. Registering the same
    /// reference twice invokes it twice.
    pub fn on_handler(&self, kind: EventKind, handler: EventHandler) {
        self.inner.registry.add(kind, handler);
    }

    /// Remove the first registration of `handler` for `kind`.
    pub fn off(&self, kind: EventKind, handler: &EventHandler) -> bool {
        self.inner.registry.remove(kind, handler)
    }

    /// Register a listener for every push message, including unknown tags.
    pub fn on_message<F>(&self, listener: F) -> EventHandler
    where
        F: Fn(&EventEnvelope) -> HandlerResult + Send + Sync + 'static,
    {
        let listener: EventHandler = Arc::new(listener);
        self.inner.registry.add_generic(Arc::clone(&listener));
        listener
    }

    pub fn off_message(&self, listener: &EventHandler) -> bool {
        self.inner.registry.remove_generic(listener)
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.inner.registry.handler_count(kind)
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn connection_state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Watch connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Subscribe to lifecycle notices.
    pub fn notices(&self) -> broadcast::Receiver<StreamNotice> {
        self.inner.notices.subscribe()
    }

    pub fn config(&self) -> &ReconnectConfig {
        &self.inner.config
    }
}

// ── Session loop ────────────────────────────────────────────────────

enum ReadOutcome {
    Stale,
    Ended,
    Failed(Error),
}

async fn run_session(inner: Arc<Inner>, generation: u64, cancel: CancellationToken) {
    let mut attempt: u32 = 0;

    loop {
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            opened = inner.transport.open() => opened,
        };

        match opened {
            Ok(frames) => {
                attempt = 0;
                if !inner.transition(
                    generation,
                    Some(ConnectionState::Connected),
                    &[StreamNotice::Connected],
                ) {
                    break;
                }
                info!("event stream connected");

                let lost = match read_frames(&inner, generation, &cancel, frames).await {
                    ReadOutcome::Stale => break,
                    ReadOutcome::Ended => {
                        warn!("event stream closed by server");
                        vec![StreamNotice::Disconnected]
                    }
                    ReadOutcome::Failed(e) => {
                        warn!(error = %e, "event stream lost");
                        vec![StreamNotice::Disconnected, StreamNotice::Error(Arc::new(e))]
                    }
                };
                if !inner.transition(generation, Some(ConnectionState::Reconnecting), &lost) {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, attempt, "event stream connect failed");
                let failed = [StreamNotice::Error(Arc::new(e))];
                if !inner.transition(generation, Some(ConnectionState::Reconnecting), &failed) {
                    break;
                }
            }
        }

        attempt = attempt.saturating_add(1);
        if inner.config.max_retries.is_some_and(|max| attempt > max) {
            warn!(attempts = attempt - 1, "event stream reconnect attempts exhausted");
            inner.give_up(generation, attempt - 1);
            break;
        }

        let delay = inner.next_delay(attempt);
        debug!(attempt, delay = ?delay, "scheduling event stream reconnect");
        if !inner.transition(
            generation,
            None,
            &[StreamNotice::Reconnecting { attempt, delay }],
        ) {
            break;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    debug!("event stream session exiting");
}

async fn read_frames(
    inner: &Inner,
    generation: u64,
    cancel: &CancellationToken,
    mut frames: FrameStream,
) -> ReadOutcome {
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return ReadOutcome::Stale,
            next = next_frame(&mut frames, inner.config.idle_timeout) => next,
        };

        match next {
            Ok(Some(frame)) => {
                if !inner.dispatch_frame(generation, &frame) {
                    return ReadOutcome::Stale;
                }
            }
            Ok(None) => return ReadOutcome::Ended,
            Err(e) => return ReadOutcome::Failed(e),
        }
    }
}

async fn next_frame(
    frames: &mut FrameStream,
    idle_timeout: Option<Duration>,
) -> Result<Option<PushFrame>, Error> {
    let next = match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, frames.next())
            .await
            .map_err(|_| {
                Error::StreamConnect(format!("no traffic for {}s", limit.as_secs()))
            })?,
        None => frames.next().await,
    };
    next.transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use pretty_assertions::assert_eq;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;

    fn quick() -> ReconnectConfig {
        ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            jitter: 0.0,
            max_retries: None,
            idle_timeout: None,
            seed: None,
        }
    }

    fn client(transport: &Arc<ChannelTransport>, config: ReconnectConfig) -> EventStreamClient {
        let transport: Arc<dyn PushTransport> = Arc::clone(transport) as Arc<dyn PushTransport>;
        EventStreamClient::new(transport, config)
    }

    fn door_lock(door: u8, locked: bool) -> Result<PushFrame, Error> {
        Ok(PushFrame::message(format!(
            r#"{{"type":"door_lock_changed","data":{{"doorID":{door},"lockState":{locked}}},"timestamp":1}}"#
        )))
    }

    async fn next_notice(rx: &mut broadcast::Receiver<StreamNotice>) -> StreamNotice {
        tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    async fn wait_for_state(client: &EventStreamClient, want: ConnectionState) {
        let mut rx = client.state();
        tokio::time::timeout(Duration::from_secs(60), rx.wait_for(|s| *s == want))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn handlers_run_in_order_and_failures_are_isolated() {
        let transport = Arc::new(ChannelTransport::new());
        let tx = transport.push_session();
        let stream = client(&transport, quick());
        let calls = Arc::new(StdMutex::new(Vec::new()));

        let c = Arc::clone(&calls);
        stream.on(EventKind::DoorLockChanged, move |_| {
            c.lock().unwrap().push("first");
            Err("first handler broke".into())
        });
        let c = Arc::clone(&calls);
        stream.on(EventKind::DoorLockChanged, move |_| {
            c.lock().unwrap().push("second");
            Ok(())
        });
        let c = Arc::clone(&calls);
        stream.on_message(move |_| {
            c.lock().unwrap().push("generic");
            Ok(())
        });

        let mut notices = stream.notices();
        stream.connect();
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Connected));

        tx.send(door_lock(0, true)).unwrap();
        match next_notice(&mut notices).await {
            StreamNotice::Error(e) => {
                assert!(matches!(&*e, Error::Handler { event_type, .. } if event_type == "door_lock_changed"));
            }
            other => panic!("unexpected notice {other:?}"),
        }
        assert_eq!(*calls.lock().unwrap(), vec!["generic", "first", "second"]);

        stream.disconnect();
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_handler_does_not_stop_the_stream() {
        let transport = Arc::new(ChannelTransport::new());
        let tx = transport.push_session();
        let stream = client(&transport, quick());
        let seen = Arc::new(StdMutex::new(0_u32));

        stream.on(EventKind::DoorLockChanged, |_| panic!("handler exploded"));
        let s = Arc::clone(&seen);
        stream.on(EventKind::DoorLockChanged, move |_| {
            *s.lock().unwrap() += 1;
            Ok(())
        });

        let mut notices = stream.notices();
        stream.connect();
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Connected));

        tx.send(door_lock(1, false)).unwrap();
        tx.send(door_lock(2, true)).unwrap();
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Error(_)));
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Error(_)));
        assert_eq!(*seen.lock().unwrap(), 2);
        assert_eq!(stream.connection_state(), ConnectionState::Connected);

        stream.disconnect();
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payload_is_reported_and_skipped() {
        let transport = Arc::new(ChannelTransport::new());
        let tx = transport.push_session();
        let stream = client(&transport, quick());
        let seen = Arc::new(StdMutex::new(0_u32));
        let s = Arc::clone(&seen);
        stream.on(EventKind::DoorLockChanged, move |_| {
            *s.lock().unwrap() += 1;
            Ok(())
        });

        let mut notices = stream.notices();
        stream.connect();
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Connected));

        tx.send(Ok(PushFrame::message("{not json"))).unwrap();
        match next_notice(&mut notices).await {
            StreamNotice::Error(e) => {
                assert!(matches!(&*e, Error::Parse { payload, .. } if payload == "{not json"));
            }
            other => panic!("unexpected notice {other:?}"),
        }

        tx.send(door_lock(3, true)).unwrap();
        // Round-trip through an unknown tag to know the lock event was handled.
        let done = Arc::new(tokio::sync::Notify::new());
        let d = Arc::clone(&done);
        stream.on_message(move |env| {
            if env.event_type == "marker" {
                d.notify_one();
            }
            Ok(())
        });
        tx.send(Ok(PushFrame::message(r#"{"type":"marker"}"#))).unwrap();
        done.notified().await;
        assert_eq!(*seen.lock().unwrap(), 1);

        stream.disconnect();
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_tags_reach_only_generic_listeners() {
        let transport = Arc::new(ChannelTransport::new());
        let tx = transport.push_session();
        let stream = client(&transport, quick());
        let generic = Arc::new(StdMutex::new(Vec::new()));
        let g = Arc::clone(&generic);
        stream.on_message(move |env| {
            g.lock().unwrap().push(env.event_type.clone());
            Ok(())
        });
        stream.on(EventKind::Unknown, |_| panic!("Unknown has no typed table"));

        let mut notices = stream.notices();
        stream.connect();
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Connected));

        tx.send(Ok(PushFrame::message(r#"{"type":"heartbeat","timestamp":9,"uptime":3.0}"#)))
            .unwrap();
        drop(tx);

        // Stream end is observed after the heartbeat was dispatched.
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Disconnected));
        assert_eq!(*generic.lock().unwrap(), vec!["heartbeat".to_owned()]);

        stream.disconnect();
    }

    #[tokio::test(start_paused = true)]
    async fn lost_stream_reconnects_with_backoff() {
        let transport = Arc::new(ChannelTransport::new());
        let first = transport.push_session();
        let _second = transport.push_session();
        let stream = client(&transport, quick());

        let mut notices = stream.notices();
        stream.connect();
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Connected));

        drop(first);
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Disconnected));
        match next_notice(&mut notices).await {
            StreamNotice::Reconnecting { attempt, delay } => {
                assert_eq!(attempt, 1);
                assert_eq!(delay, Duration::from_millis(100));
            }
            other => panic!("unexpected notice {other:?}"),
        }
        assert_eq!(stream.connection_state(), ConnectionState::Reconnecting);

        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Connected));
        assert_eq!(transport.open_count(), 2);

        stream.disconnect();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_attempts_back_off_exponentially() {
        let transport = Arc::new(ChannelTransport::new());
        let stream = client(&transport, quick());

        let mut notices = stream.notices();
        stream.connect();

        let mut delays = Vec::new();
        while delays.len() < 3 {
            if let StreamNotice::Reconnecting { delay, .. } = next_notice(&mut notices).await {
                delays.push(delay);
            }
        }
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );

        stream.disconnect();
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_during_backoff_cancels_reconnect() {
        let transport = Arc::new(ChannelTransport::new());
        let stream = client(
            &transport,
            ReconnectConfig {
                initial_delay: Duration::from_secs(5),
                ..quick()
            },
        );

        let mut notices = stream.notices();
        stream.connect();
        loop {
            if let StreamNotice::Reconnecting { .. } = next_notice(&mut notices).await {
                break;
            }
        }

        // A session is now available, but the reconnect must never happen.
        let _tx = transport.push_session();
        stream.disconnect();
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Disconnected));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.open_count(), 1);
        assert_eq!(stream.connection_state(), ConnectionState::Disconnected);
        assert!(matches!(notices.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_is_idempotent() {
        let transport = Arc::new(ChannelTransport::new());
        let _tx = transport.push_session();
        let stream = client(&transport, quick());

        let mut notices = stream.notices();
        stream.disconnect();
        assert!(matches!(notices.try_recv(), Err(TryRecvError::Empty)));

        stream.connect();
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Connected));
        stream.disconnect();
        stream.disconnect();
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Disconnected));
        assert!(matches!(notices.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn connect_while_active_is_a_noop() {
        let transport = Arc::new(ChannelTransport::new());
        let _tx = transport.push_session();
        let stream = client(&transport, quick());

        stream.connect();
        wait_for_state(&stream, ConnectionState::Connected).await;
        stream.connect();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.open_count(), 1);

        stream.disconnect();
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_from_inside_a_handler_stops_delivery() {
        let transport = Arc::new(ChannelTransport::new());
        let tx = transport.push_session();
        let stream = client(&transport, quick());
        let later = Arc::new(StdMutex::new(0_u32));

        let s = stream.clone();
        stream.on(EventKind::DoorLockChanged, move |_| {
            s.disconnect();
            Ok(())
        });
        let l = Arc::clone(&later);
        stream.on(EventKind::DoorLockChanged, move |_| {
            *l.lock().unwrap() += 1;
            Ok(())
        });

        stream.connect();
        wait_for_state(&stream, ConnectionState::Connected).await;
        tx.send(door_lock(0, true)).unwrap();
        tx.send(door_lock(1, true)).unwrap();

        wait_for_state(&stream, ConnectionState::Disconnected).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*later.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let transport = Arc::new(ChannelTransport::new());
        let stream = client(
            &transport,
            ReconnectConfig {
                max_retries: Some(2),
                ..quick()
            },
        );

        stream.connect();
        wait_for_state(&stream, ConnectionState::Disconnected).await;
        // Initial attempt plus two retries.
        assert_eq!(transport.open_count(), 3);

        // A fresh connect is allowed after giving up.
        let _tx = transport.push_session();
        stream.connect();
        wait_for_state(&stream, ConnectionState::Connected).await;
        stream.disconnect();
    }

    #[tokio::test(start_paused = true)]
    async fn idle_stream_is_treated_as_lost() {
        let transport = Arc::new(ChannelTransport::new());
        let _silent = transport.push_session();
        let stream = client(
            &transport,
            ReconnectConfig {
                idle_timeout: Some(Duration::from_secs(90)),
                ..quick()
            },
        );

        let mut notices = stream.notices();
        stream.connect();
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Connected));
        assert!(matches!(next_notice(&mut notices).await, StreamNotice::Disconnected));
        assert!(matches!(
            next_notice(&mut notices).await,
            StreamNotice::Error(e) if matches!(&*e, Error::StreamConnect(_))
        ));

        stream.disconnect();
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_jitter_follows_the_client_seed() {
        async fn first_delay(seed: u64) -> Duration {
            let transport = Arc::new(ChannelTransport::new());
            let stream = client(
                &transport,
                ReconnectConfig {
                    jitter: 0.25,
                    seed: Some(seed),
                    ..quick()
                },
            );
            let mut notices = stream.notices();
            stream.connect();
            let delay = loop {
                if let StreamNotice::Reconnecting { delay, .. } = next_notice(&mut notices).await {
                    break delay;
                }
            };
            stream.disconnect();
            delay
        }

        let a = first_delay(5).await;
        let b = first_delay(6).await;
        assert_ne!(a, b);
        assert_eq!(first_delay(5).await, a);
        for d in [a, b] {
            assert!(d >= Duration::from_millis(75) && d <= Duration::from_millis(125), "{d:?}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reentrant_disconnect_while_others_reconnect_does_not_deadlock() {
        use std::sync::mpsc;

        let transport = Arc::new(ChannelTransport::new());
        let tx = transport.push_session();
        let stream = client(&transport, quick());

        let (entered_tx, entered_rx) = mpsc::channel();
        let s = stream.clone();
        stream.on(EventKind::DoorLockChanged, move |_| {
            let _ = entered_tx.send(());
            // Give the other threads time to queue on the client's locks.
            std::thread::sleep(Duration::from_millis(200));
            s.disconnect();
            Ok(())
        });

        stream.connect();
        wait_for_state(&stream, ConnectionState::Connected).await;
        tx.send(door_lock(0, true)).unwrap();
        tokio::task::spawn_blocking(move || entered_rx.recv_timeout(Duration::from_secs(5)))
            .await
            .unwrap()
            .unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let runtime = tokio::runtime::Handle::current();

        let b = stream.clone();
        let d = done_tx.clone();
        std::thread::spawn(move || {
            b.disconnect();
            let _ = d.send("disconnect");
        });
        std::thread::sleep(Duration::from_millis(50));
        let c = stream.clone();
        std::thread::spawn(move || {
            let _guard = runtime.enter();
            c.connect();
            let _ = done_tx.send("connect");
        });

        let finished = tokio::task::spawn_blocking(move || {
            (0..2)
                .map(|_| done_rx.recv_timeout(Duration::from_secs(5)))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .unwrap();
        assert_eq!(finished.map(|v| v.len()), Ok(2));

        stream.disconnect();
    }
}
