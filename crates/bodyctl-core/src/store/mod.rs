// ── State reconciler ──
//
// Single source of truth for device state. Push events, poll replies and
// successful commands all land here through one writer lock; listeners
// hear about every effective change in commit order.

mod collection;

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use bodyctl_api::EventEnvelope;
use bodyctl_api::models::{LightKind, Position, SeatAxis};

use crate::convert;
use crate::error::CoreError;
use crate::model::{Door, EntityKey, Entry, Light, Seat, SeatMemory, Update, UpdateSource, Window};
use crate::stream::StateStream;

use self::collection::EntityCollection;

/// Immutable view of every reconciled record, ordered by key.
pub type StateSnapshot = collection::Snapshot<EntityKey, Entry>;

/// Callback invoked once per effective change.
pub type ChangeListener = Arc<dyn Fn(&Change) + Send + Sync>;

/// One committed mutation.
#[derive(Debug, Clone, Serialize)]
pub struct Change {
    pub key: EntityKey,
    /// `None` when the record did not exist before this write.
    pub previous: Option<Arc<Entry>>,
    pub current: Arc<Entry>,
}

// ── Listener table ───────────────────────────────────────────────────

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    registered: Mutex<Vec<(u64, ChangeListener)>>,
    delivery: Mutex<Delivery>,
}

#[derive(Default)]
struct Delivery {
    queue: VecDeque<Change>,
    draining: bool,
}

impl Listeners {
    fn add(&self, listener: ChangeListener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.registered).push((id, listener));
        id
    }

    fn remove(&self, id: u64) {
        lock(&self.registered).retain(|(existing, _)| *existing != id);
    }

    fn len(&self) -> usize {
        lock(&self.registered).len()
    }

    /// Queue a change. Returns `true` if the caller must drain the queue.
    fn enqueue(&self, change: Change) -> bool {
        let mut delivery = lock(&self.delivery);
        delivery.queue.push_back(change);
        if delivery.draining {
            false
        } else {
            delivery.draining = true;
            true
        }
    }

    /// Deliver queued changes until the queue is empty. Only one thread
    /// drains at a time, so listeners see changes in commit order; a
    /// listener that writes back into the store has its change queued
    /// behind the one being delivered.
    fn drain(&self) {
        loop {
            let change = {
                let mut delivery = lock(&self.delivery);
                match delivery.queue.pop_front() {
                    Some(change) => change,
                    None => {
                        delivery.draining = false;
                        return;
                    }
                }
            };

            let listeners: Vec<ChangeListener> = lock(&self.registered)
                .iter()
                .map(|(_, l)| Arc::clone(l))
                .collect();
            for listener in listeners {
                if catch_unwind(AssertUnwindSafe(|| listener(&change))).is_err() {
                    warn!(key = %change.key, "state listener panicked");
                }
            }
        }
    }
}

/// Handle for a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// ── StateReconciler ──────────────────────────────────────────────────

/// Merges push, poll and command updates into one record per device.
///
/// Writes are last-write-wins by local arrival order, measured on the
/// monotonic clock: a write that arrived before the stored record was
/// written is discarded. Wall-clock time is kept for display only.
/// Writes that leave the record unchanged are not committed and notify
/// nobody.
pub struct StateReconciler {
    entries: EntityCollection<EntityKey, Entry>,
    writer: Mutex<()>,
    listeners: Arc<Listeners>,
}

impl StateReconciler {
    pub fn new() -> Self {
        Self {
            entries: EntityCollection::new(),
            writer: Mutex::new(()),
            listeners: Arc::new(Listeners::default()),
        }
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Apply a push event. Unknown tags and malformed payloads are
    /// ignored (the latter with a warning).
    pub fn apply(&self, envelope: &EventEnvelope) -> Option<Change> {
        match convert::update_from_event(envelope) {
            Ok(Some(update)) => self.write(
                &update,
                UpdateSource::Push,
                envelope.received_at,
                envelope.arrived,
            ),
            Ok(None) => {
                trace!(event_type = %envelope.event_type, "event carries no device state");
                None
            }
            Err(e) => {
                warn!(event_type = %envelope.event_type, error = %e, "ignoring malformed push payload");
                None
            }
        }
    }

    /// Apply the `data` of a status read for `key`.
    pub fn apply_poll(&self, key: EntityKey, data: &Value) -> Result<Option<Change>, CoreError> {
        let update = convert::update_from_poll(key, data)?;
        Ok(self.write(&update, UpdateSource::Poll, Utc::now(), Instant::now()))
    }

    /// Apply the expected outcome of a command the service accepted.
    pub fn apply_command(&self, update: &Update) -> Option<Change> {
        self.write(update, UpdateSource::Command, Utc::now(), Instant::now())
    }

    /// Apply an update with explicit wall-clock and monotonic arrival
    /// stamps.
    pub fn apply_update(
        &self,
        update: &Update,
        source: UpdateSource,
        at: DateTime<Utc>,
        arrived: Instant,
    ) -> Option<Change> {
        self.write(update, source, at, arrived)
    }

    fn write(
        &self,
        update: &Update,
        source: UpdateSource,
        at: DateTime<Utc>,
        arrived: Instant,
    ) -> Option<Change> {
        let key = update.key();

        let writer = lock(&self.writer);
        let previous = self.entries.get(&key);

        if let Some(prev) = &previous {
            if arrived < prev.arrived {
                debug!(%key, %source, "discarding write older than stored state");
                return None;
            }
        }

        let state = update.merge(previous.as_ref().map(|e| &e.state), at);
        if previous.as_ref().is_some_and(|prev| prev.state == state) {
            trace!(%key, %source, "write changes nothing");
            return None;
        }

        let current = Arc::new(Entry {
            state,
            updated_at: at,
            source,
            arrived,
        });
        self.entries.upsert(key, Arc::clone(&current));
        debug!(%key, %source, "state updated");

        let change = Change {
            key,
            previous,
            current,
        };
        // Queue while still holding the writer so delivery order is
        // commit order.
        let must_drain = self.listeners.enqueue(change.clone());
        drop(writer);

        if must_drain {
            self.listeners.drain();
        }
        Some(change)
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Register a listener for every effective change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        let id = self.listeners.add(Arc::new(listener));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Snapshot stream that wakes on every commit.
    pub fn watch(&self) -> StateStream {
        StateStream::new(self.entries.subscribe())
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> StateSnapshot {
        self.entries.snapshot()
    }

    pub fn get(&self, key: EntityKey) -> Option<Arc<Entry>> {
        self.entries.get(&key)
    }

    pub fn door(&self, door: Position) -> Option<Door> {
        self.get(EntityKey::Door(door))
            .and_then(|e| e.as_door().cloned())
    }

    pub fn window(&self, window: Position) -> Option<Window> {
        self.get(EntityKey::Window(window))
            .and_then(|e| e.as_window().cloned())
    }

    pub fn light(&self, kind: LightKind) -> Option<Light> {
        self.get(EntityKey::Light(kind))
            .and_then(|e| e.as_light().cloned())
    }

    pub fn seat(&self, axis: SeatAxis) -> Option<Seat> {
        self.get(EntityKey::Seat(axis))
            .and_then(|e| e.as_seat().cloned())
    }

    pub fn memory(&self, preset: u8) -> Option<SeatMemory> {
        self.get(EntityKey::Memory(preset))
            .and_then(|e| e.as_memory().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of commits so far.
    pub fn version(&self) -> u64 {
        self.entries.version()
    }
}

impl Default for StateReconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock a std mutex, recovering from poisoning. Listener panics are
/// caught before they can poison anything, but a poisoned lock must not
/// take the store down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
