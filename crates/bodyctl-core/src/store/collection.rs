// ── Generic reactive entity collection ──
//
// Concurrent keyed storage with O(1) lookups and push-based change
// notification via `watch` channels.

use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// Ordered, shareable view of a whole collection.
pub type Snapshot<K, T> = Arc<BTreeMap<K, Arc<T>>>;

/// A reactive collection for a single entity type.
///
/// Uses `DashMap` for concurrent lookups and `watch` channels for
/// push-based change notification. Every mutation bumps a version
/// counter and rebuilds the snapshot that subscribers receive.
pub(crate) struct EntityCollection<K, T>
where
    K: Copy + Eq + Hash + Ord + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    by_key: DashMap<K, Arc<T>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on mutation for efficient subscription.
    snapshot: watch::Sender<Snapshot<K, T>>,
}

impl<K, T> EntityCollection<K, T>
where
    K: Copy + Eq + Hash + Ord + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(BTreeMap::new()));

        Self {
            by_key: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert or replace an entity. Returns the previous value, if any.
    pub(crate) fn upsert(&self, key: K, entity: Arc<T>) -> Option<Arc<T>> {
        let previous = self.by_key.insert(key, entity);
        self.rebuild_snapshot();
        self.bump_version();
        previous
    }

    pub(crate) fn get(&self, key: &K) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Snapshot<K, T> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot<K, T>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Collect all values into a snapshot map and broadcast to subscribers.
    fn rebuild_snapshot(&self) {
        let values: BTreeMap<K, Arc<T>> = self
            .by_key
            .iter()
            .map(|r| (*r.key(), Arc::clone(r.value())))
            .collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upsert_returns_previous_value() {
        let col: EntityCollection<u8, String> = EntityCollection::new();
        assert!(col.upsert(1, Arc::new("hello".into())).is_none());
        let previous = col.upsert(1, Arc::new("world".into())).unwrap();
        assert_eq!(*previous, "hello");
        assert_eq!(*col.get(&1).unwrap(), "world");
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn snapshot_is_ordered_by_key() {
        let col: EntityCollection<u8, &'static str> = EntityCollection::new();
        col.upsert(3, Arc::new("c"));
        col.upsert(1, Arc::new("a"));
        col.upsert(2, Arc::new("b"));

        let snap = col.snapshot();
        let keys: Vec<u8> = snap.keys().copied().collect();
        assert_eq!(keys, vec![1, 2, 3]);
        assert_eq!(col.version(), 3);
    }

    #[test]
    fn subscribers_see_new_snapshots() {
        let col: EntityCollection<u8, u32> = EntityCollection::new();
        let mut rx = col.subscribe();
        col.upsert(7, Arc::new(70));
        assert!(rx.has_changed().unwrap());
        assert_eq!(**rx.borrow_and_update().get(&7).unwrap(), 70);
    }
}
