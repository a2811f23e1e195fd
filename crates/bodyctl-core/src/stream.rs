// ── Reactive state stream ──
//
// Subscription type for consuming reconciler changes as whole snapshots.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::StateSnapshot;

/// A subscription to the reconciled device state.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via [`changed()`](Self::changed) or by converting to a
/// `Stream`. Intermediate snapshots may be skipped when several writes
/// land between polls; use [`StateReconciler::subscribe`](crate::StateReconciler::subscribe)
/// to see every individual change.
pub struct StateStream {
    current: StateSnapshot,
    receiver: watch::Receiver<StateSnapshot>,
}

impl StateStream {
    pub(crate) fn new(receiver: watch::Receiver<StateSnapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &StateSnapshot {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> StateSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the reconciler has been dropped.
    pub async fn changed(&mut self) -> Option<StateSnapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> StateWatchStream {
        StateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct StateWatchStream {
    inner: WatchStream<StateSnapshot>,
}

impl Stream for StateWatchStream {
    type Item = StateSnapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
