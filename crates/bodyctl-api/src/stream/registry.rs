// ── Handler registry ──
//
// Typed handlers per event kind plus generic listeners. Tables are
// copy-on-write behind `ArcSwap`, so dispatch works on a snapshot and
// callbacks may register or remove handlers while being invoked.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::stream::envelope::{EventEnvelope, EventKind};

/// Result returned by event callbacks.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Shared callback reference. Keep the `Arc` to remove it later with `off`.
pub type EventHandler = Arc<dyn Fn(&EventEnvelope) -> HandlerResult + Send + Sync>;

type HandlerTable = HashMap<EventKind, Vec<EventHandler>>;

#[derive(Default)]
pub(crate) struct Registry {
    typed: ArcSwap<HandlerTable>,
    generic: ArcSwap<Vec<EventHandler>>,
}

impl Registry {
    pub(crate) fn add(&self, kind: EventKind, handler: EventHandler) {
        self.typed.rcu(|table| {
            let mut next = HandlerTable::clone(table);
            next.entry(kind).or_default().push(Arc::clone(&handler));
            next
        });
    }

    /// Remove the first registration of `handler` under `kind`.
    pub(crate) fn remove(&self, kind: EventKind, handler: &EventHandler) -> bool {
        let mut removed = false;
        self.typed.rcu(|table| {
            let mut next = HandlerTable::clone(table);
            removed = next
                .get_mut(&kind)
                .is_some_and(|list| remove_first(list, handler));
            next
        });
        removed
    }

    pub(crate) fn add_generic(&self, handler: EventHandler) {
        self.generic.rcu(|list| {
            let mut next = Vec::clone(list);
            next.push(Arc::clone(&handler));
            next
        });
    }

    pub(crate) fn remove_generic(&self, handler: &EventHandler) -> bool {
        let mut removed = false;
        self.generic.rcu(|list| {
            let mut next = Vec::clone(list);
            removed = remove_first(&mut next, handler);
            next
        });
        removed
    }

    /// Snapshot of the handlers for `kind`, in registration order.
    pub(crate) fn typed(&self, kind: EventKind) -> Vec<EventHandler> {
        self.typed.load().get(&kind).cloned().unwrap_or_default()
    }

    pub(crate) fn generic(&self) -> Arc<Vec<EventHandler>> {
        self.generic.load_full()
    }

    pub(crate) fn handler_count(&self, kind: EventKind) -> usize {
        self.typed.load().get(&kind).map_or(0, Vec::len)
    }
}

fn remove_first(list: &mut Vec<EventHandler>, handler: &EventHandler) -> bool {
    match list.iter().position(|h| Arc::ptr_eq(h, handler)) {
        Some(index) => {
            list.remove(index);
            true
        }
        None => false,
    }
}

/// Run one callback, converting both returned errors and panics into a
/// message.
pub(crate) fn invoke(handler: &EventHandler, envelope: &EventEnvelope) -> Result<(), String> {
    match catch_unwind(AssertUnwindSafe(|| handler(envelope))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".into()
    }
}
