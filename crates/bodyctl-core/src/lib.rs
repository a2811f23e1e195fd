//! Reactive state layer between `bodyctl-api` and consumers (CLI, dashboards).
//!
//! This crate owns the domain model, the reconciliation rules that merge
//! the two channels of a body controller, and the controller lifecycle:
//!
//! - **[`Controller`]**: explicit context object. [`init()`](Controller::init)
//!   registers push handlers, performs an initial poll, starts background
//!   refresh and connects the push stream; [`dispose()`](Controller::dispose)
//!   undoes all of it. [`Controller::oneshot()`] is the fire-and-forget mode
//!   used by single CLI invocations.
//!
//! - **[`StateReconciler`]**: one record per door, window, light group, seat
//!   axis and memory preset. Push events, poll replies and accepted commands
//!   are applied last-write-wins by local arrival time under a single writer
//!   lock; only effective changes reach subscribers.
//!
//! - **[`StateStream`]**: `watch`-backed snapshot subscription exposing
//!   `current()` / `latest()` / `changed()`.
//!
//! - **[`Command`]**: typed write operations with validation, endpoint
//!   mapping and the optimistic update applied on success.

pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod model;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{ControllerConfig, DEFAULT_URL, TlsVerification};
pub use controller::{Controller, RefreshReport};
pub use error::CoreError;
pub use store::{Change, ChangeListener, StateReconciler, StateSnapshot, Subscription};
pub use stream::{StateStream, StateWatchStream};

pub use model::{
    DeviceState, Door, EntityKey, Entry, Light, LightMode, Seat, SeatMemory, Update, UpdateSource,
    Window,
};

// Wire vocabulary consumers need to build commands and read state.
pub use bodyctl_api::models::{
    HeadlightMode, IndicatorMode, LightKind, LockCommand, Position, PositionLightMode, SeatAxis,
    SeatDirection, WindowCommand,
};
pub use bodyctl_api::{ConnectionState, EventKind, StreamNotice};
