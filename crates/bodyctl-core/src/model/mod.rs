// ── Domain model ──
//
// Canonical device state held by the reconciler, the keys it is stored
// under, and the partial updates that push events, polls and successful
// commands are turned into.

mod device;
mod update;

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use bodyctl_api::models::{LightKind, Position, SeatAxis};

pub use device::{Door, Light, LightMode, Seat, SeatMemory, Window};
pub use update::Update;

// ── Keys ─────────────────────────────────────────────────────────────

/// Identity of one reconciled record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "entity", content = "id", rename_all = "snake_case")]
pub enum EntityKey {
    Door(Position),
    Window(Position),
    Light(LightKind),
    Seat(SeatAxis),
    /// Seat memory preset (1..=3).
    Memory(u8),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Door(p) => write!(f, "door:{p}"),
            Self::Window(p) => write!(f, "window:{p}"),
            Self::Light(k) => write!(f, "light:{k}"),
            Self::Seat(a) => write!(f, "seat:{a}"),
            Self::Memory(n) => write!(f, "memory:{n}"),
        }
    }
}

/// Which channel produced a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UpdateSource {
    Push,
    Poll,
    Command,
}

// ── Records ──────────────────────────────────────────────────────────

/// State of one device, tagged by device type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceState {
    Door(Door),
    Window(Window),
    Light(Light),
    Seat(Seat),
    Memory(SeatMemory),
}

impl DeviceState {
    pub fn key(&self) -> EntityKey {
        match self {
            Self::Door(d) => EntityKey::Door(d.door),
            Self::Window(w) => EntityKey::Window(w.window),
            Self::Light(l) => EntityKey::Light(l.kind),
            Self::Seat(s) => EntityKey::Seat(s.axis),
            Self::Memory(m) => EntityKey::Memory(m.preset),
        }
    }

    /// A record with nothing observed yet.
    pub fn empty(key: EntityKey) -> Self {
        match key {
            EntityKey::Door(door) => Self::Door(Door {
                door,
                locked: None,
                open: None,
            }),
            EntityKey::Window(window) => Self::Window(Window {
                window,
                position: None,
            }),
            EntityKey::Light(kind) => Self::Light(Light {
                kind,
                mode: None,
                active: None,
            }),
            EntityKey::Seat(axis) => Self::Seat(Seat {
                axis,
                position: None,
                last_command: None,
            }),
            EntityKey::Memory(preset) => Self::Memory(SeatMemory {
                preset,
                saved: None,
                last_recalled: None,
            }),
        }
    }
}

/// A stored record plus when and how it was last written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub state: DeviceState,
    /// Local arrival time of the write that produced this state.
    pub updated_at: DateTime<Utc>,
    pub source: UpdateSource,
    /// Monotonic arrival stamp. Orders writes; immune to wall-clock steps.
    #[serde(skip)]
    pub arrived: Instant,
}

impl Entry {
    pub fn key(&self) -> EntityKey {
        self.state.key()
    }

    pub fn as_door(&self) -> Option<&Door> {
        match &self.state {
            DeviceState::Door(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_window(&self) -> Option<&Window> {
        match &self.state {
            DeviceState::Window(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_light(&self) -> Option<&Light> {
        match &self.state {
            DeviceState::Light(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_seat(&self) -> Option<&Seat> {
        match &self.state {
            DeviceState::Seat(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_memory(&self) -> Option<&SeatMemory> {
        match &self.state {
            DeviceState::Memory(m) => Some(m),
            _ => None,
        }
    }
}

/// Clamp a raw percentage into 0..=100.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
pub fn clamp_percent(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_readably() {
        assert_eq!(EntityKey::Door(Position::RearLeft).to_string(), "door:rear-left");
        assert_eq!(EntityKey::Light(LightKind::Position).to_string(), "light:position");
        assert_eq!(EntityKey::Memory(2).to_string(), "memory:2");
    }

    #[test]
    fn empty_record_has_matching_key() {
        let key = EntityKey::Seat(SeatAxis::Recline);
        assert_eq!(DeviceState::empty(key).key(), key);
    }

    #[test]
    fn percentages_are_clamped() {
        assert_eq!(clamp_percent(-4.0), 0);
        assert_eq!(clamp_percent(42.4), 42);
        assert_eq!(clamp_percent(180.0), 100);
        assert_eq!(clamp_percent(f64::NAN), 0);
    }
}
