// ── Partial updates ──
//
// An `Update` names one record and carries only the fields a source
// actually reported. Merging overlays those fields on the current state.

use chrono::{DateTime, Utc};

use bodyctl_api::models::{LightKind, Position, SeatAxis, SeatDirection};

use super::{DeviceState, EntityKey, LightMode, clamp_percent};

#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Door {
        door: Position,
        locked: Option<bool>,
        open: Option<bool>,
    },
    Window {
        window: Position,
        position: u8,
    },
    Light {
        kind: LightKind,
        mode: Option<LightMode>,
        active: Option<bool>,
    },
    Seat {
        axis: SeatAxis,
        position: Option<u8>,
        last_command: Option<SeatDirection>,
    },
    Memory {
        preset: u8,
        saved: Option<bool>,
        recalled: bool,
    },
}

impl Update {
    pub fn key(&self) -> EntityKey {
        match self {
            Self::Door { door, .. } => EntityKey::Door(*door),
            Self::Window { window, .. } => EntityKey::Window(*window),
            Self::Light { kind, .. } => EntityKey::Light(*kind),
            Self::Seat { axis, .. } => EntityKey::Seat(*axis),
            Self::Memory { preset, .. } => EntityKey::Memory(*preset),
        }
    }

    /// Window update with the position clamped into 0..=100.
    pub fn window(window: Position, raw_position: f64) -> Self {
        Self::Window {
            window,
            position: clamp_percent(raw_position),
        }
    }

    /// Overlay this update on `current` (or on an empty record).
    pub fn merge(&self, current: Option<&DeviceState>, at: DateTime<Utc>) -> DeviceState {
        let key = self.key();
        let mut state = match current {
            Some(state) if state.key() == key => state.clone(),
            _ => DeviceState::empty(key),
        };

        match (&mut state, self) {
            (DeviceState::Door(d), Self::Door { locked, open, .. }) => {
                if locked.is_some() {
                    d.locked = *locked;
                }
                if open.is_some() {
                    d.open = *open;
                }
            }
            (DeviceState::Window(w), Self::Window { position, .. }) => {
                w.position = Some((*position).min(100));
            }
            (DeviceState::Light(l), Self::Light { mode, active, .. }) => match (mode, active) {
                (Some(mode), _) => {
                    l.mode = Some(*mode);
                    l.active = Some(mode.is_on());
                }
                (None, Some(false)) => {
                    l.mode = Some(LightMode::off(l.kind));
                    l.active = Some(false);
                }
                (None, Some(true)) => {
                    // Keep a remembered on-mode; an "off" mode is now stale.
                    if l.mode.is_some_and(|m| !m.is_on()) {
                        l.mode = None;
                    }
                    l.active = Some(true);
                }
                (None, None) => {}
            },
            (
                DeviceState::Seat(s),
                Self::Seat {
                    position,
                    last_command,
                    ..
                },
            ) => {
                if let Some(position) = position {
                    s.position = Some((*position).min(100));
                }
                if last_command.is_some() {
                    s.last_command = *last_command;
                }
            }
            (DeviceState::Memory(m), Self::Memory { saved, recalled, .. }) => {
                if saved.is_some() {
                    m.saved = *saved;
                }
                if *recalled {
                    m.last_recalled = Some(at);
                }
            }
            // Keys match, so the variants always line up.
            _ => {}
        }
        state
    }
}
