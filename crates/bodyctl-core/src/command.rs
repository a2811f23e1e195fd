// ── Command API ──
//
// All write operations flow through a unified `Command` enum. The
// controller validates each one, maps it to its endpoint and, once the
// service accepts it, applies the expected outcome to the reconciler.

use bodyctl_api::Endpoint;
use bodyctl_api::models::{
    HeadlightMode, IndicatorMode, LightKind, LockCommand, MAX_WINDOW_POSITION, MEMORY_PRESETS,
    Position, PositionLightMode, SeatAxis, SeatDirection, WindowCommand,
};

use crate::error::CoreError;
use crate::model::{LightMode, Update};
use crate::store::Change;

/// All possible write operations against a body controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // ── Doors ────────────────────────────────────────────────────────
    LockDoor {
        door: Position,
        command: LockCommand,
    },

    // ── Windows ──────────────────────────────────────────────────────
    SetWindowPosition {
        window: Position,
        /// Percent open, 0..=100.
        position: u8,
    },
    ControlWindow {
        window: Position,
        command: WindowCommand,
    },

    // ── Lights ───────────────────────────────────────────────────────
    SetHeadlight(HeadlightMode),
    SetIndicator(IndicatorMode),
    SetPositionLight(PositionLightMode),

    // ── Seat ─────────────────────────────────────────────────────────
    AdjustSeat {
        axis: SeatAxis,
        direction: SeatDirection,
    },
    RecallMemory {
        preset: u8,
    },
    SaveMemory {
        preset: u8,
    },
}

impl Command {
    /// Reject values the service would refuse anyway.
    pub fn validate(&self) -> Result<(), CoreError> {
        match *self {
            Self::SetWindowPosition { position, .. } if position > MAX_WINDOW_POSITION => {
                Err(CoreError::Validation {
                    message: format!("window position {position} is outside 0..={MAX_WINDOW_POSITION}"),
                })
            }
            Self::RecallMemory { preset } | Self::SaveMemory { preset }
                if !MEMORY_PRESETS.contains(&preset) =>
            {
                Err(CoreError::Validation {
                    message: format!(
                        "memory preset {preset} is outside {}..={}",
                        MEMORY_PRESETS.start(),
                        MEMORY_PRESETS.end()
                    ),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match *self {
            Self::LockDoor { door, command } => Endpoint::lock_door(door, command),
            Self::SetWindowPosition { window, position } => {
                Endpoint::set_window_position(window, position)
            }
            Self::ControlWindow { window, command } => Endpoint::control_window(window, command),
            Self::SetHeadlight(mode) => Endpoint::set_headlight(mode),
            Self::SetIndicator(mode) => Endpoint::set_indicator(mode),
            Self::SetPositionLight(mode) => Endpoint::set_position_light(mode),
            Self::AdjustSeat { axis, direction } => Endpoint::adjust_seat(axis, direction),
            Self::RecallMemory { preset } => Endpoint::recall_memory(preset),
            Self::SaveMemory { preset } => Endpoint::save_memory(preset),
        }
    }

    /// State the service should be in once it has accepted this command.
    ///
    /// `None` for commands whose outcome is only known later: window
    /// motion ends wherever it stops, and memory saves are confirmed by a
    /// push event.
    pub fn optimistic_update(&self) -> Option<Update> {
        match *self {
            Self::LockDoor { door, command } => Some(Update::Door {
                door,
                locked: Some(command == LockCommand::Lock),
                open: None,
            }),
            Self::SetWindowPosition { window, position } => Some(Update::Window {
                window,
                position: position.min(MAX_WINDOW_POSITION),
            }),
            Self::SetHeadlight(mode) => Some(light(LightMode::Headlight(mode))),
            Self::SetIndicator(mode) => Some(light(LightMode::Indicator(mode))),
            Self::SetPositionLight(mode) => Some(light(LightMode::Position(mode))),
            Self::AdjustSeat { axis, direction } => Some(Update::Seat {
                axis,
                position: None,
                last_command: Some(direction),
            }),
            Self::RecallMemory { preset } => Some(Update::Memory {
                preset,
                saved: None,
                recalled: true,
            }),
            Self::ControlWindow { .. } | Self::SaveMemory { .. } => None,
        }
    }

    /// Light group a light command targets.
    pub fn light_kind(&self) -> Option<LightKind> {
        match self {
            Self::SetHeadlight(_) => Some(LightKind::Headlight),
            Self::SetIndicator(_) => Some(LightKind::Indicator),
            Self::SetPositionLight(_) => Some(LightKind::Position),
            _ => None,
        }
    }
}

fn light(mode: LightMode) -> Update {
    Update::Light {
        kind: mode.kind(),
        mode: Some(mode),
        active: Some(mode.is_on()),
    }
}

/// Outcome of an accepted command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub command: Command,
    /// Attempts the request client needed.
    pub attempts: u32,
    /// Service message, when it sent one.
    pub message: Option<String>,
    /// The optimistic change applied to the reconciler, if any.
    pub change: Option<Change>,
}
