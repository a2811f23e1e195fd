// ── Payload conversion ──
//
// Turns push envelopes and poll replies into `Update`s. The service is
// loose about field names and types (booleans vs integer flags, `position`
// vs `newPosition`, light groups by code or by name), so every accessor
// here accepts the variants it has been seen to send.

use std::str::FromStr;

use serde_json::Value;

use bodyctl_api::models::{LightKind, MEMORY_PRESETS, Position, SeatAxis, SeatDirection, flag_from_value};
use bodyctl_api::{EventEnvelope, EventKind};

use crate::error::CoreError;
use crate::model::{EntityKey, LightMode, Update, clamp_percent};

/// Convert a push envelope. `Ok(None)` for tags that carry no device state.
pub fn update_from_event(envelope: &EventEnvelope) -> Result<Option<Update>, CoreError> {
    let data = &envelope.data;
    let kind = envelope.event_type.as_str();

    let update = match envelope.kind {
        EventKind::DoorLockChanged => Update::Door {
            door: required(kind, data, &["doorID"], wire::<Position>)?,
            locked: Some(required(kind, data, &["lockState", "newLockState"], flag_from_value)?),
            open: None,
        },
        EventKind::DoorStateChanged => Update::Door {
            door: required(kind, data, &["doorID"], wire::<Position>)?,
            locked: None,
            open: Some(required(kind, data, &["doorState", "newDoorState"], flag_from_value)?),
        },
        EventKind::WindowPositionChanged => Update::Window {
            window: required(kind, data, &["windowID"], wire::<Position>)?,
            position: required(kind, data, &["position", "newPosition"], percent)?,
        },
        EventKind::LightStateChanged => light_update(kind, data)?,
        EventKind::SeatPositionChanged => Update::Seat {
            axis: required(kind, data, &["axis"], wire::<SeatAxis>)?,
            position: optional(kind, data, &["newPosition", "position"], percent)?,
            last_command: optional(kind, data, &["direction"], wire::<SeatDirection>)?,
        },
        EventKind::SeatMemorySaveConfirm => Update::Memory {
            preset: required(kind, data, &["presetID"], preset)?,
            saved: Some(required(kind, data, &["saveResult", "result"], flag_from_value)?),
            recalled: false,
        },
        EventKind::Unknown => return Ok(None),
    };
    Ok(Some(update))
}

/// Convert a poll reply (`data` of a status read) for the record `key`.
pub fn update_from_poll(key: EntityKey, data: &Value) -> Result<Update, CoreError> {
    let kind = key.to_string();
    let kind = kind.as_str();

    Ok(match key {
        EntityKey::Door(door) => {
            let locked = optional(kind, data, &["lockState", "currentState"], flag_from_value)?;
            let open = optional(kind, data, &["doorState"], flag_from_value)?;
            if locked.is_none() && open.is_none() {
                return Err(invalid(kind, "no lockState or doorState field"));
            }
            Update::Door { door, locked, open }
        }
        EntityKey::Window(window) => Update::Window {
            window,
            position: required(kind, data, &["position", "newPosition"], percent)?,
        },
        EntityKey::Light(light) => {
            let (mode, active) = light_state(kind, light, data)?;
            Update::Light {
                kind: light,
                mode,
                active,
            }
        }
        EntityKey::Seat(axis) => Update::Seat {
            axis,
            position: optional(kind, data, &["position", "newPosition"], percent)?,
            last_command: optional(kind, data, &["direction"], wire::<SeatDirection>)?,
        },
        EntityKey::Memory(preset) => Update::Memory {
            preset,
            saved: optional(kind, data, &["saveResult", "saved"], flag_from_value)?,
            recalled: false,
        },
    })
}

// ── Light payloads ───────────────────────────────────────────────────

fn light_update(kind: &str, data: &Value) -> Result<Update, CoreError> {
    let light = required(kind, data, &["lightType"], wire::<LightKind>)?;
    let (mode, active) = light_state(kind, light, data)?;
    if mode.is_none() && active.is_none() {
        return Err(invalid(kind, "no newState or state field"));
    }
    Ok(Update::Light {
        kind: light,
        mode,
        active,
    })
}

/// `newState`/`state` is a mode code, a mode name, or a bare on/off flag.
fn light_state(
    kind: &str,
    light: LightKind,
    data: &Value,
) -> Result<(Option<LightMode>, Option<bool>), CoreError> {
    let Some(value) = field(data, &["newState", "state", "mode"]) else {
        return Ok((None, None));
    };
    match value {
        Value::Bool(on) => Ok((None, Some(*on))),
        Value::Number(n) => {
            let mode = n
                .as_i64()
                .and_then(|code| LightMode::from_code(light, code))
                .ok_or_else(|| invalid(kind, format!("unknown {light} mode {n}")))?;
            Ok((Some(mode), Some(mode.is_on())))
        }
        Value::String(s) => {
            if let Some(mode) = LightMode::parse(light, s) {
                Ok((Some(mode), Some(mode.is_on())))
            } else if let Some(on) = flag_from_value(value) {
                Ok((None, Some(on)))
            } else {
                Err(invalid(kind, format!("unknown {light} mode '{s}'")))
            }
        }
        other => Err(invalid(kind, format!("unexpected light state {other}"))),
    }
}

// ── Field accessors ──────────────────────────────────────────────────

/// First present, non-null field among `names`.
fn field<'a>(data: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| data.get(name).filter(|v| !v.is_null()))
}

fn required<T>(
    kind: &str,
    data: &Value,
    names: &[&str],
    decode: impl Fn(&Value) -> Option<T>,
) -> Result<T, CoreError> {
    optional(kind, data, names, decode)?
        .ok_or_else(|| invalid(kind, format!("missing field {}", names.join("/"))))
}

fn optional<T>(
    kind: &str,
    data: &Value,
    names: &[&str],
    decode: impl Fn(&Value) -> Option<T>,
) -> Result<Option<T>, CoreError> {
    match field(data, names) {
        None => Ok(None),
        Some(value) => decode(value)
            .map(Some)
            .ok_or_else(|| invalid(kind, format!("bad value {value} for {}", names.join("/")))),
    }
}

/// Wire enum from an integer code, a numeric string, or a name.
fn wire<T>(value: &Value) -> Option<T>
where
    T: TryFrom<i64> + FromStr,
{
    match value {
        Value::Number(n) => n.as_i64().and_then(|code| T::try_from(code).ok()),
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(code) => T::try_from(code).ok(),
                Err(_) => s.parse().ok(),
            }
        }
        _ => None,
    }
}

fn percent(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => n.as_f64().map(clamp_percent),
        Value::String(s) => s.trim().parse::<f64>().ok().map(clamp_percent),
        _ => None,
    }
}

fn preset(value: &Value) -> Option<u8> {
    value
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .filter(|n| MEMORY_PRESETS.contains(n))
}

fn invalid(kind: &str, message: impl Into<String>) -> CoreError {
    CoreError::InvalidPayload {
        kind: kind.to_owned(),
        message: message.into(),
    }
}
