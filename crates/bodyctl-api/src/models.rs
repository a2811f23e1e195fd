// Wire types for the body-control service
//
// Commands and status replies use small integer codes on the wire. Every
// code is modelled as a closed enum that serializes as its integer and
// parses from either the integer or a human name (for CLI input).
// Response payloads use `#[serde(default)]` liberally because the service
// is inconsistent about field presence between endpoints.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

// ── Wire enum plumbing ───────────────────────────────────────────────

/// A wire code outside the known range of its enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownWireValue {
    pub kind: &'static str,
    pub raw: i64,
}

impl fmt::Display for UnknownWireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} code {}", self.kind, self.raw)
    }
}

impl std::error::Error for UnknownWireValue {}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize, Display, EnumIter, EnumString,
        )]
        #[serde(into = "u8", try_from = "i64")]
        #[strum(ascii_case_insensitive)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value ),+
        }

        impl $name {
            /// Integer code sent on the wire.
            pub fn code(self) -> u8 {
                match self {
                    $( Self::$variant => $value ),+
                }
            }

            /// Parse from a wire code or a name (case-insensitive).
            pub fn parse(input: &str) -> Result<Self, UnknownWireValue> {
                let trimmed = input.trim();
                if let Ok(raw) = trimmed.parse::<i64>() {
                    return Self::try_from(raw);
                }
                trimmed.parse::<Self>().map_err(|_| UnknownWireValue {
                    kind: stringify!($name),
                    raw: -1,
                })
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value.code()
            }
        }

        impl TryFrom<i64> for $name {
            type Error = UnknownWireValue;

            fn try_from(raw: i64) -> Result<Self, Self::Error> {
                match raw {
                    $( $value => Ok(Self::$variant), )+
                    _ => Err(UnknownWireValue { kind: stringify!($name), raw }),
                }
            }
        }
    };
}

// ── Enums ────────────────────────────────────────────────────────────

wire_enum! {
    /// Door / window location. Doors and windows share the same indices.
    Position {
        #[strum(to_string = "front-left", serialize = "fl")]
        FrontLeft = 0,
        #[strum(to_string = "front-right", serialize = "fr")]
        FrontRight = 1,
        #[strum(to_string = "rear-left", serialize = "rl")]
        RearLeft = 2,
        #[strum(to_string = "rear-right", serialize = "rr")]
        RearRight = 3,
    }
}

wire_enum! {
    /// `POST /door/lock` command. `1` locks, matching the lock-state flag
    /// reported by status reads and push events.
    LockCommand {
        #[strum(to_string = "unlock")]
        Unlock = 0,
        #[strum(to_string = "lock")]
        Lock = 1,
    }
}

wire_enum! {
    /// `POST /window/control` motion command.
    WindowCommand {
        #[strum(to_string = "up")]
        Up = 0,
        #[strum(to_string = "down")]
        Down = 1,
        #[strum(to_string = "stop")]
        Stop = 2,
    }
}

wire_enum! {
    HeadlightMode {
        #[strum(to_string = "off")]
        Off = 0,
        #[strum(to_string = "low")]
        Low = 1,
        #[strum(to_string = "high")]
        High = 2,
    }
}

wire_enum! {
    IndicatorMode {
        #[strum(to_string = "off")]
        Off = 0,
        #[strum(to_string = "left")]
        Left = 1,
        #[strum(to_string = "right")]
        Right = 2,
        #[strum(to_string = "hazard")]
        Hazard = 3,
    }
}

wire_enum! {
    PositionLightMode {
        #[strum(to_string = "off")]
        Off = 0,
        #[strum(to_string = "on")]
        On = 1,
    }
}

wire_enum! {
    /// Light group, as carried by `light_state_changed` pushes.
    LightKind {
        #[strum(to_string = "headlight")]
        Headlight = 0,
        #[strum(to_string = "indicator")]
        Indicator = 1,
        #[strum(to_string = "position", serialize = "position_light")]
        Position = 2,
    }
}

wire_enum! {
    SeatAxis {
        #[strum(to_string = "translation", serialize = "forward_backward")]
        Translation = 0,
        #[strum(to_string = "recline")]
        Recline = 1,
    }
}

wire_enum! {
    SeatDirection {
        #[strum(to_string = "forward", serialize = "positive", serialize = "+")]
        Positive = 0,
        #[strum(to_string = "backward", serialize = "negative", serialize = "-")]
        Negative = 1,
        #[strum(to_string = "stop")]
        Stop = 2,
    }
}

/// Seat memory presets are numbered 1..=3.
pub const MEMORY_PRESETS: std::ops::RangeInclusive<u8> = 1..=3;

/// Window travel is expressed in percent.
pub const MAX_WINDOW_POSITION: u8 = 100;

// ── Response envelope ────────────────────────────────────────────────

/// Uniform command API envelope.
///
/// ```json
/// { "success": true, "message": "optional", "data": { ... }, "timestamp": 1700000000 }
/// ```
///
/// Error replies (4xx/5xx) use `{ "error", "message", "timestamp" }` and
/// omit `success`; those never reach envelope parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

// ── Status payloads ──────────────────────────────────────────────────

/// `GET /door/{id}/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorStatus {
    #[serde(rename = "doorID")]
    pub door: Position,
    #[serde(rename = "lockState", alias = "currentState", deserialize_with = "flag")]
    pub locked: bool,
    #[serde(
        rename = "doorState",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_flag"
    )]
    pub open: Option<bool>,
}

/// `GET /window/{id}/position`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPosition {
    #[serde(rename = "windowID")]
    pub window: Position,
    #[serde(alias = "newPosition")]
    pub position: u8,
}

/// `GET /info`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Service name -> human description.
    pub services: BTreeMap<String, String>,
    /// Service name -> URL pattern.
    pub endpoints: BTreeMap<String, String>,
}

/// `GET /health`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthStatus {
    pub status: String,
    /// Seconds since the service started.
    pub uptime: Option<f64>,
    /// Backend service name -> reachable.
    pub services: BTreeMap<String, bool>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

// ── Flexible flag decoding ───────────────────────────────────────────

/// Decode a boolean that the service sends either as JSON `true`/`false`
/// or as an integer (non-zero means set).
pub fn flag_from_value(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "locked" | "open" => Some(true),
            "false" | "0" | "off" | "unlocked" | "closed" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    flag_from_value(&value).ok_or_else(|| de::Error::custom(format!("expected flag, got {value}")))
}

fn optional_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => flag_from_value(&v)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected flag, got {v}"))),
    }
}
