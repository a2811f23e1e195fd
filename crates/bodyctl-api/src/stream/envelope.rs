// ── Push envelope ──
//
// Every push message is a JSON object `{ "type", "data", "timestamp" }`.
// Control messages (welcome, heartbeat) put their fields at the top level
// instead of under `data`.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::Error;
use crate::stream::sse::PushFrame;

/// Closed set of push event tags, plus `Unknown` for anything else.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DoorLockChanged,
    DoorStateChanged,
    WindowPositionChanged,
    LightStateChanged,
    SeatPositionChanged,
    SeatMemorySaveConfirm,
    Unknown,
}

impl EventKind {
    /// Every tag with a typed handler table (excludes `Unknown`).
    pub const KNOWN: [Self; 6] = [
        Self::DoorLockChanged,
        Self::DoorStateChanged,
        Self::WindowPositionChanged,
        Self::LightStateChanged,
        Self::SeatPositionChanged,
        Self::SeatMemorySaveConfirm,
    ];

    /// Map a wire tag to its kind. Unrecognized tags become `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or(Self::Unknown)
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A decoded push message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEnvelope {
    /// Tag exactly as received (kept for `Unknown` kinds).
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip)]
    pub kind: EventKind,
    /// The `data` member, or the whole object for control messages.
    pub data: serde_json::Value,
    /// Server timestamp (seconds), when present.
    pub timestamp: Option<i64>,
    /// Local arrival time, for display.
    pub received_at: DateTime<Utc>,
    /// Monotonic arrival stamp, for ordering against other writes.
    #[serde(skip)]
    pub arrived: Instant,
}

impl EventEnvelope {
    /// Parse a frame received now.
    pub fn from_frame(frame: &PushFrame) -> Result<Self, Error> {
        Self::parse(frame.event.as_deref(), &frame.data, Utc::now())
    }

    /// Parse raw payload text. `event_name` is the transport-level name,
    /// used when the JSON carries no `type`.
    pub fn parse(
        event_name: Option<&str>,
        payload: &str,
        received_at: DateTime<Utc>,
    ) -> Result<Self, Error> {
        let malformed = |message: String| Error::Parse {
            message,
            payload: payload.to_owned(),
        };

        let value: serde_json::Value =
            serde_json::from_str(payload).map_err(|e| malformed(e.to_string()))?;
        let serde_json::Value::Object(mut object) = value else {
            return Err(malformed("payload is not a JSON object".into()));
        };

        let event_type = match object.get("type").and_then(serde_json::Value::as_str) {
            Some(tag) => tag.to_owned(),
            None => match event_name {
                Some(name) if !name.is_empty() && name != "message" => name.to_owned(),
                _ => return Err(malformed("missing event type".into())),
            },
        };

        let timestamp = object.get("timestamp").and_then(|ts| {
            ts.as_i64()
                .or_else(|| ts.as_f64().map(truncate_seconds))
        });

        let data = match object.remove("data") {
            Some(data) => data,
            None => serde_json::Value::Object(object),
        };

        Ok(Self {
            kind: EventKind::from_tag(&event_type),
            event_type,
            data,
            timestamp,
            received_at,
            arrived: Instant::now(),
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn truncate_seconds(secs: f64) -> i64 {
    secs.trunc() as i64
}
