// ── Device records ──
//
// Canonical per-device state. Every field the controller has not observed
// yet is `None`; a record only ever gains or overwrites fields.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bodyctl_api::models::{
    HeadlightMode, IndicatorMode, LightKind, Position, PositionLightMode, SeatAxis, SeatDirection,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Door {
    pub door: Position,
    pub locked: Option<bool>,
    pub open: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Window {
    pub window: Position,
    /// Travel in percent, always within 0..=100.
    pub position: Option<u8>,
}

/// Mode of one light group, typed per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "mode", rename_all = "snake_case")]
pub enum LightMode {
    Headlight(HeadlightMode),
    Indicator(IndicatorMode),
    Position(PositionLightMode),
}

impl LightMode {
    pub fn kind(self) -> LightKind {
        match self {
            Self::Headlight(_) => LightKind::Headlight,
            Self::Indicator(_) => LightKind::Indicator,
            Self::Position(_) => LightKind::Position,
        }
    }

    /// The "off" mode of a light group.
    pub fn off(kind: LightKind) -> Self {
        match kind {
            LightKind::Headlight => Self::Headlight(HeadlightMode::Off),
            LightKind::Indicator => Self::Indicator(IndicatorMode::Off),
            LightKind::Position => Self::Position(PositionLightMode::Off),
        }
    }

    /// Decode a wire mode code for the given group.
    pub fn from_code(kind: LightKind, code: i64) -> Option<Self> {
        match kind {
            LightKind::Headlight => HeadlightMode::try_from(code).ok().map(Self::Headlight),
            LightKind::Indicator => IndicatorMode::try_from(code).ok().map(Self::Indicator),
            LightKind::Position => PositionLightMode::try_from(code).ok().map(Self::Position),
        }
    }

    /// Parse a mode name (or code) for the given group.
    pub fn parse(kind: LightKind, input: &str) -> Option<Self> {
        match kind {
            LightKind::Headlight => HeadlightMode::parse(input).ok().map(Self::Headlight),
            LightKind::Indicator => IndicatorMode::parse(input).ok().map(Self::Indicator),
            LightKind::Position => PositionLightMode::parse(input).ok().map(Self::Position),
        }
    }

    pub fn is_on(self) -> bool {
        self != Self::off(self.kind())
    }
}

impl std::fmt::Display for LightMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Headlight(m) => m.fmt(f),
            Self::Indicator(m) => m.fmt(f),
            Self::Position(m) => m.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Light {
    pub kind: LightKind,
    /// Exact mode, when known. A bare on/off push leaves it unknown unless
    /// a previous on-mode is remembered.
    pub mode: Option<LightMode>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Seat {
    pub axis: SeatAxis,
    /// Axis travel in percent, always within 0..=100.
    pub position: Option<u8>,
    pub last_command: Option<SeatDirection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatMemory {
    pub preset: u8,
    /// Outcome of the last save confirmation.
    pub saved: Option<bool>,
    pub last_recalled: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_mode_codes_are_per_kind() {
        assert_eq!(
            LightMode::from_code(LightKind::Indicator, 3),
            Some(LightMode::Indicator(IndicatorMode::Hazard))
        );
        assert_eq!(LightMode::from_code(LightKind::Position, 3), None);
        assert!(!LightMode::off(LightKind::Headlight).is_on());
        assert!(LightMode::Headlight(HeadlightMode::Low).is_on());
    }

    #[test]
    fn light_mode_parses_names() {
        assert_eq!(
            LightMode::parse(LightKind::Headlight, "HIGH"),
            Some(LightMode::Headlight(HeadlightMode::High))
        );
        assert_eq!(LightMode::parse(LightKind::Indicator, "sideways"), None);
    }
}
