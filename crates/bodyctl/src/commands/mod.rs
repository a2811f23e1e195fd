//! Command handlers, one module per top-level subcommand.

pub mod config_cmd;
pub mod door;
pub mod health;
pub mod info;
pub mod light;
pub mod seat;
pub mod status;
pub mod util;
pub mod watch;
pub mod window;

use bodyctl_core::{
    Controller, HeadlightMode, IndicatorMode, Position, PositionLightMode, SeatAxis, SeatDirection,
};

use crate::cli::{
    self, Command, DoorTarget, GlobalOpts, HeadlightArg, IndicatorArg, OnOffArg, PositionArg,
    SeatAxisArg, SeatDirectionArg,
};
use crate::error::CliError;

/// Route a controller-backed command to its handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Door(args) => door::handle(controller, args, global).await,
        Command::Window(args) => window::handle(controller, args, global).await,
        Command::Light(args) => light::handle(controller, args, global).await,
        Command::Seat(args) => seat::handle(controller, args, global).await,
        Command::Status => status::handle(controller, global).await,
        Command::Info => info::handle(controller, global).await,
        Command::Health => health::handle(controller, global).await,
        // Handled in main before a oneshot controller exists
        Command::Watch(_) | Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

// ── Argument conversions ─────────────────────────────────────────────

impl From<PositionArg> for Position {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::FrontLeft => Self::FrontLeft,
            PositionArg::FrontRight => Self::FrontRight,
            PositionArg::RearLeft => Self::RearLeft,
            PositionArg::RearRight => Self::RearRight,
        }
    }
}

impl DoorTarget {
    /// The single door this target names, `None` for `all`.
    pub fn door(self) -> Option<Position> {
        match self {
            Self::FrontLeft => Some(Position::FrontLeft),
            Self::FrontRight => Some(Position::FrontRight),
            Self::RearLeft => Some(Position::RearLeft),
            Self::RearRight => Some(Position::RearRight),
            Self::All => None,
        }
    }
}

impl From<HeadlightArg> for HeadlightMode {
    fn from(arg: HeadlightArg) -> Self {
        match arg {
            HeadlightArg::Off => Self::Off,
            HeadlightArg::Low => Self::Low,
            HeadlightArg::High => Self::High,
        }
    }
}

impl From<IndicatorArg> for IndicatorMode {
    fn from(arg: IndicatorArg) -> Self {
        match arg {
            IndicatorArg::Off => Self::Off,
            IndicatorArg::Left => Self::Left,
            IndicatorArg::Right => Self::Right,
            IndicatorArg::Hazard => Self::Hazard,
        }
    }
}

impl From<OnOffArg> for PositionLightMode {
    fn from(arg: OnOffArg) -> Self {
        match arg {
            OnOffArg::Off => Self::Off,
            OnOffArg::On => Self::On,
        }
    }
}

impl From<SeatAxisArg> for SeatAxis {
    fn from(arg: SeatAxisArg) -> Self {
        match arg {
            SeatAxisArg::Translation => Self::Translation,
            SeatAxisArg::Recline => Self::Recline,
        }
    }
}

impl From<SeatDirectionArg> for SeatDirection {
    fn from(arg: SeatDirectionArg) -> Self {
        match arg {
            SeatDirectionArg::Forward => Self::Positive,
            SeatDirectionArg::Backward => Self::Negative,
            SeatDirectionArg::Stop => Self::Stop,
        }
    }
}

const ALL_POSITIONS: [Position; 4] = [
    Position::FrontLeft,
    Position::FrontRight,
    Position::RearLeft,
    Position::RearRight,
];

/// Positions a status command should read: one, or all four.
pub(crate) fn positions(selected: Option<cli::PositionArg>) -> Vec<Position> {
    selected.map_or_else(|| ALL_POSITIONS.to_vec(), |p| vec![p.into()])
}
