use bodyctl_core::{Command, Controller, HeadlightMode, IndicatorMode, PositionLightMode};

use crate::cli::{GlobalOpts, LightArgs, LightCommand};
use crate::error::CliError;

use super::util;

pub async fn handle(
    controller: &Controller,
    args: LightArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (target, command, mode) = match args.command {
        LightCommand::Headlight { mode } => {
            let mode = HeadlightMode::from(mode);
            ("headlights", Command::SetHeadlight(mode), mode.to_string())
        }
        LightCommand::Indicator { mode } => {
            let mode = IndicatorMode::from(mode);
            ("indicators", Command::SetIndicator(mode), mode.to_string())
        }
        LightCommand::Position { mode } => {
            let mode = PositionLightMode::from(mode);
            (
                "position lights",
                Command::SetPositionLight(mode),
                mode.to_string(),
            )
        }
    };

    util::run_command(controller, command, target, &format!("set to {mode}"), global).await
}
