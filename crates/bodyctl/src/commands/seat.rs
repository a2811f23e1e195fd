use bodyctl_core::{Command, Controller, SeatAxis, SeatDirection};

use crate::cli::{GlobalOpts, SeatArgs, SeatCommand};
use crate::error::CliError;

use super::util;

pub async fn handle(
    controller: &Controller,
    args: SeatArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SeatCommand::Move { axis, direction } => {
            let axis = SeatAxis::from(axis);
            let direction = SeatDirection::from(direction);
            let action = match direction {
                SeatDirection::Stop => "stopped".to_owned(),
                moving => format!("moving {moving}"),
            };
            util::run_command(
                controller,
                Command::AdjustSeat { axis, direction },
                &format!("seat {axis}"),
                &action,
                global,
            )
            .await
        }
        SeatCommand::Recall { preset } => {
            util::run_command(
                controller,
                Command::RecallMemory { preset },
                &format!("memory {preset}"),
                "recalled",
                global,
            )
            .await
        }
        SeatCommand::Save { preset } => {
            util::confirm(
                &format!("Overwrite memory preset {preset} with the current seat position?"),
                "save seat memory",
                global.yes,
            )?;
            util::run_command(
                controller,
                Command::SaveMemory { preset },
                &format!("memory {preset}"),
                "saved",
                global,
            )
            .await
        }
    }
}
