use futures_util::future::join_all;
use tabled::Tabled;

use bodyctl_api::models::WindowPosition;
use bodyctl_core::{Command, Controller, WindowCommand as Motion};

use crate::cli::{GlobalOpts, WindowArgs, WindowCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct WindowRow {
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "State")]
    state: &'static str,
}

impl From<&WindowPosition> for WindowRow {
    fn from(w: &WindowPosition) -> Self {
        Self {
            window: w.window.to_string(),
            position: format!("{}%", w.position),
            state: match w.position {
                0 => "closed",
                100 => "open",
                _ => "partly open",
            },
        }
    }
}

pub async fn handle(
    controller: &Controller,
    args: WindowArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (window, command, action) = match args.command {
        WindowCommand::Set { window, position } => {
            let window = window.into();
            (
                window,
                Command::SetWindowPosition { window, position },
                format!("moving to {position}%"),
            )
        }
        WindowCommand::Up { window } => motion(window.into(), Motion::Up),
        WindowCommand::Down { window } => motion(window.into(), Motion::Down),
        WindowCommand::Stop { window } => motion(window.into(), Motion::Stop),
        WindowCommand::Status { window } => return status(controller, window, global).await,
    };

    util::run_command(controller, command, &format!("window {window}"), &action, global).await
}

fn motion(
    window: bodyctl_core::Position,
    command: Motion,
) -> (bodyctl_core::Position, Command, String) {
    let action = match command {
        Motion::Up => "moving up",
        Motion::Down => "moving down",
        Motion::Stop => "stopped",
    };
    (
        window,
        Command::ControlWindow { window, command },
        action.into(),
    )
}

async fn status(
    controller: &Controller,
    window: Option<crate::cli::PositionArg>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let positions = super::positions(window);
    let client = controller.client();
    let reads = join_all(
        positions
            .iter()
            .map(|&p| async move { (p, client.window_position(p).await) }),
    )
    .await;
    let (windows, failed) = util::split_reads(reads, "window");

    let out = output::render_list(&global.output, &windows, |w| WindowRow::from(w), |w| {
        format!("{} {}", w.window, w.position)
    })?;
    output::print_output(&out, global.quiet);
    util::finish_reads(failed, positions.len())
}
