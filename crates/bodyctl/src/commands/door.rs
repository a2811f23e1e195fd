use futures_util::future::join_all;
use tabled::Tabled;

use bodyctl_api::models::DoorStatus;
use bodyctl_core::{Command, Controller, LockCommand};

use crate::cli::{DoorArgs, DoorCommand, DoorTarget, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util::{self, Outcome};

#[derive(Tabled)]
struct DoorRow {
    #[tabled(rename = "Door")]
    door: String,
    #[tabled(rename = "Lock")]
    lock: String,
    #[tabled(rename = "Open")]
    open: String,
}

impl DoorRow {
    fn new(status: &DoorStatus, painter: Painter) -> Self {
        Self {
            door: status.door.to_string(),
            lock: if status.locked {
                painter.good("locked")
            } else {
                painter.warn("unlocked")
            },
            open: match status.open {
                Some(true) => painter.warn("open"),
                Some(false) => "closed".into(),
                None => "-".into(),
            },
        }
    }
}

pub async fn handle(
    controller: &Controller,
    args: DoorArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DoorCommand::Lock { door } => lock(controller, door, LockCommand::Lock, global).await,
        DoorCommand::Unlock { door } => {
            if door == DoorTarget::All {
                util::confirm("Unlock all four doors?", "unlock all doors", global.yes)?;
            }
            lock(controller, door, LockCommand::Unlock, global).await
        }
        DoorCommand::Status { door } => {
            let positions = super::positions(door);
            let client = controller.client();
            let reads = join_all(positions.iter().map(|&p| async move {
                (p, client.door_status(p).await)
            }))
            .await;
            let (statuses, failed) = util::split_reads(reads, "door");

            let painter = Painter::new(&global.color);
            let out = output::render_list(
                &global.output,
                &statuses,
                |s| DoorRow::new(s, painter),
                |s| format!("{} {}", s.door, if s.locked { "locked" } else { "unlocked" }),
            )?;
            output::print_output(&out, global.quiet);
            util::finish_reads(failed, positions.len())
        }
    }
}

async fn lock(
    controller: &Controller,
    target: DoorTarget,
    command: LockCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let action = match command {
        LockCommand::Lock => "locked",
        LockCommand::Unlock => "unlocked",
    };

    if let Some(door) = target.door() {
        return util::run_command(
            controller,
            Command::LockDoor { door, command },
            &format!("door {door}"),
            action,
            global,
        )
        .await;
    }

    let outcomes: Vec<Outcome> = controller
        .set_all_locks(command)
        .await
        .into_iter()
        .map(|(door, result)| {
            let target = format!("door {door}");
            match result {
                Ok(done) => Outcome::accepted(target, action, &done),
                Err(e) => Outcome::failed(target, action, &e),
            }
        })
        .collect();
    util::print_outcomes(&outcomes, global)
}
