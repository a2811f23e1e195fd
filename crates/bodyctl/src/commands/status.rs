use tabled::Tabled;

use bodyctl_core::{Controller, DeviceState, Entry};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, or_dash};

#[derive(Tabled)]
struct StateRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&Entry> for StateRow {
    fn from(entry: &Entry) -> Self {
        Self {
            entity: entry.key().to_string(),
            state: describe(&entry.state),
            source: entry.source.to_string(),
            updated: entry.updated_at.format("%H:%M:%S%.3f").to_string(),
        }
    }
}

/// One-line summary of a record, used by `status` and `watch`.
pub fn describe(state: &DeviceState) -> String {
    match state {
        DeviceState::Door(d) => {
            let lock = match d.locked {
                Some(true) => "locked",
                Some(false) => "unlocked",
                None => "lock unknown",
            };
            match d.open {
                Some(true) => format!("{lock}, open"),
                Some(false) => format!("{lock}, closed"),
                None => lock.to_owned(),
            }
        }
        DeviceState::Window(w) => w
            .position
            .map_or_else(|| "position unknown".into(), |p| format!("{p}% open")),
        DeviceState::Light(l) => match (l.mode, l.active) {
            (Some(mode), _) => mode.to_string(),
            (None, Some(true)) => "on".into(),
            (None, Some(false)) => "off".into(),
            (None, None) => "unknown".into(),
        },
        DeviceState::Seat(s) => format!(
            "position {}, last {}",
            or_dash(s.position.map(|p| format!("{p}%"))),
            or_dash(s.last_command)
        ),
        DeviceState::Memory(m) => {
            let saved = match m.saved {
                Some(true) => "saved",
                Some(false) => "save failed",
                None => "not saved",
            };
            match m.last_recalled {
                Some(at) => format!("{saved}, recalled {}", at.format("%H:%M:%S")),
                None => saved.to_owned(),
            }
        }
    }
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let report = controller.refresh_all().await;
    for (key, err) in &report.failed {
        eprintln!("warning: {key}: {err}");
    }

    let snapshot = controller.snapshot();
    let entries: Vec<&Entry> = snapshot.values().map(|e| &**e).collect();
    let out = output::render_list(
        &global.output,
        &entries,
        |e| StateRow::from(*e),
        |e| format!("{} {}", e.key(), describe(&e.state)),
    )?;
    output::print_output(&out, global.quiet);

    if report.is_complete() {
        Ok(())
    } else {
        Err(CliError::PartialFailure {
            failed: report.failed.len(),
            total: report.ok + report.failed.len(),
        })
    }
}
