use std::time::Duration;

use bodyctl_api::models::HealthStatus;
use bodyctl_core::Controller;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, Painter};

fn detail(health: &HealthStatus, painter: Painter) -> String {
    let status = if health.is_healthy() {
        painter.good(&health.status)
    } else {
        painter.bad(&health.status)
    };
    let uptime = health
        .uptime
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or_else(
            || "-".into(),
            |secs| humantime::format_duration(Duration::from_secs_f64(secs.trunc())).to_string(),
        );

    let mut lines = vec![output::detail(&[("Status", status), ("Uptime", uptime)])];
    if !health.services.is_empty() {
        lines.push(String::new());
        lines.push("Services:".into());
        for (name, up) in &health.services {
            let state = if *up {
                painter.good("up")
            } else {
                painter.bad("down")
            };
            lines.push(format!("  {name}: {state}"));
        }
    }
    lines.join("\n")
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let health = controller.health().await?;
    let painter = Painter::new(&global.color);
    let out = output::render_single(
        &global.output,
        &health,
        |h| detail(h, painter),
        |h| h.status.clone(),
    )?;
    output::print_output(&out, global.quiet);

    if health.is_healthy() {
        Ok(())
    } else {
        Err(CliError::Unhealthy {
            status: health.status,
        })
    }
}
