//! `bodyctl watch`: follow reconciled state changes live.
//!
//! Runs the full controller lifecycle (push stream, refresh on connect,
//! optional periodic polling) and prints one line per effective change
//! until Ctrl-C or `--duration` elapses.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

use bodyctl_core::{Change, Controller, ControllerConfig, StreamNotice};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::Painter;

use super::status::describe;

pub async fn handle(
    mut config: ControllerConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    config.events_enabled = true;
    if let Some(secs) = args.refresh {
        config.refresh_interval_secs = secs;
    }

    let controller = Controller::new(config)?;
    let painter = Painter::new(&global.color);

    let (tx, mut changes) = mpsc::unbounded_channel::<Change>();
    let subscription = controller.subscribe(move |change| {
        let _ = tx.send(change.clone());
    });
    let mut notices = controller.notices();

    controller.init().await;
    tracing::info!(url = %controller.config().url, "watching for changes");

    let stop = stop_signal(args.duration);
    tokio::pin!(stop);

    let result = loop {
        tokio::select! {
            biased;
            () = &mut stop => break Ok(()),
            Some(change) = changes.recv() => {
                if let Err(e) = print_change(&change, global, painter) {
                    break Err(e);
                }
            }
            notice = notices.recv() => match notice {
                Ok(notice) => print_notice(&notice, global, painter),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    subscription.unsubscribe();
    controller.dispose().await;
    result
}

/// Resolves on Ctrl-C, or once `duration` has elapsed.
async fn stop_signal(duration: Option<Duration>) {
    let elapsed = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        () = elapsed => {}
    }
}

fn print_change(change: &Change, global: &GlobalOpts, painter: Painter) -> Result<(), CliError> {
    if global.quiet {
        return Ok(());
    }
    let line = match global.output {
        // One JSON document per line so the output can be piped
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(change)?,
        OutputFormat::Yaml => format!("---\n{}", serde_yaml::to_string(change)?),
        OutputFormat::Plain => format!("{} {}", change.key, describe(&change.current.state)),
        OutputFormat::Table => change_line(change, painter),
    };
    println!("{line}");
    Ok(())
}

fn change_line(change: &Change, painter: Painter) -> String {
    let time = change.current.updated_at.format("%H:%M:%S%.3f").to_string();
    let current = describe(&change.current.state);
    let transition = match change.previous {
        Some(ref prev) => format!("{} → {}", painter.dim(&describe(&prev.state)), current),
        None => current,
    };
    format!(
        "{} {:<24} {} {}",
        painter.dim(&time),
        painter.key(&change.key.to_string()),
        transition,
        painter.dim(&format!("({})", change.current.source)),
    )
}

fn print_notice(notice: &StreamNotice, global: &GlobalOpts, painter: Painter) {
    if global.quiet {
        return;
    }
    let line = match notice {
        StreamNotice::Connected => painter.good("● event stream connected"),
        StreamNotice::Disconnected => painter.bad("○ event stream disconnected"),
        StreamNotice::Reconnecting { attempt, delay } => painter.warn(&format!(
            "◌ reconnecting (attempt {attempt}, in {})",
            humantime::format_duration(Duration::from_millis(
                u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
            ))
        )),
        StreamNotice::Error(e) => painter.bad(&format!("! event stream error: {e}")),
    };
    eprintln!("{line}");
}
