//! Shared helpers for command handlers.

use std::io::IsTerminal;

use serde::Serialize;

use bodyctl_core::{Command, CommandResult, Controller, CoreError, Position};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, Painter};

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<(), CliError> {
    if yes_flag {
        return Ok(());
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    if confirmed {
        Ok(())
    } else {
        Err(CliError::Aborted)
    }
}

// ── Command outcomes ─────────────────────────────────────────────────

/// Printable result of one write, successful or not.
#[derive(Debug, Serialize)]
pub struct Outcome {
    pub target: String,
    pub action: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    pub fn accepted(
        target: impl Into<String>,
        action: impl Into<String>,
        done: &CommandResult,
    ) -> Self {
        Self {
            target: target.into(),
            action: action.into(),
            ok: true,
            attempts: Some(done.attempts),
            message: done.message.clone(),
            error: None,
        }
    }

    pub fn failed(target: impl Into<String>, action: impl Into<String>, err: &CoreError) -> Self {
        Self {
            target: target.into(),
            action: action.into(),
            ok: false,
            attempts: None,
            message: None,
            error: Some(err.to_string()),
        }
    }

    fn line(&self, painter: Painter) -> String {
        let mark = if self.ok {
            painter.good("✓")
        } else {
            painter.bad("✗")
        };
        let mut line = format!("{mark} {} {}", self.target, self.action);
        if let Some(ref err) = self.error {
            line = format!("{line}: {}", painter.bad(err));
        } else if let Some(ref msg) = self.message {
            line = format!("{line} {}", painter.dim(&format!("({msg})")));
        }
        if let Some(n) = self.attempts.filter(|n| *n > 1) {
            line = format!("{line} {}", painter.warn(&format!("after {n} attempts")));
        }
        line
    }

    fn plain(&self) -> String {
        format!("{} {}", self.target, if self.ok { "ok" } else { "failed" })
    }
}

/// Print one accepted command.
pub fn print_outcome(outcome: &Outcome, global: &GlobalOpts) -> Result<(), CliError> {
    let painter = Painter::new(&global.color);
    let out = output::render_single(&global.output, outcome, |o| o.line(painter), Outcome::plain)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Print a batch of outcomes, failing with `PartialFailure` if any failed.
pub fn print_outcomes(outcomes: &[Outcome], global: &GlobalOpts) -> Result<(), CliError> {
    let painter = Painter::new(&global.color);
    let out = output::render_single(
        &global.output,
        &outcomes,
        |list| {
            list.iter()
                .map(|o| o.line(painter))
                .collect::<Vec<_>>()
                .join("\n")
        },
        |list| list.iter().map(Outcome::plain).collect::<Vec<_>>().join("\n"),
    )?;
    output::print_output(&out, global.quiet);

    let failed = outcomes.iter().filter(|o| !o.ok).count();
    if failed > 0 {
        return Err(CliError::PartialFailure {
            failed,
            total: outcomes.len(),
        });
    }
    Ok(())
}

/// Execute one command and print its outcome. Errors propagate unchanged.
pub async fn run_command(
    controller: &Controller,
    command: Command,
    target: &str,
    action: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let done = controller.execute(command).await?;
    print_outcome(&Outcome::accepted(target, action, &done), global)
}

// ── Status reads ─────────────────────────────────────────────────────

/// Split per-position reads into successes and failures, logging each
/// failure to stderr.
pub fn split_reads<T, E>(
    reads: Vec<(Position, Result<T, E>)>,
    what: &str,
) -> (Vec<T>, Vec<(Position, CoreError)>)
where
    E: Into<CoreError>,
{
    let mut ok = Vec::with_capacity(reads.len());
    let mut failed = Vec::new();
    for (position, result) in reads {
        match result {
            Ok(value) => ok.push(value),
            Err(e) => {
                let e = e.into();
                eprintln!("warning: {what} {position}: {e}");
                failed.push((position, e));
            }
        }
    }
    (ok, failed)
}

/// Turn read failures into the command's result. A single failed read
/// keeps its own error; several become a `PartialFailure`.
pub fn finish_reads(mut failed: Vec<(Position, CoreError)>, total: usize) -> Result<(), CliError> {
    match failed.len() {
        0 => Ok(()),
        1 if total == 1 => Err(failed.remove(0).1.into()),
        n => Err(CliError::PartialFailure { failed: n, total }),
    }
}
