// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `volley status` command implementation.
//!
//! Shows the live session pool next to the aggregate counters from the
//! audit store. Totals carry no chat or user data, so this command is
//! safe to wire into dashboards via `--json`.

use std::io::IsTerminal;
use std::time::Duration;

use serde::Serialize;

use volley_core::{ReportTotals, SessionSnapshot, SessionStateKind, VolleyError};

use crate::App;

/// One pool slot in `--json` output.
#[derive(Debug, Serialize)]
struct SessionLine {
    name: String,
    state: String,
    cooldown_secs: Option<u64>,
    idle_secs: Option<u64>,
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
struct StatusReport {
    sessions: Vec<SessionLine>,
    totals: ReportTotals,
}

/// Run the `volley status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(app: &App, json: bool, plain: bool) -> Result<(), VolleyError> {
    let snapshot = app.pool.snapshot().await;
    let totals = app.dispatcher.totals().await?;

    if json {
        let report = StatusReport {
            sessions: snapshot.iter().map(session_line).collect(),
            totals,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    println!();
    println!("  volley status");
    println!("  {}", "-".repeat(45));
    println!("    Sessions: {}", snapshot.len());
    for slot in &snapshot {
        let name = slot.id.to_string();
        let detail = describe_slot(slot);
        if use_color {
            use colored::Colorize;
            let painted = match slot.state {
                SessionStateKind::Idle => detail.green(),
                SessionStateKind::Busy => detail.normal(),
                SessionStateKind::RateLimited => detail.yellow(),
                SessionStateKind::Dead => detail.red(),
            };
            println!("      {name:<14} {painted}");
        } else {
            println!("      {name:<14} {detail}");
        }
    }
    println!(
        "    Reports:  {} jobs, {} attempts ({} succeeded, {} rate limited, {} not participant, {} errored)",
        totals.jobs,
        totals.attempts,
        totals.succeeded,
        totals.rate_limited,
        totals.not_participant,
        totals.errored
    );
    println!("    Lookups:  {}", totals.lookups);
    println!();
    Ok(())
}

fn session_line(slot: &SessionSnapshot) -> SessionLine {
    SessionLine {
        name: slot.id.to_string(),
        state: slot.state.to_string(),
        cooldown_secs: slot.cooldown_remaining.map(|d| d.as_secs()),
        idle_secs: slot.idle_for.map(|d| d.as_secs()),
    }
}

/// State plus the one duration that matters for it.
fn describe_slot(slot: &SessionSnapshot) -> String {
    match slot.state {
        SessionStateKind::RateLimited => match slot.cooldown_remaining {
            Some(wait) => format!("rate_limited (cooldown {})", format_wait(wait)),
            None => "rate_limited".to_string(),
        },
        SessionStateKind::Idle => match slot.idle_for {
            Some(idle) => format!("idle (for {})", format_wait(idle)),
            None => "idle".to_string(),
        },
        state => state.to_string(),
    }
}

/// Format a wait into a short human-readable string.
fn format_wait(wait: Duration) -> String {
    let secs = wait.as_secs();
    let minutes = secs / 60;
    if minutes > 0 {
        format!("{minutes}m {}s", secs % 60)
    } else {
        format!("{secs}s")
    }
}
