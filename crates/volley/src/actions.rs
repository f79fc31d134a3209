// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `volley report`, `volley lookup`, and `volley broadcast` command
//! implementations. Thin wrappers: dispatch through the engine, render
//! the result.

use std::io::IsTerminal;

use volley_core::{
    AttemptOutcome, JobStatus, JobSummary, ReportJob, RequesterId, UserInfoRecord, VolleyError,
};
use volley_engine::summary;

use crate::App;

/// Run the `volley report` command.
pub async fn run_report(
    app: &App,
    requester: RequesterId,
    chat_ref: &str,
    plain: bool,
) -> Result<(), VolleyError> {
    let job = app.dispatcher.dispatch_report(requester, chat_ref).await?;
    let use_color = !plain && std::io::stdout().is_terminal();
    print_job(&job, use_color);
    Ok(())
}

/// Run the `volley lookup` command.
pub async fn run_lookup(
    app: &App,
    requester: RequesterId,
    query: &str,
    json: bool,
) -> Result<(), VolleyError> {
    let record = app.dispatcher.dispatch_lookup(requester, query).await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&record).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        print_record(query, &record);
    }
    Ok(())
}

/// Run the `volley broadcast` command.
pub async fn run_broadcast(
    app: &App,
    requester: RequesterId,
    message: &str,
    plain: bool,
) -> Result<(), VolleyError> {
    let counts = app
        .dispatcher
        .dispatch_broadcast(requester, message)
        .await?;
    let use_color = !plain && std::io::stdout().is_terminal();
    print_broadcast(&counts, use_color);
    Ok(())
}

/// Print a finished report job with optional colors.
fn print_job(job: &ReportJob, use_color: bool) {
    println!();
    println!("  volley report {}", job.chat);
    println!("  {}", "-".repeat(45));

    let status = job.status.to_string();
    if use_color {
        use colored::Colorize;
        let painted = match job.status {
            JobStatus::Completed => status.green(),
            JobStatus::PartiallyFailed => status.yellow(),
            _ => status.normal(),
        };
        println!("    Status:   {painted}");
    } else {
        println!("    Status:   {status}");
    }
    println!(
        "    Sessions: {} dispatched, {} answered",
        job.dispatched.len(),
        job.attempts.len()
    );

    for attempt in &job.attempts {
        let id = attempt.session_id.to_string();
        let line = format!("{id:<14} {}", describe_outcome(&attempt.outcome));
        if use_color {
            use colored::Colorize;
            if attempt.outcome.is_success() {
                println!("      {} {line}", "✓".green());
            } else {
                println!("      {} {line}", "✗".red());
            }
        } else if attempt.outcome.is_success() {
            println!("      [OK]   {line}");
        } else {
            println!("      [FAIL] {line}");
        }
    }

    let counts = summary::summarize(job);
    println!(
        "    Counts:   {} succeeded, {} rate limited, {} not participant, {} errored",
        counts.succeeded, counts.rate_limited, counts.not_participant, counts.errored
    );
    println!();
}

/// Print a resolved profile as text.
fn print_record(query: &str, record: &UserInfoRecord) {
    println!();
    println!("  volley lookup {query}");
    println!("  {}", "-".repeat(45));
    println!("    Id:       {}", record.remote_id);
    println!("    Username: {}", format_username(record));
    println!("    Name:     {}", format_name(record));
    println!("    Bot:      {}", if record.is_bot { "yes" } else { "no" });
    if let Some(dc) = record.dc_id {
        println!("    DC:       {dc}");
    }
    if let Some(created) = record.account_created_at {
        println!("    Created:  {}", created.to_rfc3339());
    }
    println!("    Fetched:  {}", record.fetched_at.to_rfc3339());
    println!();
}

/// Print broadcast counters with optional colors.
fn print_broadcast(counts: &JobSummary, use_color: bool) {
    println!();
    println!("  volley broadcast");
    println!("  {}", "-".repeat(45));

    let line = format!(
        "{} of {} sessions delivered",
        counts.succeeded, counts.total_dispatched
    );
    if use_color {
        use colored::Colorize;
        if counts.succeeded == counts.total_dispatched {
            println!("    Sent:     {}", line.green());
        } else {
            println!("    Sent:     {}", line.yellow());
        }
    } else {
        println!("    Sent:     {line}");
    }
    if counts.rate_limited + counts.errored > 0 {
        println!(
            "    Failed:   {} rate limited, {} errored",
            counts.rate_limited, counts.errored
        );
    }
    println!();
}

/// One human-readable word (or few) per attempt outcome.
fn describe_outcome(outcome: &AttemptOutcome) -> String {
    match outcome {
        AttemptOutcome::Success => "success".to_string(),
        AttemptOutcome::NotParticipant => "not a participant".to_string(),
        AttemptOutcome::RateLimited {
            retry_after: Some(wait),
        } => format!("rate limited ({}s)", wait.as_secs()),
        AttemptOutcome::RateLimited { retry_after: None } => "rate limited".to_string(),
        AttemptOutcome::RpcError { code } => format!("rpc error {code}"),
        AttemptOutcome::NetworkError => "network error".to_string(),
    }
}

/// `@username`, or a dash when the account has none.
fn format_username(record: &UserInfoRecord) -> String {
    match &record.username {
        Some(name) => format!("@{name}"),
        None => "-".to_string(),
    }
}

/// First and last name joined, or a dash when both are missing.
fn format_name(record: &UserInfoRecord) -> String {
    let name = [record.first_name.as_deref(), record.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() {
        "-".to_string()
    } else {
        name
    }
}
