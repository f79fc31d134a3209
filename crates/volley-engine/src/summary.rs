// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-job attempt counters.

use volley_core::{JobSummary, OutcomeKind, ReportAttempt, ReportJob};

/// Counters for a finished job.
pub fn summarize(job: &ReportJob) -> JobSummary {
    fold_attempts(job.dispatched.len(), &job.attempts)
}

/// Fold a slice of attempts into counters. `total_dispatched` may exceed
/// the attempt count when the job deadline cut collection short.
pub fn fold_attempts(total_dispatched: usize, attempts: &[ReportAttempt]) -> JobSummary {
    let mut summary = JobSummary {
        total_dispatched,
        ..JobSummary::default()
    };
    for attempt in attempts {
        match attempt.outcome.kind() {
            OutcomeKind::Success => summary.succeeded += 1,
            OutcomeKind::RateLimited => summary.rate_limited += 1,
            OutcomeKind::NotParticipant => summary.not_participant += 1,
            OutcomeKind::RpcError | OutcomeKind::NetworkError => summary.errored += 1,
        }
    }
    summary
}
