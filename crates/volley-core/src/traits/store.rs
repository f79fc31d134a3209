// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit persistence trait.

use async_trait::async_trait;

use crate::error::VolleyError;
use crate::types::{ReportJob, ReportTotals, UserInfoRecord};

/// Durable record of what the engine did.
///
/// Writes happen after the in-memory job state is final; implementations
/// must be idempotent per `(job, session)` pair so a replayed write cannot
/// double-count an attempt.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist a finished job and all of its attempts.
    async fn record_report(&self, job: &ReportJob) -> Result<(), VolleyError>;

    /// Persist the result of a user lookup.
    async fn record_user_info(&self, record: &UserInfoRecord) -> Result<(), VolleyError>;

    /// Aggregate counters over everything recorded so far.
    async fn report_totals(&self) -> Result<ReportTotals, VolleyError>;
}
