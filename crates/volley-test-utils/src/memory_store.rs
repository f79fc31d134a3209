// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory audit store for tests that do not need SQLite.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use volley_core::{AuditStore, OutcomeKind, ReportJob, ReportTotals, UserInfoRecord, VolleyError};

/// An `AuditStore` backed by plain vectors.
///
/// Records everything it is handed and counts write calls, so tests can
/// assert that denied operations never wrote a row. Writes can be made
/// to fail for exercising persistence error paths.
#[derive(Default)]
pub struct MemoryAuditStore {
    jobs: Mutex<Vec<ReportJob>>,
    users: Mutex<Vec<UserInfoRecord>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Number of write calls taken, failed ones included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of every recorded job.
    pub async fn jobs(&self) -> Vec<ReportJob> {
        self.jobs.lock().await.clone()
    }

    /// Copy of every recorded lookup.
    pub async fn users(&self) -> Vec<UserInfoRecord> {
        self.users.lock().await.clone()
    }

    fn check_writable(&self) -> Result<(), VolleyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(VolleyError::Storage {
                source: "scripted storage failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn record_report(&self, job: &ReportJob) -> Result<(), VolleyError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.jobs.lock().await.push(job.clone());
        Ok(())
    }

    async fn record_user_info(&self, record: &UserInfoRecord) -> Result<(), VolleyError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.users.lock().await.push(record.clone());
        Ok(())
    }

    async fn report_totals(&self) -> Result<ReportTotals, VolleyError> {
        let jobs = self.jobs.lock().await;
        let users = self.users.lock().await;

        let mut totals = ReportTotals {
            jobs: jobs.len() as u64,
            lookups: users.len() as u64,
            ..ReportTotals::default()
        };
        for job in jobs.iter() {
            for attempt in &job.attempts {
                totals.attempts += 1;
                match attempt.outcome.kind() {
                    OutcomeKind::Success => totals.succeeded += 1,
                    OutcomeKind::NotParticipant => totals.not_participant += 1,
                    OutcomeKind::RateLimited => totals.rate_limited += 1,
                    OutcomeKind::RpcError | OutcomeKind::NetworkError => totals.errored += 1,
                }
            }
        }
        Ok(totals)
    }
}
