// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the AuditStore trait.

use async_trait::async_trait;

use volley_core::{AuditStore, ReportJob, ReportTotals, UserInfoRecord, VolleyError};

use crate::database::Database;
use crate::queries;

/// SQLite-backed audit store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
pub struct SqliteAuditStore {
    db: Database,
}

impl SqliteAuditStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The underlying database handle, for health checks and shutdown.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn record_report(&self, job: &ReportJob) -> Result<(), VolleyError> {
        queries::reports::insert_job_attempts(&self.db, job).await
    }

    async fn record_user_info(&self, record: &UserInfoRecord) -> Result<(), VolleyError> {
        queries::user_info::insert_user_info(&self.db, record).await
    }

    async fn report_totals(&self) -> Result<ReportTotals, VolleyError> {
        queries::reports::totals(&self.db).await
    }
}
