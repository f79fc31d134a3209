// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report attempt persistence.

use chrono::SecondsFormat;
use rusqlite::params;

use volley_core::{AttemptOutcome, OutcomeKind, ReportJob, ReportTotals, VolleyError};

use crate::database::Database;

struct AttemptRow {
    job_id: String,
    session_id: String,
    chat_handle: String,
    requester_id: i64,
    outcome: String,
    detail: Option<String>,
    created_at: String,
}

fn detail_for(outcome: &AttemptOutcome) -> Option<String> {
    match outcome {
        AttemptOutcome::RateLimited { retry_after } => {
            retry_after.map(|d| d.as_secs().to_string())
        }
        AttemptOutcome::RpcError { code } => Some(code.clone()),
        _ => None,
    }
}

/// Insert every attempt of a finished job, one row per session.
///
/// `INSERT OR IGNORE` against the `(job_id, session_id)` unique index makes
/// a replayed write a no-op instead of a double count.
pub async fn insert_job_attempts(db: &Database, job: &ReportJob) -> Result<(), VolleyError> {
    let rows: Vec<AttemptRow> = job
        .attempts
        .iter()
        .map(|attempt| AttemptRow {
            job_id: job.id.to_string(),
            session_id: attempt.session_id.0.clone(),
            chat_handle: job.chat.to_string(),
            requester_id: job.requester.0,
            outcome: attempt.outcome.kind().to_string(),
            detail: detail_for(&attempt.outcome),
            created_at: attempt
                .recorded_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        })
        .collect();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            for row in &rows {
                tx.execute(
                    "INSERT OR IGNORE INTO reports
                         (job_id, session_id, chat_handle, requester_id, outcome, detail, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        row.job_id,
                        row.session_id,
                        row.chat_handle,
                        row.requester_id,
                        row.outcome,
                        row.detail,
                        row.created_at,
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Attempt rows recorded for one job.
pub async fn count_attempts_for_job(db: &Database, job_id: &str) -> Result<i64, VolleyError> {
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM reports WHERE job_id = ?1",
                params![job_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Aggregate counters across all recorded reports and lookups.
pub async fn totals(db: &Database) -> Result<ReportTotals, VolleyError> {
    db.connection()
        .call(|conn| {
            let mut totals = ReportTotals::default();
            {
                let mut stmt =
                    conn.prepare("SELECT outcome, COUNT(*) FROM reports GROUP BY outcome")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;
                for row in rows {
                    let (outcome, count) = row?;
                    let count = count as u64;
                    totals.attempts += count;
                    match outcome.parse::<OutcomeKind>() {
                        Ok(OutcomeKind::Success) => totals.succeeded += count,
                        Ok(OutcomeKind::RateLimited) => totals.rate_limited += count,
                        Ok(OutcomeKind::NotParticipant) => totals.not_participant += count,
                        Ok(OutcomeKind::RpcError) | Ok(OutcomeKind::NetworkError) => {
                            totals.errored += count;
                        }
                        Err(_) => {}
                    }
                }
            }
            totals.jobs = conn.query_row("SELECT COUNT(DISTINCT job_id) FROM reports", [], |row| {
                row.get::<_, i64>(0)
            })? as u64;
            totals.lookups = conn.query_row("SELECT COUNT(*) FROM user_info", [], |row| {
                row.get::<_, i64>(0)
            })? as u64;
            Ok(totals)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use tempfile::tempdir;

    use volley_core::{ChatHandle, JobId, JobStatus, ReportAttempt, RequesterId, SessionId};

    use super::*;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn attempt(session: &str, outcome: AttemptOutcome) -> ReportAttempt {
        ReportAttempt {
            session_id: SessionId(session.to_string()),
            outcome,
            recorded_at: Utc::now(),
        }
    }

    fn make_job(attempts: Vec<ReportAttempt>) -> ReportJob {
        let dispatched = attempts.iter().map(|a| a.session_id.clone()).collect();
        ReportJob {
            id: JobId::new(),
            chat: ChatHandle::parse("@target_chat").unwrap(),
            requester: RequesterId(100),
            created_at: Utc::now(),
            status: JobStatus::Completed,
            dispatched,
            attempts,
        }
    }

    #[tokio::test]
    async fn insert_and_count_attempts() {
        let (db, _dir) = setup_db().await;
        let job = make_job(vec![
            attempt("a", AttemptOutcome::Success),
            attempt("b", AttemptOutcome::NotParticipant),
        ]);

        insert_job_attempts(&db, &job).await.unwrap();
        let count = count_attempts_for_job(&db, &job.id.to_string())
            .await
            .unwrap();
        assert_eq!(count, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn replayed_insert_does_not_double_count() {
        let (db, _dir) = setup_db().await;
        let job = make_job(vec![
            attempt("a", AttemptOutcome::Success),
            attempt("b", AttemptOutcome::NetworkError),
        ]);

        insert_job_attempts(&db, &job).await.unwrap();
        insert_job_attempts(&db, &job).await.unwrap();

        let count = count_attempts_for_job(&db, &job.id.to_string())
            .await
            .unwrap();
        assert_eq!(count, 2);

        let totals = totals(&db).await.unwrap();
        assert_eq!(totals.attempts, 2);
        assert_eq!(totals.jobs, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn totals_fold_outcomes_across_jobs() {
        let (db, _dir) = setup_db().await;

        let first = make_job(vec![
            attempt("a", AttemptOutcome::Success),
            attempt(
                "b",
                AttemptOutcome::RateLimited {
                    retry_after: Some(Duration::from_secs(60)),
                },
            ),
        ]);
        let second = make_job(vec![
            attempt("a", AttemptOutcome::RpcError { code: "X".into() }),
            attempt("b", AttemptOutcome::Success),
        ]);

        insert_job_attempts(&db, &first).await.unwrap();
        insert_job_attempts(&db, &second).await.unwrap();

        let totals = totals(&db).await.unwrap();
        assert_eq!(totals.attempts, 4);
        assert_eq!(totals.jobs, 2);
        assert_eq!(totals.succeeded, 2);
        assert_eq!(totals.rate_limited, 1);
        assert_eq!(totals.errored, 1);
        assert_eq!(totals.not_participant, 0);
        assert_eq!(totals.lookups, 0);

        db.close().await.unwrap();
    }
}
