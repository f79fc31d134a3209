// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Action dispatch.
//!
//! The dispatcher is the only entry point for privileged operations. Each
//! operation runs the same shape: authorize, validate input, lease sessions
//! from the pool, call the platform, release, record.
//!
//! Fan-out jobs spawn one detached task per leased session and collect
//! results over a channel. Detached on purpose: a call that outlives the
//! job deadline must still finish and put its session back, even though
//! the job stopped waiting for it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use volley_core::{
    AttemptOutcome, AuditStore, ChatHandle, JobId, JobStatus, JobSummary, ObservedOutcome,
    PlatformError, PlatformSession, ReportAttempt, ReportJob, ReportTotals, RequesterId,
    UserInfoRecord, VolleyError,
};

use crate::access::{AccessGate, Action};
use crate::pool::{SessionLease, SessionPool};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::summary;

/// Surfaced when a flood-waited lookup cannot be retried and the platform
/// never said how long to wait.
const FALLBACK_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Tunable dispatch behavior, taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Hard ceiling on a fan-out job's wall-clock time.
    pub job_deadline: Duration,
    /// How long single-session operations wait for a free session.
    pub acquire_timeout: Duration,
    /// How long a lookup waits for a different session after a flood wait.
    pub lookup_retry_wait: Duration,
    /// Upper bound on sessions drafted into one fan-out job.
    pub max_fanout: usize,
    pub retry: RetryPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            job_deadline: Duration::from_secs(60),
            acquire_timeout: Duration::from_secs(10),
            lookup_retry_wait: Duration::from_secs(5),
            max_fanout: 64,
            retry: RetryPolicy::default(),
        }
    }
}

/// The call a fan-out job makes from every leased session.
enum FanOutCall {
    Report(ChatHandle),
    SelfMessage(String),
}

impl FanOutCall {
    async fn invoke(&self, session: &dyn PlatformSession) -> Result<(), PlatformError> {
        match self {
            FanOutCall::Report(chat) => session.report_chat(chat).await,
            FanOutCall::SelfMessage(text) => session.send_self_message(text).await,
        }
    }
}

/// Executes privileged operations against the session pool.
pub struct ActionDispatcher {
    pool: Arc<SessionPool>,
    store: Arc<dyn AuditStore>,
    gate: AccessGate,
    config: DispatchConfig,
}

impl ActionDispatcher {
    pub fn new(
        pool: Arc<SessionPool>,
        store: Arc<dyn AuditStore>,
        gate: AccessGate,
        config: DispatchConfig,
    ) -> Self {
        Self {
            pool,
            store,
            gate,
            config,
        }
    }

    /// Report a chat from every currently idle session.
    ///
    /// Returns the finished job: `Completed` when every dispatched session
    /// produced an attempt and at least one succeeded, `PartiallyFailed`
    /// otherwise (including deadline cuts with successes already in hand).
    pub async fn dispatch_report(
        &self,
        requester: RequesterId,
        raw_target: &str,
    ) -> Result<ReportJob, VolleyError> {
        self.gate.authorize(requester, Action::Report)?;
        let chat = ChatHandle::parse(raw_target)?;

        let leases = self.pool.acquire_all_idle(self.config.max_fanout).await;
        if leases.is_empty() {
            return Err(VolleyError::SessionUnavailable {
                waited: Duration::ZERO,
            });
        }

        let mut job = ReportJob {
            id: JobId::new(),
            chat: chat.clone(),
            requester,
            created_at: Utc::now(),
            status: JobStatus::InProgress,
            dispatched: leases.iter().map(|lease| lease.id.clone()).collect(),
            attempts: Vec::new(),
        };
        let expected = leases.len();
        info!(
            job_id = %job.id,
            chat = %job.chat,
            sessions = expected,
            "dispatching report job"
        );

        job.attempts = self.run_fan_out(leases, FanOutCall::Report(chat)).await;

        let succeeded = job.attempts.iter().any(|a| a.outcome.is_success());
        job.status = if job.attempts.len() == expected && succeeded {
            JobStatus::Completed
        } else {
            JobStatus::PartiallyFailed
        };

        let counts = summary::summarize(&job);
        info!(
            job_id = %job.id,
            status = %job.status,
            succeeded = counts.succeeded,
            rate_limited = counts.rate_limited,
            not_participant = counts.not_participant,
            errored = counts.errored,
            "report job finished"
        );

        if let Err(err) = self.store.record_report(&job).await {
            error!(job_id = %job.id, error = %err, "failed to persist report job");
            return Err(err);
        }
        Ok(job)
    }

    /// Fetch profile data for a user through one leased session.
    ///
    /// A flood-waited lookup is retried once on a different session; if
    /// none frees up in time, the platform's cooldown is surfaced.
    pub async fn dispatch_lookup(
        &self,
        requester: RequesterId,
        query: &str,
    ) -> Result<UserInfoRecord, VolleyError> {
        self.gate.authorize(requester, Action::Lookup)?;
        let query = query.trim();
        if query.is_empty() {
            return Err(VolleyError::InvalidInput(
                "lookup target must not be empty".into(),
            ));
        }

        let lease = self.pool.acquire(self.config.acquire_timeout).await?;
        let first_id = lease.id.clone();
        let session = Arc::clone(&lease.session);
        let result = session.resolve_user(query).await;
        self.pool
            .release(lease, ObservedOutcome::from_call(&result))
            .await;

        match result {
            Ok(record) => self.persist_lookup(record).await,
            Err(PlatformError::FloodWait { retry_after }) => {
                debug!(
                    session_id = %first_id,
                    "lookup flood-waited, retrying on another session"
                );
                let retry = self
                    .pool
                    .acquire_where(self.config.lookup_retry_wait, |id| *id != first_id)
                    .await;
                match retry {
                    Ok(lease) => {
                        let session = Arc::clone(&lease.session);
                        let result = session.resolve_user(query).await;
                        self.pool
                            .release(lease, ObservedOutcome::from_call(&result))
                            .await;
                        match result {
                            Ok(record) => self.persist_lookup(record).await,
                            Err(err) => Err(err.into()),
                        }
                    }
                    Err(_) => Err(VolleyError::RateLimited {
                        retry_after: retry_after.unwrap_or(FALLBACK_RETRY_AFTER),
                    }),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Record a resolved profile. A failed write is logged, not returned:
    /// the caller still gets the record it asked for.
    async fn persist_lookup(&self, record: UserInfoRecord) -> Result<UserInfoRecord, VolleyError> {
        if let Err(err) = self.store.record_user_info(&record).await {
            error!(remote_id = record.remote_id, error = %err, "failed to persist lookup");
        }
        Ok(record)
    }

    /// Send a message from every currently idle session to its own
    /// saved-messages chat. Nothing is persisted; the caller gets counters.
    pub async fn dispatch_broadcast(
        &self,
        requester: RequesterId,
        text: &str,
    ) -> Result<JobSummary, VolleyError> {
        self.gate.authorize(requester, Action::Broadcast)?;
        if text.trim().is_empty() {
            return Err(VolleyError::InvalidInput(
                "broadcast message must not be empty".into(),
            ));
        }

        let leases = self.pool.acquire_all_idle(self.config.max_fanout).await;
        if leases.is_empty() {
            return Err(VolleyError::SessionUnavailable {
                waited: Duration::ZERO,
            });
        }
        let expected = leases.len();
        info!(sessions = expected, "broadcasting to session saved messages");

        let attempts = self
            .run_fan_out(leases, FanOutCall::SelfMessage(text.to_string()))
            .await;
        Ok(summary::fold_attempts(expected, &attempts))
    }

    /// Aggregate counters over everything recorded. Not gated: totals
    /// contain no chat or user data.
    pub async fn totals(&self) -> Result<ReportTotals, VolleyError> {
        self.store.report_totals().await
    }

    /// Run `call` from every leased session and collect attempts in
    /// completion order, stopping at the job deadline.
    async fn run_fan_out(
        &self,
        leases: Vec<SessionLease>,
        call: FanOutCall,
    ) -> Vec<ReportAttempt> {
        let expected = leases.len();
        let call = Arc::new(call);
        let (tx, mut rx) = mpsc::channel(expected);

        for lease in leases {
            let call = Arc::clone(&call);
            let pool = Arc::clone(&self.pool);
            let policy = self.config.retry;
            let tx = tx.clone();
            tokio::spawn(async move {
                let session = Arc::clone(&lease.session);
                let session_id = lease.id.clone();
                let result = run_attempt(session.as_ref(), &call, policy).await;
                pool.release(lease, ObservedOutcome::from_call(&result)).await;
                let outcome = match result {
                    Ok(()) => AttemptOutcome::Success,
                    Err(err) => AttemptOutcome::from_platform(&err),
                };
                // The collector may be gone already; the release above
                // is what matters for a late finisher.
                let _ = tx
                    .send(ReportAttempt {
                        session_id,
                        outcome,
                        recorded_at: Utc::now(),
                    })
                    .await;
            });
        }
        drop(tx);

        let mut attempts = Vec::with_capacity(expected);
        let deadline = tokio::time::sleep(self.config.job_deadline);
        tokio::pin!(deadline);
        while attempts.len() < expected {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(attempt) => attempts.push(attempt),
                    None => break,
                },
                _ = &mut deadline => {
                    warn!(
                        received = attempts.len(),
                        expected,
                        "job deadline hit with calls outstanding"
                    );
                    break;
                }
            }
        }
        attempts
    }
}

/// One session's full attempt: the platform call plus bounded in-place
/// retries for network failures.
async fn run_attempt(
    session: &dyn PlatformSession,
    call: &FanOutCall,
    policy: RetryPolicy,
) -> Result<(), PlatformError> {
    let mut attempt = 0;
    loop {
        match call.invoke(session).await {
            Ok(()) => return Ok(()),
            Err(err) => match policy.decide(&err, attempt) {
                RetryDecision::Retry { after } => {
                    debug!(
                        session_id = %session.id(),
                        attempt,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(after).await;
                    attempt += 1;
                }
                RetryDecision::Record => return Err(err),
            },
        }
    }
}
