// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Volley workspace.

use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::PlatformError;
use crate::handle::ChatHandle;

/// Unique identifier for a platform session, taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric identity of whoever issued a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequesterId(pub i64);

impl std::fmt::Display for RequesterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a report job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Credentials for one platform session. The token is opaque to the engine
/// and must never appear in logs or error messages.
pub struct SessionCredential {
    pub name: String,
    pub token: SecretString,
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("name", &self.name)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Reportable session state, as seen from the outside.
///
/// The pool tracks richer per-slot state internally; this is the flattened
/// view exposed through [`SessionSnapshot`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum SessionStateKind {
    Idle,
    Busy,
    RateLimited,
    Dead,
}

/// Point-in-time view of one pooled session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub state: SessionStateKind,
    /// Remaining cooldown, when the session is rate limited.
    pub cooldown_remaining: Option<Duration>,
    /// Time since the session last finished a call, when known.
    pub idle_for: Option<Duration>,
}

/// Terminal outcome of a single session's attempt at a report action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The platform accepted the report call.
    Success,
    /// The session is not a member of the target chat.
    NotParticipant,
    /// The platform imposed a cooldown before the call went through.
    RateLimited { retry_after: Option<Duration> },
    /// Any other RPC-level rejection, identified by its error code.
    RpcError { code: String },
    /// Transport failure that persisted through retries.
    NetworkError,
}

/// Fieldless mirror of [`AttemptOutcome`], used as a storage and counter key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum OutcomeKind {
    Success,
    NotParticipant,
    RateLimited,
    RpcError,
    NetworkError,
}

impl AttemptOutcome {
    /// Classify a platform error into the outcome recorded for the attempt.
    pub fn from_platform(err: &PlatformError) -> Self {
        match err {
            PlatformError::FloodWait { retry_after } => AttemptOutcome::RateLimited {
                retry_after: *retry_after,
            },
            PlatformError::NotParticipant => AttemptOutcome::NotParticipant,
            PlatformError::NotFound => AttemptOutcome::RpcError {
                code: "NOT_FOUND".into(),
            },
            PlatformError::AuthRevoked => AttemptOutcome::RpcError {
                code: "AUTH_REVOKED".into(),
            },
            PlatformError::Rpc { code, .. } => AttemptOutcome::RpcError { code: code.clone() },
            PlatformError::Network { .. } => AttemptOutcome::NetworkError,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            AttemptOutcome::Success => OutcomeKind::Success,
            AttemptOutcome::NotParticipant => OutcomeKind::NotParticipant,
            AttemptOutcome::RateLimited { .. } => OutcomeKind::RateLimited,
            AttemptOutcome::RpcError { .. } => OutcomeKind::RpcError,
            AttemptOutcome::NetworkError => OutcomeKind::NetworkError,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

/// How a finished platform call looked from the pool's perspective.
///
/// This drives slot state on release and is deliberately coarser than
/// [`AttemptOutcome`]: a call that reached the platform and got a domain
/// answer (even "not found") leaves the session healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedOutcome {
    Succeeded,
    RateLimited { retry_after: Option<Duration> },
    AuthRevoked,
    Errored,
}

impl ObservedOutcome {
    pub fn from_call<T>(result: &Result<T, PlatformError>) -> Self {
        match result {
            Ok(_) => ObservedOutcome::Succeeded,
            Err(PlatformError::NotParticipant) | Err(PlatformError::NotFound) => {
                ObservedOutcome::Succeeded
            }
            Err(PlatformError::FloodWait { retry_after }) => ObservedOutcome::RateLimited {
                retry_after: *retry_after,
            },
            Err(PlatformError::AuthRevoked) => ObservedOutcome::AuthRevoked,
            Err(PlatformError::Rpc { .. }) | Err(PlatformError::Network { .. }) => {
                ObservedOutcome::Errored
            }
        }
    }
}

/// One session's recorded attempt within a report job.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportAttempt {
    pub session_id: SessionId,
    pub outcome: AttemptOutcome,
    pub recorded_at: DateTime<Utc>,
}

/// Lifecycle state of a report job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    PartiallyFailed,
}

/// A fan-out report job and everything recorded about it.
#[derive(Debug, Clone)]
pub struct ReportJob {
    pub id: JobId,
    pub chat: ChatHandle,
    pub requester: RequesterId,
    pub created_at: DateTime<Utc>,
    pub status: JobStatus,
    /// Sessions the job was handed to, in dispatch order.
    pub dispatched: Vec<SessionId>,
    /// Attempts in completion order, at most one per dispatched session.
    pub attempts: Vec<ReportAttempt>,
}

/// Per-job counters derived from its attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub total_dispatched: usize,
    pub succeeded: usize,
    pub rate_limited: usize,
    pub not_participant: usize,
    pub errored: usize,
}

/// Profile data fetched for a lookup target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfoRecord {
    pub remote_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_bot: bool,
    pub dc_id: Option<u32>,
    pub account_created_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

/// Aggregate counters over everything the audit store has recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportTotals {
    /// All report attempts ever recorded.
    pub attempts: u64,
    /// Distinct report jobs those attempts belong to.
    pub jobs: u64,
    pub succeeded: u64,
    pub rate_limited: u64,
    pub not_participant: u64,
    pub errored: u64,
    /// User lookups persisted.
    pub lookups: u64,
}
