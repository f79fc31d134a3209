// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Volley dispatch engine.

use std::time::Duration;

use thiserror::Error;

/// The primary error type surfaced by engine operations, storage, and the CLI.
#[derive(Debug, Error)]
pub enum VolleyError {
    /// The requester is not the configured owner.
    #[error("access denied for requester {requester}")]
    AccessDenied { requester: i64 },

    /// Input could not be parsed into something dispatchable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No session became available within the acquisition window.
    #[error("no session available after waiting {waited:?}")]
    SessionUnavailable { waited: Duration },

    /// The platform told us to back off.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// The referenced chat or user does not exist.
    #[error("target not found")]
    NotFound,

    /// The acting session is not a member of the target chat.
    #[error("session is not a participant of the target chat")]
    NotParticipant,

    /// Transport-level failure talking to the platform.
    #[error("network error: {message}")]
    Network { message: String },

    /// The platform rejected the call with an RPC error code.
    #[error("rpc error {code}: {message}")]
    Rpc { code: String, message: String },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Advertised to callers when the platform rate-limits without saying
/// for how long.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Error raised by a single platform session call, before the engine
/// classifies it into an attempt outcome.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform imposed a cooldown on the calling session.
    /// `retry_after` is absent when the platform did not say how long.
    #[error("flood wait for {retry_after:?}")]
    FloodWait { retry_after: Option<Duration> },

    /// The session is not a member of the target chat.
    #[error("session is not a participant of the target chat")]
    NotParticipant,

    /// The referenced chat or user does not exist.
    #[error("target not found")]
    NotFound,

    /// The session's authorization is no longer valid.
    #[error("session authorization revoked")]
    AuthRevoked,

    /// Any other RPC-level rejection.
    #[error("rpc error {code}: {message}")]
    Rpc { code: String, message: String },

    /// Transport-level failure (DNS, TLS, connection reset).
    #[error("network error: {message}")]
    Network {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl From<PlatformError> for VolleyError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::FloodWait { retry_after } => VolleyError::RateLimited {
                retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
            },
            PlatformError::NotParticipant => VolleyError::NotParticipant,
            PlatformError::NotFound => VolleyError::NotFound,
            PlatformError::AuthRevoked => VolleyError::Rpc {
                code: "AUTH_REVOKED".into(),
                message: "session authorization revoked".into(),
            },
            PlatformError::Rpc { code, message } => VolleyError::Rpc { code, message },
            PlatformError::Network { message, .. } => VolleyError::Network { message },
        }
    }
}
