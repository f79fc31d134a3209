// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Volley dispatch engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Volley workspace. The engine, storage,
//! and platform crates all meet through the vocabulary defined here.

pub mod error;
pub mod handle;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{PlatformError, VolleyError};
pub use handle::ChatHandle;
pub use types::{
    AttemptOutcome, JobId, JobStatus, JobSummary, ObservedOutcome, OutcomeKind, ReportAttempt,
    ReportJob, ReportTotals, RequesterId, SessionCredential, SessionId, SessionSnapshot,
    SessionStateKind, UserInfoRecord,
};

// Re-export the seam traits at crate root.
pub use traits::{AuditStore, PlatformSession, SessionConnector};
