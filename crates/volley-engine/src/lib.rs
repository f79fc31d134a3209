// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Volley dispatch engine.
//!
//! Owns the session pool, per-session rate-limit state, and the dispatch
//! logic for every privileged operation. The engine is platform-agnostic:
//! it sees sessions only through the `volley-core` traits.

pub mod access;
pub mod dispatcher;
pub mod limiter;
pub mod pool;
pub mod retry;
pub mod summary;

pub use access::{Access, AccessGate, Action};
pub use dispatcher::{ActionDispatcher, DispatchConfig};
pub use limiter::RateLimiter;
pub use pool::{SessionLease, SessionPool};
pub use retry::{RetryDecision, RetryPolicy};
