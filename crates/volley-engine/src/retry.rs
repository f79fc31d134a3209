// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry policy for transient platform failures.
//!
//! Only network-level failures are retried, on the same session, with
//! exponential backoff. Everything else the platform says is an answer,
//! not a fault, and is recorded as-is.

use std::time::Duration;

use volley_core::PlatformError;

/// Delays stop doubling past this many retries.
const MAX_BACKOFF_DOUBLINGS: u32 = 6;

/// Bounded same-session retry for network failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total call attempts before a network failure becomes terminal.
    pub network_attempts: u32,
    /// Delay before the first retry; doubles each further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            network_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// What to do with a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try the same session again after the delay.
    Retry { after: Duration },
    /// The failure is terminal for this attempt; record it.
    Record,
}

impl RetryPolicy {
    /// Decide what to do after a failed call. `attempt` is zero-based:
    /// the first call that fails is attempt 0.
    pub fn decide(&self, err: &PlatformError, attempt: u32) -> RetryDecision {
        match err {
            PlatformError::Network { .. } if attempt + 1 < self.network_attempts => {
                RetryDecision::Retry {
                    after: self.backoff(attempt),
                }
            }
            _ => RetryDecision::Record,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << attempt.min(MAX_BACKOFF_DOUBLINGS))
    }
}
