// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session rate-limit bookkeeping.
//!
//! The platform answers some calls with an explicit cooldown. The limiter
//! remembers those cooldowns per session, escalates a fallback delay when
//! the platform gives none, and forgets everything on the next success.
//!
//! Expiry is lazy: entries are dropped when consulted past their deadline.
//! There is no background sweeper.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use volley_core::SessionId;

/// Strikes past this stop doubling the fallback delay.
const MAX_BACKOFF_DOUBLINGS: u32 = 6;

#[derive(Debug, Clone, Copy)]
struct Cooldown {
    until: Instant,
    strikes: u32,
}

/// Tracks which sessions are cooling down and until when.
pub struct RateLimiter {
    cooldowns: Mutex<HashMap<SessionId, Cooldown>>,
    fallback: Duration,
}

impl RateLimiter {
    /// `fallback` is the base cooldown applied when the platform rate-limits
    /// without saying for how long. It doubles per consecutive strike.
    pub fn new(fallback: Duration) -> Self {
        Self {
            cooldowns: Mutex::new(HashMap::new()),
            fallback,
        }
    }

    /// Whether the session is clear to take work right now.
    pub async fn may_dispatch(&self, id: &SessionId) -> bool {
        let mut cooldowns = self.cooldowns.lock().await;
        match cooldowns.get(id) {
            None => true,
            Some(cooldown) if cooldown.until <= Instant::now() => {
                cooldowns.remove(id);
                true
            }
            Some(_) => false,
        }
    }

    /// Record a rate-limit answer for the session and return when its
    /// cooldown ends. `retry_after` comes from the platform when it said so.
    pub async fn record_rate_limited(
        &self,
        id: &SessionId,
        retry_after: Option<Duration>,
    ) -> Instant {
        let mut cooldowns = self.cooldowns.lock().await;
        let strikes = cooldowns.get(id).map(|c| c.strikes).unwrap_or(0) + 1;
        let delay = retry_after.unwrap_or_else(|| {
            self.fallback * (1u32 << (strikes - 1).min(MAX_BACKOFF_DOUBLINGS))
        });
        let until = Instant::now() + delay;
        debug!(session_id = id.as_str(), strikes, ?delay, "session cooldown set");
        cooldowns.insert(id.clone(), Cooldown { until, strikes });
        until
    }

    /// A completed call clears the session's cooldown and strike history.
    pub async fn record_success(&self, id: &SessionId) {
        self.cooldowns.lock().await.remove(id);
    }

    /// Remaining cooldown, if one is active.
    pub async fn cooldown_remaining(&self, id: &SessionId) -> Option<Duration> {
        let mut cooldowns = self.cooldowns.lock().await;
        let now = Instant::now();
        match cooldowns.get(id) {
            Some(cooldown) if cooldown.until > now => Some(cooldown.until - now),
            Some(_) => {
                cooldowns.remove(id);
                None
            }
            None => None,
        }
    }
}
