// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session pool with leased checkout.
//!
//! The pool owns every connected platform session and hands them out as
//! [`SessionLease`]s, one outstanding lease per session. Callers must give
//! the lease back through [`SessionPool::release`] together with how the
//! call went; the pool folds that into the session's lifecycle state.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{info, warn};

use volley_core::{
    ObservedOutcome, PlatformError, PlatformSession, SessionConnector, SessionCredential,
    SessionId, SessionSnapshot, SessionStateKind, VolleyError,
};

use crate::limiter::RateLimiter;

/// Lifecycle state of one pooled session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Idle,
    Busy,
    RateLimited { until: Instant },
    Dead,
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SlotState::Idle => "idle",
            SlotState::Busy => "busy",
            SlotState::RateLimited { .. } => "rate_limited",
            SlotState::Dead => "dead",
        };
        write!(f, "{s}")
    }
}

struct Slot {
    session: Arc<dyn PlatformSession>,
    state: SlotState,
    last_used_at: Option<Instant>,
}

impl Slot {
    /// Lapse an expired cooldown so acquisition scans see the slot as idle.
    fn expire_cooldown(&mut self, now: Instant) {
        if let SlotState::RateLimited { until } = self.state {
            if until <= now {
                // Transition: RateLimited -> Idle
                self.state = SlotState::Idle;
            }
        }
    }
}

/// Exclusive checkout of one session.
///
/// Holding a lease is the only way to call a pooled session. The lease is
/// consumed by [`SessionPool::release`].
pub struct SessionLease {
    index: usize,
    pub id: SessionId,
    pub session: Arc<dyn PlatformSession>,
}

/// All connected sessions plus their rate-limit bookkeeping.
pub struct SessionPool {
    slots: Mutex<Vec<Slot>>,
    limiter: RateLimiter,
    notify: Notify,
}

impl SessionPool {
    /// Connect every credential and pool the sessions that made it.
    ///
    /// Connections run concurrently and independently; a credential that
    /// fails to authenticate is reported back but never blocks the rest.
    pub async fn connect_all(
        connector: &dyn SessionConnector,
        credentials: &[SessionCredential],
        limiter: RateLimiter,
    ) -> (Self, Vec<(String, PlatformError)>) {
        let connects = credentials.iter().map(|credential| async move {
            (credential.name.clone(), connector.connect(credential).await)
        });

        let mut slots = Vec::new();
        let mut failures = Vec::new();
        for (name, result) in join_all(connects).await {
            match result {
                Ok(session) => {
                    info!(session_id = %session.id(), "session connected");
                    slots.push(Slot {
                        session,
                        state: SlotState::Idle,
                        last_used_at: None,
                    });
                }
                Err(err) => {
                    warn!(session_id = name.as_str(), error = %err, "session failed to connect");
                    failures.push((name, err));
                }
            }
        }

        let pool = Self {
            slots: Mutex::new(slots),
            limiter,
            notify: Notify::new(),
        };
        (pool, failures)
    }

    /// Number of sessions in the pool, in any state.
    pub async fn session_count(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Wait up to `timeout` for any eligible idle session.
    pub async fn acquire(&self, timeout: Duration) -> Result<SessionLease, VolleyError> {
        self.acquire_where(timeout, |_| true).await
    }

    /// Wait up to `timeout` for an idle session matching `eligible`.
    pub async fn acquire_where(
        &self,
        timeout: Duration,
        eligible: impl Fn(&SessionId) -> bool,
    ) -> Result<SessionLease, VolleyError> {
        let started = Instant::now();
        let deadline = started + timeout;
        loop {
            if let Some(lease) = self.try_acquire(&eligible).await {
                return Ok(lease);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(VolleyError::SessionUnavailable {
                    waited: now - started,
                });
            }
            // Wake on a release, or when the nearest cooldown can expire.
            let wake_at = match self.nearest_cooldown_end().await {
                Some(end) => end.min(deadline),
                None => deadline,
            };
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    /// Take every currently idle, dispatchable session, up to `ceiling`.
    ///
    /// Non-blocking by design: fan-out works with whatever is free at the
    /// moment of the call.
    pub async fn acquire_all_idle(&self, ceiling: usize) -> Vec<SessionLease> {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();
        let mut leases = Vec::new();
        for (index, slot) in slots.iter_mut().enumerate() {
            if leases.len() >= ceiling {
                break;
            }
            slot.expire_cooldown(now);
            if slot.state != SlotState::Idle {
                continue;
            }
            let id = slot.session.id().clone();
            if !self.limiter.may_dispatch(&id).await {
                continue;
            }
            // Transition: Idle -> Busy
            slot.state = SlotState::Busy;
            leases.push(SessionLease {
                index,
                id,
                session: Arc::clone(&slot.session),
            });
        }
        leases
    }

    /// End of the soonest active cooldown, if any session is cooling down.
    async fn nearest_cooldown_end(&self) -> Option<Instant> {
        let slots = self.slots.lock().await;
        slots
            .iter()
            .filter_map(|slot| match slot.state {
                SlotState::RateLimited { until } => Some(until),
                _ => None,
            })
            .min()
    }

    async fn try_acquire(
        &self,
        eligible: &impl Fn(&SessionId) -> bool,
    ) -> Option<SessionLease> {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();
        for (index, slot) in slots.iter_mut().enumerate() {
            slot.expire_cooldown(now);
            if slot.state != SlotState::Idle {
                continue;
            }
            let id = slot.session.id().clone();
            if !eligible(&id) || !self.limiter.may_dispatch(&id).await {
                continue;
            }
            // Transition: Idle -> Busy
            slot.state = SlotState::Busy;
            return Some(SessionLease {
                index,
                id,
                session: Arc::clone(&slot.session),
            });
        }
        None
    }

    /// Return a lease, folding the call's outcome into the slot state.
    pub async fn release(&self, lease: SessionLease, observed: ObservedOutcome) {
        {
            let mut slots = self.slots.lock().await;
            let Some(slot) = slots.get_mut(lease.index) else {
                return;
            };
            slot.last_used_at = Some(Instant::now());
            match observed {
                ObservedOutcome::Succeeded => {
                    self.limiter.record_success(&lease.id).await;
                    // Transition: Busy -> Idle
                    slot.state = SlotState::Idle;
                }
                ObservedOutcome::RateLimited { retry_after } => {
                    let until = self.limiter.record_rate_limited(&lease.id, retry_after).await;
                    // Transition: Busy -> RateLimited
                    slot.state = SlotState::RateLimited { until };
                }
                ObservedOutcome::AuthRevoked => {
                    warn!(
                        session_id = %lease.id,
                        "session authorization revoked, removing from rotation"
                    );
                    // Transition: Busy -> Dead
                    slot.state = SlotState::Dead;
                }
                ObservedOutcome::Errored => {
                    // Transition: Busy -> Idle
                    slot.state = SlotState::Idle;
                }
            }
        }
        self.notify.notify_waiters();
    }

    /// Point-in-time view of every slot.
    pub async fn snapshot(&self) -> Vec<SessionSnapshot> {
        let slots = self.slots.lock().await;
        let now = Instant::now();
        let mut out = Vec::with_capacity(slots.len());
        for slot in slots.iter() {
            let (state, cooldown_remaining) = match slot.state {
                SlotState::Idle => (SessionStateKind::Idle, None),
                SlotState::Busy => (SessionStateKind::Busy, None),
                SlotState::RateLimited { until } if until > now => {
                    (SessionStateKind::RateLimited, Some(until - now))
                }
                // Expired cooldowns read as idle even before the next acquire.
                SlotState::RateLimited { .. } => (SessionStateKind::Idle, None),
                SlotState::Dead => (SessionStateKind::Dead, None),
            };
            let idle_for = match state {
                SessionStateKind::Idle => slot.last_used_at.map(|at| now - at),
                _ => None,
            };
            out.push(SessionSnapshot {
                id: slot.session.id().clone(),
                state,
                cooldown_remaining,
                idle_for,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use volley_test_utils::ScriptedConnector;

    fn credentials(names: &[&str]) -> Vec<SessionCredential> {
        names
            .iter()
            .map(|name| SessionCredential {
                name: name.to_string(),
                token: format!("token-{name}").into(),
            })
            .collect()
    }

    async fn pool_of(names: &[&str]) -> SessionPool {
        let connector = ScriptedConnector::healthy();
        let (pool, failures) = SessionPool::connect_all(
            &connector,
            &credentials(names),
            RateLimiter::new(Duration::from_secs(60)),
        )
        .await;
        assert!(failures.is_empty());
        pool
    }

    #[test]
    fn slot_state_display() {
        assert_eq!(SlotState::Idle.to_string(), "idle");
        assert_eq!(SlotState::Busy.to_string(), "busy");
        assert_eq!(
            SlotState::RateLimited {
                until: Instant::now()
            }
            .to_string(),
            "rate_limited"
        );
        assert_eq!(SlotState::Dead.to_string(), "dead");
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_all_idle_takes_each_session_once() {
        let pool = pool_of(&["a", "b", "c"]).await;

        let leases = pool.acquire_all_idle(16).await;
        assert_eq!(leases.len(), 3);

        let mut ids: Vec<String> = leases.iter().map(|l| l.id.0.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);

        // Everything is checked out now.
        assert!(pool.acquire_all_idle(16).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_all_idle_honors_ceiling() {
        let pool = pool_of(&["a", "b", "c"]).await;
        let leases = pool.acquire_all_idle(2).await;
        assert_eq!(leases.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn release_success_makes_session_reacquirable() {
        let pool = pool_of(&["a"]).await;

        let lease = pool.acquire(Duration::from_secs(1)).await.unwrap();
        pool.release(lease, ObservedOutcome::Succeeded).await;

        let again = pool.acquire(Duration::from_secs(1)).await;
        assert!(again.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_session_excluded_until_cooldown_passes() {
        let pool = pool_of(&["a"]).await;

        let lease = pool.acquire(Duration::from_secs(1)).await.unwrap();
        pool.release(
            lease,
            ObservedOutcome::RateLimited {
                retry_after: Some(Duration::from_secs(120)),
            },
        )
        .await;

        let denied = pool.acquire(Duration::from_secs(1)).await;
        assert!(matches!(
            denied,
            Err(VolleyError::SessionUnavailable { .. })
        ));

        tokio::time::advance(Duration::from_secs(121)).await;
        let granted = pool.acquire(Duration::from_secs(1)).await;
        assert!(granted.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_wakes_when_cooldown_expires_mid_wait() {
        let pool = pool_of(&["a"]).await;

        let lease = pool.acquire(Duration::from_secs(1)).await.unwrap();
        pool.release(
            lease,
            ObservedOutcome::RateLimited {
                retry_after: Some(Duration::from_secs(30)),
            },
        )
        .await;

        // The wait window covers the cooldown, so this must succeed
        // shortly after the 30s mark rather than erroring at 60s.
        let started = Instant::now();
        let lease = pool.acquire(Duration::from_secs(60)).await.unwrap();
        assert!(Instant::now() - started >= Duration::from_secs(30));
        assert_eq!(lease.id.as_str(), "a");
    }

    #[tokio::test(start_paused = true)]
    async fn dead_session_never_comes_back() {
        let pool = pool_of(&["a"]).await;

        let lease = pool.acquire(Duration::from_secs(1)).await.unwrap();
        pool.release(lease, ObservedOutcome::AuthRevoked).await;

        tokio::time::advance(Duration::from_secs(3600)).await;
        let denied = pool.acquire(Duration::from_secs(1)).await;
        assert!(matches!(
            denied,
            Err(VolleyError::SessionUnavailable { .. })
        ));

        let snapshot = pool.snapshot().await;
        assert_eq!(snapshot[0].state, SessionStateKind::Dead);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_where_skips_excluded_session() {
        let pool = pool_of(&["a", "b"]).await;

        let excluded = SessionId("a".to_string());
        let lease = pool
            .acquire_where(Duration::from_secs(1), |id| *id != excluded)
            .await
            .unwrap();
        assert_eq!(lease.id.as_str(), "b");
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_where_times_out_when_only_excluded_session_is_free() {
        let pool = pool_of(&["a"]).await;

        let excluded = SessionId("a".to_string());
        let denied = pool
            .acquire_where(Duration::from_secs(2), |id| *id != excluded)
            .await;
        assert!(matches!(
            denied,
            Err(VolleyError::SessionUnavailable { waited }) if waited >= Duration::from_secs(2)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connects_are_reported_not_pooled() {
        let connector = ScriptedConnector::failing_for(&["b"]);
        let (pool, failures) = SessionPool::connect_all(
            &connector,
            &credentials(&["a", "b", "c"]),
            RateLimiter::new(Duration::from_secs(60)),
        )
        .await;

        assert_eq!(pool.session_count().await, 2);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_reflects_states_and_cooldowns() {
        let pool = pool_of(&["a", "b"]).await;

        let leases = pool.acquire_all_idle(2).await;
        let mut leases = leases.into_iter();
        let first = leases.next().unwrap();
        let second = leases.next().unwrap();

        pool.release(first, ObservedOutcome::Succeeded).await;
        pool.release(
            second,
            ObservedOutcome::RateLimited {
                retry_after: Some(Duration::from_secs(45)),
            },
        )
        .await;

        let snapshot = pool.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].state, SessionStateKind::Idle);
        assert!(snapshot[0].idle_for.is_some());
        assert_eq!(snapshot[1].state, SessionStateKind::RateLimited);
        assert_eq!(
            snapshot[1].cooldown_remaining,
            Some(Duration::from_secs(45))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn leased_session_takes_calls() {
        let pool = pool_of(&["a"]).await;
        let lease = pool.acquire(Duration::from_secs(1)).await.unwrap();

        let chat = volley_core::ChatHandle::parse("@somewhere").unwrap();
        let result = lease.session.report_chat(&chat).await;
        assert!(result.is_ok());

        pool.release(lease, ObservedOutcome::from_call(&result)).await;
    }
}
