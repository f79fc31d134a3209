// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end dispatch testing.
//!
//! `EngineHarness` assembles a complete dispatch stack: scripted sessions,
//! a connected pool, an in-memory audit store, and the dispatcher itself.

use std::sync::Arc;
use std::time::Duration;

use volley_core::{PlatformError, RequesterId, SessionCredential};
use volley_engine::{AccessGate, ActionDispatcher, DispatchConfig, RateLimiter, SessionPool};

use crate::memory_store::MemoryAuditStore;
use crate::scripted_session::{ScriptedCall, ScriptedConnector, ScriptedSession};

/// Builder for creating dispatch test environments.
pub struct EngineHarnessBuilder {
    sessions: Vec<String>,
    failing: Vec<String>,
    scripts: Vec<(String, Vec<ScriptedCall>)>,
    owner: i64,
    config: DispatchConfig,
    fallback_cooldown: Duration,
}

impl EngineHarnessBuilder {
    fn new() -> Self {
        Self {
            sessions: Vec::new(),
            failing: Vec::new(),
            scripts: Vec::new(),
            owner: 42,
            config: DispatchConfig::default(),
            fallback_cooldown: Duration::from_secs(60),
        }
    }

    /// Name the sessions in the pool roster.
    pub fn with_sessions(mut self, names: &[&str]) -> Self {
        self.sessions = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Pre-load the named session's call script. The name must also be
    /// in the roster given to [`with_sessions`](Self::with_sessions).
    pub fn with_script(mut self, name: &str, script: Vec<ScriptedCall>) -> Self {
        self.scripts.push((name.to_string(), script));
        self
    }

    /// Make the named roster session fail to connect.
    pub fn with_failing_session(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }

    /// Set the owner account id (default 42).
    pub fn with_owner(mut self, id: i64) -> Self {
        self.owner = id;
        self
    }

    /// Override dispatch timing and fan-out limits.
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the cooldown used when the platform rate-limits without a wait.
    pub fn with_fallback_cooldown(mut self, cooldown: Duration) -> Self {
        self.fallback_cooldown = cooldown;
        self
    }

    /// Build the harness, connecting every roster session.
    pub async fn build(self) -> EngineHarness {
        let connector = if self.failing.is_empty() {
            ScriptedConnector::healthy()
        } else {
            let failing: Vec<&str> = self.failing.iter().map(String::as_str).collect();
            ScriptedConnector::failing_for(&failing)
        };
        for (name, script) in self.scripts {
            connector.script_for(&name, script).await;
        }
        let connector = Arc::new(connector);

        let credentials: Vec<SessionCredential> = self
            .sessions
            .iter()
            .map(|name| SessionCredential {
                name: name.clone(),
                token: format!("token-{name}").into(),
            })
            .collect();

        let (pool, connect_failures) = SessionPool::connect_all(
            connector.as_ref(),
            &credentials,
            RateLimiter::new(self.fallback_cooldown),
        )
        .await;
        let pool = Arc::new(pool);

        let store = Arc::new(MemoryAuditStore::new());
        let owner = RequesterId(self.owner);
        let dispatcher = ActionDispatcher::new(
            Arc::clone(&pool),
            store.clone(),
            AccessGate::new(owner),
            self.config,
        );

        EngineHarness {
            dispatcher,
            pool,
            store,
            connector,
            connect_failures,
            owner,
        }
    }
}

/// A complete dispatch environment with scripted sessions and memory storage.
pub struct EngineHarness {
    /// The dispatcher under test.
    pub dispatcher: ActionDispatcher,
    /// The connected session pool.
    pub pool: Arc<SessionPool>,
    /// The in-memory audit store.
    pub store: Arc<MemoryAuditStore>,
    /// The connector, for reaching sessions after connect.
    pub connector: Arc<ScriptedConnector>,
    /// Sessions that failed to connect, by name.
    pub connect_failures: Vec<(String, PlatformError)>,
    owner: RequesterId,
}

impl EngineHarness {
    /// Create a new builder for configuring the harness.
    pub fn builder() -> EngineHarnessBuilder {
        EngineHarnessBuilder::new()
    }

    /// The configured owner id.
    pub fn owner(&self) -> RequesterId {
        self.owner
    }

    /// A requester id that is not the owner.
    pub fn stranger(&self) -> RequesterId {
        RequesterId(self.owner.0 + 1)
    }

    /// The connected session with the given name, if any.
    pub async fn session(&self, name: &str) -> Option<Arc<ScriptedSession>> {
        self.connector.session(name).await
    }
}
