// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted platform sessions for deterministic testing.
//!
//! `ScriptedConnector` implements `SessionConnector` and hands out
//! `ScriptedSession`s whose call answers are popped from a FIFO script,
//! enabling fast, CI-runnable tests without a gateway.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use volley_core::{
    PlatformError, PlatformSession, SessionConnector, SessionCredential, SessionId, UserInfoRecord,
};

/// One scripted answer for a platform call.
#[derive(Debug, Clone)]
pub enum ScriptedCall {
    /// Answer immediately with success.
    Succeed,
    /// Sleep for the given (test-clock) duration, then succeed.
    /// Simulates a call that outlives a job deadline.
    SucceedAfter(Duration),
    /// Answer with a flood wait, optionally naming the cooldown.
    FloodWait(Option<Duration>),
    /// Answer with "not a participant".
    NotParticipant,
    /// Answer with a revoked session.
    AuthRevoked,
    /// Answer with an RPC error carrying the given code.
    Rpc(&'static str),
    /// Answer with a network error.
    NetworkError,
}

impl ScriptedCall {
    async fn play(self) -> Result<(), PlatformError> {
        match self {
            ScriptedCall::Succeed => Ok(()),
            ScriptedCall::SucceedAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            ScriptedCall::FloodWait(retry_after) => Err(PlatformError::FloodWait { retry_after }),
            ScriptedCall::NotParticipant => Err(PlatformError::NotParticipant),
            ScriptedCall::AuthRevoked => Err(PlatformError::AuthRevoked),
            ScriptedCall::Rpc(code) => Err(PlatformError::Rpc {
                code: code.to_string(),
                message: "scripted rpc failure".to_string(),
            }),
            ScriptedCall::NetworkError => Err(PlatformError::Network {
                message: "scripted network failure".to_string(),
                source: None,
            }),
        }
    }
}

/// A platform session that answers calls from a pre-loaded script.
///
/// Answers are popped from a FIFO queue. When the queue is empty,
/// every call succeeds. Every call is counted, so tests can assert
/// that denied operations never touched a session.
pub struct ScriptedSession {
    id: SessionId,
    script: Mutex<VecDeque<ScriptedCall>>,
    calls: AtomicUsize,
}

impl ScriptedSession {
    /// Create a session with an empty script (every call succeeds).
    pub fn new(name: &str) -> Arc<Self> {
        Self::scripted(name, Vec::new())
    }

    /// Create a session pre-loaded with the given answers.
    pub fn scripted(name: &str, script: Vec<ScriptedCall>) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId(name.to_string()),
            script: Mutex::new(VecDeque::from(script)),
            calls: AtomicUsize::new(0),
        })
    }

    /// Add an answer to the end of the script.
    pub async fn push(&self, call: ScriptedCall) {
        self.script.lock().await.push_back(call);
    }

    /// Number of platform calls this session has taken.
    pub fn calls_made(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self) -> Result<(), PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or(ScriptedCall::Succeed);
        step.play().await
    }
}

#[async_trait]
impl PlatformSession for ScriptedSession {
    fn id(&self) -> &SessionId {
        &self.id
    }

    async fn report_chat(
        &self,
        _chat: &volley_core::ChatHandle,
    ) -> Result<(), PlatformError> {
        self.next().await
    }

    async fn resolve_user(&self, query: &str) -> Result<UserInfoRecord, PlatformError> {
        self.next().await?;
        Ok(stub_user(query))
    }

    async fn send_self_message(&self, _text: &str) -> Result<(), PlatformError> {
        self.next().await
    }
}

/// Deterministic profile a scripted lookup resolves to.
pub fn stub_user(query: &str) -> UserInfoRecord {
    UserInfoRecord {
        remote_id: 4242,
        username: Some(query.trim_start_matches('@').to_string()),
        first_name: Some("Scripted".to_string()),
        last_name: None,
        is_bot: false,
        dc_id: Some(2),
        account_created_at: None,
        fetched_at: Utc::now(),
    }
}

/// A connector that builds scripted sessions instead of gateway clients.
///
/// Sessions are registered by credential name as they connect, so tests
/// can reach them afterwards for script pushes and call counts.
pub struct ScriptedConnector {
    failing: HashSet<String>,
    scripts: Mutex<HashMap<String, Vec<ScriptedCall>>>,
    sessions: Mutex<HashMap<String, Arc<ScriptedSession>>>,
}

impl ScriptedConnector {
    /// Every credential connects and every call succeeds.
    pub fn healthy() -> Self {
        Self {
            failing: HashSet::new(),
            scripts: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Credentials with the given names fail to connect; the rest are healthy.
    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            scripts: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Pre-load the script handed to the named session when it connects.
    pub async fn script_for(&self, name: &str, script: Vec<ScriptedCall>) {
        self.scripts.lock().await.insert(name.to_string(), script);
    }

    /// The connected session with the given name, if any.
    pub async fn session(&self, name: &str) -> Option<Arc<ScriptedSession>> {
        self.sessions.lock().await.get(name).cloned()
    }

    /// Total platform calls across every connected session.
    pub async fn total_calls(&self) -> usize {
        self.sessions
            .lock()
            .await
            .values()
            .map(|s| s.calls_made())
            .sum()
    }
}

#[async_trait]
impl SessionConnector for ScriptedConnector {
    async fn connect(
        &self,
        credential: &SessionCredential,
    ) -> Result<Arc<dyn PlatformSession>, PlatformError> {
        if self.failing.contains(&credential.name) {
            return Err(PlatformError::Network {
                message: format!("scripted connect failure for {}", credential.name),
                source: None,
            });
        }
        let script = self
            .scripts
            .lock()
            .await
            .remove(&credential.name)
            .unwrap_or_default();
        let session = ScriptedSession::scripted(&credential.name, script);
        self.sessions
            .lock()
            .await
            .insert(credential.name.clone(), Arc::clone(&session));
        Ok(session)
    }
}
