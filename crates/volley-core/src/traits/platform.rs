// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform session traits.
//!
//! A [`PlatformSession`] is one authenticated identity on the messaging
//! platform. The engine never constructs sessions itself; a
//! [`SessionConnector`] turns configured credentials into live sessions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::handle::ChatHandle;
use crate::types::{SessionCredential, SessionId, UserInfoRecord};

/// One live, authenticated platform session.
///
/// All methods are platform calls: they may be slow, may flood-wait, and
/// may discover mid-call that the session's authorization was revoked.
#[async_trait]
pub trait PlatformSession: Send + Sync {
    /// Stable identifier for this session, taken from its credential name.
    fn id(&self) -> &SessionId;

    /// File a report against the given chat from this session.
    async fn report_chat(&self, chat: &ChatHandle) -> Result<(), PlatformError>;

    /// Fetch profile data for a user, by numeric id or username.
    async fn resolve_user(&self, query: &str) -> Result<UserInfoRecord, PlatformError>;

    /// Send a text message to this session's own saved-messages chat.
    async fn send_self_message(&self, text: &str) -> Result<(), PlatformError>;
}

/// Factory that authenticates credentials into live sessions.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Authenticate one credential. A failure here affects only this
    /// session; callers initialize each credential independently.
    async fn connect(
        &self,
        credential: &SessionCredential,
    ) -> Result<Arc<dyn PlatformSession>, PlatformError>;
}
