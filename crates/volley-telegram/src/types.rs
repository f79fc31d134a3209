// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the session gateway API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use volley_core::UserInfoRecord;

/// Envelope every gateway method answers with.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error_code: Option<u16>,
    pub description: Option<String>,
    pub parameters: Option<ResponseParameters>,
}

/// Extra error context, present on rate-limit answers.
#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

/// `getMe` result payload.
#[derive(Debug, Deserialize)]
pub struct SelfInfo {
    pub id: i64,
    pub username: Option<String>,
}

/// `getUserProfile` result payload.
#[derive(Debug, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
    pub dc_id: Option<u32>,
    /// RFC 3339. The gateway omits it for accounts that hide it.
    pub created_at: Option<String>,
}

impl UserProfile {
    /// Convert the wire payload into the engine's record type.
    ///
    /// The creation date is best effort: an unparseable value is dropped
    /// rather than failing the whole lookup.
    pub fn into_record(self) -> UserInfoRecord {
        let account_created_at = self.created_at.as_deref().and_then(|s| {
            match DateTime::parse_from_rfc3339(s) {
                Ok(t) => Some(t.with_timezone(&Utc)),
                Err(err) => {
                    debug!(error = %err, "unparseable account creation date, dropping");
                    None
                }
            }
        });
        UserInfoRecord {
            remote_id: self.id,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            is_bot: self.is_bot,
            dc_id: self.dc_id,
            account_created_at,
            fetched_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportChatRequest<'a> {
    pub chat: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UserQueryRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SelfMessageRequest<'a> {
    pub text: &'a str,
}

/// Body for methods that take no arguments.
#[derive(Debug, Serialize)]
pub struct Empty {}
