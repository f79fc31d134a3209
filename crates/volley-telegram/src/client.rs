// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the session gateway.
//!
//! Each configured credential becomes one [`HttpSession`] with its own
//! `reqwest` client carrying the session token as a default header. The
//! token never appears in URLs or error text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use volley_core::{
    ChatHandle, PlatformError, PlatformSession, SessionConnector, SessionCredential, SessionId,
    UserInfoRecord,
};

use crate::types::{
    ApiEnvelope, Empty, ReportChatRequest, SelfInfo, SelfMessageRequest, UserProfile,
    UserQueryRequest,
};

/// Default address of the local session bridge.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8081";

/// Per-call timeout. Gateway calls are quick; anything slower is a fault.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// One authenticated gateway session.
pub struct HttpSession {
    id: SessionId,
    client: reqwest::Client,
    base_url: String,
}

impl HttpSession {
    /// Authenticate the session and fetch its own identity.
    pub async fn get_me(&self) -> Result<SelfInfo, PlatformError> {
        self.call("getMe", &Empty {}).await
    }

    async fn call<B, T>(&self, api_method: &str, body: &B) -> Result<T, PlatformError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}/v1/{}", self.base_url, api_method);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| PlatformError::Network {
                message: format!("{api_method} request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| PlatformError::Network {
            message: format!("failed to read {api_method} response: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(session_id = %self.id, api_method, status = %status, "gateway answered");

        let envelope: ApiEnvelope<T> =
            serde_json::from_str(&body).map_err(|e| PlatformError::Network {
                message: format!("failed to parse {api_method} response: {e}"),
                source: Some(Box::new(e)),
            })?;

        if envelope.ok {
            return envelope.result.ok_or_else(|| PlatformError::Network {
                message: format!("{api_method} answer is ok but carries no result"),
                source: None,
            });
        }

        let retry_after = envelope
            .parameters
            .and_then(|p| p.retry_after)
            .map(Duration::from_secs);
        Err(classify_api_error(
            status,
            envelope.error_code,
            envelope.description,
            retry_after,
        ))
    }
}

#[async_trait]
impl PlatformSession for HttpSession {
    fn id(&self) -> &SessionId {
        &self.id
    }

    async fn report_chat(&self, chat: &ChatHandle) -> Result<(), PlatformError> {
        let target = chat.to_string();
        let _: bool = self
            .call("reportChat", &ReportChatRequest { chat: &target })
            .await?;
        Ok(())
    }

    async fn resolve_user(&self, query: &str) -> Result<UserInfoRecord, PlatformError> {
        let profile: UserProfile = self
            .call("getUserProfile", &UserQueryRequest { query })
            .await?;
        Ok(profile.into_record())
    }

    async fn send_self_message(&self, text: &str) -> Result<(), PlatformError> {
        let _: bool = self
            .call("sendSelfMessage", &SelfMessageRequest { text })
            .await?;
        Ok(())
    }
}

/// Connects configured credentials to the session gateway.
pub struct HttpConnector {
    base_url: String,
}

impl HttpConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl SessionConnector for HttpConnector {
    async fn connect(
        &self,
        credential: &SessionCredential,
    ) -> Result<Arc<dyn PlatformSession>, PlatformError> {
        let mut token = HeaderValue::from_str(credential.token.expose_secret()).map_err(|_| {
            PlatformError::Rpc {
                code: "BAD_TOKEN".into(),
                message: "session token contains invalid header characters".into(),
            }
        })?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-session-token", token);
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PlatformError::Network {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let session = HttpSession {
            id: SessionId(credential.name.clone()),
            client,
            base_url: self.base_url.clone(),
        };

        // A bad token must surface at startup, not mid-job.
        let me = session.get_me().await?;
        info!(
            session_id = %session.id,
            remote_id = me.id,
            "session authenticated against gateway"
        );
        Ok(Arc::new(session))
    }
}

/// Map a gateway error answer onto the engine's platform errors.
fn classify_api_error(
    status: reqwest::StatusCode,
    error_code: Option<u16>,
    description: Option<String>,
    retry_after: Option<Duration>,
) -> PlatformError {
    let code = error_code.unwrap_or_else(|| status.as_u16());
    let description = description.unwrap_or_default();

    if code == 429 || description.starts_with("FLOOD_WAIT") {
        return PlatformError::FloodWait { retry_after };
    }
    match description.as_str() {
        "USER_NOT_PARTICIPANT" => return PlatformError::NotParticipant,
        "USERNAME_NOT_FOUND" | "USER_ID_INVALID" | "CHAT_NOT_FOUND" => {
            return PlatformError::NotFound;
        }
        "AUTH_KEY_UNREGISTERED" | "SESSION_REVOKED" | "USER_DEACTIVATED" => {
            return PlatformError::AuthRevoked;
        }
        _ => {}
    }
    if code == 401 || code == 403 {
        return PlatformError::AuthRevoked;
    }

    let rpc_code = if description.is_empty() {
        format!("HTTP_{code}")
    } else {
        description
    };
    PlatformError::Rpc {
        message: format!("gateway rejected the call ({rpc_code})"),
        code: rpc_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_get_me(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/getMe"))
            .and(header("x-session-token", "secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"id": 777, "username": "alpha_account"}
            })))
            .mount(server)
            .await;
    }

    async fn connected_session(server: &MockServer) -> Arc<dyn PlatformSession> {
        mount_get_me(server).await;
        let connector = HttpConnector::new(server.uri());
        let credential = SessionCredential {
            name: "alpha".into(),
            token: "secret-token".into(),
        };
        connector.connect(&credential).await.unwrap()
    }

    #[tokio::test]
    async fn connect_authenticates_with_token_header() {
        let server = MockServer::start().await;
        let session = connected_session(&server).await;
        assert_eq!(session.id().as_str(), "alpha");
    }

    #[tokio::test]
    async fn connect_fails_on_revoked_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/getMe"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 401,
                "description": "AUTH_KEY_UNREGISTERED"
            })))
            .mount(&server)
            .await;

        let connector = HttpConnector::new(server.uri());
        let credential = SessionCredential {
            name: "alpha".into(),
            token: "secret-token".into(),
        };
        let err = connector.connect(&credential).await.err().unwrap();
        assert!(matches!(err, PlatformError::AuthRevoked));
    }

    #[tokio::test]
    async fn report_chat_posts_handle() {
        let server = MockServer::start().await;
        let session = connected_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/reportChat"))
            .and(body_json(serde_json::json!({"chat": "@target_chat"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let chat = ChatHandle::parse("https://t.me/target_chat").unwrap();
        session.report_chat(&chat).await.unwrap();
    }

    #[tokio::test]
    async fn flood_wait_carries_retry_after() {
        let server = MockServer::start().await;
        let session = connected_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/reportChat"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 429,
                "description": "FLOOD_WAIT",
                "parameters": {"retry_after": 30}
            })))
            .mount(&server)
            .await;

        let chat = ChatHandle::parse("@busy_chat").unwrap();
        let err = session.report_chat(&chat).await.unwrap_err();
        assert!(matches!(
            err,
            PlatformError::FloodWait {
                retry_after: Some(d)
            } if d == Duration::from_secs(30)
        ));
    }

    #[tokio::test]
    async fn flood_wait_without_duration_maps_to_none() {
        let server = MockServer::start().await;
        let session = connected_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/reportChat"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 429,
                "description": "FLOOD_WAIT"
            })))
            .mount(&server)
            .await;

        let chat = ChatHandle::parse("@busy_chat").unwrap();
        let err = session.report_chat(&chat).await.unwrap_err();
        assert!(matches!(
            err,
            PlatformError::FloodWait { retry_after: None }
        ));
    }

    #[tokio::test]
    async fn not_participant_is_a_domain_answer() {
        let server = MockServer::start().await;
        let session = connected_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/reportChat"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 400,
                "description": "USER_NOT_PARTICIPANT"
            })))
            .mount(&server)
            .await;

        let chat = ChatHandle::parse("@members_only").unwrap();
        let err = session.report_chat(&chat).await.unwrap_err();
        assert!(matches!(err, PlatformError::NotParticipant));
    }

    #[tokio::test]
    async fn unknown_description_becomes_rpc_error() {
        let server = MockServer::start().await;
        let session = connected_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/reportChat"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 400,
                "description": "CHAT_ADMIN_REQUIRED"
            })))
            .mount(&server)
            .await;

        let chat = ChatHandle::parse("@some_chat").unwrap();
        let err = session.report_chat(&chat).await.unwrap_err();
        assert!(matches!(
            err,
            PlatformError::Rpc { code, .. } if code == "CHAT_ADMIN_REQUIRED"
        ));
    }

    #[tokio::test]
    async fn resolve_user_maps_full_profile() {
        let server = MockServer::start().await;
        let session = connected_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/getUserProfile"))
            .and(body_json(serde_json::json!({"query": "ada"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {
                    "id": 4242,
                    "username": "ada",
                    "first_name": "Ada",
                    "last_name": "L",
                    "is_bot": false,
                    "dc_id": 4,
                    "created_at": "2019-03-01T12:00:00Z"
                }
            })))
            .mount(&server)
            .await;

        let record = session.resolve_user("ada").await.unwrap();
        assert_eq!(record.remote_id, 4242);
        assert_eq!(record.username.as_deref(), Some("ada"));
        assert_eq!(record.dc_id, Some(4));
        assert_eq!(
            record.account_created_at,
            Some("2019-03-01T12:00:00Z".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn send_self_message_round_trips() {
        let server = MockServer::start().await;
        let session = connected_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/sendSelfMessage"))
            .and(body_json(serde_json::json!({"text": "all sessions check in"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        session
            .send_self_message("all sessions check in")
            .await
            .unwrap();
    }
}
