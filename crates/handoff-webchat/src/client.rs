// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the webchat vendor API.
//!
//! Provides [`WebchatClient`] which handles request construction,
//! authentication, already-exists user registration, and transient error
//! retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use handoff_core::types::{ConversationId, MessageId, Timestamp, VendorMessage, VendorReply, VendorUser};
use handoff_core::{AdapterType, HandoffError, HealthStatus, PluginAdapter, UserId, VendorAdapter};

use crate::types::{
    ApiErrorResponse, ConversationEnvelope, CreateUserRequest, MessagesEnvelope,
    PostMessageRequest, ReplyEnvelope, TextPayload,
};

/// Header carrying the per-user vendor session key.
const USER_KEY_HEADER: &str = "x-user-key";

/// Webchat vendor API configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebchatConfig {
    /// Base URL of the vendor's webhook endpoint.
    pub base_url: String,
    /// Bearer token for privileged operations (user creation, posting).
    pub api_token: Option<String>,
}

/// HTTP client for webchat vendor API communication.
///
/// Manages authentication headers, connection pooling, and retry logic
/// for transient errors (429, 500, 503).
#[derive(Debug, Clone)]
pub struct WebchatClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl WebchatClient {
    /// Creates a new webchat API client.
    pub fn new(config: WebchatConfig) -> Result<Self, HandoffError> {
        if config.base_url.is_empty() {
            return Err(HandoffError::Config(
                "webchat.base_url is required for the vendor adapter".into(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("application/json"));
        if let Some(token) = &config.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                HandoffError::Config(format!("invalid API token header value: {e}"))
            })?;
            headers.insert("authorization", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HandoffError::Vendor {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
        })
    }

    /// Sends a request, retrying once after a 1-second delay on transient
    /// statuses (429, 500, 503). Non-transient statuses are returned to the
    /// caller unconsumed so endpoint-specific handling (409) stays possible.
    async fn execute(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, HandoffError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying vendor request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = build().send().await.map_err(|e| HandoffError::Vendor {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

            let status = response.status();
            debug!(status = %status, attempt, "vendor response received");

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient vendor error, will retry");
                last_error = Some(HandoffError::vendor(format!(
                    "API returned {status}: {body}"
                )));
                continue;
            }

            return Ok(response);
        }

        Err(last_error
            .unwrap_or_else(|| HandoffError::vendor("vendor request failed with no response")))
    }

    /// Builds an error from a failed response body, preferring the vendor's
    /// structured error shape.
    fn api_error(&self, status: StatusCode, body: String) -> HandoffError {
        match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(api_err) => HandoffError::vendor(format!(
                "vendor API error ({}): {}",
                api_err.error.type_, api_err.error.message
            )),
            Err(_) => HandoffError::vendor(format!("API returned {status}: {body}")),
        }
    }
}

#[async_trait]
impl PluginAdapter for WebchatClient {
    fn name(&self) -> &str {
        "webchat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Vendor
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoffError> {
        // The vendor exposes no health endpoint; a constructed client with
        // valid headers is the best signal available.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HandoffError> {
        Ok(())
    }
}

#[async_trait]
impl VendorAdapter for WebchatClient {
    async fn create_user(&self, id: &UserId, name: &str) -> Result<VendorUser, HandoffError> {
        let url = format!("{}/users", self.base_url);
        let request = CreateUserRequest { id: &id.0, name };
        let response = self.execute(|| self.client.post(&url).json(&request)).await?;

        let header_key = response
            .headers()
            .get(USER_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() || status == StatusCode::CONFLICT {
            if status == StatusCode::CONFLICT {
                debug!(user = %id, "vendor user already exists, resolving existing key");
            }
            let parsed: crate::types::CreateUserResponse =
                serde_json::from_str(&body).unwrap_or_default();
            Ok(VendorUser {
                key: header_key.or(parsed.key),
                name: parsed.user.and_then(|u| u.name),
            })
        } else {
            Err(self.api_error(status, body))
        }
    }

    async fn create_conversation(&self, user_key: &str) -> Result<ConversationId, HandoffError> {
        let url = format!("{}/conversations", self.base_url);
        let response = self
            .execute(|| {
                self.client
                    .post(&url)
                    .header(USER_KEY_HEADER, user_key)
                    .json(&serde_json::json!({}))
            })
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(self.api_error(status, body));
        }

        let envelope: ConversationEnvelope =
            serde_json::from_str(&body).map_err(|e| HandoffError::Vendor {
                message: format!("unusable create-conversation response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(ConversationId(envelope.conversation.id))
    }

    async fn post_message(
        &self,
        conversation: &ConversationId,
        user_key: &str,
        text: &str,
    ) -> Result<VendorReply, HandoffError> {
        let url = format!("{}/messages", self.base_url);
        let request = PostMessageRequest {
            conversation_id: &conversation.0,
            payload: TextPayload { kind: "text", text },
        };
        let response = self
            .execute(|| {
                self.client
                    .post(&url)
                    .header(USER_KEY_HEADER, user_key)
                    .json(&request)
            })
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(self.api_error(status, body));
        }

        // An empty body is a valid "no synchronous reply" outcome.
        let envelope: ReplyEnvelope = serde_json::from_str(&body).unwrap_or_default();
        Ok(envelope.into_reply())
    }

    async fn list_messages(
        &self,
        conversation: &ConversationId,
        user_key: &str,
    ) -> Result<Vec<VendorMessage>, HandoffError> {
        let url = format!("{}/conversations/{}/messages", self.base_url, conversation);
        let response = self
            .execute(|| self.client.get(&url).header(USER_KEY_HEADER, user_key))
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(self.api_error(status, body));
        }

        let envelope: MessagesEnvelope = serde_json::from_str(&body).unwrap_or_default();
        let messages = envelope
            .messages
            .into_iter()
            .map(|wire| {
                let created_at = wire.created_at.unwrap_or_else(Timestamp::now);
                // The vendor occasionally omits ids; fall back to the
                // timestamp the way the product always has.
                let id = wire.id.unwrap_or_else(|| match &created_at {
                    Timestamp::Iso(s) => s.clone(),
                    other => other.resolve().to_rfc3339(),
                });
                VendorMessage {
                    id: MessageId(id),
                    text: wire.payload.and_then(|p| p.text),
                    author_id: wire.user_id.unwrap_or_default(),
                    created_at,
                }
            })
            .collect();
        Ok(messages)
    }
}

/// Returns true for status codes that warrant a retry.
fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> WebchatClient {
        WebchatClient::new(WebchatConfig {
            base_url: server.uri(),
            api_token: Some("test-token".into()),
        })
        .expect("client")
    }

    #[tokio::test]
    async fn create_user_prefers_the_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-user-key", "key-from-header")
                    .set_body_json(serde_json::json!({"user": {"name": "Ada"}})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let user = client
            .create_user(&UserId("u-1".into()), "Ada")
            .await
            .unwrap();
        assert_eq!(user.key.as_deref(), Some("key-from-header"));
        assert_eq!(user.name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn conflict_resolves_to_the_existing_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(serde_json::json!({"key": "existing"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let user = client
            .create_user(&UserId("u-1".into()), "Ada")
            .await
            .unwrap();
        assert_eq!(user.key.as_deref(), Some("existing"));
    }

    #[tokio::test]
    async fn post_message_parses_the_responses_array() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "responses": [{"text": "Our demo runs Tuesdays.", "confidence": 0.82}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let reply = client
            .post_message(&ConversationId("c-1".into()), "key", "when is the demo?")
            .await
            .unwrap();
        assert_eq!(reply.text.as_deref(), Some("Our demo runs Tuesdays."));
        assert_eq!(reply.confidence, Some(0.82));
    }

    #[tokio::test]
    async fn transient_error_is_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": "recovered"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let reply = client
            .post_message(&ConversationId("c-1".into()), "key", "hello")
            .await
            .unwrap();
        assert_eq!(reply.text.as_deref(), Some("recovered"));
    }

    #[tokio::test]
    async fn list_messages_maps_payloads_and_authors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations/c-1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [
                    {"id": "m-1", "userId": "u-1", "createdAt": "2023-11-14T22:13:20.000Z",
                     "payload": {"text": "hi"}},
                    {"userId": "bot-7", "createdAt": "2023-11-14T22:13:21.000Z",
                     "payload": {"text": "hello!"}}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let messages = client
            .list_messages(&ConversationId("c-1".into()), "key")
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, MessageId("m-1".into()));
        assert_eq!(messages[0].author_id, "u-1");
        // Missing id falls back to the timestamp string.
        assert_eq!(messages[1].id, MessageId("2023-11-14T22:13:21.000Z".into()));
    }

    #[tokio::test]
    async fn non_transient_error_surfaces_the_vendor_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"type": "forbidden", "message": "bad key"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.create_conversation("key").await.unwrap_err();
        assert!(err.to_string().contains("forbidden"));
    }
}
