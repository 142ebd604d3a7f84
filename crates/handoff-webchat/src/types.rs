// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the webchat vendor API.

use handoff_core::types::{Timestamp, VendorReply};
use serde::{Deserialize, Serialize};

/// Body for `POST /users`.
#[derive(Debug, Serialize)]
pub struct CreateUserRequest<'a> {
    pub id: &'a str,
    pub name: &'a str,
}

/// Body returned by `POST /users`, both on creation and on 409 conflict.
/// The vendor is inconsistent about where the key lives, hence the alias.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserResponse {
    #[serde(default, alias = "userKey")]
    pub key: Option<String>,
    #[serde(default)]
    pub user: Option<UserBody>,
}

#[derive(Debug, Deserialize)]
pub struct UserBody {
    #[serde(default)]
    pub name: Option<String>,
}

/// Body returned by `POST /conversations`.
#[derive(Debug, Deserialize)]
pub struct ConversationEnvelope {
    pub conversation: ConversationBody,
}

#[derive(Debug, Deserialize)]
pub struct ConversationBody {
    pub id: String,
}

/// Body for `POST /messages`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest<'a> {
    pub conversation_id: &'a str,
    pub payload: TextPayload<'a>,
}

#[derive(Debug, Serialize)]
pub struct TextPayload<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
}

/// One entry of the vendor's `responses` array.
#[derive(Debug, Default, Deserialize)]
pub struct ReplyPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl ReplyPart {
    fn best_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or(self.message.as_deref())
            .or(self.content.as_deref())
            .filter(|t| !t.is_empty())
    }
}

/// Reply body for `POST /messages`. The vendor emits several shapes; the
/// precedence below mirrors the behavior the product was built against.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyEnvelope {
    #[serde(default)]
    pub responses: Option<Vec<ReplyPart>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub intent_confidence: Option<f64>,
}

impl ReplyEnvelope {
    /// Collapses the envelope into a single reply: the joined `responses`
    /// texts when present, else the first of `text`/`message`/`content`.
    /// Top-level confidence overrides the first response part's.
    pub fn into_reply(self) -> VendorReply {
        let mut text = None;
        let mut confidence = None;

        if let Some(parts) = self.responses.as_deref().filter(|p| !p.is_empty()) {
            let joined = parts
                .iter()
                .filter_map(ReplyPart::best_text)
                .collect::<Vec<_>>()
                .join("\n");
            if !joined.is_empty() {
                text = Some(joined);
            }
            confidence = parts[0].confidence;
        }

        if text.is_none() {
            text = self
                .text
                .or(self.message)
                .or(self.content)
                .filter(|t| !t.is_empty());
        }

        if let Some(c) = self.confidence.or(self.intent_confidence) {
            confidence = Some(c);
        }

        VendorReply { text, confidence }
    }
}

/// Envelope for `GET /conversations/{id}/messages`.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesEnvelope {
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

/// One history entry as the vendor lists it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub payload: Option<WirePayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WirePayload {
    #[serde(default)]
    pub text: Option<String>,
}

/// Error body the vendor returns on failed requests.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
}
