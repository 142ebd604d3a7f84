// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation decisions and their persistence.
//!
//! [`EscalationPolicy::evaluate`] is the pure half: it inspects a single
//! user/bot exchange and returns every trigger that fires, in a fixed order
//! (keyword first, then reply quality). [`EscalationEngine`] is the effectful
//! half: it merges the escalation record into the store and copies the
//! conversation transcript alongside it.
//!
//! Escalation records are keyed by user id. A user who re-triggers gets
//! their existing record refreshed in place, never a sibling record; the
//! transcript copy relies on the store's deduplicating array append, so
//! re-triggering is idempotent.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use handoff_core::types::{
    EscalationStatus, Message, Timestamp, TranscriptMessage, collections,
};
use handoff_core::{
    ConversationId, HandoffError, MessageId, Sender, StoreAdapter, UserId,
};

use crate::config::EscalationPolicy;

/// One completed user/bot exchange, the unit the policy evaluates.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub user_id: UserId,
    pub user_name: String,
    pub conversation_id: ConversationId,
    pub user_message: String,
    pub bot_response: String,
    pub confidence: f64,
}

/// Why an exchange escalated.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerReason {
    /// The user message contained a configured trigger phrase.
    Keyword(String),
    /// The vendor scored its reply below the configured threshold.
    LowConfidence(f64),
    /// The reply was one of the known fallback/error strings.
    FallbackReply,
}

/// A fired trigger, carrying the title the record will be filed under.
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationTrigger {
    pub title: String,
    pub reason: TriggerReason,
}

impl EscalationPolicy {
    /// Evaluates an exchange against the policy. Both the keyword check and
    /// the reply-quality check run independently, so a single exchange can
    /// fire up to two triggers.
    pub fn evaluate(&self, exchange: &Exchange) -> Vec<EscalationTrigger> {
        let mut triggers = Vec::new();

        let lowered = exchange.user_message.to_lowercase();
        if let Some(phrase) = self
            .trigger_phrases
            .iter()
            .find(|phrase| phrase_matches(&lowered, phrase))
        {
            triggers.push(EscalationTrigger {
                title: phrase.clone(),
                reason: TriggerReason::Keyword(phrase.clone()),
            });
        }

        let low_confidence = exchange.confidence < self.confidence_threshold;
        let fallback = self
            .fallback_responses
            .iter()
            .any(|r| r == &exchange.bot_response);
        if low_confidence || fallback {
            triggers.push(EscalationTrigger {
                title: format!(
                    "Escalation for User: {} - Conversation: {}",
                    exchange.user_id, exchange.conversation_id
                ),
                reason: if low_confidence {
                    TriggerReason::LowConfidence(exchange.confidence)
                } else {
                    TriggerReason::FallbackReply
                },
            });
        }

        triggers
    }
}

/// True when every word of `phrase` appears in `message` in order, with
/// arbitrary words allowed in between. "cancel demo" therefore matches
/// "I want to cancel my demo", which a plain substring check would miss.
/// Both inputs are expected lowercase; message words are stripped of
/// surrounding punctuation.
fn phrase_matches(message: &str, phrase: &str) -> bool {
    let mut wanted = phrase.split_whitespace();
    let mut next = wanted.next();
    for word in message.split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        match next {
            Some(w) if w == word => next = wanted.next(),
            Some(_) => {}
            None => break,
        }
    }
    next.is_none()
}

/// Persists escalation decisions into the store.
pub struct EscalationEngine {
    store: Arc<dyn StoreAdapter>,
    policy: EscalationPolicy,
}

impl EscalationEngine {
    pub fn new(store: Arc<dyn StoreAdapter>, policy: EscalationPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    /// Evaluates an exchange and persists every fired trigger. Persistence
    /// failures are logged and swallowed: escalation bookkeeping must never
    /// break the chat flow it observes.
    pub async fn process(&self, exchange: &Exchange) {
        for trigger in self.policy.evaluate(exchange) {
            info!(
                user = %exchange.user_id,
                conversation = %exchange.conversation_id,
                reason = ?trigger.reason,
                "escalation triggered"
            );
            if let Err(e) = self.escalate(exchange, &trigger).await {
                warn!(user = %exchange.user_id, error = %e, "failed to persist escalation");
            }
        }
    }

    /// Writes the escalation record (merge semantics, keyed by user id) and
    /// copies the conversation transcript into it.
    pub async fn escalate(
        &self,
        exchange: &Exchange,
        trigger: &EscalationTrigger,
    ) -> Result<(), HandoffError> {
        let record = json!({
            "userId": exchange.user_id,
            "userName": exchange.user_name,
            "userMessage": exchange.user_message,
            "botResponse": exchange.bot_response,
            "createdAt": Timestamp::now(),
            "status": EscalationStatus::Pending,
            "conversationId": exchange.conversation_id,
            "confidence": exchange.confidence,
            "title": trigger.title,
        });
        self.store
            .set(collections::ESCALATIONS, &exchange.user_id.0, record, true)
            .await?;

        self.copy_transcript(&exchange.user_id).await
    }

    /// Copies the user's direct-channel history into the escalation record's
    /// transcript. Entries keep their original ids and timestamps, so the
    /// store-side dedup makes repeated copies a no-op.
    async fn copy_transcript(&self, user: &UserId) -> Result<(), HandoffError> {
        let Some(doc) = self
            .store
            .get(collections::CHAT_MESSAGES, &user.0)
            .await?
        else {
            debug!(user = %user, "no chat history to copy into escalation");
            return Ok(());
        };

        let Some(raw) = doc.get("messages").and_then(|m| m.as_array()) else {
            return Ok(());
        };

        let mut transcript = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<Message>(value.clone()) {
                Ok(msg) => transcript.push(
                    serde_json::to_value(TranscriptMessage {
                        id: msg.id,
                        text: msg.text,
                        sender: msg.sender,
                        created_at: msg.timestamp,
                        recipient: None,
                    })
                    .map_err(HandoffError::store)?,
                ),
                Err(e) => {
                    warn!(user = %user, error = %e, "skipping unparsable message in transcript copy");
                }
            }
        }

        if transcript.is_empty() {
            return Ok(());
        }
        self.store
            .append_to_array(collections::ESCALATIONS, &user.0, "messages", transcript)
            .await
    }

    /// Appends a staff reply to an escalated conversation's transcript.
    pub async fn append_staff_reply(
        &self,
        user: &UserId,
        recipient: &UserId,
        text: &str,
    ) -> Result<(), HandoffError> {
        let now = Timestamp::now();
        let entry = serde_json::to_value(TranscriptMessage {
            id: Some(MessageId(format!(
                "staff_{}",
                now.resolve().timestamp_millis()
            ))),
            text: text.to_string(),
            sender: Sender::from("staff"),
            created_at: now,
            recipient: Some(recipient.clone()),
        })
        .map_err(HandoffError::store)?;

        self.store
            .append_to_array(collections::ESCALATIONS, &user.0, "messages", vec![entry])
            .await
    }
}
