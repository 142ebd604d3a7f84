// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user chat session against the vendor conversational API.
//!
//! A [`ChatSession`] carries its own key material and conversation handle;
//! nothing is ambient. Opening a session registers the user with the vendor
//! (idempotently), resolves the per-user API key, persists it, and opens a
//! fresh conversation.
//!
//! Error policy in [`ChatSession::send`] is deliberately uneven. Failing to
//! persist the user's own message aborts the send, because losing user input
//! is not acceptable. A vendor failure degrades to a canned fallback reply,
//! a bot-reply persistence failure only logs, and escalation bookkeeping is
//! fully fire-and-forget.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use handoff_core::types::{Message, Timestamp, TranscriptMessage, collections};
use handoff_core::{
    ConversationId, HandoffError, MessageId, Sender, StoreAdapter, UserId, VendorAdapter,
};

use crate::escalation::{EscalationEngine, Exchange};

/// Reply shown when the vendor returns nothing usable or is unreachable.
pub const DEFAULT_FALLBACK_REPLY: &str = "Sorry, I couldn't understand that.";

/// First message of every fresh conversation.
pub const WELCOME_MESSAGE: &str = "Hi! How can I help you today?";

/// An automated reply as surfaced to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct BotReply {
    pub text: String,
    pub confidence: f64,
}

/// A live chat session for one user.
pub struct ChatSession {
    user_id: UserId,
    user_name: String,
    user_key: String,
    conversation_id: ConversationId,
    messages: Vec<Message>,
    store: Arc<dyn StoreAdapter>,
    vendor: Arc<dyn VendorAdapter>,
    escalation: Arc<EscalationEngine>,
}

impl ChatSession {
    /// Opens a session: registers the user with the vendor, resolves the
    /// per-user key (vendor-issued, else previously stored), persists it,
    /// and opens a new conversation.
    pub async fn open(
        store: Arc<dyn StoreAdapter>,
        vendor: Arc<dyn VendorAdapter>,
        escalation: Arc<EscalationEngine>,
        user_id: UserId,
        user_name: String,
    ) -> Result<Self, HandoffError> {
        let vendor_user = vendor.create_user(&user_id, &user_name).await?;

        let user_key = match vendor_user.key {
            Some(key) => key,
            None => store
                .get(collections::USERS, &user_id.0)
                .await?
                .and_then(|doc| {
                    doc.get("userKey")
                        .and_then(|k| k.as_str())
                        .map(str::to_string)
                })
                .ok_or_else(|| {
                    HandoffError::vendor(format!(
                        "no user key available for existing user {user_id}"
                    ))
                })?,
        };

        store
            .set(
                collections::USERS,
                &user_id.0,
                json!({ "name": user_name, "userKey": user_key }),
                true,
            )
            .await?;

        let conversation_id = vendor.create_conversation(&user_key).await?;
        info!(user = %user_id, conversation = %conversation_id, "chat session opened");

        Ok(Self {
            user_id,
            user_name,
            user_key,
            conversation_id,
            messages: Vec::new(),
            store,
            vendor,
            escalation,
        })
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The session's local view of the conversation, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Sends a user message, obtains the automated reply, persists both,
    /// and runs escalation evaluation on the completed exchange.
    pub async fn send(&mut self, text: &str) -> Result<BotReply, HandoffError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(HandoffError::Internal(
                "cannot send an empty message".to_string(),
            ));
        }

        // Losing user input is not acceptable; this failure aborts the send.
        let user_message = self.store_message(text, Sender::from("user")).await?;

        let reply = match self
            .vendor
            .post_message(&self.conversation_id, &self.user_key, text)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(user = %self.user_id, error = %e, "vendor post failed, degrading to fallback reply");
                handoff_core::types::VendorReply {
                    text: Some(DEFAULT_FALLBACK_REPLY.to_string()),
                    confidence: Some(1.0),
                }
            }
        };

        let reply_text = reply
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_FALLBACK_REPLY.to_string());
        let confidence = reply.confidence.unwrap_or(1.0);

        let bot_message = match self.store_message(&reply_text, Sender::from("bot")).await {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(user = %self.user_id, error = %e, "failed to persist bot reply");
                None
            }
        };

        self.escalation
            .process(&Exchange {
                user_id: self.user_id.clone(),
                user_name: self.user_name.clone(),
                conversation_id: self.conversation_id.clone(),
                user_message: text.to_string(),
                bot_response: reply_text.clone(),
                confidence,
            })
            .await;

        self.messages.push(user_message);
        if let Some(message) = bot_message {
            self.messages.push(message);
        }

        Ok(BotReply {
            text: reply_text,
            confidence,
        })
    }

    /// Appends one message to the user's direct channel and mirrors it into
    /// the escalation transcript feed. Both copies carry the same captured
    /// timestamp so a later full-transcript copy deduplicates against this
    /// mirror instead of duplicating it.
    async fn store_message(
        &self,
        text: &str,
        sender: Sender,
    ) -> Result<Message, HandoffError> {
        let now = Timestamp::now();
        // Prefix the minted id with the sender: both sides of an exchange
        // are stored within the same millisecond, and the id is what the
        // merge dedup keys on.
        let message = Message {
            id: Some(MessageId(format!(
                "{}_{}",
                sender,
                now.resolve().timestamp_millis()
            ))),
            text: text.to_string(),
            sender,
            timestamp: now.clone(),
            conversation_id: Some(self.conversation_id.clone()),
            channel_id: None,
            user_id: Some(self.user_id.clone()),
            recipient_id: None,
        };

        let entry = serde_json::to_value(&message).map_err(HandoffError::store)?;
        self.store
            .append_to_array(
                collections::CHAT_MESSAGES,
                &self.user_id.0,
                "messages",
                vec![entry],
            )
            .await?;

        let mirror = serde_json::to_value(TranscriptMessage {
            id: message.id.clone(),
            text: message.text.clone(),
            sender: message.sender.clone(),
            created_at: message.timestamp.clone(),
            recipient: None,
        })
        .map_err(HandoffError::store)?;
        if let Err(e) = self
            .store
            .append_to_array(
                collections::ESCALATIONS,
                &self.user_id.0,
                "messages",
                vec![mirror],
            )
            .await
        {
            warn!(user = %self.user_id, error = %e, "failed to mirror message into escalation feed");
        }

        Ok(message)
    }

    /// Fetches the vendor-side history for this conversation and merges it
    /// into the local view. Vendor messages without text are skipped.
    pub async fn fetch_messages(&mut self) -> Result<(), HandoffError> {
        let history = self
            .vendor
            .list_messages(&self.conversation_id, &self.user_key)
            .await?;

        let fetched: Vec<Message> = history
            .into_iter()
            .filter_map(|m| {
                let text = m.text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
                let sender = if m.author_id == self.user_id.0 {
                    Sender::from("user")
                } else {
                    Sender::from("bot")
                };
                Some(Message {
                    id: Some(m.id),
                    text,
                    sender,
                    timestamp: m.created_at,
                    conversation_id: Some(self.conversation_id.clone()),
                    channel_id: None,
                    user_id: Some(self.user_id.clone()),
                    recipient_id: None,
                })
            })
            .collect();

        self.merge_messages(fetched);
        Ok(())
    }

    /// Reloads the stored direct-channel history into the local view.
    pub async fn load_stored_messages(&mut self) -> Result<(), HandoffError> {
        let Some(doc) = self
            .store
            .get(collections::CHAT_MESSAGES, &self.user_id.0)
            .await?
        else {
            return Ok(());
        };
        let Some(raw) = doc.get("messages").and_then(|m| m.as_array()) else {
            return Ok(());
        };

        let stored: Vec<Message> = raw
            .iter()
            .filter_map(|value| match serde_json::from_value(value.clone()) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(user = %self.user_id, error = %e, "skipping unparsable stored message");
                    None
                }
            })
            .collect();

        self.merge_messages(stored);
        Ok(())
    }

    /// Merges incoming messages into the local view, deduplicating by id,
    /// then re-sorts ascending by resolved timestamp.
    fn merge_messages(&mut self, incoming: impl IntoIterator<Item = Message>) {
        let mut seen: HashSet<MessageId> = self
            .messages
            .iter()
            .filter_map(|m| m.id.clone())
            .collect();

        for message in incoming {
            match &message.id {
                Some(id) if seen.contains(id) => continue,
                Some(id) => {
                    seen.insert(id.clone());
                }
                None => {}
            }
            self.messages.push(message);
        }

        self.messages
            .sort_by_key(|m| m.timestamp.resolve());
    }

    /// Discards the current conversation and opens a fresh one, seeding it
    /// with the welcome message.
    pub async fn refresh(&mut self) -> Result<(), HandoffError> {
        self.conversation_id = self.vendor.create_conversation(&self.user_key).await?;
        self.messages.clear();
        debug!(user = %self.user_id, conversation = %self.conversation_id, "conversation refreshed");

        let welcome = self.store_message(WELCOME_MESSAGE, Sender::from("bot")).await?;
        self.messages.push(welcome);
        Ok(())
    }
}
