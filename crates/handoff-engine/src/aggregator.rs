// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation aggregation: merges raw messages from the direct and
//! escalated channels into per-conversation summaries.
//!
//! [`aggregate`] is a pure function of its two input sequences -- identical
//! inputs always produce identical summaries, and it performs no writes.
//! [`Aggregator`] is the store-backed shell around it: it fetches both
//! channels for an actor, aggregates, then resolves display names (with a
//! placeholder fallback that never aborts the pass).

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use handoff_core::types::{
    ConversationKind, ConversationSummary, Message, collections,
};
use handoff_core::{ConversationId, HandoffError, StoreAdapter, UserId};

/// Conversation key for messages that carry no usable identifier at all.
pub const UNKNOWN_CONVERSATION: &str = "unknown";

/// Placeholder shown when a recipient's display name cannot be resolved.
pub const DISPLAY_NAME_PLACEHOLDER: &str = "Client";

/// Resolves the conversation key for a message.
///
/// The fallback order is load-bearing: explicit conversation id, else
/// channel id, else the message's own id, else the literal `"unknown"`.
/// Messages missing an explicit id still group deterministically.
pub fn conversation_key(message: &Message) -> ConversationId {
    message
        .conversation_id
        .clone()
        .or_else(|| message.channel_id.clone().map(ConversationId))
        .or_else(|| message.id.clone().map(|id| ConversationId(id.0)))
        .unwrap_or_else(|| ConversationId(UNKNOWN_CONVERSATION.to_string()))
}

/// Merges both channels into summaries, one per resolved conversation key.
///
/// Within each group messages are ordered by resolved timestamp descending
/// (stable, so equal timestamps keep concatenation order); the newest
/// message supplies the preview fields. Output is ordered newest
/// conversation first, ties broken by key, so re-runs on unchanged input
/// are bit-identical.
pub fn aggregate(direct: &[Message], escalated: &[Message]) -> Vec<ConversationSummary> {
    let mut groups: BTreeMap<ConversationId, Vec<&Message>> = BTreeMap::new();
    for message in direct.iter().chain(escalated) {
        groups.entry(conversation_key(message)).or_default().push(message);
    }

    let mut summaries = Vec::with_capacity(groups.len());
    for (conversation_id, mut group) in groups {
        group.sort_by_key(|m| std::cmp::Reverse(m.timestamp.resolve()));

        let newest = group[0];
        let kind = if newest.sender.looks_automated() {
            ConversationKind::Ai
        } else {
            ConversationKind::Human
        };

        summaries.push(ConversationSummary {
            conversation_id,
            preview_text: newest.text.clone(),
            last_sender: newest.sender.clone(),
            last_timestamp: newest.timestamp.resolve(),
            recipient_id: newest.recipient_id.clone(),
            recipient_display_name: DISPLAY_NAME_PLACEHOLDER.to_string(),
            kind,
            last_two_senders: group.iter().take(2).map(|m| m.sender.clone()).collect(),
        });
    }

    summaries.sort_by(|a, b| {
        b.last_timestamp
            .cmp(&a.last_timestamp)
            .then_with(|| a.conversation_id.cmp(&b.conversation_id))
    });
    summaries
}

/// Store-backed aggregation shell.
pub struct Aggregator {
    store: Arc<dyn StoreAdapter>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn StoreAdapter>) -> Self {
        Self { store }
    }

    /// Computes summaries for one actor from a fresh full read of both
    /// channels. A fetch failure aborts this pass (the next scheduled tick
    /// retries); a display-name lookup failure only degrades that summary.
    pub async fn summaries_for(
        &self,
        actor: &UserId,
    ) -> Result<Vec<ConversationSummary>, HandoffError> {
        let direct = self
            .channel_messages(collections::CHAT_MESSAGES, actor)
            .await?;
        let escalated = self
            .channel_messages(collections::ESCALATIONS, actor)
            .await?;

        let mut summaries = aggregate(&direct, &escalated);
        for summary in &mut summaries {
            if let Some(recipient) = summary.recipient_id.clone() {
                summary.recipient_display_name = self.display_name(&recipient).await;
            }
        }
        Ok(summaries)
    }

    /// Reads one channel's `messages` array for the actor. An absent
    /// document is an empty channel; an entry that fails to parse is
    /// skipped with a warning rather than failing the pass.
    async fn channel_messages(
        &self,
        collection: &str,
        actor: &UserId,
    ) -> Result<Vec<Message>, HandoffError> {
        let Some(doc) = self.store.get(collection, &actor.0).await? else {
            return Ok(Vec::new());
        };

        let Some(raw) = doc.get("messages").and_then(|m| m.as_array()) else {
            return Ok(Vec::new());
        };

        let mut messages = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<Message>(value.clone()) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    warn!(collection, actor = %actor, error = %e, "skipping unparsable message entry");
                }
            }
        }
        Ok(messages)
    }

    /// Resolves a recipient's display name from the clients collection,
    /// degrading to a placeholder on any failure.
    async fn display_name(&self, recipient: &UserId) -> String {
        match self.store.get(collections::CLIENTS, &recipient.0).await {
            Ok(Some(doc)) => doc
                .get("name")
                .and_then(|n| n.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| DISPLAY_NAME_PLACEHOLDER.to_string()),
            Ok(None) => DISPLAY_NAME_PLACEHOLDER.to_string(),
            Err(e) => {
                warn!(recipient = %recipient, error = %e, "display name lookup failed");
                DISPLAY_NAME_PLACEHOLDER.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::types::{MessageId, Sender, Timestamp};

    fn message(
        id: Option<&str>,
        text: &str,
        sender: &str,
        ts: i64,
        conversation: Option<&str>,
    ) -> Message {
        Message {
            id: id.map(|i| MessageId(i.to_string())),
            text: text.to_string(),
            sender: Sender::from(sender),
            timestamp: Timestamp::EpochMillis(ts),
            conversation_id: conversation.map(|c| ConversationId(c.to_string())),
            channel_id: None,
            user_id: None,
            recipient_id: None,
        }
    }

    #[test]
    fn fallback_chain_resolves_in_order() {
        let with_conversation = message(Some("m1"), "a", "user", 1, Some("c1"));
        assert_eq!(conversation_key(&with_conversation).0, "c1");

        let mut with_channel = message(Some("m2"), "b", "user", 2, None);
        with_channel.channel_id = Some("ch1".to_string());
        assert_eq!(conversation_key(&with_channel).0, "ch1");

        let with_id_only = message(Some("m3"), "c", "user", 3, None);
        assert_eq!(conversation_key(&with_id_only).0, "m3");

        let bare = message(None, "d", "user", 4, None);
        assert_eq!(conversation_key(&bare).0, UNKNOWN_CONVERSATION);
    }

    #[test]
    fn aggregation_is_deterministic_and_order_independent() {
        let direct = vec![
            message(Some("m1"), "hello", "user", 10, Some("c1")),
            message(Some("m2"), "hi there", "bot", 20, Some("c1")),
        ];
        let escalated = vec![message(Some("m3"), "need help", "client", 15, Some("c2"))];

        let first = aggregate(&direct, &escalated);
        let second = aggregate(&direct, &escalated);
        assert_eq!(first, second);

        // Reordering messages inside a channel must not change summaries.
        let shuffled = vec![direct[1].clone(), direct[0].clone()];
        assert_eq!(aggregate(&shuffled, &escalated), first);
    }

    #[test]
    fn last_two_senders_track_the_two_newest_messages() {
        let direct = vec![
            message(Some("m1"), "first", "user", 10, Some("c1")),
            message(Some("m2"), "second", "bot", 30, Some("c1")),
            message(Some("m3"), "third", "staff", 20, Some("c1")),
        ];
        let summaries = aggregate(&direct, &[]);
        assert_eq!(summaries.len(), 1);
        assert_eq!(
            summaries[0].last_two_senders,
            vec![Sender::from("bot"), Sender::from("staff")]
        );
        assert_eq!(summaries[0].preview_text, "second");
    }

    #[test]
    fn single_message_conversation_has_one_last_sender() {
        let summaries = aggregate(&[message(Some("m1"), "only", "user", 1, Some("c1"))], &[]);
        assert_eq!(summaries[0].last_two_senders.len(), 1);
    }

    #[test]
    fn kind_follows_the_contains_bot_rule() {
        let ai = aggregate(&[message(Some("m1"), "x", "ChatBot", 1, Some("c1"))], &[]);
        assert_eq!(ai[0].kind, ConversationKind::Ai);

        let human = aggregate(&[message(Some("m1"), "x", "staff", 1, Some("c1"))], &[]);
        assert_eq!(human[0].kind, ConversationKind::Human);
    }

    #[test]
    fn mixed_timestamp_shapes_order_correctly() {
        let older = Message {
            timestamp: Timestamp::Store {
                seconds: 1_700_000_000,
                nanoseconds: 0,
            },
            ..message(Some("m1"), "older", "user", 0, Some("c1"))
        };
        let newer = Message {
            timestamp: Timestamp::Iso("2023-11-14T22:13:21.000Z".to_string()),
            ..message(Some("m2"), "newer", "bot", 0, Some("c1"))
        };

        let summaries = aggregate(&[older, newer], &[]);
        assert_eq!(summaries[0].preview_text, "newer");
    }

    #[test]
    fn conversations_order_newest_first() {
        let direct = vec![
            message(Some("m1"), "old", "user", 10, Some("c-old")),
            message(Some("m2"), "new", "user", 20, Some("c-new")),
        ];
        let summaries = aggregate(&direct, &[]);
        assert_eq!(summaries[0].conversation_id.0, "c-new");
        assert_eq!(summaries[1].conversation_id.0, "c-old");
    }
}
