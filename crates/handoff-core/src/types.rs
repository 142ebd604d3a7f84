// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Handoff conversation core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a user (client, staff member, or bot relay account).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub String);

/// Unique identifier for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The sender field of a message as stored in documents.
///
/// Senders are opaque strings on the wire (`"user"`, `"bot"`, `"staff"`,
/// `"client"`, ...). The helpers below encode the two comparisons the core
/// actually performs, so call sites never re-implement the casing rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sender(pub String);

impl Sender {
    /// Exact (case-insensitive) match against `"bot"`.
    pub fn is_bot(&self) -> bool {
        self.0.eq_ignore_ascii_case("bot")
    }

    /// Exact (case-insensitive) match against `"user"`.
    pub fn is_user(&self) -> bool {
        self.0.eq_ignore_ascii_case("user")
    }

    /// True when the sender identifier contains `"bot"` anywhere,
    /// case-insensitively. Drives the AI/Human summary classification,
    /// which is deliberately looser than [`Sender::is_bot`].
    pub fn looks_automated(&self) -> bool {
        self.0.to_lowercase().contains("bot")
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Sender {
    fn from(s: &str) -> Self {
        Sender(s.to_string())
    }
}

/// A timestamp as it arrives at the store/vendor boundary.
///
/// Three wire shapes are accepted at every boundary: a store-native object
/// (`{seconds, nanoseconds}`), an epoch-milliseconds number, or an ISO-8601
/// string. [`Timestamp::resolve`] normalizes all three to one comparable
/// instant; an unparsable value resolves to "now" rather than failing the
/// enclosing operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Store-native timestamp object.
    Store {
        seconds: i64,
        #[serde(default)]
        nanoseconds: u32,
    },
    /// Milliseconds since the Unix epoch.
    EpochMillis(i64),
    /// ISO-8601 / RFC 3339 string.
    Iso(String),
}

impl Timestamp {
    /// The current instant, in the epoch-milliseconds representation.
    pub fn now() -> Self {
        Timestamp::EpochMillis(Utc::now().timestamp_millis())
    }

    /// Normalizes to a comparable UTC instant. Never fails: out-of-range
    /// or unparsable values resolve to the current time.
    pub fn resolve(&self) -> DateTime<Utc> {
        match self {
            Timestamp::Store {
                seconds,
                nanoseconds,
            } => DateTime::from_timestamp(*seconds, *nanoseconds).unwrap_or_else(Utc::now),
            Timestamp::EpochMillis(ms) => {
                DateTime::from_timestamp_millis(*ms).unwrap_or_else(Utc::now)
            }
            Timestamp::Iso(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp::EpochMillis(dt.timestamp_millis())
    }
}

fn timestamp_now() -> Timestamp {
    Timestamp::now()
}

/// A chat message as persisted in the document store. Append-only: a message
/// is never mutated or deleted once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message identifier. Escalation transcript entries may lack one,
    /// which is why the conversation-key fallback chain exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,

    pub text: String,

    pub sender: Sender,

    /// Accepts both the direct-channel `timestamp` field and the
    /// escalated-channel `createdAt` field; a missing value defaults to now.
    #[serde(default = "timestamp_now", alias = "createdAt")]
    pub timestamp: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,

    /// The user whose document this message was written under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    /// Accepts both the direct-channel `recipientId` field and the
    /// `recipient` field that escalated-channel transcript entries carry.
    #[serde(default, alias = "recipient", skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<UserId>,
}

/// Whether a conversation's latest activity is automated or human-staffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationKind {
    Ai,
    Human,
}

/// Derived, recomputed-per-cycle view of a conversation's latest state.
/// Never persisted; every aggregation pass rebuilds it from a full read.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub preview_text: String,
    pub last_sender: Sender,
    pub last_timestamp: DateTime<Utc>,
    pub recipient_id: Option<UserId>,
    pub recipient_display_name: String,
    pub kind: ConversationKind,
    /// Senders of the two most recent messages, newest first.
    /// Length 1 when the conversation has a single message.
    pub last_two_senders: Vec<Sender>,
}

/// A message copied into an escalation record's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,

    pub text: String,

    pub sender: Sender,

    #[serde(default = "timestamp_now")]
    pub created_at: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<UserId>,
}

impl TranscriptMessage {
    /// Identity used for append deduplication: the explicit id when present,
    /// else the (text, sender) pair.
    pub fn identity(&self) -> (Option<&MessageId>, &str, &str) {
        (self.id.as_ref(), &self.text, &self.sender.0)
    }
}

/// Lifecycle state of an escalation record. The decision engine only ever
/// writes `Pending`; the terminal states are reached by human action outside
/// this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EscalationStatus {
    Pending,
    Resolved,
    Dismissed,
}

/// An escalation record as persisted in the store, keyed by the originating
/// user's identifier. At most one live escalation document exists per user;
/// re-triggers merge into it rather than creating a sibling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRecord {
    pub user_id: UserId,
    pub user_name: String,
    pub user_message: String,
    pub bot_response: String,
    pub status: EscalationStatus,
    pub conversation_id: ConversationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<TranscriptMessage>,
    #[serde(default = "timestamp_now")]
    pub created_at: Timestamp,
}

/// A change notification emitted by a store subscription.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub collection: String,
    pub doc_id: String,
    pub document: serde_json::Value,
}

// --- Vendor API boundary types ---

/// Result of registering a user with the vendor conversational API.
/// The key may be absent when the vendor reports the user already exists
/// without echoing the key back; callers then fall back to the stored key.
#[derive(Debug, Clone, Default)]
pub struct VendorUser {
    pub key: Option<String>,
    pub name: Option<String>,
}

/// The automated reply returned for a posted message.
#[derive(Debug, Clone, Default)]
pub struct VendorReply {
    pub text: Option<String>,
    /// Self-reported confidence in [0.0, 1.0]. Absent means the vendor did
    /// not score the reply; callers default it to 1.0.
    pub confidence: Option<f64>,
}

/// A raw message listed from the vendor's conversation history.
#[derive(Debug, Clone)]
pub struct VendorMessage {
    pub id: MessageId,
    pub text: Option<String>,
    /// The vendor-side author identifier; matched against the session's
    /// user id to distinguish user from bot messages.
    pub author_id: String,
    pub created_at: Timestamp,
}

// --- Adapter plumbing types ---

/// Identifies the type of adapter behind a [`PluginAdapter`](crate::traits::PluginAdapter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Store,
    Vendor,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Document collection names shared between the engine and the store tests.
pub mod collections {
    /// Per-user direct-channel message documents (`messages` array field).
    pub const CHAT_MESSAGES: &str = "chatMessages";
    /// Per-user escalation records, keyed by the originating user id.
    pub const ESCALATIONS: &str = "escalations";
    /// Vendor session material (user keys) per user.
    pub const USERS: &str = "users";
    /// Client profile documents used for display-name resolution.
    pub const CLIENTS: &str = "clients";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_timestamp_shapes_resolve_to_the_same_instant() {
        let store = Timestamp::Store {
            seconds: 1_700_000_000,
            nanoseconds: 0,
        };
        let epoch = Timestamp::EpochMillis(1_700_000_000_000);
        let iso = Timestamp::Iso("2023-11-14T22:13:20.000Z".to_string());

        assert_eq!(store.resolve(), epoch.resolve());
        assert_eq!(epoch.resolve(), iso.resolve());
    }

    #[test]
    fn unparsable_timestamp_resolves_to_now() {
        let before = Utc::now();
        let resolved = Timestamp::Iso("not a timestamp".to_string()).resolve();
        let after = Utc::now();
        assert!(resolved >= before && resolved <= after);
    }

    #[test]
    fn timestamp_deserializes_all_wire_shapes() {
        let store: Timestamp = serde_json::from_str(r#"{"seconds":1700000000}"#).unwrap();
        let epoch: Timestamp = serde_json::from_str("1700000000000").unwrap();
        let iso: Timestamp = serde_json::from_str(r#""2023-11-14T22:13:20.000Z""#).unwrap();

        assert_eq!(
            store,
            Timestamp::Store {
                seconds: 1_700_000_000,
                nanoseconds: 0
            }
        );
        assert_eq!(epoch, Timestamp::EpochMillis(1_700_000_000_000));
        assert_eq!(iso, Timestamp::Iso("2023-11-14T22:13:20.000Z".to_string()));
    }

    #[test]
    fn sender_helpers() {
        assert!(Sender::from("bot").is_bot());
        assert!(Sender::from("Bot").is_bot());
        assert!(!Sender::from("chatbot").is_bot());
        assert!(Sender::from("chatbot").looks_automated());
        assert!(Sender::from("user").is_user());
        assert!(!Sender::from("client").is_user());
        assert!(!Sender::from("staff").looks_automated());
    }

    #[test]
    fn message_accepts_created_at_alias_and_missing_timestamp() {
        let m: Message =
            serde_json::from_str(r#"{"text":"hi","sender":"staff","createdAt":1700000000000}"#)
                .unwrap();
        assert_eq!(m.timestamp, Timestamp::EpochMillis(1_700_000_000_000));
        assert!(m.id.is_none());

        let m: Message = serde_json::from_str(r#"{"text":"hi","sender":"user"}"#).unwrap();
        // Missing timestamp defaults to now; resolving it must not panic.
        let _ = m.timestamp.resolve();
    }

    #[test]
    fn message_accepts_the_transcript_recipient_field() {
        // Escalated-channel transcript entries persist the recipient under
        // `recipient`, not `recipientId`.
        let m: Message = serde_json::from_str(
            r#"{"text":"taking over","sender":"staff","createdAt":1700000000000,"recipient":"u-7"}"#,
        )
        .unwrap();
        assert_eq!(m.recipient_id, Some(UserId("u-7".into())));

        let m: Message = serde_json::from_str(
            r#"{"text":"hi","sender":"staff","recipientId":"u-8"}"#,
        )
        .unwrap();
        assert_eq!(m.recipient_id, Some(UserId("u-8".into())));
    }

    #[test]
    fn escalation_record_round_trips_with_camel_case_fields() {
        let record = EscalationRecord {
            user_id: UserId("u-1".into()),
            user_name: "Ada".into(),
            user_message: "cancel demo".into(),
            bot_response: "ok".into(),
            status: EscalationStatus::Pending,
            conversation_id: ConversationId("c-1".into()),
            confidence: Some(0.4),
            title: "cancel demo".into(),
            messages: vec![],
            created_at: Timestamp::EpochMillis(0),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], "u-1");
        assert_eq!(json["status"], "pending");
        let back: EscalationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn transcript_identity_prefers_explicit_id() {
        let a = TranscriptMessage {
            id: Some(MessageId("m-1".into())),
            text: "hello".into(),
            sender: Sender::from("user"),
            created_at: Timestamp::EpochMillis(1),
            recipient: None,
        };
        let b = TranscriptMessage {
            id: Some(MessageId("m-2".into())),
            text: "hello".into(),
            sender: Sender::from("user"),
            created_at: Timestamp::EpochMillis(1),
            recipient: None,
        };
        assert_ne!(a.identity(), b.identity());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn resolve_never_panics_on_arbitrary_iso_strings(s in ".*") {
                let _ = Timestamp::Iso(s).resolve();
            }

            #[test]
            fn resolve_never_panics_on_arbitrary_numbers(ms in any::<i64>(), secs in any::<i64>()) {
                let _ = Timestamp::EpochMillis(ms).resolve();
                let _ = Timestamp::Store { seconds: secs, nanoseconds: 0 }.resolve();
            }
        }
    }
}
