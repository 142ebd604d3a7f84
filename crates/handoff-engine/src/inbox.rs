// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff-facing escalation inbox.
//!
//! Lists every escalation record in the store, normalized into a small
//! display shape. Records are documents written by the escalation engine
//! and possibly edited by other tools, so every field read here is lenient.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use handoff_core::types::{Timestamp, collections};
use handoff_core::{HandoffError, StoreAdapter, UserId};

/// One row of the escalation inbox.
#[derive(Debug, Clone, PartialEq)]
pub struct InboxEntry {
    pub user_id: UserId,
    pub client_name: String,
    pub title: String,
    pub last_message: String,
    pub created_at: DateTime<Utc>,
}

/// Reads escalation records into a sorted inbox view.
pub struct EscalationInbox {
    store: Arc<dyn StoreAdapter>,
}

impl EscalationInbox {
    pub fn new(store: Arc<dyn StoreAdapter>) -> Self {
        Self { store }
    }

    /// Lists all escalations, newest first. Field fallbacks keep older
    /// record shapes readable: `clientName` before `userName`,
    /// `lastMessage` before `userMessage`.
    pub async fn list(&self) -> Result<Vec<InboxEntry>, HandoffError> {
        let docs = self.store.list(collections::ESCALATIONS).await?;

        let mut entries: Vec<InboxEntry> = docs
            .into_iter()
            .map(|(id, doc)| InboxEntry {
                user_id: UserId(id),
                client_name: string_field(&doc, &["clientName", "userName"])
                    .unwrap_or_else(|| "Unknown".to_string()),
                title: string_field(&doc, &["title"]).unwrap_or_default(),
                last_message: string_field(&doc, &["lastMessage", "userMessage"])
                    .unwrap_or_default(),
                created_at: doc
                    .get("createdAt")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<Timestamp>(v).ok())
                    .map(|t| t.resolve())
                    .unwrap_or_else(Utc::now),
            })
            .collect();

        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.user_id.0.cmp(&b.user_id.0))
        });
        Ok(entries)
    }
}

/// Case-insensitive substring filter over client name and last message.
/// An empty needle keeps everything.
pub fn filter(entries: &[InboxEntry], needle: &str) -> Vec<InboxEntry> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return entries.to_vec();
    }
    entries
        .iter()
        .filter(|e| {
            e.client_name.to_lowercase().contains(&needle)
                || e.last_message.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

fn string_field(doc: &Value, names: &[&str]) -> Option<String> {
    // An empty string falls through to the next candidate field.
    names.iter().find_map(|name| {
        doc.get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, last: &str) -> InboxEntry {
        InboxEntry {
            user_id: UserId("u".to_string()),
            client_name: name.to_string(),
            title: String::new(),
            last_message: last.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn filter_matches_name_and_message_case_insensitively() {
        let entries = vec![entry("Ada Lovelace", "need a refund"), entry("Bob", "hello")];

        let by_name = filter(&entries, "ada");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].client_name, "Ada Lovelace");

        let by_message = filter(&entries, "REFUND");
        assert_eq!(by_message.len(), 1);

        assert!(filter(&entries, "zzz").is_empty());
    }

    #[test]
    fn empty_needle_keeps_everything() {
        let entries = vec![entry("Ada", "a"), entry("Bob", "b")];
        assert_eq!(filter(&entries, "  ").len(), 2);
    }

    #[test]
    fn string_field_falls_back_in_order() {
        let doc = serde_json::json!({ "userName": "Ada", "clientName": "" });
        assert_eq!(
            string_field(&doc, &["clientName", "userName"]),
            Some("Ada".to_string())
        );
        assert_eq!(string_field(&doc, &["missing"]), None);
    }
}
