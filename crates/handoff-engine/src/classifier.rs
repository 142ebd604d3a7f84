// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation routing: decides which handling surface an aggregated
//! conversation opens into.
//!
//! The rule is deliberately asymmetric. A bot exchange is recognized from
//! the newest sender alone, while a human hand-off additionally needs a
//! concrete recipient to address replies to. Conversations that satisfy
//! neither route are unroutable and yield `None`.

use handoff_core::types::ConversationSummary;
use handoff_core::{ConversationId, UserId};

use crate::aggregator::UNKNOWN_CONVERSATION;

/// Handling surface for a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Automated flow. Replies go to the vendor bot.
    BotView { conversation: ConversationId },
    /// Staff hand-off flow. Replies go to a concrete human recipient.
    StaffView {
        conversation: ConversationId,
        recipient: UserId,
    },
}

/// Classifies a summary into a route, or `None` when it cannot be opened.
///
/// Bot conversations route on the newest sender alone, even under the
/// fallback `"unknown"` key. Human conversations require both a real
/// conversation key and a recipient.
pub fn route_for(summary: &ConversationSummary) -> Option<Route> {
    let newest = summary.last_two_senders.first()?;

    if newest.is_bot() || newest.is_user() {
        return Some(Route::BotView {
            conversation: summary.conversation_id.clone(),
        });
    }

    if summary.conversation_id.0 == UNKNOWN_CONVERSATION {
        return None;
    }

    let recipient = summary.recipient_id.clone()?;
    Some(Route::StaffView {
        conversation: summary.conversation_id.clone(),
        recipient,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use handoff_core::types::{ConversationKind, Sender};

    fn summary(
        conversation: &str,
        senders: &[&str],
        recipient: Option<&str>,
    ) -> ConversationSummary {
        ConversationSummary {
            conversation_id: ConversationId(conversation.to_string()),
            preview_text: "preview".to_string(),
            last_sender: Sender::from(senders[0]),
            last_timestamp: Utc::now(),
            recipient_id: recipient.map(|r| UserId(r.to_string())),
            recipient_display_name: "Client".to_string(),
            kind: ConversationKind::Human,
            last_two_senders: senders.iter().map(|s| Sender::from(*s)).collect(),
        }
    }

    #[test]
    fn bot_exchange_routes_to_bot_view() {
        let route = route_for(&summary("c1", &["bot", "user"], None));
        assert_eq!(
            route,
            Some(Route::BotView {
                conversation: ConversationId("c1".to_string())
            })
        );
    }

    #[test]
    fn user_sender_routes_to_bot_view_even_without_recipient() {
        let route = route_for(&summary(UNKNOWN_CONVERSATION, &["user"], None));
        assert!(matches!(route, Some(Route::BotView { .. })));
    }

    #[test]
    fn human_exchange_with_recipient_routes_to_staff_view() {
        let route = route_for(&summary("c2", &["staff", "client"], Some("u-7")));
        assert_eq!(
            route,
            Some(Route::StaffView {
                conversation: ConversationId("c2".to_string()),
                recipient: UserId("u-7".to_string()),
            })
        );
    }

    #[test]
    fn human_exchange_without_recipient_is_unroutable() {
        assert_eq!(route_for(&summary("c3", &["staff"], None)), None);
    }

    #[test]
    fn human_exchange_under_fallback_key_is_unroutable() {
        let route = route_for(&summary(UNKNOWN_CONVERSATION, &["staff"], Some("u-7")));
        assert_eq!(route, None);
    }

    #[test]
    fn empty_summary_is_unroutable() {
        let mut s = summary("c4", &["user"], None);
        s.last_two_senders.clear();
        assert_eq!(route_for(&s), None);
    }
}
