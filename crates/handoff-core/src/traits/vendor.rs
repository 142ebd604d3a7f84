// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vendor adapter trait for the external conversational API.

use async_trait::async_trait;

use crate::error::HandoffError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ConversationId, UserId, VendorMessage, VendorReply, VendorUser};

/// Adapter for the vendor conversational API providing automated replies.
///
/// The vendor owns users, conversations, and message history on its side;
/// this core treats all of it as opaque and never replicates its behavior.
#[async_trait]
pub trait VendorAdapter: PluginAdapter {
    /// Registers a user with the vendor. An already-existing user is not an
    /// error; implementations resolve it to the existing key when possible.
    async fn create_user(&self, id: &UserId, name: &str) -> Result<VendorUser, HandoffError>;

    /// Opens a new conversation for the given user key.
    async fn create_conversation(&self, user_key: &str) -> Result<ConversationId, HandoffError>;

    /// Posts a user message and returns the automated reply, if any.
    async fn post_message(
        &self,
        conversation: &ConversationId,
        user_key: &str,
        text: &str,
    ) -> Result<VendorReply, HandoffError>;

    /// Lists the vendor-side message history for a conversation.
    async fn list_messages(
        &self,
        conversation: &ConversationId,
        user_key: &str,
    ) -> Result<Vec<VendorMessage>, HandoffError>;
}
