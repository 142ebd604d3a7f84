// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock vendor adapter for deterministic testing.
//!
//! `MockVendor` implements `VendorAdapter` with pre-configured replies,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use handoff_core::traits::adapter::PluginAdapter;
use handoff_core::traits::vendor::VendorAdapter;
use handoff_core::types::{
    AdapterType, HealthStatus, Timestamp, VendorMessage, VendorReply, VendorUser,
};
use handoff_core::{ConversationId, HandoffError, MessageId, UserId};

/// A mock vendor that returns pre-configured replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty a default
/// reply with confidence 1.0 is returned. Every posted message and its reply
/// are recorded into an in-memory history that `list_messages` serves back.
pub struct MockVendor {
    replies: Arc<Mutex<VecDeque<VendorReply>>>,
    history: Arc<Mutex<Vec<VendorMessage>>>,
    user_key: Option<String>,
    user_author: String,
    fail_posts: AtomicBool,
    conversations_created: AtomicUsize,
    next_id: AtomicUsize,
}

impl MockVendor {
    /// Create a new mock vendor with an empty reply queue.
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            history: Arc::new(Mutex::new(Vec::new())),
            user_key: Some("mock-user-key".to_string()),
            user_author: "mock-user".to_string(),
            fail_posts: AtomicBool::new(false),
            conversations_created: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Create a mock vendor pre-loaded with `(text, confidence)` replies.
    pub fn with_replies(replies: Vec<(&str, f64)>) -> Self {
        let queue: VecDeque<VendorReply> = replies
            .into_iter()
            .map(|(text, confidence)| VendorReply {
                text: Some(text.to_string()),
                confidence: Some(confidence),
            })
            .collect();
        Self {
            replies: Arc::new(Mutex::new(queue)),
            ..Self::new()
        }
    }

    /// Make `create_user` return no key, simulating a vendor that reports
    /// an already-existing user without echoing the key back.
    pub fn without_user_key(mut self) -> Self {
        self.user_key = None;
        self
    }

    /// The author id `list_messages` attributes user messages to.
    pub fn with_user_author(mut self, author: &str) -> Self {
        self.user_author = author.to_string();
        self
    }

    /// Add a reply to the end of the queue.
    pub async fn add_reply(&self, text: &str, confidence: f64) {
        self.replies.lock().await.push_back(VendorReply {
            text: Some(text.to_string()),
            confidence: Some(confidence),
        });
    }

    /// Make every subsequent `post_message` fail, simulating an outage.
    pub fn set_post_failure(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    /// Number of conversations opened so far.
    pub fn conversations_created(&self) -> usize {
        self.conversations_created.load(Ordering::SeqCst)
    }

    async fn next_reply(&self) -> VendorReply {
        self.replies.lock().await.pop_front().unwrap_or(VendorReply {
            text: Some("mock reply".to_string()),
            confidence: Some(1.0),
        })
    }

    fn next_message_id(&self) -> MessageId {
        MessageId(format!("mock-msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}

impl Default for MockVendor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockVendor {
    fn name(&self) -> &str {
        "mock-vendor"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Vendor
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoffError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HandoffError> {
        Ok(())
    }
}

#[async_trait]
impl VendorAdapter for MockVendor {
    async fn create_user(&self, _id: &UserId, name: &str) -> Result<VendorUser, HandoffError> {
        Ok(VendorUser {
            key: self.user_key.clone(),
            name: Some(name.to_string()),
        })
    }

    async fn create_conversation(&self, _user_key: &str) -> Result<ConversationId, HandoffError> {
        let n = self.conversations_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ConversationId(format!("mock-conversation-{n}")))
    }

    async fn post_message(
        &self,
        _conversation: &ConversationId,
        _user_key: &str,
        text: &str,
    ) -> Result<VendorReply, HandoffError> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(HandoffError::vendor("mock vendor outage"));
        }

        let reply = self.next_reply().await;

        let mut history = self.history.lock().await;
        history.push(VendorMessage {
            id: self.next_message_id(),
            text: Some(text.to_string()),
            author_id: self.user_author.clone(),
            created_at: Timestamp::now(),
        });
        if let Some(reply_text) = &reply.text {
            history.push(VendorMessage {
                id: self.next_message_id(),
                text: Some(reply_text.clone()),
                author_id: "mock-bot".to_string(),
                created_at: Timestamp::now(),
            });
        }

        Ok(reply)
    }

    async fn list_messages(
        &self,
        _conversation: &ConversationId,
        _user_key: &str,
    ) -> Result<Vec<VendorMessage>, HandoffError> {
        Ok(self.history.lock().await.clone())
    }
}
