// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete stack with a mock vendor, a temp
//! SQLite-backed store, the escalation engine, and an open chat session.
//! Provides `send()` to drive the full send/reply/escalate pipeline.

use std::sync::Arc;

use handoff_core::types::{EscalationRecord, collections};
use handoff_core::{HandoffError, StoreAdapter, UserId, VendorAdapter};
use handoff_engine::escalation::EscalationEngine;
use handoff_engine::session::{BotReply, ChatSession};
use handoff_engine::EscalationPolicy;
use handoff_store::{SqliteStore, StoreConfig};

use crate::mock_vendor::MockVendor;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<(String, f64)>,
    policy: EscalationPolicy,
    user_id: String,
    user_name: String,
    vendor_user_key: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            policy: EscalationPolicy::default(),
            user_id: "test-user".to_string(),
            user_name: "Test User".to_string(),
            vendor_user_key: true,
        }
    }

    /// Queue vendor replies as `(text, confidence)` pairs.
    pub fn with_replies(mut self, replies: Vec<(&str, f64)>) -> Self {
        self.replies = replies
            .into_iter()
            .map(|(t, c)| (t.to_string(), c))
            .collect();
        self
    }

    /// Use a custom escalation policy.
    pub fn with_policy(mut self, policy: EscalationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Identify the session user.
    pub fn with_user(mut self, id: &str, name: &str) -> Self {
        self.user_id = id.to_string();
        self.user_name = name.to_string();
        self
    }

    /// Make the vendor withhold the user key on registration.
    pub fn without_vendor_user_key(mut self) -> Self {
        self.vendor_user_key = false;
        self
    }

    /// Build the test harness, creating the temp store and opening a session.
    pub async fn build(self) -> Result<TestHarness, HandoffError> {
        let temp_dir = tempfile::TempDir::new().map_err(HandoffError::store)?;
        let db_path = temp_dir.path().join("test.db");

        let store = SqliteStore::new(StoreConfig {
            database_path: db_path.to_string_lossy().to_string(),
        });
        store.initialize().await?;
        let store: Arc<dyn StoreAdapter> = Arc::new(store);

        let mut mock_vendor = MockVendor::new().with_user_author(&self.user_id);
        if !self.vendor_user_key {
            mock_vendor = mock_vendor.without_user_key();
        }
        let mock_vendor = Arc::new(mock_vendor);
        for (text, confidence) in &self.replies {
            mock_vendor.add_reply(text, *confidence).await;
        }

        let escalation = Arc::new(EscalationEngine::new(store.clone(), self.policy));

        let session = ChatSession::open(
            store.clone(),
            mock_vendor.clone() as Arc<dyn VendorAdapter>,
            escalation.clone(),
            UserId(self.user_id),
            self.user_name,
        )
        .await?;

        Ok(TestHarness {
            mock_vendor,
            store,
            escalation,
            session,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock vendor and temp storage.
pub struct TestHarness {
    /// The mock vendor adapter.
    pub mock_vendor: Arc<MockVendor>,
    /// SQLite store adapter (temp DB, cleaned up on drop).
    pub store: Arc<dyn StoreAdapter>,
    /// The escalation engine wired to the store.
    pub escalation: Arc<EscalationEngine>,
    /// An open chat session for the configured user.
    pub session: ChatSession,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Send a message through the full pipeline and return the bot reply.
    pub async fn send(&mut self, text: &str) -> Result<BotReply, HandoffError> {
        self.session.send(text).await
    }

    /// Read the escalation record for a user, if one was written.
    pub async fn escalation_record(
        &self,
        user: &str,
    ) -> Result<Option<EscalationRecord>, HandoffError> {
        let Some(doc) = self.store.get(collections::ESCALATIONS, user).await? else {
            return Ok(None);
        };
        // The transcript mirror creates the document before any trigger
        // fires; only an engine-written record carries the userId field.
        if doc.get("userId").is_none() {
            return Ok(None);
        }
        serde_json::from_value(doc)
            .map(Some)
            .map_err(HandoffError::store)
    }
}
