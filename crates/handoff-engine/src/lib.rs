// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation aggregation and human-escalation core.
//!
//! This crate contains the decision logic of the messaging product:
//! - [`aggregator`]: merges direct-channel and escalated-channel messages
//!   into per-conversation summaries (pure, recomputed every pass)
//! - [`classifier`]: decides which handling surface a conversation routes to
//! - [`escalation`]: evaluates each user/bot exchange and materializes
//!   hand-off decisions as escalation records in the store
//! - [`session`]: the per-user chat flow against the vendor API, carrying
//!   session material explicitly instead of ambient globals
//! - [`inbox`]: the staff-facing list of open escalations
//! - [`poller`]: the cancellable scheduling shell that re-runs aggregation
//!   on a fixed cadence and on store change notifications

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod escalation;
pub mod inbox;
pub mod poller;
pub mod session;

pub use aggregator::{Aggregator, aggregate, conversation_key};
pub use classifier::{Route, route_for};
pub use config::{EscalationPolicy, PollConfig};
pub use escalation::{EscalationEngine, EscalationTrigger, Exchange, TriggerReason};
pub use inbox::{EscalationInbox, InboxEntry};
pub use poller::PollerHandle;
pub use session::{BotReply, ChatSession};
