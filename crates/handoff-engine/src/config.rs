// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tunables for the escalation engine and the polling shell.
//!
//! These are plain config structs with compiled defaults; file and
//! environment loading belongs to the surrounding application shell, not to
//! this core.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Escalation decision tunables.
///
/// The defaults reproduce the vocabulary and threshold the product shipped
/// with. Trigger phrases are matched case-insensitively as ordered word
/// sequences (intervening words allowed), so they must be stored lowercase;
/// fallback replies are matched exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationPolicy {
    /// Phrases in a user message that always escalate. The matched phrase
    /// becomes the escalation title.
    #[serde(default = "default_trigger_phrases")]
    pub trigger_phrases: Vec<String>,

    /// Replies scored below this confidence escalate.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Known fallback/error reply strings that escalate regardless of score.
    #[serde(default = "default_fallback_responses")]
    pub fallback_responses: Vec<String>,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            trigger_phrases: default_trigger_phrases(),
            confidence_threshold: default_confidence_threshold(),
            fallback_responses: default_fallback_responses(),
        }
    }
}

fn default_trigger_phrases() -> Vec<String> {
    [
        "demo cancellation",
        "cancel demo",
        "renew subscription",
        "cancel subscription",
        "more information on demo",
    ]
    .map(String::from)
    .to_vec()
}

fn default_confidence_threshold() -> f64 {
    0.6
}

fn default_fallback_responses() -> Vec<String> {
    [
        "Sorry, I couldn't understand that.",
        "I received a response but couldn't understand it.",
        "Sorry, I'm having trouble connecting to the service (Error 500).",
        "Sorry, I'm having trouble connecting to the service (Error 503).",
        "Sorry, I'm having trouble connecting to the service (Error 504).",
    ]
    .map(String::from)
    .to_vec()
}

/// Polling cadence for the active-chat refresh loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Milliseconds between scheduled refresh passes.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_interval_ms() -> u64 {
    3_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_shipped_tunables() {
        let policy = EscalationPolicy::default();
        assert_eq!(policy.confidence_threshold, 0.6);
        assert!(policy.trigger_phrases.contains(&"cancel demo".to_string()));
        assert_eq!(policy.fallback_responses.len(), 5);

        let poll = PollConfig::default();
        assert_eq!(poll.interval(), Duration::from_secs(3));
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let policy: EscalationPolicy =
            serde_json::from_str(r#"{"confidence_threshold": 0.8}"#).unwrap();
        assert_eq!(policy.confidence_threshold, 0.8);
        assert!(!policy.trigger_phrases.is_empty());
    }
}
