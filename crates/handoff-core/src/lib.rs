// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Handoff conversation core.
//!
//! This crate provides the trait definitions, error type, and common types
//! shared by the Handoff workspace: the document-store and vendor-API
//! adapter contracts, the message/summary/escalation domain types, and the
//! boundary [`Timestamp`](types::Timestamp) normalization.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::HandoffError;
pub use types::{AdapterType, ConversationId, HealthStatus, MessageId, Sender, UserId};

// Re-export the adapter traits at crate root.
pub use traits::{PluginAdapter, StoreAdapter, VendorAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handoff_error_has_all_variants() {
        let _config = HandoffError::Config("test".into());
        let _store = HandoffError::store(std::io::Error::other("test"));
        let _vendor = HandoffError::vendor("test");
        let _timeout = HandoffError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = HandoffError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        for variant in [AdapterType::Store, AdapterType::Vendor] {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn adapter_traits_are_object_safe() {
        fn _store(_: &dyn StoreAdapter) {}
        fn _vendor(_: &dyn VendorAdapter) {}
    }
}
