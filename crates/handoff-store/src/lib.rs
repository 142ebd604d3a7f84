// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed reference implementation of the Handoff store adapter.
//!
//! Documents live in a single `documents` table keyed by `(collection,
//! doc_id)` with a JSON body. The two semantics the conversation core
//! depends on are implemented here:
//! - merge-set performs a field-level deep merge inside one transaction;
//! - array append skips values already present (array-union), which is what
//!   makes repeated transcript appends idempotent.
//!
//! Every successful write emits a [`ChangeEvent`](handoff_core::types::ChangeEvent)
//! on the collection's broadcast channel.

pub mod adapter;
pub mod database;
pub mod merge;

pub use adapter::{SqliteStore, StoreConfig};
