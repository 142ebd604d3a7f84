// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store adapter trait abstracting the external document database.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::HandoffError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ChangeEvent;

/// Adapter for the document-oriented store backing the conversation core.
///
/// Documents are addressed by `(collection, id)` and carried as JSON values.
/// The core depends on two atomicity guarantees the store must provide:
/// merge-set never interleaves with another writer's merge, and array append
/// deduplicates against the values already present. Neither is implemented
/// here; the core only consumes them.
#[async_trait]
pub trait StoreAdapter: PluginAdapter {
    /// Initializes the storage backend (schema, connections).
    async fn initialize(&self) -> Result<(), HandoffError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), HandoffError>;

    /// Reads a single document, or `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, HandoffError>;

    /// Writes a document. With `merge` set, `fields` is deep-merged into the
    /// existing document (absent fields survive); otherwise the document is
    /// replaced wholesale.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
        merge: bool,
    ) -> Result<(), HandoffError>;

    /// Appends `items` to an array field, skipping values already present
    /// (array-union semantics). Creates the document and the field on demand.
    async fn append_to_array(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        items: Vec<Value>,
    ) -> Result<(), HandoffError>;

    /// Lists every `(id, document)` pair in a collection.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, HandoffError>;

    /// Subscribes to change events for one collection. Every successful
    /// write through this adapter emits an event after it is durable.
    fn subscribe(&self, collection: &str) -> broadcast::Receiver<ChangeEvent>;
}
