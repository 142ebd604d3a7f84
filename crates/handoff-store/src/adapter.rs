// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StoreAdapter trait.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{OnceCell, broadcast};
use tracing::debug;

use handoff_core::types::ChangeEvent;
use handoff_core::{
    AdapterType, HandoffError, HealthStatus, PluginAdapter, StoreAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::merge;

/// Capacity of each collection's change-event broadcast channel. A slow
/// subscriber only loses notifications, never data; the next poll re-reads
/// the full snapshot anyway.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub database_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: "handoff.db".to_string(),
        }
    }
}

/// SQLite-backed document store.
///
/// Wraps a [`Database`] handle; the connection is lazily opened on the first
/// call to [`StoreAdapter::initialize`]. All writes run inside a transaction
/// on tokio-rusqlite's single background thread, which is what upholds the
/// merge/append atomicity the conversation core depends on.
pub struct SqliteStore {
    config: StoreConfig,
    db: OnceCell<Database>,
    channels: Mutex<HashMap<String, broadcast::Sender<ChangeEvent>>>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database is not opened until [`initialize`](StoreAdapter::initialize)
    /// is called.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, HandoffError> {
        self.db.get().ok_or_else(|| {
            HandoffError::store("store not initialized -- call initialize() first")
        })
    }

    /// Emits a change event on the collection's channel, if anyone listens.
    fn notify(&self, collection: &str, doc_id: &str, document: Value) {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = channels.get(collection) {
            let _ = tx.send(ChangeEvent {
                collection: collection.to_string(),
                doc_id: doc_id.to_string(),
                document,
            });
        }
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoffError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HandoffError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StoreAdapter for SqliteStore {
    async fn initialize(&self) -> Result<(), HandoffError> {
        let db = Database::open(&self.config.database_path).await?;
        self.db
            .set(db)
            .map_err(|_| HandoffError::store("store already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite document store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), HandoffError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, HandoffError> {
        let db = self.db()?;
        let (c, i) = (collection.to_string(), id.to_string());
        let raw: Option<String> = db
            .connection()
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                let row = conn
                    .query_row(
                        "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2",
                        params![c, i],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(map_tr_err)?;

        match raw {
            Some(body) => Ok(Some(
                serde_json::from_str(&body).map_err(HandoffError::store)?,
            )),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
        merge: bool,
    ) -> Result<(), HandoffError> {
        let db = self.db()?;
        let (c, i) = (collection.to_string(), id.to_string());
        let document = db
            .connection()
            .call(move |conn| -> Result<Value, rusqlite::Error> {
                let tx = conn.transaction()?;
                let existing: Option<String> = tx
                    .query_row(
                        "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2",
                        params![c, i],
                        |row| row.get(0),
                    )
                    .optional()?;

                let mut doc = match (existing, merge) {
                    (Some(raw), true) => serde_json::from_str(&raw)
                        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
                    _ => Value::Object(Default::default()),
                };
                merge::deep_merge(&mut doc, fields);

                tx.execute(
                    "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3)
                     ON CONFLICT (collection, doc_id) DO UPDATE SET
                       body = excluded.body,
                       updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                    params![c, i, doc.to_string()],
                )?;
                tx.commit()?;
                Ok(doc)
            })
            .await
            .map_err(map_tr_err)?;

        self.notify(collection, id, document);
        Ok(())
    }

    async fn append_to_array(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        items: Vec<Value>,
    ) -> Result<(), HandoffError> {
        let db = self.db()?;
        let (c, i, f) = (collection.to_string(), id.to_string(), field.to_string());
        let document = db
            .connection()
            .call(move |conn| -> Result<Value, rusqlite::Error> {
                let tx = conn.transaction()?;
                let existing: Option<String> = tx
                    .query_row(
                        "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2",
                        params![c, i],
                        |row| row.get(0),
                    )
                    .optional()?;

                let mut doc: Value = match existing {
                    Some(raw) => serde_json::from_str(&raw)
                        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
                    None => Value::Object(Default::default()),
                };

                let array = doc
                    .as_object_mut()
                    .ok_or_else(|| {
                        rusqlite::Error::ToSqlConversionFailure(
                            "document body is not an object".into(),
                        )
                    })?
                    .entry(f.clone())
                    .or_insert_with(|| Value::Array(Vec::new()))
                    .as_array_mut()
                    .ok_or_else(|| {
                        rusqlite::Error::ToSqlConversionFailure(
                            format!("field {f} exists and is not an array").into(),
                        )
                    })?;
                merge::array_union(array, items);

                tx.execute(
                    "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3)
                     ON CONFLICT (collection, doc_id) DO UPDATE SET
                       body = excluded.body,
                       updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                    params![c, i, doc.to_string()],
                )?;
                tx.commit()?;
                Ok(doc)
            })
            .await
            .map_err(map_tr_err)?;

        self.notify(collection, id, document);
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, HandoffError> {
        let db = self.db()?;
        let c = collection.to_string();
        let rows: Vec<(String, String)> = db
            .connection()
            .call(move |conn| -> Result<Vec<(String, String)>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT doc_id, body FROM documents WHERE collection = ?1 ORDER BY doc_id",
                )?;
                let mapped = stmt.query_map(params![c], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;
                let mut rows = Vec::new();
                for row in mapped {
                    rows.push(row?);
                }
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)?;

        rows.into_iter()
            .map(|(id, body)| {
                let doc = serde_json::from_str(&body).map_err(HandoffError::store)?;
                Ok((id, doc))
            })
            .collect()
    }

    fn subscribe(&self, collection: &str) -> broadcast::Receiver<ChangeEvent> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn open_store() -> (SqliteStore, tempfile::TempDir) {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let store = SqliteStore::new(StoreConfig {
            database_path: tmp.path().join("test.db").to_string_lossy().to_string(),
        });
        store.initialize().await.expect("initialize");
        (store, tmp)
    }

    #[tokio::test]
    async fn get_absent_document_returns_none() {
        let (store, _tmp) = open_store().await;
        assert!(store.get("escalations", "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn merge_set_preserves_unmentioned_fields() {
        let (store, _tmp) = open_store().await;
        store
            .set("escalations", "u-1", json!({"userName": "Ada", "status": "pending"}), true)
            .await
            .unwrap();
        store
            .set("escalations", "u-1", json!({"title": "cancel demo"}), true)
            .await
            .unwrap();

        let doc = store.get("escalations", "u-1").await.unwrap().unwrap();
        assert_eq!(doc["userName"], "Ada");
        assert_eq!(doc["title"], "cancel demo");
    }

    #[tokio::test]
    async fn plain_set_replaces_the_document() {
        let (store, _tmp) = open_store().await;
        store
            .set("users", "u-1", json!({"userKey": "k1", "extra": true}), false)
            .await
            .unwrap();
        store.set("users", "u-1", json!({"userKey": "k2"}), false).await.unwrap();

        let doc = store.get("users", "u-1").await.unwrap().unwrap();
        assert_eq!(doc, json!({"userKey": "k2"}));
    }

    #[tokio::test]
    async fn append_to_array_deduplicates_across_calls() {
        let (store, _tmp) = open_store().await;
        let msg = json!({"text": "hi", "sender": "user", "createdAt": 1});
        store
            .append_to_array("escalations", "u-1", "messages", vec![msg.clone()])
            .await
            .unwrap();
        store
            .append_to_array(
                "escalations",
                "u-1",
                "messages",
                vec![msg, json!({"text": "yo", "sender": "bot", "createdAt": 2})],
            )
            .await
            .unwrap();

        let doc = store.get("escalations", "u-1").await.unwrap().unwrap();
        assert_eq!(doc["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn subscribers_receive_change_events() {
        let (store, _tmp) = open_store().await;
        let mut rx = store.subscribe("escalations");

        store
            .set("escalations", "u-9", json!({"status": "pending"}), true)
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.collection, "escalations");
        assert_eq!(event.doc_id, "u-9");
        assert_eq!(event.document["status"], "pending");
    }

    #[tokio::test]
    async fn list_returns_all_documents_in_id_order() {
        let (store, _tmp) = open_store().await;
        store.set("clients", "b", json!({"name": "B"}), true).await.unwrap();
        store.set("clients", "a", json!({"name": "A"}), true).await.unwrap();

        let docs = store.list("clients").await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].0, "a");
        assert_eq!(docs[1].0, "b");
    }
}
