//! # In-Memory Document Store
//!
//! Process-local [`DocumentStore`]. Backs the `memory` backend and every
//! reconciler test.
//!
//! Test hooks:
//! - `set_failing(true)` makes every call fail
//! - `fail_next_writes(n)` fails only the next `n` writes
//! - `write_count()` counts successful add/update/delete calls

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use gemledger_core::{new_record_id, RemoteQuery};

use super::{DocumentStore, RemoteDocument};
use crate::error::{SyncError, SyncResult};

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<RemoteDocument>>>,
    failing: AtomicBool,
    failures_pending: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Seeds a document under a chosen id, bypassing the counters.
    pub async fn insert_document(&self, collection: &str, id: &str, data: Value) {
        let mut collections = self.collections.lock().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(RemoteDocument {
                id: id.to_string(),
                data,
            });
    }

    /// Snapshot of a collection in insertion order.
    pub async fn documents(&self, collection: &str) -> Vec<RemoteDocument> {
        let collections = self.collections.lock().await;
        collections.get(collection).cloned().unwrap_or_default()
    }

    fn check_read(&self) -> SyncResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteUnavailable("injected failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> SyncResult<()> {
        self.check_read()?;

        let injected = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(SyncError::RemoteUnavailable("injected write failure".into()));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn created_at(doc: &RemoteDocument) -> Option<DateTime<Utc>> {
    doc.data
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add(&self, collection: &str, data: &Value) -> SyncResult<String> {
        self.check_write()?;

        let id = new_record_id();
        let mut collections = self.collections.lock().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(RemoteDocument {
                id: id.clone(),
                data: data.clone(),
            });
        self.record_write();

        debug!(collection = %collection, remote_id = %id, "Memory store add");
        Ok(id)
    }

    async fn query(&self, collection: &str, query: &RemoteQuery) -> SyncResult<Vec<RemoteDocument>> {
        self.check_read()?;

        let collections = self.collections.lock().await;
        let mut docs: Vec<RemoteDocument> = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| query.matches(&d.data)).cloned().collect())
            .unwrap_or_default();

        // Undated documents sort last.
        docs.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
        Ok(docs)
    }

    async fn update(&self, collection: &str, id: &str, patch: &Value) -> SyncResult<()> {
        self.check_write()?;

        let mut collections = self.collections.lock().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| SyncError::RemoteUnavailable(format!("no document {}/{}", collection, id)))?;

        match (&mut doc.data, patch) {
            (Value::Object(current), Value::Object(fields)) => {
                for (key, value) in fields {
                    if value.is_null() {
                        current.remove(key);
                    } else {
                        current.insert(key.clone(), value.clone());
                    }
                }
            }
            (data, patch) => *data = patch.clone(),
        }
        self.record_write();
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> SyncResult<()> {
        self.check_write()?;

        let mut collections = self.collections.lock().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
        self.record_write();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_query_orders_by_created_at_desc() {
        let store = MemoryDocumentStore::new();
        store.add("sales", &json!({"n": 1, "createdAt": "2024-01-01T00:00:00Z"})).await.unwrap();
        store.add("sales", &json!({"n": 2, "createdAt": "2024-03-01T00:00:00Z"})).await.unwrap();
        store.add("sales", &json!({"n": 3})).await.unwrap();
        store.add("sales", &json!({"n": 4, "createdAt": "2024-02-01T00:00:00Z"})).await.unwrap();

        let docs = store.query("sales", &RemoteQuery::default()).await.unwrap();
        let order: Vec<_> = docs.iter().map(|d| d.data["n"].as_i64().unwrap()).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
    }

    #[tokio::test]
    async fn test_query_applies_filters() {
        let store = MemoryDocumentStore::new();
        store.add("sales", &json!({"paymentMode": "UPI"})).await.unwrap();
        store.add("sales", &json!({"paymentMode": "Cash"})).await.unwrap();

        let query = RemoteQuery::default().with_equals("paymentMode", "Cash");
        assert_eq!(store.query("sales", &query).await.unwrap().len(), 1);
        assert!(store.query("customers", &query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_and_delete_removes() {
        let store = MemoryDocumentStore::new();
        let id = store.add("customers", &json!({"name": "A", "phone": "1"})).await.unwrap();

        store.update("customers", &id, &json!({"name": "B"})).await.unwrap();
        let docs = store.documents("customers").await;
        assert_eq!(docs[0].data, json!({"name": "B", "phone": "1"}));

        store.update("customers", &id, &json!({"phone": null})).await.unwrap();
        let docs = store.documents("customers").await;
        assert_eq!(docs[0].data, json!({"name": "B"}));

        assert!(store.update("customers", "missing", &json!({})).await.is_err());

        store.delete("customers", &id).await.unwrap();
        assert!(store.documents("customers").await.is_empty());
        assert_eq!(store.write_count(), 4);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryDocumentStore::new();
        store.fail_next_writes(1);
        assert!(store.add("sales", &json!({})).await.is_err());
        assert!(store.add("sales", &json!({})).await.is_ok());
        assert_eq!(store.write_count(), 1);

        store.set_failing(true);
        assert!(store.query("sales", &RemoteQuery::default()).await.is_err());
        store.set_failing(false);
        assert_eq!(store.query("sales", &RemoteQuery::default()).await.unwrap().len(), 1);
    }
}
