//! # Remote Store Adapter
//!
//! Mirrors local cache operations into a network document store while the
//! connectivity flag is up.
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Reconciler                                                             │
//! │      │  add_record / update_record / query_records / delete_document    │
//! │      ▼                                                                  │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  RemoteStore                                                    │   │
//! │  │  • offline or no backend  → RemoteUnavailable (fail fast)       │   │
//! │  │  • any backend error      → RemoteUnavailable                   │   │
//! │  │  • record ⇄ JSON document, document id becomes remoteId         │   │
//! │  └──────────────────────────────┬──────────────────────────────────┘   │
//! │                                 │  dyn DocumentStore                    │
//! │               ┌─────────────────┴──────────────────┐                    │
//! │               ▼                                    ▼                    │
//! │      HttpDocumentStore                    MemoryDocumentStore           │
//! │      (reqwest, REST JSON)                 (in-process, tests)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No call here retries or imposes its own timeout beyond the backend's.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use gemledger_core::{Collection, Record, RemoteQuery};

use crate::config::{RemoteBackend, SyncConfig};
use crate::error::{SyncError, SyncResult};

pub use http::HttpDocumentStore;
pub use memory::MemoryDocumentStore;

/// Field holding the store-assigned id on a local record. Never written to
/// the remote document itself.
const REMOTE_ID_FIELD: &str = "remoteId";

// =============================================================================
// Document Store
// =============================================================================

/// A document as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    /// Store-assigned document id.
    pub id: String,
    pub data: Value,
}

/// A JSON document database keyed by collection name.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores a new document and returns the id the store assigned.
    async fn add(&self, collection: &str, data: &Value) -> SyncResult<String>;

    /// Documents matching `query`, most recently created first.
    async fn query(&self, collection: &str, query: &RemoteQuery) -> SyncResult<Vec<RemoteDocument>>;

    /// Merges `patch` into the document. A `null` value removes the field.
    async fn update(&self, collection: &str, id: &str, patch: &Value) -> SyncResult<()>;

    async fn delete(&self, collection: &str, id: &str) -> SyncResult<()>;
}

// =============================================================================
// Connectivity
// =============================================================================

/// Shared online/offline flag.
///
/// Clones observe the same flag. Subscribers see every transition.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Connectivity { tx: Arc::new(tx) }
    }

    /// Sets the flag. Returns true when the value actually changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            info!(online, "Connectivity changed");
        }
        changed
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Connectivity::new(true)
    }
}

// =============================================================================
// Remote Store
// =============================================================================

/// Connectivity-aware adapter over a [`DocumentStore`].
#[derive(Clone)]
pub struct RemoteStore {
    store: Option<Arc<dyn DocumentStore>>,
    connectivity: Connectivity,
}

impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore")
            .field("enabled", &self.store.is_some())
            .field("online", &self.connectivity.is_online())
            .finish()
    }
}

impl RemoteStore {
    pub fn new(store: Arc<dyn DocumentStore>, connectivity: Connectivity) -> Self {
        RemoteStore {
            store: Some(store),
            connectivity,
        }
    }

    /// A store with no backend: every call reports `RemoteUnavailable`.
    pub fn disabled(connectivity: Connectivity) -> Self {
        RemoteStore {
            store: None,
            connectivity,
        }
    }

    /// Builds the backend named by the configuration.
    pub fn from_config(config: &SyncConfig, connectivity: Connectivity) -> SyncResult<Self> {
        match config.backend() {
            RemoteBackend::Http => {
                let store = HttpDocumentStore::from_config(config)?;
                info!(base_url = ?config.base_url(), "Using HTTP document store");
                Ok(RemoteStore::new(Arc::new(store), connectivity))
            }
            RemoteBackend::Memory => {
                info!("Using in-memory document store");
                Ok(RemoteStore::new(Arc::new(MemoryDocumentStore::new()), connectivity))
            }
            RemoteBackend::None => {
                info!("Remote store disabled, running local-only");
                Ok(RemoteStore::disabled(connectivity))
            }
        }
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// True when a backend exists and the flag is up.
    pub fn is_online(&self) -> bool {
        self.is_enabled() && self.connectivity.is_online()
    }

    fn available(&self) -> SyncResult<&Arc<dyn DocumentStore>> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| SyncError::RemoteUnavailable("no remote store configured".into()))?;

        if !self.connectivity.is_online() {
            return Err(SyncError::RemoteUnavailable("offline".into()));
        }
        Ok(store)
    }

    // =========================================================================
    // Raw Documents
    // =========================================================================

    pub async fn add_document(&self, collection: &str, data: &Value) -> SyncResult<String> {
        let store = self.available()?;
        let id = store
            .add(collection, data)
            .await
            .map_err(|e| unavailable(collection, "add", e))?;

        debug!(collection = %collection, remote_id = %id, "Remote document added");
        Ok(id)
    }

    pub async fn query_documents(
        &self,
        collection: &str,
        query: &RemoteQuery,
    ) -> SyncResult<Vec<RemoteDocument>> {
        let store = self.available()?;
        let docs = store
            .query(collection, query)
            .await
            .map_err(|e| unavailable(collection, "query", e))?;

        debug!(collection = %collection, count = docs.len(), "Remote query returned");
        Ok(docs)
    }

    pub async fn update_document(&self, collection: &str, id: &str, patch: &Value) -> SyncResult<()> {
        let store = self.available()?;
        store
            .update(collection, id, patch)
            .await
            .map_err(|e| unavailable(collection, "update", e))?;

        debug!(collection = %collection, remote_id = %id, "Remote document updated");
        Ok(())
    }

    pub async fn delete_document(&self, collection: &str, id: &str) -> SyncResult<()> {
        let store = self.available()?;
        store
            .delete(collection, id)
            .await
            .map_err(|e| unavailable(collection, "delete", e))?;

        debug!(collection = %collection, remote_id = %id, "Remote document deleted");
        Ok(())
    }

    // =========================================================================
    // Typed Records
    // =========================================================================

    /// Stores a record as a new document; returns its remote id.
    pub async fn add_record<R: Record>(&self, record: &R) -> SyncResult<String> {
        let data = to_document(record)?;
        self.add_document(R::COLLECTION.as_str(), &data).await
    }

    /// Overwrites the fields of an already-synced record.
    ///
    /// Cleared optional fields go out as `null` and legacy field names are
    /// nulled too, so the patched document reads back exactly as `record`.
    pub async fn update_record<R: Record>(&self, record: &R) -> SyncResult<()> {
        let remote_id = record.remote_id().ok_or_else(|| {
            SyncError::Internal(format!("record {} has no remote id", record.id()))
        })?;
        let mut data = to_document(record)?;
        if let Value::Object(ref mut map) = data {
            for legacy in R::LEGACY_FIELDS {
                map.entry(legacy.to_string()).or_insert(Value::Null);
            }
        }
        self.update_document(R::COLLECTION.as_str(), remote_id, &data).await
    }

    /// Records matching `query`. Documents that do not decode are skipped.
    pub async fn query_records<R: Record>(&self, query: &RemoteQuery) -> SyncResult<Vec<R>> {
        let docs = self.query_documents(R::COLLECTION.as_str(), query).await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| from_document::<R>(doc))
            .collect())
    }

    pub async fn delete_in(&self, collection: Collection, remote_id: &str) -> SyncResult<()> {
        self.delete_document(collection.as_str(), remote_id).await
    }
}

fn unavailable(collection: &str, op: &str, err: SyncError) -> SyncError {
    warn!(collection = %collection, op, error = %err, "Remote store call failed");
    err.into_remote_unavailable()
}

/// Record → document body, minus the local-only remote id.
fn to_document<R: Record>(record: &R) -> SyncResult<Value> {
    let mut data = serde_json::to_value(record)?;
    if let Value::Object(ref mut map) = data {
        map.remove(REMOTE_ID_FIELD);
    }
    Ok(data)
}

/// Document → record. Documents created elsewhere may lack an `id`; the
/// document id stands in for it.
fn from_document<R: Record>(doc: RemoteDocument) -> Option<R> {
    let RemoteDocument { id, data } = doc;

    let mut map = match data {
        Value::Object(map) => map,
        other => {
            warn!(remote_id = %id, kind = ?other, "Remote document is not an object, skipping");
            return None;
        }
    };

    let missing_id = map
        .get("id")
        .and_then(Value::as_str)
        .map(str::is_empty)
        .unwrap_or(true);
    if missing_id {
        map.insert("id".to_string(), Value::String(id.clone()));
    }
    map.insert(REMOTE_ID_FIELD.to_string(), Value::String(id.clone()));

    match serde_json::from_value::<R>(Value::Object(map)) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(collection = %R::COLLECTION, remote_id = %id, error = %e, "Undecodable remote document, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gemledger_core::Customer;
    use serde_json::json;

    fn customer(name: &str) -> Customer {
        Customer::new(name, "90000", None, None, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_connectivity_transitions() {
        let connectivity = Connectivity::new(false);
        let mut rx = connectivity.subscribe();

        assert!(!connectivity.is_online());
        assert!(connectivity.set_online(true));
        assert!(!connectivity.set_online(true));
        assert!(connectivity.is_online());
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());

        let clone = connectivity.clone();
        clone.set_online(false);
        assert!(!connectivity.is_online());
    }

    #[tokio::test]
    async fn test_offline_fails_fast() {
        let memory = Arc::new(MemoryDocumentStore::new());
        let remote = RemoteStore::new(memory.clone(), Connectivity::new(false));

        let err = remote.add_record(&customer("Asha")).await.unwrap_err();
        assert!(err.is_remote_unavailable());
        assert_eq!(memory.write_count(), 0);
        assert!(!remote.is_online());
    }

    #[tokio::test]
    async fn test_disabled_store_is_unavailable() {
        let remote = RemoteStore::disabled(Connectivity::new(true));
        assert!(!remote.is_online());
        let err = remote
            .query_records::<Customer>(&RemoteQuery::default())
            .await
            .unwrap_err();
        assert!(err.is_remote_unavailable());
    }

    #[tokio::test]
    async fn test_backend_errors_become_unavailable() {
        let memory = Arc::new(MemoryDocumentStore::new());
        memory.set_failing(true);
        let remote = RemoteStore::new(memory, Connectivity::new(true));

        let err = remote.add_record(&customer("Asha")).await.unwrap_err();
        assert!(err.is_remote_unavailable());
    }

    #[tokio::test]
    async fn test_record_round_trip_sets_remote_id() {
        let memory = Arc::new(MemoryDocumentStore::new());
        let remote = RemoteStore::new(memory.clone(), Connectivity::new(true));

        let local = customer("Asha");
        let remote_id = remote.add_record(&local).await.unwrap();

        let stored = memory.documents("customers").await;
        assert_eq!(stored.len(), 1);
        assert!(stored[0].data.get("remoteId").is_none());

        let fetched: Vec<Customer> = remote.query_records(&RemoteQuery::default()).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, local.id);
        assert_eq!(fetched[0].remote_id.as_deref(), Some(remote_id.as_str()));
    }

    #[tokio::test]
    async fn test_foreign_documents_take_document_id() {
        let memory = Arc::new(MemoryDocumentStore::new());
        memory
            .insert_document(
                "customers",
                "doc-1",
                json!({"name": "Legacy", "phoneNumber": "123", "createdAt": "2023-01-01T00:00:00Z"}),
            )
            .await;
        memory.insert_document("customers", "doc-2", json!("garbage")).await;

        let remote = RemoteStore::new(memory, Connectivity::new(true));
        let fetched: Vec<Customer> = remote.query_records(&RemoteQuery::default()).await.unwrap();

        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, "doc-1");
        assert_eq!(fetched[0].phone, "123");
    }

    #[tokio::test]
    async fn test_update_clears_removed_fields() {
        let memory = Arc::new(MemoryDocumentStore::new());
        memory
            .insert_document(
                "customers",
                "doc-1",
                json!({
                    "id": "c1",
                    "name": "Legacy",
                    "phoneNumber": "123",
                    "email": "old@mail.com",
                    "createdAt": "2023-01-01T00:00:00Z"
                }),
            )
            .await;
        let remote = RemoteStore::new(memory.clone(), Connectivity::new(true));

        let mut fetched: Vec<Customer> = remote.query_records(&RemoteQuery::default()).await.unwrap();
        let mut customer = fetched.remove(0);
        assert_eq!(customer.email.as_deref(), Some("old@mail.com"));

        customer.email = None;
        remote.update_record(&customer).await.unwrap();

        let doc = &memory.documents("customers").await[0].data;
        assert!(doc.get("email").is_none());
        assert!(doc.get("phoneNumber").is_none());
        assert_eq!(doc["phone"], "123");

        let fetched: Vec<Customer> = remote.query_records(&RemoteQuery::default()).await.unwrap();
        assert_eq!(fetched[0], customer);
    }

    #[tokio::test]
    async fn test_update_requires_remote_id() {
        let remote = RemoteStore::new(Arc::new(MemoryDocumentStore::new()), Connectivity::new(true));
        let err = remote.update_record(&customer("Asha")).await.unwrap_err();
        assert!(matches!(err, SyncError::Internal(_)));
    }
}
