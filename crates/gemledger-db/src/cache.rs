//! # Local Cache
//!
//! Durable write-through mirror of every collection and the offline
//! fallback for reads.
//!
//! ## Failure Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation            On storage or serialization error                 │
//! │  ───────────────────  ──────────────────────────────────────────────    │
//! │  put / put_all_pair   logged, write dropped, store unchanged            │
//! │  get / get_all        logged, treated as "no data"                      │
//! │  remove / remove_all  logged, nothing removed                           │
//! │  load_settings        logged, defaults returned                         │
//! │  get_value            logged, None                                      │
//! │                                                                         │
//! │  Nothing here returns an error to the caller.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes return `true` when they reached disk so callers that care (backup
//! restore) can report it; most callers ignore the flag.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::repository::kv::KeyValueRepository;
use crate::repository::record::RecordRepository;
use gemledger_core::{Collection, LocalKey, Record, Settings};

/// Infallible facade over the record and key-value repositories.
#[derive(Debug, Clone)]
pub struct LocalCache {
    records: RecordRepository,
    kv: KeyValueRepository,
}

impl LocalCache {
    pub fn new(records: RecordRepository, kv: KeyValueRepository) -> Self {
        LocalCache { records, kv }
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Upserts a record by id.
    pub async fn put<R: Record>(&self, record: &R) -> bool {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(e) => {
                error!(collection = %R::COLLECTION, id = %record.id(), error = %e, "Failed to encode record");
                return false;
            }
        };

        match self.records.upsert(R::COLLECTION, record.id(), &payload).await {
            Ok(()) => true,
            Err(e) => {
                error!(collection = %R::COLLECTION, id = %record.id(), error = %e, "Local write dropped");
                false
            }
        }
    }

    /// Looks up one record by its local id.
    pub async fn get<R: Record>(&self, id: &str) -> Option<R> {
        match self.records.get(R::COLLECTION, id).await {
            Ok(Some(row)) => decode(R::COLLECTION, &row.id, &row.payload),
            Ok(None) => None,
            Err(e) => {
                warn!(collection = %R::COLLECTION, id = %id, error = %e, "Local read failed");
                None
            }
        }
    }

    /// Every record of the collection in insertion order. Rows that no
    /// longer decode are skipped.
    pub async fn get_all<R: Record>(&self) -> Vec<R> {
        match self.records.list(R::COLLECTION).await {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| decode(R::COLLECTION, &row.id, &row.payload))
                .collect(),
            Err(e) => {
                warn!(collection = %R::COLLECTION, error = %e, "Local read failed, treating as empty");
                Vec::new()
            }
        }
    }

    /// Replaces two whole collections together, in one transaction. On
    /// failure neither changes.
    pub async fn put_all_pair<A: Record, B: Record>(&self, first: &[A], second: &[B]) -> bool {
        let (first, second) = match (encode_all(first), encode_all(second)) {
            (Some(first), Some(second)) => (first, second),
            _ => return false,
        };
        let batches = [
            (A::COLLECTION, first.as_slice()),
            (B::COLLECTION, second.as_slice()),
        ];

        match self.records.replace_many(&batches).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Local replace dropped");
                false
            }
        }
    }

    pub async fn remove(&self, collection: Collection, id: &str) -> bool {
        match self.records.delete(collection, id).await {
            Ok(removed) => removed,
            Err(e) => {
                error!(collection = %collection, id = %id, error = %e, "Local delete failed");
                false
            }
        }
    }

    pub async fn remove_all(&self, collection: Collection) -> bool {
        match self.records.delete_all(collection).await {
            Ok(_) => true,
            Err(e) => {
                error!(collection = %collection, error = %e, "Local clear failed");
                false
            }
        }
    }

    pub async fn count(&self, collection: Collection) -> usize {
        match self.records.count(collection).await {
            Ok(count) => count.max(0) as usize,
            Err(e) => {
                warn!(collection = %collection, error = %e, "Local count failed");
                0
            }
        }
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Persisted settings merged over the defaults.
    pub async fn load_settings(&self) -> Settings {
        let mut settings = Settings::default();
        let stored: Option<serde_json::Value> = self.read_json(Collection::Settings.storage_key()).await;

        if let Some(patch) = stored {
            if let Err(e) = settings.merge(&patch) {
                warn!(error = %e, "Stored settings ignored");
                return Settings::default();
            }
        }
        settings
    }

    pub async fn save_settings(&self, settings: &Settings) -> bool {
        self.write_json(Collection::Settings.storage_key(), settings).await
    }

    // =========================================================================
    // Single-value keys
    // =========================================================================

    pub async fn get_value<T: DeserializeOwned>(&self, key: LocalKey) -> Option<T> {
        self.read_json(key.as_str()).await
    }

    pub async fn set_value<T: Serialize + ?Sized>(&self, key: LocalKey, value: &T) -> bool {
        self.write_json(key.as_str(), value).await
    }

    pub async fn remove_value(&self, key: LocalKey) -> bool {
        match self.kv.delete(key.as_str()).await {
            Ok(existed) => existed,
            Err(e) => {
                error!(key = %key.as_str(), error = %e, "Local delete failed");
                false
            }
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let text = match self.kv.get(key).await {
            Ok(text) => text?,
            Err(e) => {
                warn!(key = %key, error = %e, "Local read failed");
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Stored value does not decode, ignoring");
                None
            }
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(e) => {
                error!(key = %key, error = %e, "Failed to encode value");
                return false;
            }
        };

        match self.kv.set(key, &text).await {
            Ok(()) => true,
            Err(e) => {
                error!(key = %key, error = %e, "Local write dropped");
                false
            }
        }
    }
}

fn decode<R: Record>(collection: Collection, id: &str, payload: &str) -> Option<R> {
    match serde_json::from_str(payload) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(collection = %collection, id = %id, error = %e, "Skipping undecodable cached record");
            None
        }
    }
}

fn encode_all<R: Record>(records: &[R]) -> Option<Vec<(String, String)>> {
    let mut items = Vec::with_capacity(records.len());
    for record in records {
        match serde_json::to_string(record) {
            Ok(payload) => items.push((record.id().to_string(), payload)),
            Err(e) => {
                error!(collection = %R::COLLECTION, id = %record.id(), error = %e, "Failed to encode record");
                return None;
            }
        }
    }
    Some(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{TimeZone, Utc};
    use gemledger_core::{Customer, Sale, SessionUser};

    async fn setup() -> (Database, LocalCache) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cache = db.cache();
        (db, cache)
    }

    fn customer(name: &str, phone: &str) -> Customer {
        Customer::new(name, phone, None, None, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_get_all() {
        let (_db, cache) = setup().await;
        assert!(cache.get_all::<Customer>().await.is_empty());

        let mut a = customer("Asha", "1");
        let b = customer("Ravi", "2");
        assert!(cache.put(&a).await);
        assert!(cache.put(&b).await);

        a.name = "Asha M".to_string();
        cache.put(&a).await;

        let all = cache.get_all::<Customer>().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Asha M");
        let fetched = cache.get::<Customer>(&b.id).await;
        assert_eq!(fetched, Some(b));
    }

    #[tokio::test]
    async fn test_remove_and_remove_all() {
        let (_db, cache) = setup().await;
        let a = customer("Asha", "1");
        cache.put(&a).await;
        cache.put(&customer("Ravi", "2")).await;

        assert!(cache.remove(Collection::Customers, &a.id).await);
        assert_eq!(cache.count(Collection::Customers).await, 1);
        assert!(cache.remove_all(Collection::Customers).await);
        assert!(cache.get_all::<Customer>().await.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_rows_are_skipped() {
        let (db, cache) = setup().await;
        cache.put(&customer("Asha", "1")).await;
        db.records()
            .upsert(Collection::Customers, "broken", "{not json")
            .await
            .unwrap();

        let all = cache.get_all::<Customer>().await;
        assert_eq!(all.len(), 1);
        assert!(cache.get::<Customer>("broken").await.is_none());
    }

    #[tokio::test]
    async fn test_settings_round_trip_and_defaults() {
        let (db, cache) = setup().await;
        assert_eq!(cache.load_settings().await, Settings::default());

        let mut settings = Settings::default();
        settings.currency_symbol = "$".to_string();
        assert!(cache.save_settings(&settings).await);
        assert_eq!(cache.load_settings().await.currency_symbol, "$");

        db.kv()
            .set(Collection::Settings.storage_key(), "[1,2]")
            .await
            .unwrap();
        assert_eq!(cache.load_settings().await, Settings::default());
    }

    #[tokio::test]
    async fn test_local_keys() {
        let (_db, cache) = setup().await;
        let user = SessionUser {
            username: "admin".to_string(),
            login_time: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        };

        assert!(cache.get_value::<SessionUser>(LocalKey::Session).await.is_none());
        cache.set_value(LocalKey::Session, &user).await;
        let stored = cache.get_value::<SessionUser>(LocalKey::Session).await;
        assert_eq!(stored, Some(user));

        assert!(cache.remove_value(LocalKey::Session).await);
        assert!(cache.get_value::<SessionUser>(LocalKey::Session).await.is_none());
    }

    #[tokio::test]
    async fn test_closed_pool_degrades_silently() {
        let (db, cache) = setup().await;
        db.close().await;

        assert!(!cache.put(&customer("Asha", "1")).await);
        assert!(cache.get_all::<Customer>().await.is_empty());
        assert_eq!(cache.load_settings().await, Settings::default());
        assert!(!cache.remove_all(Collection::Sales).await);
    }

    #[tokio::test]
    async fn test_put_all_pair_replaces_both_collections() {
        let (_db, cache) = setup().await;
        cache.put(&customer("Old", "0")).await;
        let fresh = vec![customer("Asha", "1"), customer("Ravi", "2")];
        assert!(cache.put_all_pair::<Sale, Customer>(&[], &fresh).await);

        assert!(cache.get_all::<Sale>().await.is_empty());

        let names: Vec<_> = cache
            .get_all::<Customer>()
            .await
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Asha", "Ravi"]);
    }
}
