//! # Reconciler
//!
//! One consistent view of each collection, merged from the local cache and
//! the remote store, plus the pass that pushes local-only records out.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  write(record)                                                          │
//! │      │                                                                  │
//! │      ├── online?  remoteId? ── yes ──► RemoteStore::update_record       │
//! │      │                    └── no  ──► RemoteStore::add_record           │
//! │      │                                  └─► record.remoteId = new id    │
//! │      │            (failure: logged, never returned)                     │
//! │      │                                                                  │
//! │      └── LocalCache::put(record)   ◄── always, after the remote attempt │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Read Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  read(filter)                                                           │
//! │      1. remote = online ? query(whole collection) : []                  │
//! │                  (failure → [])                                         │
//! │      2. local  = LocalCache::get_all()                                  │
//! │      3. merged = remote ++ [l in local | l.id ∉ remote ids             │
//! │                                        and l.remoteId ∉ remote ids]     │
//! │      4. keep filter.matches(..)                                         │
//! │      5. sort createdAt desc                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A remote copy always wins over a local copy of the same record. The
//! remote fetch is unfiltered so that holds for filtered reads too.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use gemledger_core::filter::sort_recent_first;
use gemledger_core::{
    Collection, Customer, LocalKey, NoFilter, Record, RecordFilter, RemoteQuery, Sale,
};
use gemledger_db::LocalCache;

use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteStore;

// =============================================================================
// Reports
// =============================================================================

/// Outcome of one [`Reconciler::sync`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Local-only records that received a remote id.
    pub pushed: usize,

    /// Local-only records whose push failed; retried on the next pass.
    pub failed: usize,

    /// Queued remote deletions that went through.
    pub deletes_replayed: usize,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// A remote deletion that has not reached the store yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDelete {
    pub collection: Collection,
    pub remote_id: String,
}

// =============================================================================
// Reconciler
// =============================================================================

#[derive(Debug, Clone)]
pub struct Reconciler {
    cache: LocalCache,
    remote: RemoteStore,
}

impl Reconciler {
    pub fn new(cache: LocalCache, remote: RemoteStore) -> Self {
        Reconciler { cache, remote }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn remote(&self) -> &RemoteStore {
        &self.remote
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Persists a record: remote first when online, then always locally.
    ///
    /// Returns the record as stored locally, carrying its remote id when one
    /// was obtained. Remote failures are logged and swallowed.
    #[instrument(skip(self, record), fields(collection = %R::COLLECTION, id = %record.id()))]
    pub async fn write<R: Record>(&self, mut record: R) -> R {
        if self.remote.is_online() {
            match record.remote_id().map(str::to_string) {
                Some(remote_id) => {
                    if let Err(e) = self.remote.update_record(&record).await {
                        warn!(remote_id = %remote_id, error = %e, "Remote update skipped, kept locally");
                    }
                }
                None => match self.remote.add_record(&record).await {
                    Ok(remote_id) => {
                        debug!(remote_id = %remote_id, "Record stored remotely");
                        record.set_remote_id(remote_id);
                    }
                    Err(e) => warn!(error = %e, "Remote add skipped, kept locally"),
                },
            }
        }

        self.cache.put(&record).await;
        record
    }

    /// Applies `edit` to the record with the given id (local id or remote
    /// id) and writes it back, remote update included.
    ///
    /// `Ok(None)` when no such record is visible. An error from `edit`
    /// aborts before anything is written.
    pub async fn update<R, F, E>(&self, id: &str, edit: F) -> Result<Option<R>, E>
    where
        R: Record,
        F: FnOnce(&mut R) -> Result<(), E>,
    {
        let mut record = match self.find::<R>(id).await {
            Some(record) => record,
            None => return Ok(None),
        };
        edit(&mut record)?;
        Ok(Some(self.write(record).await))
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Merged, filtered view of a collection, most recent first.
    #[instrument(skip(self, filter), fields(collection = %R::COLLECTION))]
    pub async fn read<R, F>(&self, filter: &F) -> Vec<R>
    where
        R: Record,
        F: RecordFilter<R> + ?Sized,
    {
        let mut merged: Vec<R> = if self.remote.is_online() {
            match self.remote.query_records::<R>(&RemoteQuery::default()).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, "Remote read failed, using local cache only");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let mut seen: HashSet<String> = HashSet::with_capacity(merged.len() * 2);
        for record in &merged {
            seen.insert(record.id().to_string());
            if let Some(remote_id) = record.remote_id() {
                seen.insert(remote_id.to_string());
            }
        }

        let remote_count = merged.len();
        for record in self.cache.get_all::<R>().await {
            let duplicate = seen.contains(record.id())
                || record.remote_id().map(|r| seen.contains(r)).unwrap_or(false);
            if !duplicate {
                merged.push(record);
            }
        }
        debug!(remote = remote_count, total = merged.len(), "Merged remote and local records");

        merged.retain(|record| filter.matches(record));
        sort_recent_first(&mut merged);
        merged
    }

    /// The record with this local id or remote id, from the merged view.
    pub async fn find<R: Record>(&self, id: &str) -> Option<R> {
        self.read::<R, _>(&NoFilter)
            .await
            .into_iter()
            .find(|record| record.id() == id || record.remote_id() == Some(id))
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Deletes one record. Returns whether it existed.
    pub async fn delete<R: Record>(&self, id: &str) -> bool {
        self.delete_many::<R>(&[id.to_string()]).await == 1
    }

    /// Deletes every record whose local or remote id is listed.
    ///
    /// Local removal always happens. Remote deletions that cannot be made
    /// now are queued and replayed by [`Reconciler::sync`]. Returns the
    /// number of records removed.
    #[instrument(skip(self, ids), fields(collection = %R::COLLECTION, requested = ids.len()))]
    pub async fn delete_many<R: Record>(&self, ids: &[String]) -> usize {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let targets: Vec<R> = self
            .read::<R, _>(&NoFilter)
            .await
            .into_iter()
            .filter(|r| wanted.contains(r.id()) || r.remote_id().map(|id| wanted.contains(id)).unwrap_or(false))
            .collect();

        let mut queued = Vec::new();
        for record in &targets {
            self.cache.remove(R::COLLECTION, record.id()).await;

            if let Some(remote_id) = record.remote_id() {
                if let Err(e) = self.remote.delete_in(R::COLLECTION, remote_id).await {
                    debug!(remote_id = %remote_id, error = %e, "Queueing remote delete");
                    queued.push(PendingDelete {
                        collection: R::COLLECTION,
                        remote_id: remote_id.to_string(),
                    });
                }
            }
        }

        if !queued.is_empty() {
            let mut pending = self.pending_deletes().await;
            for entry in queued {
                if !pending.contains(&entry) {
                    pending.push(entry);
                }
            }
            self.cache.set_value(LocalKey::PendingDeletes, &pending).await;
        }

        info!(deleted = targets.len(), "Records deleted");
        targets.len()
    }

    /// Empties the local sales and customer collections.
    pub async fn clear_all(&self) -> bool {
        let sales = self.cache.remove_all(Collection::Sales).await;
        let customers = self.cache.remove_all(Collection::Customers).await;
        warn!("Local collections cleared");
        sales && customers
    }

    pub async fn pending_deletes(&self) -> Vec<PendingDelete> {
        self.cache
            .get_value::<Vec<PendingDelete>>(LocalKey::PendingDeletes)
            .await
            .unwrap_or_default()
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Pushes every local record without a remote id and replays queued
    /// deletions. Each record is tried once; failures do not stop the pass.
    ///
    /// Fails only when the remote store is unavailable before the pass
    /// starts.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> SyncResult<SyncReport> {
        if !self.remote.is_online() {
            return Err(SyncError::RemoteUnavailable("offline, sync skipped".into()));
        }

        let mut report = SyncReport {
            deletes_replayed: self.replay_pending_deletes().await,
            ..Default::default()
        };

        self.push_unsynced::<Sale>(&mut report).await;
        self.push_unsynced::<Customer>(&mut report).await;

        let now = Utc::now();
        self.cache.set_value(LocalKey::LastSync, &now).await;

        info!(
            pushed = report.pushed,
            failed = report.failed,
            deletes_replayed = report.deletes_replayed,
            "Sync pass complete"
        );
        Ok(report)
    }

    pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.cache.get_value(LocalKey::LastSync).await
    }

    async fn push_unsynced<R: Record>(&self, report: &mut SyncReport) {
        for mut record in self.cache.get_all::<R>().await {
            if record.remote_id().is_some() {
                continue;
            }

            match self.remote.add_record(&record).await {
                Ok(remote_id) => {
                    debug!(collection = %R::COLLECTION, id = %record.id(), remote_id = %remote_id, "Pushed local record");
                    record.set_remote_id(remote_id);
                    self.cache.put(&record).await;
                    report.pushed += 1;
                }
                Err(e) => {
                    warn!(collection = %R::COLLECTION, id = %record.id(), error = %e, "Push failed, will retry next sync");
                    report.failed += 1;
                }
            }
        }
    }

    async fn replay_pending_deletes(&self) -> usize {
        let pending = self.pending_deletes().await;
        if pending.is_empty() {
            return 0;
        }

        let mut remaining = Vec::new();
        let mut replayed = 0;
        for entry in pending {
            match self.remote.delete_in(entry.collection, &entry.remote_id).await {
                Ok(()) => replayed += 1,
                Err(e) => {
                    warn!(collection = %entry.collection, remote_id = %entry.remote_id, error = %e, "Remote delete still pending");
                    remaining.push(entry);
                }
            }
        }

        if remaining.is_empty() {
            self.cache.remove_value(LocalKey::PendingDeletes).await;
        } else {
            self.cache.set_value(LocalKey::PendingDeletes, &remaining).await;
        }
        replayed
    }
}
