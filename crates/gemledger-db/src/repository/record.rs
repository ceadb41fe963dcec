//! # Record Repository
//!
//! One table holds every collection; the payload is the record's canonical
//! JSON.
//!
//! ## Ordering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  upsert(sales, "a")  → position 1                                       │
//! │  upsert(sales, "b")  → position 2                                       │
//! │  upsert(sales, "a")  → payload replaced, still position 1               │
//! │  delete(sales, "a")                                                     │
//! │  upsert(sales, "c")  → position 3  (max + 1, gaps are fine)             │
//! │                                                                         │
//! │  list(sales)         → b, c                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use gemledger_core::Collection;

/// A raw cached row.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredRecord {
    pub collection: String,
    pub id: String,
    pub position: i64,
    pub payload: String,
    pub updated_at: DateTime<Utc>,
}

/// Repository for cached records.
#[derive(Debug, Clone)]
pub struct RecordRepository {
    pool: SqlitePool,
}

const UPSERT_SQL: &str = r#"
    INSERT INTO records (collection, id, position, payload, updated_at)
    VALUES (
        ?1,
        ?2,
        (SELECT COALESCE(MAX(position), 0) + 1 FROM records WHERE collection = ?1),
        ?3,
        ?4
    )
    ON CONFLICT (collection, id) DO UPDATE SET
        payload = excluded.payload,
        updated_at = excluded.updated_at
"#;

impl RecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RecordRepository { pool }
    }

    /// Inserts or replaces a record. New ids go to the end of the
    /// collection; existing ids keep their position.
    pub async fn upsert(&self, collection: Collection, id: &str, payload: &str) -> DbResult<()> {
        debug!(collection = %collection, id = %id, "Upserting record");

        sqlx::query(UPSERT_SQL)
            .bind(collection.as_str())
            .bind(id)
            .bind(payload)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get(&self, collection: Collection, id: &str) -> DbResult<Option<StoredRecord>> {
        let record = sqlx::query_as::<_, StoredRecord>(
            r#"
            SELECT collection, id, position, payload, updated_at
            FROM records
            WHERE collection = ?1 AND id = ?2
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// All records of a collection in insertion order.
    pub async fn list(&self, collection: Collection) -> DbResult<Vec<StoredRecord>> {
        let records = sqlx::query_as::<_, StoredRecord>(
            r#"
            SELECT collection, id, position, payload, updated_at
            FROM records
            WHERE collection = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Deletes one record. Returns whether a row was removed.
    pub async fn delete(&self, collection: Collection, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ?1 AND id = ?2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clears a collection. Returns the number of rows removed.
    pub async fn delete_all(&self, collection: Collection) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ?1")
            .bind(collection.as_str())
            .execute(&self.pool)
            .await?;

        debug!(collection = %collection, count = result.rows_affected(), "Cleared collection");
        Ok(result.rows_affected())
    }

    /// Replaces a whole collection with `(id, payload)` pairs, in order,
    /// inside one transaction.
    pub async fn replace_all(
        &self,
        collection: Collection,
        items: &[(String, String)],
    ) -> DbResult<()> {
        self.replace_many(&[(collection, items)]).await
    }

    /// Replaces several collections in one transaction: either every
    /// collection takes its new contents or none changes.
    pub async fn replace_many(&self, batches: &[(Collection, &[(String, String)])]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        for (collection, items) in batches {
            sqlx::query("DELETE FROM records WHERE collection = ?1")
                .bind(collection.as_str())
                .execute(&mut *tx)
                .await?;

            for (id, payload) in items.iter() {
                sqlx::query(UPSERT_SQL)
                    .bind(collection.as_str())
                    .bind(id)
                    .bind(payload)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        for (collection, items) in batches {
            debug!(collection = %collection, count = items.len(), "Replaced collection");
        }
        Ok(())
    }

    pub async fn count(&self, collection: Collection) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?1")
            .bind(collection.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
