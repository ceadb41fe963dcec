//! # Key-Value Repository
//!
//! Single-value keys: settings, the session user, the logo, the last sync
//! time and the pending remote deletes. Values are JSON text.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct KeyValueRepository {
    pool: SqlitePool,
}

impl KeyValueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        KeyValueRepository { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, "Setting local key");

        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns whether the key existed.
    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM kv WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_set_get_delete() {
        let kv = Database::new(DbConfig::in_memory()).await.unwrap().kv();

        assert_eq!(kv.get("k").await.unwrap(), None);
        kv.set("k", "1").await.unwrap();
        kv.set("k", "2").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("2"));

        assert!(kv.delete("k").await.unwrap());
        assert!(!kv.delete("k").await.unwrap());
        assert_eq!(kv.get("k").await.unwrap(), None);
    }
}
