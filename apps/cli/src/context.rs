//! # Application Context
//!
//! Everything a command needs, built once at startup and passed explicitly.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           AppContext                                    │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────────────┐  ┌──────────────────┐  │
//! │  │   Database   │  │       Reconciler         │  │    SyncAgent     │  │
//! │  │  (SQLite)    │──│  LocalCache + RemoteStore │──│ reconnect sync   │  │
//! │  └──────────────┘  └──────────────────────────┘  └──────────────────┘  │
//! │                                                                         │
//! │  settings: loaded once from the local cache, saved on change            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::info;

use gemledger_core::Settings;
use gemledger_db::{Database, DbConfig, LocalCache};
use gemledger_sync::{Connectivity, Reconciler, RemoteStore, SyncAgent, SyncConfig};

use crate::error::AppError;

pub struct AppContext {
    db: Database,
    reconciler: Reconciler,
    agent: SyncAgent,
    settings: Settings,
}

impl AppContext {
    /// Opens the database and builds the remote store named by `sync_config`.
    pub async fn open(db_config: DbConfig, sync_config: SyncConfig) -> Result<Self, AppError> {
        let db = Database::new(db_config).await?;
        let connectivity = Connectivity::new(sync_config.sync.start_online);
        let remote = RemoteStore::from_config(&sync_config, connectivity)?;
        Ok(Self::assemble(db, remote, sync_config).await)
    }

    /// Builds a context around an existing database and remote store.
    pub async fn assemble(db: Database, remote: RemoteStore, sync_config: SyncConfig) -> Self {
        let cache = db.cache();
        let settings = cache.load_settings().await;
        let reconciler = Reconciler::new(cache, remote);
        let agent = SyncAgent::new(sync_config, reconciler.clone());

        AppContext {
            db,
            reconciler,
            agent,
            settings,
        }
    }

    /// Starts the sync agent (runs the startup pass when configured).
    pub async fn start_sync(&mut self) -> Result<(), AppError> {
        self.agent.start().await?;
        Ok(())
    }

    pub async fn close(mut self) {
        if let Err(e) = self.agent.shutdown().await {
            tracing::warn!(error = %e, "Sync agent shutdown failed");
        }
        self.db.close().await;
        info!("Application context closed");
    }

    /// Whether the local store answers queries.
    pub async fn health_check(&self) -> bool {
        self.db.health_check().await
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn cache(&self) -> &LocalCache {
        self.reconciler.cache()
    }

    pub fn remote(&self) -> &RemoteStore {
        self.reconciler.remote()
    }

    pub fn agent(&self) -> &SyncAgent {
        &self.agent
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the in-memory settings and persists them.
    pub async fn save_settings(&mut self, settings: Settings) -> bool {
        let saved = self.cache().save_settings(&settings).await;
        self.settings = settings;
        saved
    }

    #[cfg(test)]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// In-memory database with an in-memory remote store. Test use only.
    #[cfg(test)]
    pub async fn for_tests(online: bool) -> (Self, std::sync::Arc<gemledger_sync::MemoryDocumentStore>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let memory = std::sync::Arc::new(gemledger_sync::MemoryDocumentStore::new());
        let remote = RemoteStore::new(memory.clone(), Connectivity::new(online));
        let ctx = Self::assemble(db, remote, SyncConfig::default()).await;
        (ctx, memory)
    }
}
