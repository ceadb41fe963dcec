//! # gemledger-db: Local Cache for gemledger
//!
//! SQLite-backed storage for every collection, used as the write-through
//! mirror of the remote store and as the offline fallback.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        gemledger Data Flow                              │
//! │                                                                         │
//! │  Reconciler::write / read / sync (gemledger-sync)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  gemledger-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │  record, kv    │    │  (embedded)  │   │   │
//! │  │   └───────┬───────┘    └───────┬────────┘    └──────────────┘   │   │
//! │  │           │                    │                                │   │
//! │  │           └──────► LocalCache ◄┘  (never fails to the caller)   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  <data dir>/gemledger.db                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gemledger_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("gemledger.db")).await?;
//! let cache = db.cache();
//! cache.put(&sale).await;
//! let sales: Vec<Sale> = cache.get_all().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use cache::LocalCache;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::kv::KeyValueRepository;
pub use repository::record::{RecordRepository, StoredRecord};
