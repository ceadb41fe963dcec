//! # gemledger-sync: Remote Store and Reconciler for gemledger
//!
//! Offline-first access to the sales and customer collections. The local
//! cache is always written; the remote document store is used whenever the
//! connectivity flag is up, and local-only records are pushed out when it
//! comes back.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Layer Architecture                           │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                          SyncAgent                               │  │
//! │  │  Watches Connectivity, runs Reconciler::sync on reconnect        │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                          Reconciler                              │  │
//! │  │  write / update / read / delete / sync                           │  │
//! │  └───────────────┬──────────────────────────────────┬───────────────┘  │
//! │                  ▼                                  ▼                   │
//! │  ┌───────────────────────────────┐  ┌─────────────────────────────┐    │
//! │  │ RemoteStore (remote/)         │  │ LocalCache (gemledger-db)   │    │
//! │  │ fails fast offline;           │  │ never fails to the caller   │    │
//! │  │ errors → RemoteUnavailable    │  │                             │    │
//! │  └───────────────────────────────┘  └─────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`agent`] - `SyncAgent` background task
//! - [`config`] - Remote backend and sync settings (TOML + env)
//! - [`error`] - Sync error types
//! - [`reconciler`] - Merge, write-through and sync pass
//! - [`remote`] - `DocumentStore` trait, HTTP and in-memory backends
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gemledger_sync::{Connectivity, Reconciler, RemoteStore, SyncAgent, SyncConfig};
//!
//! let config = SyncConfig::load_or_default(None);
//! let connectivity = Connectivity::new(config.sync.start_online);
//! let remote = RemoteStore::from_config(&config, connectivity.clone())?;
//! let reconciler = Reconciler::new(db.cache(), remote);
//!
//! let mut agent = SyncAgent::new(config, reconciler.clone());
//! agent.start().await?;
//!
//! let sale = reconciler.write(sale).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod config;
pub mod error;
pub mod reconciler;
pub mod remote;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::{NoOpEmitter, SyncAgent, SyncEventEmitter, SyncStatus};
pub use config::{RemoteBackend, RemoteSettings, SyncConfig, SyncSettings};
pub use error::{SyncError, SyncResult};
pub use reconciler::{PendingDelete, Reconciler, SyncReport};
pub use remote::{
    Connectivity, DocumentStore, HttpDocumentStore, MemoryDocumentStore, RemoteDocument, RemoteStore,
};
