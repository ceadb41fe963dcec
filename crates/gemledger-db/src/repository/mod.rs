//! # Repository Module
//!
//! SQL access for the local cache.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LocalCache                                                             │
//! │       │                                                                 │
//! │       ├──► RecordRepository      records(collection, id, position, …)   │
//! │       │    ├── upsert / get / list / delete / delete_all / count        │
//! │       │    └── replace_many (one transaction)                           │
//! │       │                                                                 │
//! │       └──► KeyValueRepository    kv(key, value, updated_at)             │
//! │            └── get / set / delete                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories are fallible (`DbResult`); the cache facade decides what a
//! failure means to the caller.

pub mod kv;
pub mod record;
