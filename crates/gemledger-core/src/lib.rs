//! # gemledger-core: Pure Record Logic for gemledger
//!
//! Everything that can be decided without touching a disk or a network:
//! record shapes, validation, filters, dashboard figures, spreadsheet mapping
//! and the backup format.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        gemledger Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    gemledger-cli (apps/cli)                     │   │
//! │  │   sale ─ customer ─ dashboard ─ transfer ─ settings ─ auth      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    gemledger-sync                               │   │
//! │  │      Reconciler ─ RemoteStore ─ Connectivity ─ SyncAgent        │   │
//! │  └───────────────┬─────────────────────────────┬───────────────────┘   │
//! │                  │                             │                        │
//! │  ┌───────────────▼───────────────┐   ┌────────▼────────────────────┐   │
//! │  │  gemledger-db (LocalCache)    │   │  remote document store      │   │
//! │  └───────────────┬───────────────┘   └─────────────────────────────┘   │
//! │                  │                                                      │
//! │  ┌───────────────▼─────────────────────────────────────────────────┐   │
//! │  │               ★ gemledger-core (THIS CRATE) ★                   │   │
//! │  │   types ─ money ─ validation ─ filter ─ aggregate               │   │
//! │  │   sheet ─ backup ─ receipt                                      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • NO CLOCK READS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Sale, Customer, Settings, the `Record` trait
//! - [`money`] - Integer money with a decimal wire format
//! - [`error`] - Domain error types
//! - [`validation`] - Checks run before any write
//! - [`filter`] - Sale and customer filters, remote query pushdown
//! - [`aggregate`] - Dashboard and report figures
//! - [`sheet`] - Spreadsheet export and import
//! - [`backup`] - Whole-store JSON backups
//! - [`receipt`] - Printable receipt
//!
//! ## Example Usage
//!
//! ```rust
//! use gemledger_core::aggregate::by_category;
//! use gemledger_core::money::Money;
//!
//! // A sale split across two categories contributes half to each
//! let shares = Money::from_major(100).split_evenly(2);
//! assert_eq!(shares, vec![Money::from_major(50), Money::from_major(50)]);
//! assert!(by_category(&[]).is_empty());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod backup;
pub mod error;
pub mod filter;
pub mod money;
pub mod receipt;
pub mod sheet;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use filter::{CustomerFilter, NoFilter, RecordFilter, RemoteQuery, SaleFilter};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a free-text field, in characters.
pub const MAX_TEXT_LEN: usize = 200;

/// Maximum quantity on a single category line.
///
/// Catches typing 100 instead of 10 on the entry form.
pub const MAX_CATEGORY_QUANTITY: u32 = 999;

/// Maximum decoded size of a custom logo.
pub const MAX_LOGO_BYTES: usize = 2 * 1024 * 1024;

/// Version written into every backup.
pub const BACKUP_VERSION: &str = "2.0.0";
