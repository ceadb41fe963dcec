//! # Commands Module
//!
//! Every operation the `gemledger` binary exposes.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (exports)
//! ├── sale.rs       ◄─── Record, edit, delete, list, receipt
//! ├── customer.rs   ◄─── Roster with derived purchase figures
//! ├── dashboard.rs  ◄─── Summary, series, breakdowns, top customers
//! ├── transfer.rs   ◄─── Sheets, backups, clear-all
//! ├── settings.rs   ◄─── Preferences and custom logo
//! ├── auth.rs       ◄─── Login gate and session
//! └── sync.rs       ◄─── Manual sync and status
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  $ gemledger sale list --category rings                                 │
//! │         │                                                               │
//! │         │ (clap parses into Cli)                                        │
//! │         ▼                                                               │
//! │  async fn list_sales(                                                   │
//! │      ctx: &AppContext,      ◄── Built once in lib::run                  │
//! │      filter: &SaleFilter,   ◄── From the command-line flags             │
//! │  ) -> Vec<Sale>                                                         │
//! │         │                                                               │
//! │         │ (JSON serialization)                                          │
//! │         ▼                                                               │
//! │  stdout: [ { "id": "…", "customerName": "…", … } ]                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands never print. They return data or an [`AppError`](crate::error::AppError)
//! and the caller decides how to render it.

pub mod auth;
pub mod customer;
pub mod dashboard;
pub mod sale;
pub mod settings;
pub mod sync;
pub mod transfer;
