//! # gemledger CLI Library
//!
//! The `gemledger` binary: argument parsing, context setup and output.
//!
//! ## Module Organization
//! ```text
//! gemledger_cli/
//! ├── lib.rs          ◄─── You are here (startup, dispatch, output)
//! ├── cli.rs          ◄─── clap definitions
//! ├── context.rs      ◄─── AppContext (database, reconciler, sync agent)
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── sale.rs     ◄─── Sales and receipts
//! │   ├── customer.rs ◄─── Customer roster
//! │   ├── dashboard.rs◄─── Dashboard figures
//! │   ├── transfer.rs ◄─── Sheets, backups, clear-all
//! │   ├── settings.rs ◄─── Preferences and logo
//! │   ├── auth.rs     ◄─── Login gate
//! │   └── sync.rs     ◄─── Sync control
//! └── error.rs        ◄─── AppError returned by every command
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Initialize logging (stderr, RUST_LOG overrides the default filter)  │
//! │  2. Resolve the database path (--db, GEMLEDGER_DB_PATH, data dir)       │
//! │  3. Load sync config (sync.toml + GEMLEDGER_* env), apply --offline     │
//! │  4. Open AppContext, start the sync agent (startup pass when online)    │
//! │  5. Dispatch the command, print JSON to stdout                          │
//! │  6. Shut the agent down, close the pool                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod commands;
pub mod context;
pub mod error;

use std::path::{Path, PathBuf};

use chrono::Local;
use directories::ProjectDirs;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gemledger_core::backup::Backup;
use gemledger_db::DbConfig;
use gemledger_sync::SyncConfig;

use cli::{
    AuthCommand, Cli, Command, CustomerCommand, SaleCommand, SettingsCommand, TransferCommand,
};
use commands::{auth, customer, dashboard, sale, settings, sync, transfer};
use context::AppContext;
use error::AppError;

/// Runs one command end to end.
pub async fn run(cli: Cli) -> Result<(), AppError> {
    let db_path = database_path(cli.db.clone())?;
    info!(?db_path, "Database path determined");

    let mut sync_config = SyncConfig::load(cli.config.clone())?;
    if cli.offline {
        sync_config.sync.start_online = false;
    }

    let mut ctx = AppContext::open(DbConfig::new(db_path), sync_config).await?;
    ctx.start_sync().await?;

    let outcome = dispatch(&mut ctx, cli.command, cli.yes, cli.json).await;
    ctx.close().await;
    outcome
}

async fn dispatch(
    ctx: &mut AppContext,
    command: Command,
    yes: bool,
    json: bool,
) -> Result<(), AppError> {
    let today = Local::now().date_naive();

    match command {
        Command::Sale(command) => match command {
            SaleCommand::Record(args) => {
                print_json(&sale::record_sale(ctx, args.into_draft(today)).await?)
            }
            SaleCommand::Edit(args) => {
                let (id, update) = args.into_update();
                print_json(&sale::edit_sale(ctx, &id, update).await?)
            }
            SaleCommand::Delete { id } => {
                sale::delete_sale(ctx, &id).await?;
                print_json(&serde_json::json!({ "deleted": 1 }))
            }
            SaleCommand::DeleteMany { ids } => {
                let deleted = sale::delete_sales(ctx, &ids, yes).await?;
                print_json(&serde_json::json!({ "deleted": deleted }))
            }
            SaleCommand::List(args) => print_json(&sale::list_sales(ctx, &args.into()).await),
            SaleCommand::Receipt { id } => {
                let receipt = sale::receipt(ctx, &id).await?;
                if json {
                    print_json(&receipt)
                } else {
                    print!("{}", receipt);
                    Ok(())
                }
            }
        },

        Command::Customer(command) => match command {
            CustomerCommand::List { search } => {
                print_json(&customer::list_customers(ctx, &customer::search(search)).await)
            }
            CustomerCommand::Add(args) => {
                print_json(&customer::add_customer(ctx, args.into()).await?)
            }
            CustomerCommand::Edit {
                id,
                name,
                phone,
                email,
                address,
            } => {
                let update = gemledger_core::CustomerUpdate {
                    name,
                    phone,
                    email,
                    address,
                };
                print_json(&customer::edit_customer(ctx, &id, update).await?)
            }
            CustomerCommand::Delete { id } => {
                customer::delete_customer(ctx, &id).await?;
                print_json(&serde_json::json!({ "deleted": 1 }))
            }
        },

        Command::Dashboard { today: day } => {
            print_json(&dashboard::build(ctx, day.unwrap_or(today)).await)
        }

        Command::Transfer(command) => match command {
            TransferCommand::ExportSales { out } => {
                write_or_print(out.as_deref(), &transfer::export_sales_sheet(ctx).await)
            }
            TransferCommand::ExportCustomers { out } => {
                write_or_print(out.as_deref(), &transfer::export_customers_sheet(ctx).await)
            }
            TransferCommand::ImportSales { file } => {
                let rows = transfer::parse_sheet_rows(&read_file(&file)?)?;
                print_json(&transfer::import_sales_sheet(ctx, &rows, today).await)
            }
            TransferCommand::ImportCustomers { file } => {
                let rows = transfer::parse_sheet_rows(&read_file(&file)?)?;
                print_json(&transfer::import_customers_sheet(ctx, &rows).await)
            }
            TransferCommand::SalesTemplate { out } => {
                write_or_print(out.as_deref(), &transfer::sales_import_template(ctx, today))
            }
            TransferCommand::CustomersTemplate { out } => {
                write_or_print(out.as_deref(), &gemledger_core::sheet::customers_template())
            }
            TransferCommand::Backup { out } => {
                write_or_print(out.as_deref(), &transfer::export_backup(ctx).await?)
            }
            TransferCommand::Restore { file } => {
                let backup = Backup::parse(&read_file(&file)?)?;
                print_json(&transfer::restore_backup(ctx, backup, yes).await?)
            }
            TransferCommand::Clear => {
                transfer::clear_all(ctx, yes).await?;
                print_json(&serde_json::json!({ "cleared": true }))
            }
        },

        Command::Settings(command) => match command {
            SettingsCommand::Show => print_json(&settings::show(ctx)),
            SettingsCommand::Set { key, value } => {
                print_json(&settings::set(ctx, &key, &value).await?)
            }
            SettingsCommand::Logo { data_uri: Some(uri) } => {
                settings::set_logo(ctx, &uri).await?;
                print_json(&serde_json::json!({ "logo": "saved" }))
            }
            SettingsCommand::Logo { data_uri: None } => print_json(&settings::get_logo(ctx).await),
            SettingsCommand::ClearLogo => {
                let cleared = settings::clear_logo(ctx).await;
                print_json(&serde_json::json!({ "cleared": cleared }))
            }
        },

        Command::Auth(command) => match command {
            AuthCommand::Login { username, password } => {
                print_json(&auth::login(ctx, &username, &password).await?)
            }
            AuthCommand::Logout => print_json(&auth::logout(ctx).await),
            AuthCommand::Whoami => print_json(&auth::current_user(ctx).await),
            AuthCommand::Passwd { current, new } => {
                auth::change_password(ctx, &current, &new).await?;
                print_json(&serde_json::json!({ "passwordChanged": true }))
            }
        },

        Command::Sync => print_json(&sync::sync_now(ctx).await?),
        Command::Status => print_json(&sync::status(ctx).await),
    }
}

// =============================================================================
// Startup Helpers
// =============================================================================

/// Initializes the tracing subscriber. Logs go to stderr so stdout stays
/// machine-readable.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=gemledger_sync=trace` - Trace the reconciler only
/// - Default: INFO, DEBUG for gemledger crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gemledger=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.gemledger.gemledger/gemledger.db`
/// - **Windows**: `%APPDATA%\gemledger\gemledger\data\gemledger.db`
/// - **Linux**: `~/.local/share/gemledger/gemledger.db`
///
/// `--db` (or `GEMLEDGER_DB_PATH`) overrides the platform directory.
pub fn database_path(explicit: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let proj_dirs = ProjectDirs::from("com", "gemledger", "gemledger")
        .ok_or_else(|| AppError::internal("Could not determine app data directory"))?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("gemledger.db"))
}

// =============================================================================
// Output
// =============================================================================

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    println!("{}", to_pretty(value)?);
    Ok(())
}

fn write_or_print<T: Serialize>(out: Option<&Path>, value: &T) -> Result<(), AppError> {
    match out {
        Some(path) => {
            std::fs::write(path, to_pretty(value)?)?;
            info!(?path, "Written");
            print_json(&serde_json::json!({ "written": path }))
        }
        None => print_json(value),
    }
}

fn to_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::internal(format!("Failed to encode output: {}", e)))
}

fn read_file(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path)
        .map_err(|e| AppError::import(format!("Cannot read {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_database_path_wins() {
        let path = PathBuf::from("/tmp/ledger-test.db");
        assert_eq!(database_path(Some(path.clone())).unwrap(), path);
    }

    fn cli(db: &Path, config: &Path, args: &[&str]) -> Cli {
        let mut full = vec![
            "gemledger".to_string(),
            "--offline".to_string(),
            "--db".to_string(),
            db.display().to_string(),
            "--config".to_string(),
            config.display().to_string(),
        ];
        full.extend(args.iter().map(|a| a.to_string()));
        <Cli as clap::Parser>::try_parse_from(full).unwrap()
    }

    #[tokio::test]
    async fn test_run_against_temp_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ledger.db");
        let config = dir.path().join("sync.toml");

        run(cli(&db, &config, &[
            "sale", "record", "--name", "Asha", "--phone", "1", "--item", "rings", "--cost", "10",
            "--price", "50",
        ]))
        .await
        .unwrap();

        let backup = dir.path().join("backup.json");
        run(cli(&db, &config, &["transfer", "backup", "--out", backup.to_str().unwrap()]))
            .await
            .unwrap();
        let parsed = Backup::parse(&std::fs::read_to_string(&backup).unwrap()).unwrap();
        assert_eq!(parsed.sales.len(), 1);
        assert_eq!(parsed.customers.len(), 1);

        let err = run(cli(&db, &config, &["transfer", "clear"])).await.unwrap_err();
        assert_eq!(err.code, error::ErrorCode::ValidationError);
        run(cli(&db, &config, &["transfer", "clear", "--yes"])).await.unwrap();

        let err = run(cli(&db, &config, &["sync"])).await.unwrap_err();
        assert_eq!(err.code, error::ErrorCode::RemoteUnavailable);
    }
}
