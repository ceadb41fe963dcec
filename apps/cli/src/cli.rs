//! # Command-Line Interface
//!
//! ```text
//! gemledger [--offline] [--db PATH] [--config PATH] [--yes] [--json] <COMMAND>
//!
//!   sale       record | edit | delete | delete-many | list | receipt
//!   customer   list | add | edit | delete
//!   dashboard
//!   transfer   export-sales | export-customers | import-sales |
//!              import-customers | sales-template | customers-template |
//!              backup | restore | clear
//!   settings   show | set | logo | clear-logo
//!   auth       login | logout | whoami | passwd
//!   sync
//!   status
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};

use gemledger_core::{CategoryLine, Money, NewSale, SaleFilter, SaleUpdate, DEFAULT_PAYMENT_MODE};

use crate::commands::customer::NewCustomer;

#[derive(Debug, Parser)]
#[command(name = "gemledger", about = "Sales and customer ledger for a jewelry shop", version)]
pub struct Cli {
    /// Work against the local store only; nothing is sent to the remote store.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub offline: bool,

    /// SQLite file for the local store.
    #[arg(long, global = true, env = "GEMLEDGER_DB_PATH")]
    pub db: Option<PathBuf>,

    /// Sync configuration file (TOML).
    #[arg(long, global = true, env = "GEMLEDGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Confirm destructive operations.
    #[arg(long, short = 'y', global = true, action = ArgAction::SetTrue)]
    pub yes: bool,

    /// Print receipts as JSON instead of text.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(subcommand)]
    Sale(SaleCommand),
    #[command(subcommand)]
    Customer(CustomerCommand),
    /// Dashboard figures for the window ending today (or --today).
    Dashboard {
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    #[command(subcommand)]
    Transfer(TransferCommand),
    #[command(subcommand)]
    Settings(SettingsCommand),
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Push unsynced records and replay queued deletions.
    Sync,
    Status,
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum SaleCommand {
    Record(RecordSaleArgs),
    Edit(EditSaleArgs),
    Delete { id: String },
    /// Delete several sales at once (needs --yes).
    DeleteMany {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    List(SaleFilterArgs),
    Receipt { id: String },
}

#[derive(Debug, Args)]
pub struct RecordSaleArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    /// Category line as `name` or `name:quantity`; repeatable.
    #[arg(long = "item", required = true, value_parser = parse_category_line)]
    pub items: Vec<CategoryLine>,
    #[arg(long, value_parser = parse_money)]
    pub cost: Money,
    #[arg(long, value_parser = parse_money)]
    pub price: Money,
    #[arg(long, value_parser = parse_money, default_value = "0")]
    pub shipping: Money,
    #[arg(long, default_value = DEFAULT_PAYMENT_MODE)]
    pub payment: String,
    /// Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

impl RecordSaleArgs {
    pub fn into_draft(self, today: NaiveDate) -> NewSale {
        NewSale {
            customer_name: self.name,
            customer_phone: self.phone,
            customer_email: self.email,
            customer_address: self.address,
            categories: self.items,
            cost_price: self.cost,
            selling_price: self.price,
            shipping_cost: self.shipping,
            payment_mode: self.payment,
            sale_date: self.date.unwrap_or(today),
        }
    }
}

#[derive(Debug, Args)]
pub struct EditSaleArgs {
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    /// Replaces all category lines when given.
    #[arg(long = "item", value_parser = parse_category_line)]
    pub items: Vec<CategoryLine>,
    #[arg(long, value_parser = parse_money)]
    pub cost: Option<Money>,
    #[arg(long, value_parser = parse_money)]
    pub price: Option<Money>,
    #[arg(long, value_parser = parse_money)]
    pub shipping: Option<Money>,
    /// Stored as given instead of being recomputed from the prices.
    #[arg(long, value_parser = parse_money, allow_hyphen_values = true)]
    pub profit: Option<Money>,
    #[arg(long)]
    pub payment: Option<String>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

impl EditSaleArgs {
    pub fn into_update(self) -> (String, SaleUpdate) {
        let update = SaleUpdate {
            customer_name: self.name,
            customer_phone: self.phone,
            customer_email: self.email,
            customer_address: self.address,
            categories: if self.items.is_empty() { None } else { Some(self.items) },
            cost_price: self.cost,
            selling_price: self.price,
            shipping_cost: self.shipping,
            profit: self.profit,
            payment_mode: self.payment,
            sale_date: self.date,
        };
        (self.id, update)
    }
}

#[derive(Debug, Args)]
pub struct SaleFilterArgs {
    #[arg(long)]
    pub from: Option<NaiveDate>,
    #[arg(long)]
    pub to: Option<NaiveDate>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub payment: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
}

impl From<SaleFilterArgs> for SaleFilter {
    fn from(args: SaleFilterArgs) -> Self {
        SaleFilter {
            start_date: args.from,
            end_date: args.to,
            category: args.category,
            payment_mode: args.payment,
            search: args.search,
        }
    }
}

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum CustomerCommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Add(CustomerArgs),
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    Delete { id: String },
}

#[derive(Debug, Args)]
pub struct CustomerArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
}

impl From<CustomerArgs> for NewCustomer {
    fn from(args: CustomerArgs) -> Self {
        NewCustomer {
            name: args.name,
            phone: args.phone,
            email: args.email,
            address: args.address,
        }
    }
}

// =============================================================================
// Transfer
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum TransferCommand {
    /// Write the sales sheet as JSON (stdout when no --out).
    ExportSales {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    ExportCustomers {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Read a sheet (exported JSON or an array of row objects).
    ImportSales { file: PathBuf },
    ImportCustomers { file: PathBuf },
    /// Write a sample sheet with the headers import-sales accepts.
    SalesTemplate {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    CustomersTemplate {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Backup {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace local sales and customers with a backup (needs --yes).
    Restore { file: PathBuf },
    /// Empty local sales and customers (needs --yes).
    Clear,
}

// =============================================================================
// Settings
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    /// Set one key; the value is read as JSON when it parses.
    Set { key: String, value: String },
    /// Store a custom logo given as a data URI, or print the current one.
    Logo { data_uri: Option<String> },
    ClearLogo,
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "GEMLEDGER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Whoami,
    /// Change the logged-in user's password.
    Passwd {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
}

// =============================================================================
// Value Parsers
// =============================================================================

fn parse_money(text: &str) -> Result<Money, String> {
    Money::parse(text).ok_or_else(|| format!("'{}' is not an amount", text))
}

fn parse_category_line(text: &str) -> Result<CategoryLine, String> {
    let (name, quantity) = match text.rsplit_once(':') {
        Some((name, qty)) => {
            let qty = qty
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("'{}' is not a quantity", qty))?;
            (name, qty)
        }
        None => (text, 1),
    };

    let name = name.trim();
    if name.is_empty() {
        return Err("category name is empty".to_string());
    }
    Ok(CategoryLine::new(name, quantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_category_line_parser() {
        assert_eq!(parse_category_line("rings").unwrap(), CategoryLine::new("rings", 1));
        assert_eq!(parse_category_line("nose pins:3").unwrap(), CategoryLine::new("nose pins", 3));
        assert!(parse_category_line("rings:x").is_err());
        assert!(parse_category_line(":2").is_err());
    }

    #[test]
    fn test_record_sale_args() {
        let cli = Cli::try_parse_from([
            "gemledger", "sale", "record", "--name", "Asha", "--phone", "1", "--item", "rings:2",
            "--item", "chains", "--cost", "40", "--price", "1,200.50", "--date", "2024-06-01",
        ])
        .unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        match cli.command {
            Command::Sale(SaleCommand::Record(args)) => {
                let draft = args.into_draft(today);
                assert_eq!(draft.categories.len(), 2);
                assert_eq!(draft.selling_price, Money::from_minor(120050));
                assert_eq!(draft.shipping_cost, Money::zero());
                assert_eq!(draft.payment_mode, "Cash");
                assert_eq!(draft.sale_date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["gemledger", "transfer", "clear", "--yes", "--offline"]).unwrap();
        assert!(cli.yes);
        assert!(cli.offline);
        assert!(matches!(cli.command, Command::Transfer(TransferCommand::Clear)));
    }
}
