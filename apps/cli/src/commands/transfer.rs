//! # Transfer Commands
//!
//! Moving data in and out of the store: spreadsheet exports and imports,
//! whole-store backups, and the clear-all reset.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  export_*_sheet ──► Sheet { name, headers, rows }   (JSON on stdout)     │
//! │  *_template     ──► same shape, accepted headers plus one sample row    │
//! │                                                                         │
//! │  import_*_sheet ◄── Sheet JSON  or  [ { "Header": "cell", … }, … ]      │
//! │        │                                                                │
//! │        ▼  bad rows skipped and reported, never fatal                    │
//! │  Reconciler::write per record                                           │
//! │                                                                         │
//! │  export_backup  ──► { sales, customers, settings, exportDate, version } │
//! │  restore_backup ◄── replaces local collections, merges settings         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use gemledger_core::backup::Backup;
use gemledger_core::sheet::{
    customers_sheet, import_customers, import_sales, sales_sheet,
    sales_template, ImportReport, Sheet, SheetRow,
};
use gemledger_core::{Customer, NoFilter, Sale};

use crate::commands::sale::ensure_customers;
use crate::context::AppContext;
use crate::error::AppError;

// =============================================================================
// Sheets
// =============================================================================

pub async fn export_sales_sheet(ctx: &AppContext) -> Sheet {
    let sales: Vec<Sale> = ctx.reconciler().read(&NoFilter).await;
    sales_sheet(&sales, ctx.settings())
}

pub async fn export_customers_sheet(ctx: &AppContext) -> Sheet {
    let customers: Vec<Customer> = ctx.reconciler().read(&NoFilter).await;
    let sales: Vec<Sale> = ctx.reconciler().read(&NoFilter).await;
    customers_sheet(&customers, &sales, ctx.settings())
}

/// Sample sales sheet showing the headers the importer accepts.
pub fn sales_import_template(ctx: &AppContext, today: NaiveDate) -> Sheet {
    sales_template(ctx.settings(), today)
}

/// Reads sheet rows from either an exported `Sheet` or an array of
/// header-keyed objects. Non-string cells are stringified; nulls become
/// empty cells.
pub fn parse_sheet_rows(text: &str) -> Result<Vec<SheetRow>, AppError> {
    let value: Value = serde_json::from_str(text)?;

    if value.get("headers").is_some() && value.get("rows").is_some() {
        let sheet: Sheet = serde_json::from_value(value)?;
        return Ok(sheet.records());
    }

    let items = value
        .as_array()
        .ok_or_else(|| AppError::import("expected a sheet or an array of rows"))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let object = item
                .as_object()
                .ok_or_else(|| AppError::import(format!("row {} is not an object", index + 1)))?;
            Ok(object
                .iter()
                .map(|(header, cell)| (header.clone(), cell_text(cell)))
                .collect())
        })
        .collect()
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Imports sales rows and adds any new buyers to the roster.
pub async fn import_sales_sheet(
    ctx: &AppContext,
    rows: &[SheetRow],
    today: NaiveDate,
) -> ImportReport {
    let (sales, report) = import_sales(rows, &ctx.settings().date_format, today, Utc::now());

    let mut written = Vec::with_capacity(sales.len());
    for sale in sales {
        written.push(ctx.reconciler().write(sale).await);
    }
    let new_customers = ensure_customers(ctx, &written).await;

    for error in &report.errors {
        warn!(row = error.row, reason = %error.reason, "Sales row skipped");
    }
    info!(
        imported = report.imported,
        skipped = report.skipped,
        new_customers = new_customers.len(),
        "Sales import complete"
    );
    report
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerImport {
    #[serde(flatten)]
    pub report: ImportReport,
    /// Valid rows not written because the phone is already on the roster.
    pub duplicates: usize,
}

pub async fn import_customers_sheet(ctx: &AppContext, rows: &[SheetRow]) -> CustomerImport {
    let (customers, mut report) = import_customers(rows, Utc::now());
    let mut known: Vec<Customer> = ctx.reconciler().read(&NoFilter).await;
    let mut duplicates = 0;

    for customer in customers {
        if known.iter().any(|c| c.has_phone(&customer.phone)) {
            duplicates += 1;
            continue;
        }
        known.push(ctx.reconciler().write(customer).await);
    }
    report.imported -= duplicates;

    info!(
        imported = report.imported,
        skipped = report.skipped,
        duplicates,
        "Customer import complete"
    );
    CustomerImport { report, duplicates }
}

// =============================================================================
// Backup
// =============================================================================

pub async fn export_backup(ctx: &AppContext) -> Result<Backup, AppError> {
    let sales: Vec<Sale> = ctx.reconciler().read(&NoFilter).await;
    let customers: Vec<Customer> = ctx.reconciler().read(&NoFilter).await;
    let backup = Backup::new(sales, customers, ctx.settings(), Utc::now())?;
    info!(
        sales = backup.sales.len(),
        customers = backup.customers.len(),
        "Backup exported"
    );
    Ok(backup)
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub sales: usize,
    pub customers: usize,
    pub settings_merged: bool,
}

/// Replaces the local sales and customers with the backup's and merges its
/// settings over the current ones. Both collections are replaced in one
/// transaction; on failure the local store is left as it was.
///
/// Restored records keep their remote ids; those without one are pushed on
/// the next sync pass.
pub async fn restore_backup(
    ctx: &mut AppContext,
    backup: Backup,
    confirmed: bool,
) -> Result<RestoreReport, AppError> {
    if !confirmed {
        return Err(AppError::confirmation_required("Restoring a backup"));
    }

    let mut settings = ctx.settings().clone();
    backup.merge_settings_into(&mut settings)?;

    if !ctx.cache().put_all_pair(&backup.sales, &backup.customers).await {
        return Err(AppError::new(
            crate::error::ErrorCode::DatabaseError,
            "Backup could not be written to the local store",
        ));
    }

    let settings_merged = backup.settings.is_some();
    if settings_merged {
        ctx.save_settings(settings).await;
    }

    let report = RestoreReport {
        sales: backup.sales.len(),
        customers: backup.customers.len(),
        settings_merged,
    };
    info!(
        sales = report.sales,
        customers = report.customers,
        version = ?backup.version,
        "Backup restored"
    );
    Ok(report)
}

/// Empties the local sales and customers. Remote documents are untouched.
pub async fn clear_all(ctx: &AppContext, confirmed: bool) -> Result<(), AppError> {
    if !confirmed {
        return Err(AppError::confirmation_required("Clearing all data"));
    }
    if ctx.reconciler().clear_all().await {
        Ok(())
    } else {
        Err(AppError::new(
            crate::error::ErrorCode::DatabaseError,
            "Local data could not be cleared",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sale::record_sale;
    use crate::error::ErrorCode;
    use gemledger_core::{CategoryLine, Money, NewSale};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn draft(name: &str, phone: &str) -> NewSale {
        NewSale {
            customer_name: name.to_string(),
            customer_phone: phone.to_string(),
            customer_email: None,
            customer_address: None,
            categories: vec![CategoryLine::new("rings", 1)],
            cost_price: Money::from_major(40),
            selling_price: Money::from_major(100),
            shipping_cost: Money::zero(),
            payment_mode: "Cash".to_string(),
            sale_date: today(),
        }
    }

    #[test]
    fn test_parse_rows_from_objects() {
        let rows = parse_sheet_rows(
            r#"[{"Customer Name": "Asha", "Selling Price": 1200, "Email": null}]"#,
        )
        .unwrap();
        assert_eq!(rows[0]["Customer Name"], "Asha");
        assert_eq!(rows[0]["Selling Price"], "1200");
        assert_eq!(rows[0]["Email"], "");

        assert_eq!(parse_sheet_rows("{}").unwrap_err().code, ErrorCode::ImportError);
        assert_eq!(parse_sheet_rows("[1]").unwrap_err().code, ErrorCode::ImportError);
        assert_eq!(parse_sheet_rows("nope").unwrap_err().code, ErrorCode::ImportError);
    }

    #[tokio::test]
    async fn test_import_sales_partial_success() {
        let (ctx, memory) = AppContext::for_tests(true).await;
        let rows = parse_sheet_rows(
            r#"[
                {"Customer Name": "Asha", "Phone": "1", "Items": "rings", "Selling Price": "100"},
                {"Customer Name": "", "Phone": "2", "Items": "rings", "Selling Price": "100"},
                {"Customer Name": "Ravi", "Phone": "3", "Items": "chains", "Selling Price": "250"}
            ]"#,
        )
        .unwrap();

        let report = import_sales_sheet(&ctx, &rows, today()).await;
        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.errors[0].row, 2);

        let customers: Vec<Customer> = ctx.reconciler().read(&NoFilter).await;
        assert_eq!(customers.len(), 2);
        assert_eq!(memory.documents("sales").await.len(), 2);
    }

    #[tokio::test]
    async fn test_exported_sheet_reimports() {
        let (ctx, _memory) = AppContext::for_tests(false).await;
        record_sale(&ctx, draft("Asha", "1")).await.unwrap();

        let sheet = export_sales_sheet(&ctx).await;
        assert_eq!(sheet.rows.len(), 1);

        let (other, _memory) = AppContext::for_tests(false).await;
        let text = serde_json::to_string(&sheet).unwrap();
        let report = import_sales_sheet(&other, &parse_sheet_rows(&text).unwrap(), today()).await;
        assert_eq!(report.imported, 1);
    }

    #[tokio::test]
    async fn test_import_customers_skips_known_phones() {
        let (ctx, _memory) = AppContext::for_tests(false).await;
        record_sale(&ctx, draft("Asha", "98765 43210")).await.unwrap();

        let rows = parse_sheet_rows(
            r#"[
                {"Name": "Asha M", "Phone": "9876543210"},
                {"Name": "Meera", "Phone": "777"},
                {"Name": "No Phone", "Phone": ""}
            ]"#,
        )
        .unwrap();
        let outcome = import_customers_sheet(&ctx, &rows).await;

        assert_eq!(outcome.report.imported, 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.report.skipped, 1);
        let customers: Vec<Customer> = ctx.reconciler().read(&NoFilter).await;
        assert_eq!(customers.len(), 2);
    }

    #[tokio::test]
    async fn test_filled_template_imports() {
        let (ctx, _memory) = AppContext::for_tests(false).await;
        let text = serde_json::to_string(&sales_import_template(&ctx, today())).unwrap();
        let rows = parse_sheet_rows(&text).unwrap();
        let report = import_sales_sheet(&ctx, &rows, today()).await;
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 0);

        let sales: Vec<Sale> = ctx.reconciler().read(&NoFilter).await;
        assert_eq!(sales[0].sale_date, today());
        let customers: Vec<Customer> = ctx.reconciler().read(&NoFilter).await;
        assert_eq!(customers.len(), 1);
    }

    #[tokio::test]
    async fn test_backup_restore_replaces_and_merges() {
        let (ctx, _memory) = AppContext::for_tests(false).await;
        record_sale(&ctx, draft("Asha", "1")).await.unwrap();
        let backup = export_backup(&ctx).await.unwrap();
        assert_eq!(backup.version.as_deref(), Some("2.0.0"));

        let (mut other, _memory) = AppContext::for_tests(false).await;
        record_sale(&other, draft("Ravi", "2")).await.unwrap();
        record_sale(&other, draft("Meera", "3")).await.unwrap();

        let mut text: Value = serde_json::to_value(&backup).unwrap();
        text["settings"] = serde_json::json!({ "currencySymbol": "$" });
        let backup = Backup::parse(&text.to_string()).unwrap();

        let err = restore_backup(&mut other, backup.clone(), false).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let report = restore_backup(&mut other, backup, true).await.unwrap();
        assert_eq!(report.sales, 1);
        assert!(report.settings_merged);

        let sales: Vec<Sale> = other.reconciler().read(&NoFilter).await;
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].customer_name, "Asha");
        assert_eq!(other.settings().currency_symbol, "$");
        assert_eq!(other.settings().receipt_prefix, "TJ");
        assert_eq!(other.cache().load_settings().await.currency_symbol, "$");
    }

    #[tokio::test]
    async fn test_failed_restore_keeps_local_data() {
        let (ctx, _memory) = AppContext::for_tests(false).await;
        record_sale(&ctx, draft("Asha", "1")).await.unwrap();
        let backup = export_backup(&ctx).await.unwrap();

        let (mut other, _memory) = AppContext::for_tests(false).await;
        record_sale(&other, draft("Ravi", "2")).await.unwrap();

        sqlx::query(
            "CREATE TRIGGER reject_customers BEFORE INSERT ON records \
             WHEN NEW.collection = 'customers' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(other.database().pool())
        .await
        .unwrap();

        let err = restore_backup(&mut other, backup, true).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);

        let sales: Vec<Sale> = other.cache().get_all().await;
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].customer_name, "Ravi");
        let customers: Vec<Customer> = other.cache().get_all().await;
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].name, "Ravi");
    }

    #[tokio::test]
    async fn test_clear_all_requires_confirmation() {
        let (ctx, _memory) = AppContext::for_tests(false).await;
        record_sale(&ctx, draft("Asha", "1")).await.unwrap();

        assert!(clear_all(&ctx, false).await.is_err());
        assert_eq!(export_backup(&ctx).await.unwrap().sales.len(), 1);

        clear_all(&ctx, true).await.unwrap();
        let backup = export_backup(&ctx).await.unwrap();
        assert!(backup.sales.is_empty());
        assert!(backup.customers.is_empty());
    }
}
