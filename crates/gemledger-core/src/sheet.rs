//! # Spreadsheet Mapping
//!
//! Converts records to and from spreadsheet rows. Workbook encoding itself
//! (xlsx, csv) is left to the caller; this module only deals with headers
//! and cell text.
//!
//! ## Import Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  row { "Customer Phone": "98765", "Cost Price (₹)": "500", … }          │
//! │        │                                                                │
//! │        ▼  header_key(): lowercase, alphanumerics only, "(₹)" dropped    │
//! │  { "customerphone": "98765", "costprice": "500", … }                    │
//! │        │                                                                │
//! │        ▼  alias lookup (phoneNumber, Items/Category, Price, …)          │
//! │  Sale  ──► validate_sale ──► imported                                   │
//! │        │                                                                │
//! │        └── any failure ──► ImportRowError { row, reason }, skipped      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A bad row never aborts the batch.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::aggregate::customer_stats;
use crate::money::Money;
use crate::types::{
    compute_profit, new_record_id, CategoryLine, Customer, Sale, Settings, DEFAULT_PAYMENT_MODE,
};
use crate::validation::{validate_customer, validate_sale};

/// One spreadsheet row keyed by header text.
pub type SheetRow = BTreeMap<String, String>;

pub const SALES_SHEET_HEADERS: [&str; 12] = [
    "Date",
    "Receipt Number",
    "Customer Name",
    "Customer Phone",
    "Customer Email",
    "Customer Address",
    "Items",
    "Price",
    "Shipping Cost",
    "Total Amount",
    "Payment Mode",
    "Sale ID",
];

pub const CUSTOMERS_SHEET_HEADERS: [&str; 9] = [
    "Name",
    "Phone",
    "Email",
    "Address",
    "Total Purchases",
    "Total Spent",
    "Last Purchase",
    "Customer Since",
    "Customer ID",
];

/// An exported sheet with ordered columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    fn new(name: &str, headers: &[&str]) -> Self {
        Sheet {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows keyed by header, the shape `import_*` accepts.
    pub fn records(&self) -> Vec<SheetRow> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

// =============================================================================
// Dates
// =============================================================================

fn chrono_format(date_format: &str) -> &'static str {
    match date_format.to_uppercase().as_str() {
        "MM/DD/YYYY" => "%m/%d/%Y",
        "YYYY-MM-DD" => "%Y-%m-%d",
        "DD-MM-YYYY" => "%d-%m-%Y",
        _ => "%d/%m/%Y",
    }
}

/// Formats a date with a settings-style pattern such as `DD/MM/YYYY`.
pub fn format_date(date: NaiveDate, date_format: &str) -> String {
    date.format(chrono_format(date_format)).to_string()
}

/// Parses a sheet date: ISO (`2024-05-03`, or an RFC 3339 timestamp), the
/// configured display format, or an Excel serial day number.
pub fn parse_sheet_date(text: &str, date_format: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(iso) = text.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
            return Some(date);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, chrono_format(date_format)) {
        return Some(date);
    }

    // Excel stores dates as days since 1899-12-30
    if let Ok(serial) = text.parse::<f64>() {
        if (1.0..=2_958_465.0).contains(&serial) {
            let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
            return epoch.checked_add_signed(Duration::days(serial.trunc() as i64));
        }
    }

    None
}

// =============================================================================
// Export
// =============================================================================

/// Sales export, one row per sale in the given order.
pub fn sales_sheet(sales: &[Sale], settings: &Settings) -> Sheet {
    let mut sheet = Sheet::new("Sales", &SALES_SHEET_HEADERS);
    for sale in sales {
        sheet.rows.push(vec![
            format_date(sale.sale_date, &settings.date_format),
            sale.receipt_number(&settings.receipt_prefix),
            sale.customer_name.clone(),
            sale.customer_phone.clone(),
            sale.customer_email.clone().unwrap_or_default(),
            sale.customer_address.clone().unwrap_or_default(),
            sale.item_names(),
            sale.selling_price.to_string(),
            sale.shipping_cost.to_string(),
            sale.total_amount().to_string(),
            sale.payment_mode.clone(),
            sale.id.clone(),
        ]);
    }
    sheet
}

/// Customer export with derived purchase columns (not re-imported).
pub fn customers_sheet(customers: &[Customer], sales: &[Sale], settings: &Settings) -> Sheet {
    let mut sheet = Sheet::new("Customers", &CUSTOMERS_SHEET_HEADERS);
    for stats in customer_stats(sales, customers) {
        let c = &stats.customer;
        sheet.rows.push(vec![
            c.name.clone(),
            c.phone.clone(),
            c.email.clone().unwrap_or_default(),
            c.address.clone().unwrap_or_default(),
            stats.total_purchases.to_string(),
            stats.total_spent.to_string(),
            stats
                .last_purchase_date
                .map(|d| format_date(d, &settings.date_format))
                .unwrap_or_else(|| "Never".to_string()),
            format_date(c.created_at.date_naive(), &settings.date_format),
            c.id.clone(),
        ]);
    }
    sheet
}

// =============================================================================
// Import Templates
// =============================================================================

/// Column labels offered in the sales import template. Amount columns carry
/// the currency symbol, which [`header_key`] drops again on import.
const SALES_TEMPLATE_COLUMNS: [&str; 11] = [
    "Date",
    "Customer Name",
    "Customer Phone",
    "Customer Email",
    "Customer Address",
    "Items",
    "Cost Price",
    "Selling Price",
    "Shipping Cost",
    "Profit",
    "Payment Mode",
];

const CUSTOMERS_TEMPLATE_COLUMNS: [&str; 4] = ["Name", "Phone", "Email", "Address"];

fn with_symbol(column: &str, symbol: &str) -> String {
    match column {
        "Cost Price" | "Selling Price" | "Shipping Cost" | "Profit" => {
            format!("{} ({})", column, symbol)
        }
        _ => column.to_string(),
    }
}

/// A blank sales sheet with the accepted headers and one sample row.
pub fn sales_template(settings: &Settings, today: NaiveDate) -> Sheet {
    let sample = [
        format_date(today, &settings.date_format),
        "Asha Verma".to_string(),
        "+91-9876543210".to_string(),
        "asha@example.com".to_string(),
        "12 MG Road, Bengaluru".to_string(),
        "necklaces, earrings".to_string(),
        "1000.00".to_string(),
        "1500.00".to_string(),
        "50.00".to_string(),
        "450.00".to_string(),
        "UPI".to_string(),
    ];

    Sheet {
        name: "Sales Import Template".to_string(),
        headers: SALES_TEMPLATE_COLUMNS
            .iter()
            .map(|c| with_symbol(c, &settings.currency_symbol))
            .collect(),
        rows: vec![sample.to_vec()],
    }
}

/// A blank customer sheet with the accepted headers and one sample row.
pub fn customers_template() -> Sheet {
    let mut sheet = Sheet::new("Customer Import Template", &CUSTOMERS_TEMPLATE_COLUMNS);
    sheet.rows.push(vec![
        "Asha Verma".to_string(),
        "+91-9876543210".to_string(),
        "asha@example.com".to_string(),
        "12 MG Road, Bengaluru".to_string(),
    ]);
    sheet
}

// =============================================================================
// Import
// =============================================================================

/// A row that could not be imported. `row` is the 1-based data row number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRowError {
    pub row: usize,
    pub reason: String,
}

/// Outcome of an import batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportRowError>,
}

impl ImportReport {
    fn skip(&mut self, row: usize, reason: impl Into<String>) {
        self.skipped += 1;
        self.errors.push(ImportRowError {
            row,
            reason: reason.into(),
        });
    }
}

/// Normalizes a header: drops a parenthesized suffix, lowercases, keeps
/// alphanumerics. `"Cost Price (₹)"` and `"costPrice"` both become
/// `"costprice"`.
pub fn header_key(header: &str) -> String {
    let head = header.split('(').next().unwrap_or(header);
    head.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

const NAME: &[&str] = &["customername", "name", "customer"];
const PHONE: &[&str] = &["customerphone", "phonenumber", "phone", "mobile"];
const EMAIL: &[&str] = &["customeremail", "email"];
const ADDRESS: &[&str] = &["customeraddress", "address"];
const ITEMS: &[&str] = &["items", "category", "categories"];
const COST: &[&str] = &["costprice", "cost"];
const SELLING: &[&str] = &["sellingprice", "price", "saleprice"];
const SHIPPING: &[&str] = &["shippingcost", "shipping"];
const PAYMENT: &[&str] = &["paymentmode", "paymentmethod", "payment"];
const DATE: &[&str] = &["date", "saledate"];
const PROFIT: &[&str] = &["profit"];
const RECEIPT: &[&str] = &["receiptnumber", "receipt"];

struct NormalizedRow(HashMap<String, String>);

impl NormalizedRow {
    fn new(row: &SheetRow) -> Self {
        let mut map = HashMap::new();
        for (header, value) in row {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            map.entry(header_key(header))
                .or_insert_with(|| value.to_string());
        }
        NormalizedRow(map)
    }

    fn text(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .find_map(|alias| self.0.get(*alias))
            .map(String::as_str)
    }

    /// Missing cell is zero; an unparseable cell is an error.
    fn money(&self, aliases: &[&str], label: &str) -> Result<Option<Money>, String> {
        match self.text(aliases) {
            None => Ok(None),
            Some(text) => Money::parse(text)
                .map(Some)
                .ok_or_else(|| format!("{} '{}' is not a number", label, text)),
        }
    }
}

fn parse_sale_row(
    row: &NormalizedRow,
    date_format: &str,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Sale, String> {
    let name = row.text(NAME).unwrap_or_default();
    if name.is_empty() {
        return Err("customer name is missing".to_string());
    }

    let selling = row.money(SELLING, "selling price")?.unwrap_or_default();
    if !selling.is_positive() {
        return Err("selling price must be positive".to_string());
    }

    let cost = row.money(COST, "cost price")?.unwrap_or_default();
    let shipping = row.money(SHIPPING, "shipping cost")?.unwrap_or_default();
    let profit = row
        .money(PROFIT, "profit")?
        .unwrap_or_else(|| compute_profit(cost, selling, shipping));

    let sale_date = row
        .text(DATE)
        .and_then(|text| parse_sheet_date(text, date_format))
        .unwrap_or(today);

    let sale = Sale {
        id: new_record_id(),
        remote_id: None,
        customer_name: name.to_string(),
        customer_phone: row.text(PHONE).unwrap_or_default().to_string(),
        customer_email: row.text(EMAIL).map(str::to_string),
        customer_address: row.text(ADDRESS).map(str::to_string),
        categories: row
            .text(ITEMS)
            .map(CategoryLine::parse_list)
            .unwrap_or_default(),
        cost_price: cost,
        selling_price: selling,
        shipping_cost: shipping,
        profit,
        payment_mode: row
            .text(PAYMENT)
            .unwrap_or(DEFAULT_PAYMENT_MODE)
            .to_string(),
        receipt_number: row.text(RECEIPT).map(str::to_string),
        sale_date,
        created_at: now,
        updated_at: Some(now),
    };

    validate_sale(&sale).map_err(|e| e.to_string())?;
    Ok(sale)
}

/// Imports sales rows.
///
/// Rows with no customer name or a non-positive selling price are skipped,
/// as are rows that fail validation or contain unparseable amounts. A
/// missing payment mode becomes `Cash`; an unreadable date becomes `today`;
/// a missing profit is computed from the prices.
pub fn import_sales(
    rows: &[SheetRow],
    date_format: &str,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> (Vec<Sale>, ImportReport) {
    let mut report = ImportReport::default();
    let mut sales = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        match parse_sale_row(&NormalizedRow::new(row), date_format, today, now) {
            Ok(sale) => {
                report.imported += 1;
                sales.push(sale);
            }
            Err(reason) => report.skip(index + 1, reason),
        }
    }

    (sales, report)
}

/// Imports customer rows; name and phone are required. Computed export
/// columns are ignored.
pub fn import_customers(rows: &[SheetRow], now: DateTime<Utc>) -> (Vec<Customer>, ImportReport) {
    let mut report = ImportReport::default();
    let mut customers = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let row = NormalizedRow::new(row);
        let customer = Customer::new(
            row.text(NAME).unwrap_or_default(),
            row.text(PHONE).unwrap_or_default(),
            row.text(EMAIL).map(str::to_string),
            row.text(ADDRESS).map(str::to_string),
            now,
        );
        match validate_customer(&customer) {
            Ok(()) => {
                report.imported += 1;
                customers.push(customer);
            }
            Err(e) => report.skip(index + 1, e.to_string()),
        }
    }

    (customers, report)
}
