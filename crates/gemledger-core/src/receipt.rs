//! # Receipt Model
//!
//! Printable receipt for one sale.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ RECEIPT              TJ-3f9a1c           │
//! │ Date: 05/03/2024                         │
//! │ Customer: Asha (98765)                   │
//! │──────────────────────────────────────────│
//! │ Rings                              x2    │
//! │ Chains                             x1    │
//! │──────────────────────────────────────────│
//! │ Items: 3                                 │
//! │ Subtotal                     ₹1000.00    │
//! │ Shipping                       ₹40.00    │
//! │ Total                        ₹1040.00    │
//! │ Paid by UPI                              │
//! └──────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::sheet::format_date;
use crate::types::{Sale, Settings, CATEGORY_CATALOGUE};

const RECEIPT_WIDTH: usize = 40;

/// Display label for a category: catalogue names are capitalized, free-form
/// names are shown as entered.
pub fn category_label(category: &str) -> String {
    let lower = category.to_lowercase();
    if !CATEGORY_CATALOGUE.contains(&lower.as_str()) {
        return category.to_string();
    }
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReceiptLine {
    pub label: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Receipt {
    pub number: String,
    pub date: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub lines: Vec<ReceiptLine>,
    pub total_quantity: u32,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub payment_mode: String,
    pub currency_symbol: String,
}

impl Receipt {
    pub fn from_sale(sale: &Sale, settings: &Settings) -> Self {
        Receipt {
            number: sale.receipt_number(&settings.receipt_prefix),
            date: format_date(sale.sale_date, &settings.date_format),
            customer_name: sale.customer_name.clone(),
            customer_phone: sale.customer_phone.clone(),
            customer_email: sale.customer_email.clone(),
            customer_address: sale.customer_address.clone(),
            lines: sale
                .categories
                .iter()
                .map(|line| ReceiptLine {
                    label: category_label(&line.category),
                    quantity: line.quantity,
                })
                .collect(),
            total_quantity: sale.total_quantity(),
            subtotal: sale.selling_price,
            shipping: sale.shipping_cost,
            total: sale.total_amount(),
            payment_mode: sale.payment_mode.clone(),
            currency_symbol: settings.currency_symbol.clone(),
        }
    }

    fn amount_row(&self, label: &str, amount: Money) -> String {
        let value = amount.format_with(&self.currency_symbol);
        let pad = RECEIPT_WIDTH.saturating_sub(label.chars().count() + value.chars().count());
        format!("{}{}{}", label, " ".repeat(pad), value)
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(RECEIPT_WIDTH);
        let title = "RECEIPT";
        let pad = RECEIPT_WIDTH.saturating_sub(title.len() + self.number.chars().count());
        writeln!(f, "{}{}{}", title, " ".repeat(pad), self.number)?;
        writeln!(f, "Date: {}", self.date)?;
        writeln!(f, "Customer: {} ({})", self.customer_name, self.customer_phone)?;
        if let Some(ref email) = self.customer_email {
            writeln!(f, "Email: {}", email)?;
        }
        if let Some(ref address) = self.customer_address {
            writeln!(f, "Address: {}", address)?;
        }
        writeln!(f, "{}", rule)?;
        for line in &self.lines {
            let qty = format!("x{}", line.quantity);
            let pad = RECEIPT_WIDTH.saturating_sub(line.label.chars().count() + qty.len());
            writeln!(f, "{}{}{}", line.label, " ".repeat(pad), qty)?;
        }
        writeln!(f, "{}", rule)?;
        writeln!(f, "Items: {}", self.total_quantity)?;
        writeln!(f, "{}", self.amount_row("Subtotal", self.subtotal))?;
        writeln!(f, "{}", self.amount_row("Shipping", self.shipping))?;
        writeln!(f, "{}", self.amount_row("Total", self.total))?;
        write!(f, "Paid by {}", self.payment_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryLine, NewSale};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sale() -> Sale {
        let mut sale = Sale::create(
            NewSale {
                customer_name: "Asha".to_string(),
                customer_phone: "98765".to_string(),
                customer_email: None,
                customer_address: None,
                categories: vec![CategoryLine::new("rings", 2), CategoryLine::new("Toe ring", 1)],
                cost_price: Money::from_major(400),
                selling_price: Money::from_major(1000),
                shipping_cost: Money::from_major(40),
                payment_mode: "UPI".to_string(),
                sale_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            },
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
        );
        sale.id = "9b2e-4c1d-3f9a1c".to_string();
        sale
    }

    #[test]
    fn test_category_label() {
        assert_eq!(category_label("rings"), "Rings");
        assert_eq!(category_label("BANGLES"), "Bangles");
        assert_eq!(category_label("Toe ring"), "Toe ring");
    }

    #[test]
    fn test_from_sale() {
        let receipt = Receipt::from_sale(&sale(), &Settings::default());
        assert_eq!(receipt.number, "TJ-3f9a1c");
        assert_eq!(receipt.date, "05/03/2024");
        assert_eq!(receipt.total_quantity, 3);
        assert_eq!(receipt.total, Money::from_major(1040));
        assert_eq!(receipt.lines[0].label, "Rings");
    }

    #[test]
    fn test_render_text() {
        let text = Receipt::from_sale(&sale(), &Settings::default()).to_string();
        assert!(text.starts_with("RECEIPT"));
        assert!(text.contains("TJ-3f9a1c"));
        assert!(text.contains("₹1040.00"));
        assert!(text.contains("x2"));
        assert!(text.ends_with("Paid by UPI"));
        assert!(!text.contains("Email:"));
    }
}
