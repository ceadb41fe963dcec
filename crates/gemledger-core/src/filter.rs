//! # Record Filters
//!
//! Filters applied to the merged (remote + local) view of a collection.
//!
//! ## Where Filters Run
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleFilter { start, end, category, payment_mode, search }              │
//! │        │                                                                │
//! │        └── matches(&Sale) → bool                                        │
//! │                 applied to the merged list only, never pushed to the    │
//! │                 document store: a remote copy filtered out there could  │
//! │                 no longer hide its stale local duplicate                │
//! │                                                                         │
//! │  RemoteQuery { date range, equality fields }                            │
//! │        direct document lookups (the users collection)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Customer, Record, Sale};

// =============================================================================
// Remote Query
// =============================================================================

/// Inclusive date range on a `YYYY-MM-DD` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

/// Exact match on a top-level document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEquals {
    pub field: String,
    pub value: serde_json::Value,
}

/// The subset of a filter a document store can evaluate: one date range
/// and any number of equality constraints. Results are most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equals: Vec<FieldEquals>,
}

impl RemoteQuery {
    pub fn with_equals(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.equals.push(FieldEquals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.date_range.is_none() && self.equals.is_empty()
    }

    /// Evaluates the query against a JSON document.
    ///
    /// Used by in-process stores; HTTP stores evaluate it server-side.
    pub fn matches(&self, doc: &serde_json::Value) -> bool {
        if let Some(ref range) = self.date_range {
            let date = doc
                .get(&range.field)
                .and_then(|v| v.as_str())
                .and_then(|s| NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok());
            match date {
                Some(date) => {
                    if range.from.map(|from| date < from).unwrap_or(false) {
                        return false;
                    }
                    if range.to.map(|to| date > to).unwrap_or(false) {
                        return false;
                    }
                }
                None if range.from.is_some() || range.to.is_some() => return false,
                None => {}
            }
        }

        self.equals
            .iter()
            .all(|eq| doc.get(&eq.field) == Some(&eq.value))
    }
}

// =============================================================================
// Filter Trait
// =============================================================================

/// A filter over one record type.
pub trait RecordFilter<R> {
    fn matches(&self, record: &R) -> bool;
}

/// Matches everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilter;

impl<R> RecordFilter<R> for NoFilter {
    fn matches(&self, _record: &R) -> bool {
        true
    }
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn normalized_search(search: &Option<String>) -> Option<String> {
    search
        .as_ref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

// =============================================================================
// Sale Filter
// =============================================================================

/// Sales list filter.
///
/// - Date range is inclusive and applies to `saleDate`
/// - `category` and `payment_mode` are exact matches
/// - `search` is a case-insensitive substring of name, phone or category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub payment_mode: Option<String>,
    pub search: Option<String>,
}

impl RecordFilter<Sale> for SaleFilter {
    fn matches(&self, sale: &Sale) -> bool {
        if self.start_date.map(|start| sale.sale_date < start).unwrap_or(false) {
            return false;
        }
        if self.end_date.map(|end| sale.sale_date > end).unwrap_or(false) {
            return false;
        }

        if let Some(ref category) = self.category {
            if !sale.categories.iter().any(|line| &line.category == category) {
                return false;
            }
        }

        if let Some(ref mode) = self.payment_mode {
            if &sale.payment_mode != mode {
                return false;
            }
        }

        if let Some(needle) = normalized_search(&self.search) {
            let hit = contains_ignore_case(&sale.customer_name, &needle)
                || sale.customer_phone.contains(&needle)
                || sale
                    .categories
                    .iter()
                    .any(|line| contains_ignore_case(&line.category, &needle));
            if !hit {
                return false;
            }
        }

        true
    }
}

// =============================================================================
// Customer Filter
// =============================================================================

/// Customer roster filter: substring of name, phone or email.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerFilter {
    pub search: Option<String>,
}

impl RecordFilter<Customer> for CustomerFilter {
    fn matches(&self, customer: &Customer) -> bool {
        match normalized_search(&self.search) {
            Some(needle) => {
                contains_ignore_case(&customer.name, &needle)
                    || customer.phone.contains(&needle)
                    || customer
                        .email
                        .as_deref()
                        .map(|email| contains_ignore_case(email, &needle))
                        .unwrap_or(false)
            }
            None => true,
        }
    }
}

// =============================================================================
// Ordering
// =============================================================================

/// Sorts by `createdAt` descending; ties broken by id for a stable order.
pub fn sort_recent_first<R: Record>(records: &mut [R]) {
    records.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{CategoryLine, NewSale};
    use chrono::{TimeZone, Utc};

    fn sale(name: &str, phone: &str, day: u32, categories: &[&str], mode: &str) -> Sale {
        let now = Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap();
        Sale::create(
            NewSale {
                customer_name: name.to_string(),
                customer_phone: phone.to_string(),
                customer_email: None,
                customer_address: None,
                categories: categories.iter().map(|c| CategoryLine::new(*c, 1)).collect(),
                cost_price: Money::from_major(10),
                selling_price: Money::from_major(20),
                shipping_cost: Money::zero(),
                payment_mode: mode.to_string(),
                sale_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            },
            now,
        )
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let filter = SaleFilter {
            start_date: Some(date(2)),
            end_date: Some(date(4)),
            ..Default::default()
        };
        assert!(!filter.matches(&sale("A", "1", 1, &["rings"], "Cash")));
        assert!(filter.matches(&sale("A", "1", 2, &["rings"], "Cash")));
        assert!(filter.matches(&sale("A", "1", 4, &["rings"], "Cash")));
        assert!(!filter.matches(&sale("A", "1", 5, &["rings"], "Cash")));
    }

    #[test]
    fn test_exact_fields() {
        let s = sale("Asha", "98765", 3, &["rings", "chains"], "UPI");
        let by_category = SaleFilter {
            category: Some("chains".to_string()),
            ..Default::default()
        };
        assert!(by_category.matches(&s));

        let by_mode = SaleFilter {
            payment_mode: Some("Cash".to_string()),
            ..Default::default()
        };
        assert!(!by_mode.matches(&s));
    }

    #[test]
    fn test_free_text_search() {
        let s = sale("Asha Menon", "98765", 3, &["Bangles"], "UPI");
        let search = |q: &str| SaleFilter {
            search: Some(q.to_string()),
            ..Default::default()
        };
        assert!(search("menon").matches(&s));
        assert!(search("876").matches(&s));
        assert!(search("bang").matches(&s));
        assert!(search("   ").matches(&s));
        assert!(!search("ruby").matches(&s));
    }

    #[test]
    fn test_remote_query_matching() {
        let query = RemoteQuery {
            date_range: Some(DateRange {
                field: "saleDate".to_string(),
                from: Some(date(1)),
                to: None,
            }),
            equals: Vec::new(),
        }
        .with_equals("paymentMode", "UPI");

        let doc = serde_json::json!({"saleDate": "2024-05-03", "paymentMode": "UPI"});
        assert!(query.matches(&doc));
        let doc = serde_json::json!({"saleDate": "2024-04-30", "paymentMode": "UPI"});
        assert!(!query.matches(&doc));
        let doc = serde_json::json!({"paymentMode": "UPI"});
        assert!(!query.matches(&doc));

        assert!(RemoteQuery::default().is_empty());
        assert!(RemoteQuery::default().matches(&doc));
    }

    #[test]
    fn test_customer_filter() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let c = Customer::new("Ravi", "90000", Some("Ravi@Mail.com".into()), None, now);
        let search = |q: &str| CustomerFilter {
            search: Some(q.to_string()),
        };
        assert!(search("mail.COM").matches(&c));
        assert!(search("900").matches(&c));
        assert!(!search("zzz").matches(&c));
        assert!(CustomerFilter::default().matches(&c));
    }

    #[test]
    fn test_sort_recent_first() {
        let mut sales = vec![
            sale("A", "1", 1, &["rings"], "Cash"),
            sale("B", "2", 3, &["rings"], "Cash"),
            sale("C", "3", 2, &["rings"], "Cash"),
        ];
        sort_recent_first(&mut sales);
        let names: Vec<_> = sales.iter().map(|s| s.customer_name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
    }
}
