//! # Aggregator
//!
//! Dashboard and report figures computed from a record sequence.
//!
//! Every function here is total: it never fails, treats missing amounts as
//! zero and missing category lists as empty. Nothing is cached; callers pass
//! the merged record set each time.
//!
//! ## Time Windows
//! ```text
//! by_time_window(sales, bucket_fn)
//!
//!   bucket_day      → 2024-05-03      "last 30 days" chart
//!   bucket_month    → "2024-05"       "last 6 months" chart
//!   bucket_iso_week → "2024-W18"      weekly report
//!   bucket_weekday  → 0..=6 (Mon..Sun) day-of-week pattern
//! ```

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{normalize_phone, Customer, Sale};

/// Label used for sales without a payment mode.
pub const NOT_SPECIFIED: &str = "Not Specified";

/// Number of customers shown on the dashboard leaderboard.
pub const DASHBOARD_TOP_CUSTOMERS: usize = 20;

pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

// =============================================================================
// Totals
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Totals {
    pub revenue: Money,
    pub profit: Money,
    pub count: usize,
    pub average: Money,
}

/// Sum of selling price and profit, count, and average sale.
pub fn totals(sales: &[Sale]) -> Totals {
    let revenue: Money = sales.iter().map(|s| s.selling_price).sum();
    let profit: Money = sales.iter().map(|s| s.profit).sum();
    Totals {
        revenue,
        profit,
        count: sales.len(),
        average: Money::average(revenue, sales.len()),
    }
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryStats {
    /// Number of sales containing the category.
    pub count: usize,
    /// Units sold (sum of line quantities).
    pub units: u32,
    pub revenue: Money,
    pub profit: Money,
}

/// Per-category figures.
///
/// A sale's revenue and profit are split evenly across its category lines,
/// regardless of quantity; there is no per-item price breakdown.
pub fn by_category(sales: &[Sale]) -> BTreeMap<String, CategoryStats> {
    let mut stats: BTreeMap<String, CategoryStats> = BTreeMap::new();

    for sale in sales {
        let n = sale.categories.len();
        let revenue_shares = sale.selling_price.split_evenly(n);
        let profit_shares = sale.profit.split_evenly(n);

        for ((line, revenue), profit) in sale
            .categories
            .iter()
            .zip(revenue_shares)
            .zip(profit_shares)
        {
            let entry = stats.entry(line.category.clone()).or_default();
            entry.count += 1;
            entry.units = entry.units.saturating_add(line.quantity);
            entry.revenue += revenue;
            entry.profit += profit;
        }
    }

    stats
}

/// `profit / revenue * 100`, 0 when revenue is 0.
pub fn profit_margin(stats: &CategoryStats) -> f64 {
    stats.profit.percent_of(stats.revenue)
}

// =============================================================================
// Time Windows
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WindowStats {
    pub revenue: Money,
    pub profit: Money,
    pub count: usize,
}

impl WindowStats {
    fn add(&mut self, sale: &Sale) {
        self.revenue += sale.selling_price;
        self.profit += sale.profit;
        self.count += 1;
    }
}

/// Groups sales by a caller-supplied bucket key.
pub fn by_time_window<K, F>(sales: &[Sale], bucket: F) -> BTreeMap<K, WindowStats>
where
    K: Ord,
    F: Fn(&Sale) -> K,
{
    let mut windows: BTreeMap<K, WindowStats> = BTreeMap::new();
    for sale in sales {
        windows.entry(bucket(sale)).or_default().add(sale);
    }
    windows
}

pub fn bucket_day(sale: &Sale) -> NaiveDate {
    sale.sale_date
}

pub fn bucket_month(sale: &Sale) -> String {
    month_key(sale.sale_date)
}

pub fn bucket_iso_week(sale: &Sale) -> String {
    let week = sale.sale_date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// Days from Monday (0) to Sunday (6).
pub fn bucket_weekday(sale: &Sale) -> u32 {
    sale.sale_date.weekday().num_days_from_monday()
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// One entry per day for the `days` days ending at `today`, oldest first,
/// zero-filled.
pub fn daily_series(sales: &[Sale], today: NaiveDate, days: u32) -> Vec<(NaiveDate, WindowStats)> {
    let windows = by_time_window(sales, bucket_day);
    (0..days)
        .rev()
        .map(|back| {
            let day = today - Duration::days(i64::from(back));
            (day, windows.get(&day).copied().unwrap_or_default())
        })
        .collect()
}

/// One entry per month for the `months` months ending at `today`'s month,
/// oldest first, zero-filled.
pub fn monthly_series(sales: &[Sale], today: NaiveDate, months: u32) -> Vec<(String, WindowStats)> {
    let windows = by_time_window(sales, bucket_month);
    let current = today.year() * 12 + today.month0() as i32;

    (0..months as i32)
        .rev()
        .map(|back| {
            let index = current - back;
            let key = format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1);
            let stats = windows.get(&key).copied().unwrap_or_default();
            (key, stats)
        })
        .collect()
}

/// Sales per day of week, Monday first.
pub fn weekday_pattern(sales: &[Sale]) -> [WindowStats; 7] {
    let mut pattern = [WindowStats::default(); 7];
    for (day, stats) in by_time_window(sales, bucket_weekday) {
        pattern[day as usize] = stats;
    }
    pattern
}

/// Counts and revenue per payment mode; blank modes are `Not Specified`.
pub fn by_payment_mode(sales: &[Sale]) -> BTreeMap<String, WindowStats> {
    by_time_window(sales, |sale| {
        let mode = sale.payment_mode.trim();
        if mode.is_empty() {
            NOT_SPECIFIED.to_string()
        } else {
            mode.to_string()
        }
    })
}

// =============================================================================
// Customers
// =============================================================================

/// Grouping key for a sale's buyer: normalized phone, else the name.
fn buyer_key(phone: &str, name: &str) -> String {
    let phone = normalize_phone(phone);
    if phone.is_empty() {
        format!("name:{}", name.trim())
    } else {
        format!("phone:{}", phone)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerTotal {
    pub name: String,
    pub phone: String,
    pub total_spent: Money,
    pub purchases: usize,
}

/// Biggest spenders, grouped by phone (or name when phone is missing),
/// with display names resolved from the customer roster.
pub fn top_customers(sales: &[Sale], customers: &[Customer], limit: usize) -> Vec<CustomerTotal> {
    let mut groups: HashMap<String, CustomerTotal> = HashMap::new();

    for sale in sales {
        let key = buyer_key(&sale.customer_phone, &sale.customer_name);
        let entry = groups.entry(key).or_insert_with(|| CustomerTotal {
            name: sale.customer_name.clone(),
            phone: sale.customer_phone.clone(),
            total_spent: Money::zero(),
            purchases: 0,
        });
        entry.total_spent += sale.selling_price;
        entry.purchases += 1;
    }

    let roster: HashMap<String, &Customer> = customers
        .iter()
        .map(|c| (buyer_key(&c.phone, &c.name), c))
        .collect();

    let mut ranked: Vec<CustomerTotal> = groups
        .into_iter()
        .map(|(key, mut total)| {
            if let Some(customer) = roster.get(&key) {
                total.name = customer.name.clone();
            }
            total
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.total_spent
            .cmp(&a.total_spent)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(limit);
    ranked
}

/// Purchase figures derived for one customer; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerStats {
    pub customer: Customer,
    pub total_purchases: usize,
    pub total_spent: Money,
    #[ts(as = "Option<String>")]
    pub last_purchase_date: Option<NaiveDate>,
}

/// Joins each customer against the sales by phone (or name when the
/// customer has no phone).
pub fn customer_stats(sales: &[Sale], customers: &[Customer]) -> Vec<CustomerStats> {
    let mut by_buyer: HashMap<String, (usize, Money, Option<NaiveDate>)> = HashMap::new();
    for sale in sales {
        let entry = by_buyer
            .entry(buyer_key(&sale.customer_phone, &sale.customer_name))
            .or_insert((0, Money::zero(), None));
        entry.0 += 1;
        entry.1 += sale.selling_price;
        entry.2 = entry.2.max(Some(sale.sale_date));
    }

    customers
        .iter()
        .map(|customer| {
            let (count, spent, last) = by_buyer
                .get(&buyer_key(&customer.phone, &customer.name))
                .copied()
                .unwrap_or((0, Money::zero(), None));
            CustomerStats {
                customer: customer.clone(),
                total_purchases: count,
                total_spent: spent,
                last_purchase_date: last,
            }
        })
        .collect()
}

// =============================================================================
// Summary
// =============================================================================

/// Headline dashboard figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Summary {
    pub total_revenue: Money,
    pub total_profit: Money,
    pub total_cost: Money,
    pub transactions: usize,
    pub customers: usize,
    pub average_sale: Money,
    pub margin: f64,
}

pub fn summary(sales: &[Sale], customers: &[Customer]) -> Summary {
    let t = totals(sales);
    Summary {
        total_revenue: t.revenue,
        total_profit: t.profit,
        total_cost: sales.iter().map(|s| s.cost_price).sum(),
        transactions: t.count,
        customers: customers.len(),
        average_sale: t.average,
        margin: t.profit.percent_of(t.revenue),
    }
}
