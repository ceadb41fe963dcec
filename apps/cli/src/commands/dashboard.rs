//! # Dashboard
//!
//! Figures are recomputed from the merged record set on every call.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  summary        revenue, profit, cost, count, margin       │
//! │  categories     per category, share-weighted, with margin  │
//! │  last30Days     one point per day, oldest first            │
//! │  last6Months    one point per month, oldest first          │
//! │  weekdays       Mon..Sun                                   │
//! │  paymentModes   per mode                                   │
//! │  topCustomers   biggest spenders                           │
//! └────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::Serialize;

use gemledger_core::aggregate::{
    by_category, by_payment_mode, daily_series, monthly_series, profit_margin, summary,
    top_customers, weekday_pattern, CategoryStats, CustomerTotal, Summary, WindowStats,
    DASHBOARD_TOP_CUSTOMERS, WEEKDAY_LABELS,
};
use gemledger_core::{Customer, NoFilter, Sale};

use crate::context::AppContext;

const DAILY_WINDOW_DAYS: u32 = 30;
const MONTHLY_WINDOW_MONTHS: u32 = 6;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRow {
    pub category: String,
    #[serde(flatten)]
    pub stats: CategoryStats,
    pub margin: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub label: String,
    #[serde(flatten)]
    pub stats: WindowStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub summary: Summary,
    pub categories: Vec<CategoryRow>,
    pub last_30_days: Vec<SeriesPoint>,
    pub last_6_months: Vec<SeriesPoint>,
    pub weekdays: Vec<SeriesPoint>,
    pub payment_modes: Vec<SeriesPoint>,
    pub top_customers: Vec<CustomerTotal>,
}

/// Builds every dashboard panel for the window ending on `today`.
pub async fn build(ctx: &AppContext, today: NaiveDate) -> Dashboard {
    let sales: Vec<Sale> = ctx.reconciler().read(&NoFilter).await;
    let customers: Vec<Customer> = ctx.reconciler().read(&NoFilter).await;
    compute(&sales, &customers, today)
}

fn compute(sales: &[Sale], customers: &[Customer], today: NaiveDate) -> Dashboard {
    let categories = by_category(sales)
        .into_iter()
        .map(|(category, stats)| CategoryRow {
            margin: profit_margin(&stats),
            category,
            stats,
        })
        .collect();

    let last_30_days = daily_series(sales, today, DAILY_WINDOW_DAYS)
        .into_iter()
        .map(|(day, stats)| SeriesPoint {
            label: day.format("%Y-%m-%d").to_string(),
            stats,
        })
        .collect();

    let last_6_months = monthly_series(sales, today, MONTHLY_WINDOW_MONTHS)
        .into_iter()
        .map(|(label, stats)| SeriesPoint { label, stats })
        .collect();

    let weekdays = WEEKDAY_LABELS
        .iter()
        .zip(weekday_pattern(sales))
        .map(|(label, stats)| SeriesPoint {
            label: label.to_string(),
            stats,
        })
        .collect();

    let payment_modes = by_payment_mode(sales)
        .into_iter()
        .map(|(label, stats)| SeriesPoint { label, stats })
        .collect();

    Dashboard {
        summary: summary(sales, customers),
        categories,
        last_30_days,
        last_6_months,
        weekdays,
        payment_modes,
        top_customers: top_customers(sales, customers, DASHBOARD_TOP_CUSTOMERS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sale::record_sale;
    use gemledger_core::{CategoryLine, Money, NewSale};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(phone: &str, mode: &str, selling: i64, date: NaiveDate) -> NewSale {
        NewSale {
            customer_name: format!("Buyer {}", phone),
            customer_phone: phone.to_string(),
            customer_email: None,
            customer_address: None,
            categories: vec![CategoryLine::new("rings", 1)],
            cost_price: Money::from_major(10),
            selling_price: Money::from_major(selling),
            shipping_cost: Money::zero(),
            payment_mode: mode.to_string(),
            sale_date: date,
        }
    }

    #[tokio::test]
    async fn test_empty_dashboard_has_fixed_windows() {
        let (ctx, _memory) = AppContext::for_tests(false).await;
        let dashboard = build(&ctx, day(2024, 6, 30)).await;

        assert_eq!(dashboard.summary.transactions, 0);
        assert!(dashboard.categories.is_empty());
        assert_eq!(dashboard.last_30_days.len(), 30);
        assert_eq!(dashboard.last_6_months.len(), 6);
        assert_eq!(dashboard.weekdays.len(), 7);
        assert_eq!(dashboard.weekdays[0].label, "Mon");
        assert!(dashboard.top_customers.is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_figures() {
        let (ctx, _memory) = AppContext::for_tests(false).await;
        record_sale(&ctx, draft("1", "Cash", 100, day(2024, 6, 30))).await.unwrap();
        record_sale(&ctx, draft("1", "UPI", 50, day(2024, 6, 29))).await.unwrap();
        record_sale(&ctx, draft("2", "Cash", 300, day(2023, 12, 15))).await.unwrap();

        let dashboard = build(&ctx, day(2024, 6, 30)).await;

        assert_eq!(dashboard.summary.transactions, 3);
        assert_eq!(dashboard.summary.customers, 2);
        assert_eq!(dashboard.summary.total_revenue, Money::from_major(450));

        let last = dashboard.last_30_days.last().unwrap();
        assert_eq!(last.label, "2024-06-30");
        assert_eq!(last.stats.count, 1);

        // December falls outside the six-month window ending in June
        let window_count: usize = dashboard.last_6_months.iter().map(|p| p.stats.count).sum();
        assert_eq!(window_count, 2);

        let cash = dashboard
            .payment_modes
            .iter()
            .find(|p| p.label == "Cash")
            .unwrap();
        assert_eq!(cash.stats.count, 2);

        assert_eq!(dashboard.top_customers[0].phone, "2");
        assert_eq!(dashboard.top_customers[1].purchases, 2);

        let json = serde_json::to_value(&dashboard).unwrap();
        assert!(json["last30Days"].is_array());
        assert!(json["categories"][0]["margin"].is_number());
    }
}
