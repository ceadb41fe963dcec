//! # Domain Types
//!
//! Record shapes shared by every layer: sales, customers, settings and the
//! session user.
//!
//! ## Record Identity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every stored record carries two identities:                            │
//! │                                                                         │
//! │  id        UUID v4, assigned on this device, never reused               │
//! │  remoteId  document id assigned by the cloud store, None until synced   │
//! │                                                                         │
//! │  Local-only record:   { id: "8c1f…", remoteId: None }                   │
//! │  Synced record:       { id: "8c1f…", remoteId: Some("Kx93…") }          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Legacy Field Names
//! Older backups and documents use `phoneNumber`, `email`, `address`,
//! `category` and `firestoreId`. Only the private ingest structs at the end
//! of this module read them; everything downstream sees the canonical names.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreError;
use crate::money::Money;

// =============================================================================
// Collections and Local Keys
// =============================================================================

/// The named collections held by the local cache and the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Sales,
    Customers,
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Sales,
        Collection::Customers,
        Collection::Settings,
    ];

    /// Collection name used by the remote document store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Sales => "sales",
            Collection::Customers => "customers",
            Collection::Settings => "settings",
        }
    }

    /// Namespaced key under which the collection is persisted locally.
    pub fn storage_key(&self) -> &'static str {
        match self {
            Collection::Sales => "gemledgerSales",
            Collection::Customers => "gemledgerCustomers",
            Collection::Settings => "gemledgerSettings",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sales" => Ok(Collection::Sales),
            "customers" => Ok(Collection::Customers),
            "settings" => Ok(Collection::Settings),
            other => Err(CoreError::Serialization(format!(
                "Unknown collection: '{}'",
                other
            ))),
        }
    }
}

/// Single-value local keys outside the record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalKey {
    /// Current logged-in user.
    Session,
    /// Custom logo as a data URI.
    Logo,
    /// Timestamp of the last completed sync pass.
    LastSync,
    /// Remote document ids whose deletion has not reached the remote store.
    PendingDeletes,
}

impl LocalKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalKey::Session => "gemledgerUser",
            LocalKey::Logo => "gemledgerLogo",
            LocalKey::LastSync => "gemledgerLastSync",
            LocalKey::PendingDeletes => "gemledgerPendingDeletes",
        }
    }
}

// =============================================================================
// Record Trait
// =============================================================================

/// A record that lives in one of the synced collections.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The collection this record type is stored in.
    const COLLECTION: Collection;

    /// Older field names still read on ingest. Updates clear them from the
    /// remote document so they cannot shadow a cleared canonical field.
    const LEGACY_FIELDS: &'static [&'static str];

    fn id(&self) -> &str;

    fn remote_id(&self) -> Option<&str>;

    fn set_remote_id(&mut self, remote_id: String);

    fn created_at(&self) -> DateTime<Utc>;
}

/// Generates a new client-side record id.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Categories
// =============================================================================

/// Category names offered by the sales entry form. Free-form names are
/// still accepted everywhere.
pub const CATEGORY_CATALOGUE: [&str; 8] = [
    "necklaces",
    "rings",
    "earrings",
    "bracelets",
    "chains",
    "sets",
    "pendants",
    "bangles",
];

/// Payment modes offered by the sales entry form.
pub const PAYMENT_MODES: [&str; 4] = ["Cash", "UPI", "Bank Transfer", "Card"];

/// Payment mode assumed when an imported row leaves it blank.
pub const DEFAULT_PAYMENT_MODE: &str = "Cash";

/// One category entry on a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryLine {
    pub category: String,
    pub quantity: u32,
}

impl CategoryLine {
    pub fn new(category: impl Into<String>, quantity: u32) -> Self {
        CategoryLine {
            category: category.into(),
            quantity,
        }
    }

    /// Parses a comma-separated list of names, quantity 1 each.
    pub fn parse_list(text: &str) -> Vec<CategoryLine> {
        text.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| CategoryLine::new(name, 1))
            .collect()
    }
}

fn default_quantity() -> u32 {
    1
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLine {
    Line {
        category: String,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
    Name(String),
}

/// Accepts `[{category, quantity}]`, `["rings", …]` or `"rings, chains"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCategories {
    Lines(Vec<RawLine>),
    Text(String),
    Missing(()),
}

impl RawCategories {
    fn into_lines(self) -> Vec<CategoryLine> {
        match self {
            RawCategories::Lines(lines) => lines
                .into_iter()
                .map(|line| match line {
                    RawLine::Line { category, quantity } => CategoryLine { category, quantity },
                    RawLine::Name(name) => CategoryLine::new(name, 1),
                })
                .collect(),
            RawCategories::Text(text) => CategoryLine::parse_list(&text),
            RawCategories::Missing(()) => Vec::new(),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded jewelry sale.
///
/// `profit` is stored, not derived on read. It is computed at entry time and
/// recomputed by [`Sale::apply_update`] when a price field changes.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,

    pub remote_id: Option<String>,

    pub customer_name: String,

    pub customer_phone: String,

    /// Serialized as `null` when cleared so a merge-patch update removes it.
    pub customer_email: Option<String>,

    pub customer_address: Option<String>,

    pub categories: Vec<CategoryLine>,

    pub cost_price: Money,

    pub selling_price: Money,

    pub shipping_cost: Money,

    pub profit: Money,

    pub payment_mode: String,

    /// Receipt number carried over from an import; derived from the id
    /// when absent.
    pub receipt_number: Option<String>,

    /// Calendar date of the sale (business date).
    #[ts(as = "String")]
    pub sale_date: NaiveDate,

    /// When the record was first persisted. Never changes.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input of the sales entry form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSale {
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_address: Option<String>,
    pub categories: Vec<CategoryLine>,
    #[serde(default)]
    pub cost_price: Money,
    pub selling_price: Money,
    #[serde(default)]
    pub shipping_cost: Money,
    #[serde(default)]
    pub payment_mode: String,
    #[ts(as = "String")]
    pub sale_date: NaiveDate,
}

/// A partial edit of an existing sale. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleUpdate {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub categories: Option<Vec<CategoryLine>>,
    pub cost_price: Option<Money>,
    pub selling_price: Option<Money>,
    pub shipping_cost: Option<Money>,
    /// Explicit profit override; stored as given.
    pub profit: Option<Money>,
    pub payment_mode: Option<String>,
    #[ts(as = "Option<String>")]
    pub sale_date: Option<NaiveDate>,
}

impl SaleUpdate {
    fn touches_prices(&self) -> bool {
        self.cost_price.is_some() || self.selling_price.is_some() || self.shipping_cost.is_some()
    }
}

/// `selling - cost - shipping`.
pub fn compute_profit(cost_price: Money, selling_price: Money, shipping_cost: Money) -> Money {
    selling_price - cost_price - shipping_cost
}

impl Sale {
    /// Builds a new sale from the entry form, assigning a fresh id.
    pub fn create(draft: NewSale, now: DateTime<Utc>) -> Sale {
        let profit = compute_profit(draft.cost_price, draft.selling_price, draft.shipping_cost);
        Sale {
            id: new_record_id(),
            remote_id: None,
            customer_name: draft.customer_name.trim().to_string(),
            customer_phone: draft.customer_phone.trim().to_string(),
            customer_email: non_empty(draft.customer_email),
            customer_address: non_empty(draft.customer_address),
            categories: draft.categories,
            cost_price: draft.cost_price,
            selling_price: draft.selling_price,
            shipping_cost: draft.shipping_cost,
            profit,
            payment_mode: draft.payment_mode.trim().to_string(),
            receipt_number: None,
            sale_date: draft.sale_date,
            created_at: now,
            updated_at: Some(now),
        }
    }

    /// Applies a partial edit.
    ///
    /// Profit follows the price fields when any of them changes, unless the
    /// edit carries an explicit profit.
    pub fn apply_update(&mut self, update: SaleUpdate, now: DateTime<Utc>) {
        let recompute = update.touches_prices() && update.profit.is_none();

        if let Some(name) = update.customer_name {
            self.customer_name = name.trim().to_string();
        }
        if let Some(phone) = update.customer_phone {
            self.customer_phone = phone.trim().to_string();
        }
        if let Some(email) = update.customer_email {
            self.customer_email = non_empty(Some(email));
        }
        if let Some(address) = update.customer_address {
            self.customer_address = non_empty(Some(address));
        }
        if let Some(categories) = update.categories {
            self.categories = categories;
        }
        if let Some(cost) = update.cost_price {
            self.cost_price = cost;
        }
        if let Some(selling) = update.selling_price {
            self.selling_price = selling;
        }
        if let Some(shipping) = update.shipping_cost {
            self.shipping_cost = shipping;
        }
        if let Some(mode) = update.payment_mode {
            self.payment_mode = mode.trim().to_string();
        }
        if let Some(date) = update.sale_date {
            self.sale_date = date;
        }

        if let Some(profit) = update.profit {
            self.profit = profit;
        } else if recompute {
            self.profit = self.expected_profit();
        }

        self.updated_at = Some(now);
    }

    /// Profit implied by the current price fields.
    pub fn expected_profit(&self) -> Money {
        compute_profit(self.cost_price, self.selling_price, self.shipping_cost)
    }

    /// Selling price plus shipping.
    pub fn total_amount(&self) -> Money {
        self.selling_price + self.shipping_cost
    }

    /// Sum of line quantities.
    pub fn total_quantity(&self) -> u32 {
        self.categories
            .iter()
            .fold(0u32, |total, line| total.saturating_add(line.quantity))
    }

    /// Category names joined with `", "`.
    pub fn item_names(&self) -> String {
        self.categories
            .iter()
            .map(|line| line.category.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Stored receipt number, else `<prefix>-<last 6 chars of id>`.
    pub fn receipt_number(&self, prefix: &str) -> String {
        if let Some(ref number) = self.receipt_number {
            if !number.trim().is_empty() {
                return number.clone();
            }
        }
        let chars: Vec<char> = self.id.chars().collect();
        if chars.is_empty() {
            return format!("{}-000000", prefix);
        }
        let tail: String = chars[chars.len().saturating_sub(6)..].iter().collect();
        format!("{}-{}", prefix, tail)
    }
}

impl Record for Sale {
    const COLLECTION: Collection = Collection::Sales;
    const LEGACY_FIELDS: &'static [&'static str] =
        &["firestoreId", "phoneNumber", "email", "address", "category"];

    fn id(&self) -> &str {
        &self.id
    }

    fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    fn set_remote_id(&mut self, remote_id: String) {
        self.remote_id = Some(remote_id);
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer on the roster. Phone is the natural dedup key.
///
/// Purchase totals are not stored; see [`crate::aggregate::customer_stats`].
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,

    pub remote_id: Option<String>,

    pub name: String,

    pub phone: String,

    pub email: Option<String>,

    pub address: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial edit of a customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl Customer {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        email: Option<String>,
        address: Option<String>,
        now: DateTime<Utc>,
    ) -> Customer {
        Customer {
            id: new_record_id(),
            remote_id: None,
            name: name.into().trim().to_string(),
            phone: phone.into().trim().to_string(),
            email: non_empty(email),
            address: non_empty(address),
            created_at: now,
            updated_at: None,
        }
    }

    /// Customer record for the buyer of a sale, first seen at `now`.
    pub fn from_sale(sale: &Sale, now: DateTime<Utc>) -> Customer {
        Customer::new(
            sale.customer_name.clone(),
            sale.customer_phone.clone(),
            sale.customer_email.clone(),
            sale.customer_address.clone(),
            now,
        )
    }

    pub fn apply_update(&mut self, update: CustomerUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(phone) = update.phone {
            self.phone = phone.trim().to_string();
        }
        if let Some(email) = update.email {
            self.email = non_empty(Some(email));
        }
        if let Some(address) = update.address {
            self.address = non_empty(Some(address));
        }
        self.updated_at = Some(now);
    }

    /// Whether this customer has the given phone, ignoring formatting.
    pub fn has_phone(&self, phone: &str) -> bool {
        let ours = normalize_phone(&self.phone);
        !ours.is_empty() && ours == normalize_phone(phone)
    }
}

impl Record for Customer {
    const COLLECTION: Collection = Collection::Customers;
    const LEGACY_FIELDS: &'static [&'static str] = &["firestoreId", "phoneNumber"];

    fn id(&self) -> &str {
        &self.id
    }

    fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    fn set_remote_id(&mut self, remote_id: String) {
        self.remote_id = Some(remote_id);
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Strips spaces, dashes, dots and parentheses so `98765 43210` and
/// `98765-43210` compare equal.
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '.' | '(' | ')'))
        .collect()
}

// =============================================================================
// Ingest
// =============================================================================

/// Every shape a stored sale has had. Canonical names win over legacy ones
/// when a document carries both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaleWire {
    id: String,
    #[serde(default)]
    remote_id: Option<String>,
    #[serde(default)]
    firestore_id: Option<String>,
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    customer_phone: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    customer_address: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    categories: Option<RawCategories>,
    #[serde(default)]
    category: Option<RawCategories>,
    #[serde(default)]
    cost_price: Money,
    #[serde(default)]
    selling_price: Money,
    #[serde(default)]
    shipping_cost: Money,
    #[serde(default)]
    profit: Money,
    #[serde(default)]
    payment_mode: Option<String>,
    #[serde(default)]
    receipt_number: Option<String>,
    sale_date: NaiveDate,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<SaleWire> for Sale {
    fn from(wire: SaleWire) -> Sale {
        let categories = wire
            .categories
            .map(RawCategories::into_lines)
            .filter(|lines| !lines.is_empty())
            .or_else(|| wire.category.map(RawCategories::into_lines))
            .unwrap_or_default();

        Sale {
            id: wire.id,
            remote_id: wire.remote_id.or(wire.firestore_id),
            customer_name: wire.customer_name.unwrap_or_default(),
            customer_phone: wire.customer_phone.or(wire.phone_number).unwrap_or_default(),
            customer_email: wire.customer_email.or(wire.email),
            customer_address: wire.customer_address.or(wire.address),
            categories,
            cost_price: wire.cost_price,
            selling_price: wire.selling_price,
            shipping_cost: wire.shipping_cost,
            profit: wire.profit,
            payment_mode: wire.payment_mode.unwrap_or_default(),
            receipt_number: wire.receipt_number,
            sale_date: wire.sale_date,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        }
    }
}

impl<'de> Deserialize<'de> for Sale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        SaleWire::deserialize(deserializer).map(Sale::from)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerWire {
    id: String,
    #[serde(default)]
    remote_id: Option<String>,
    #[serde(default)]
    firestore_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    address: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl<'de> Deserialize<'de> for Customer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = CustomerWire::deserialize(deserializer)?;
        Ok(Customer {
            id: wire.id,
            remote_id: wire.remote_id.or(wire.firestore_id),
            name: wire.name.unwrap_or_default(),
            phone: wire.phone.or(wire.phone_number).unwrap_or_default(),
            email: wire.email,
            address: wire.address,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        })
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Process-wide settings. Unknown keys are kept in `extra` so nothing is
/// lost across a backup round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    #[serde(default = "default_date_format")]
    pub date_format: String,

    #[serde(default = "default_primary_color")]
    pub primary_color: String,

    #[serde(default = "default_button_color")]
    pub button_color: String,

    #[serde(default = "default_accent_color")]
    pub accent_color: String,

    #[serde(default)]
    pub auto_backup: bool,

    #[serde(default = "default_receipt_prefix")]
    pub receipt_prefix: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_currency() -> String {
    "₹".to_string()
}

fn default_date_format() -> String {
    "DD/MM/YYYY".to_string()
}

fn default_primary_color() -> String {
    "#4285f4".to_string()
}

fn default_button_color() -> String {
    "#34a853".to_string()
}

fn default_accent_color() -> String {
    "#ea4335".to_string()
}

fn default_receipt_prefix() -> String {
    "TJ".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            currency_symbol: default_currency(),
            date_format: default_date_format(),
            primary_color: default_primary_color(),
            button_color: default_button_color(),
            accent_color: default_accent_color(),
            auto_backup: false,
            receipt_prefix: default_receipt_prefix(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Older settings objects used these key names.
const LEGACY_SETTINGS_KEYS: [(&str, &str); 1] = [("currency", "currencySymbol")];

impl Settings {
    /// Merges a JSON object into the current settings; keys in `patch` win.
    ///
    /// A non-object patch is rejected and leaves `self` unchanged.
    pub fn merge(&mut self, patch: &serde_json::Value) -> Result<(), CoreError> {
        let patch = patch.as_object().ok_or_else(|| {
            CoreError::Serialization("settings patch must be a JSON object".to_string())
        })?;

        let mut current = match serde_json::to_value(&*self)? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        for (key, value) in patch {
            let key = LEGACY_SETTINGS_KEYS
                .iter()
                .find(|(legacy, _)| legacy == key)
                .map(|(_, canonical)| canonical.to_string())
                .unwrap_or_else(|| key.clone());
            current.insert(key, value.clone());
        }

        *self = serde_json::from_value(serde_json::Value::Object(current))?;
        Ok(())
    }
}

// =============================================================================
// Session
// =============================================================================

/// The currently logged-in user, kept in the local cache until logout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionUser {
    pub username: String,
    #[ts(as = "String")]
    pub login_time: DateTime<Utc>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn draft() -> NewSale {
        NewSale {
            customer_name: " Asha ".to_string(),
            customer_phone: "98765 43210".to_string(),
            customer_email: Some("".to_string()),
            customer_address: None,
            categories: vec![CategoryLine::new("rings", 2)],
            cost_price: Money::from_major(600),
            selling_price: Money::from_major(1000),
            shipping_cost: Money::from_major(50),
            payment_mode: "UPI".to_string(),
            sale_date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        }
    }

    #[test]
    fn test_create_computes_profit() {
        let sale = Sale::create(draft(), now());
        assert_eq!(sale.profit, Money::from_major(350));
        assert_eq!(sale.customer_name, "Asha");
        assert_eq!(sale.customer_email, None);
        assert_eq!(sale.created_at, now());
        assert_eq!(sale.updated_at, Some(now()));
        assert!(sale.remote_id.is_none());
        assert_eq!(sale.total_amount(), Money::from_major(1050));
        assert_eq!(sale.total_quantity(), 2);
    }

    #[test]
    fn test_update_recomputes_profit_when_prices_change() {
        let mut sale = Sale::create(draft(), now());
        let later = now() + chrono::Duration::hours(1);

        sale.apply_update(
            SaleUpdate {
                selling_price: Some(Money::from_major(1200)),
                ..Default::default()
            },
            later,
        );
        assert_eq!(sale.profit, Money::from_major(550));
        assert_eq!(sale.updated_at, Some(later));
        assert_eq!(sale.created_at, now());
    }

    #[test]
    fn test_update_keeps_explicit_profit_override() {
        let mut sale = Sale::create(draft(), now());
        sale.apply_update(
            SaleUpdate {
                cost_price: Some(Money::from_major(100)),
                profit: Some(Money::from_major(10)),
                ..Default::default()
            },
            now(),
        );
        assert_eq!(sale.profit, Money::from_major(10));
    }

    #[test]
    fn test_update_without_price_change_keeps_profit() {
        let mut sale = Sale::create(draft(), now());
        sale.profit = Money::from_major(1);
        sale.apply_update(
            SaleUpdate {
                customer_name: Some("Asha K".to_string()),
                ..Default::default()
            },
            now(),
        );
        assert_eq!(sale.profit, Money::from_major(1));
        assert_eq!(sale.customer_name, "Asha K");
    }

    #[test]
    fn test_receipt_number() {
        let mut sale = Sale::create(draft(), now());
        sale.id = "abc123def456".to_string();
        assert_eq!(sale.receipt_number("TJ"), "TJ-def456");

        sale.id = String::new();
        assert_eq!(sale.receipt_number("TJ"), "TJ-000000");

        sale.receipt_number = Some("INV-7".to_string());
        assert_eq!(sale.receipt_number("TJ"), "INV-7");
    }

    #[test]
    fn test_legacy_sale_aliases() {
        let json = serde_json::json!({
            "id": "s1",
            "firestoreId": "remote-1",
            "customerName": "Meera",
            "phoneNumber": "99999",
            "email": "m@example.com",
            "category": ["rings", "chains"],
            "costPrice": "100",
            "sellingPrice": 250.5,
            "paymentMode": "Cash",
            "saleDate": "2024-01-05",
            "createdAt": "2024-01-05T10:00:00.000Z"
        });
        let sale: Sale = serde_json::from_value(json).unwrap();
        assert_eq!(sale.remote_id.as_deref(), Some("remote-1"));
        assert_eq!(sale.customer_phone, "99999");
        assert_eq!(sale.customer_email.as_deref(), Some("m@example.com"));
        assert_eq!(sale.categories.len(), 2);
        assert_eq!(sale.categories[1], CategoryLine::new("chains", 1));
        assert_eq!(sale.cost_price, Money::from_major(100));
        assert_eq!(sale.selling_price, Money::from_minor(25050));
        assert!(sale.shipping_cost.is_zero());
        assert!(sale.updated_at.is_none());
    }

    #[test]
    fn test_canonical_names_win_over_legacy() {
        let json = serde_json::json!({
            "id": "s4",
            "customerPhone": "11111",
            "phoneNumber": "22222",
            "customerEmail": null,
            "categories": [],
            "category": "rings",
            "saleDate": "2024-01-05",
            "createdAt": "2024-01-05T10:00:00Z"
        });
        let sale: Sale = serde_json::from_value(json).unwrap();
        assert_eq!(sale.customer_phone, "11111");
        assert!(sale.customer_email.is_none());
        assert_eq!(sale.item_names(), "rings");

        let json = serde_json::json!({
            "id": "c1",
            "firestoreId": "doc-9",
            "phoneNumber": "33333",
            "email": null,
            "createdAt": "2024-01-05T10:00:00Z"
        });
        let customer: Customer = serde_json::from_value(json).unwrap();
        assert_eq!(customer.remote_id.as_deref(), Some("doc-9"));
        assert_eq!(customer.phone, "33333");
        assert!(customer.email.is_none());
    }

    #[test]
    fn test_categories_from_text_and_objects() {
        let json = serde_json::json!({
            "id": "s2",
            "categories": "rings, , bangles",
            "saleDate": "2024-01-05",
            "createdAt": "2024-01-05T10:00:00Z"
        });
        let sale: Sale = serde_json::from_value(json).unwrap();
        assert_eq!(sale.item_names(), "rings, bangles");

        let json = serde_json::json!({
            "id": "s3",
            "categories": [{"category": "sets", "quantity": 3}, {"category": "rings"}],
            "saleDate": "2024-01-05",
            "createdAt": "2024-01-05T10:00:00Z"
        });
        let sale: Sale = serde_json::from_value(json).unwrap();
        assert_eq!(sale.categories[0].quantity, 3);
        assert_eq!(sale.categories[1].quantity, 1);
    }

    #[test]
    fn test_canonical_serialization_uses_camel_case() {
        let sale = Sale::create(draft(), now());
        let value = serde_json::to_value(&sale).unwrap();
        assert!(value.get("customerPhone").is_some());
        assert!(value["remoteId"].is_null());
        assert!(value["customerEmail"].is_null());
        assert!(value.get("phoneNumber").is_none());

        let back: Sale = serde_json::from_value(value).unwrap();
        assert_eq!(back, sale);
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(987) 654-3210"), "9876543210");
        assert_eq!(normalize_phone(" 98765 43210 "), "9876543210");

        let customer = Customer::new("A", "98765-43210", None, None, now());
        assert!(customer.has_phone("98765 43210"));
        assert!(!customer.has_phone("12345"));
        assert!(!Customer::new("B", "", None, None, now()).has_phone(""));
    }

    #[test]
    fn test_settings_defaults_and_merge() {
        let mut settings = Settings::default();
        assert_eq!(settings.currency_symbol, "₹");
        assert_eq!(settings.date_format, "DD/MM/YYYY");

        settings
            .merge(&serde_json::json!({
                "currency": "$",
                "autoBackup": true,
                "storeName": "Theia"
            }))
            .unwrap();
        assert_eq!(settings.currency_symbol, "$");
        assert!(settings.auto_backup);
        assert_eq!(settings.primary_color, "#4285f4");
        assert_eq!(settings.extra.get("storeName"), Some(&serde_json::json!("Theia")));

        assert!(settings.merge(&serde_json::json!([1, 2])).is_err());
        assert_eq!(settings.currency_symbol, "$");
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(Collection::Sales.as_str(), "sales");
        assert_eq!("Customers".parse::<Collection>().unwrap(), Collection::Customers);
        assert!("orders".parse::<Collection>().is_err());
        assert_ne!(Collection::Sales.storage_key(), Collection::Customers.storage_key());
    }
}
