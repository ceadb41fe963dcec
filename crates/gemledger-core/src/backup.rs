//! # Backup Format
//!
//! Whole-store JSON backups.
//!
//! ```text
//! {
//!   "sales":      [ Sale, … ],        required
//!   "customers":  [ Customer, … ],    required
//!   "settings":   { … },              optional, merged on restore
//!   "exportDate": "2024-06-01T…Z",    informational
//!   "version":    "2.0.0"             informational
//! }
//! ```
//!
//! Restoring replaces the local sales and customers collections wholesale.
//! Settings are merged rather than replaced so keys absent from an older
//! backup keep their current values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{Customer, Sale, Settings};
use crate::BACKUP_VERSION;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub sales: Vec<Sale>,
    pub customers: Vec<Customer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Backup {
    /// Snapshot of the current store.
    pub fn new(
        sales: Vec<Sale>,
        customers: Vec<Customer>,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        Ok(Backup {
            sales,
            customers,
            settings: Some(serde_json::to_value(settings)?),
            export_date: Some(now),
            version: Some(BACKUP_VERSION.to_string()),
        })
    }

    /// Parses backup text.
    ///
    /// ## Errors
    /// - `InvalidBackup` when the text is not a JSON object, or `sales` or
    ///   `customers` is missing or not an array
    /// - `InvalidBackup` naming the first record that does not parse
    pub fn parse(text: &str) -> CoreResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| CoreError::InvalidBackup(format!("not valid JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| CoreError::InvalidBackup("expected a JSON object".to_string()))?;

        for key in ["sales", "customers"] {
            match object.get(key) {
                Some(serde_json::Value::Array(_)) => {}
                Some(_) => {
                    return Err(CoreError::InvalidBackup(format!("'{}' must be an array", key)))
                }
                None => return Err(CoreError::InvalidBackup(format!("missing '{}'", key))),
            }
        }

        let sales = parse_records::<Sale>(object, "sales")?;
        let customers = parse_records::<Customer>(object, "customers")?;

        let settings = object.get("settings").filter(|v| v.is_object()).cloned();
        let export_date = object
            .get("exportDate")
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        let version = object
            .get("version")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(Backup {
            sales,
            customers,
            settings,
            export_date,
            version,
        })
    }

    /// Merges the backed-up settings into `settings`. No-op when the backup
    /// carries none.
    pub fn merge_settings_into(&self, settings: &mut Settings) -> CoreResult<()> {
        match self.settings {
            Some(ref patch) => settings.merge(patch),
            None => Ok(()),
        }
    }

    pub fn to_json_pretty(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn parse_records<R: serde::de::DeserializeOwned>(
    object: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> CoreResult<Vec<R>> {
    let items = object
        .get(key)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| {
                CoreError::InvalidBackup(format!("{}[{}]: {}", key, index, e))
            })
        })
        .collect()
}
