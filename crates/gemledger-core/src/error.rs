//! # Error Types
//!
//! Domain-specific error types for gemledger-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  gemledger-core errors (this file)                                      │
//! │  ├── CoreError        - General domain errors                           │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  gemledger-db errors                                                    │
//! │  └── DbError          - Local cache failures (swallowed by LocalCache)  │
//! │                                                                         │
//! │  gemledger-sync errors                                                  │
//! │  └── SyncError        - RemoteUnavailable and config failures           │
//! │                                                                         │
//! │  CLI errors                                                             │
//! │  └── AppError         - What the operator sees                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Spreadsheet row failures are not errors in this sense: they are collected
//! as [`crate::sheet::ImportRowError`] values and never abort an import.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Customer cannot be found.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// A backup file is missing required sections or is not valid JSON.
    ///
    /// ## When This Occurs
    /// - `sales` or `customers` key is absent
    /// - One of them is present but not an array
    /// - The file is not a JSON object at all
    #[error("Invalid backup: {0}")]
    InvalidBackup(String),

    /// A value could not be converted to or from JSON.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write is attempted; a failed validation leaves both the
/// local cache and the remote store untouched.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. bad date, bad data URI).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("customerName");
        assert_eq!(err.to_string(), "customerName is required");

        let err = ValidationError::MustBePositive {
            field: "sellingPrice".to_string(),
        };
        assert_eq!(err.to_string(), "sellingPrice must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("customerPhone").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let core_err: CoreError = err.into();
        assert!(matches!(core_err, CoreError::Serialization(_)));
    }
}
