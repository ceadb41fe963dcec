//! # Sync Error Types
//!
//! Error types for remote store and reconciliation operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌──────────────────────┐  ┌───────────────────┐  │
//! │  │  Configuration  │  │   Remote             │  │   Local           │  │
//! │  │                 │  │                      │  │                   │  │
//! │  │  InvalidConfig  │  │  RemoteUnavailable   │  │  DatabaseError    │  │
//! │  │  InvalidUrl     │  │  (offline, transport,│  │  Serialization    │  │
//! │  │  ConfigLoad/Save│  │   status, decode)    │  │                   │  │
//! │  └─────────────────┘  └──────────────────────┘  └───────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every remote failure collapses into `RemoteUnavailable`; the reconciler
//! treats it exactly like being offline.

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid remote URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// The remote store could not be used: offline flag, transport failure,
    /// non-success status or an undecodable response.
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    // =========================================================================
    // Local Errors
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<gemledger_db::DbError> for SyncError {
    fn from(err: gemledger_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::RemoteUnavailable(format!("request timed out: {}", err))
        } else if let Some(status) = err.status() {
            SyncError::RemoteUnavailable(format!("HTTP {}: {}", status.as_u16(), err))
        } else {
            SyncError::RemoteUnavailable(err.to_string())
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// True for any failure the reconciler should treat as "offline".
    pub fn is_remote_unavailable(&self) -> bool {
        matches!(self, SyncError::RemoteUnavailable(_))
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }

    /// Collapses any error raised while talking to the remote into
    /// `RemoteUnavailable`, keeping the message.
    pub fn into_remote_unavailable(self) -> SyncError {
        match self {
            SyncError::RemoteUnavailable(_) => self,
            other => SyncError::RemoteUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert!(SyncError::RemoteUnavailable("offline".into()).is_remote_unavailable());
        assert!(!SyncError::InvalidConfig("x".into()).is_remote_unavailable());
        assert!(SyncError::InvalidUrl("x".into()).is_config_error());
        assert!(!SyncError::DatabaseError("x".into()).is_config_error());
    }

    #[test]
    fn test_into_remote_unavailable() {
        let err = SyncError::SerializationFailed("bad body".into()).into_remote_unavailable();
        assert!(err.is_remote_unavailable());
        assert!(err.to_string().contains("bad body"));
    }
}
