//! # Application Error Type
//!
//! Unified error type for every command.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in gemledger                              │
//! │                                                                         │
//! │  gemledger sale record …                                                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, AppError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Validation? ─── ValidationError ────────────┐                   │  │
//! │  │  Storage?    ─── DbError ────────────────────┤                   │  │
//! │  │  Remote?     ─── SyncError ──────────────────┼──► AppError ─────►│  │
//! │  │  Backup?     ─── CoreError::InvalidBackup ───┘                   │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  stderr: {"code": "VALIDATION_ERROR", "message": "…"}   exit 1          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use gemledger_core::{CoreError, ValidationError};
use gemledger_db::DbError;
use gemledger_sync::SyncError;

/// Error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Sale not found: 8c1f…"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,

    ValidationError,

    DatabaseError,

    /// Remote store offline or failing and the command has no local fallback.
    RemoteUnavailable,

    AuthFailed,

    /// An input file could not be read as a sheet or backup.
    ImportError,

    Internal,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        AppError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::AuthFailed, message)
    }

    pub fn import(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ImportError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Internal, message)
    }

    /// Destructive commands refuse to run without `--yes`.
    pub fn confirmation_required(action: &str) -> Self {
        AppError::validation(format!(
            "{} cannot be undone; re-run with --yes to confirm",
            action
        ))
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SaleNotFound(id) => AppError::not_found("Sale", &id),
            CoreError::CustomerNotFound(id) => AppError::not_found("Customer", &id),
            CoreError::InvalidBackup(reason) => {
                AppError::import(format!("Invalid backup: {}", reason))
            }
            CoreError::Serialization(e) => {
                tracing::error!("Serialization failed: {}", e);
                AppError::internal(format!("Serialization failed: {}", e))
            }
            CoreError::Validation(e) => AppError::from(e),
        }
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => AppError::not_found(&entity, &id),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::PoolExhausted => {
                AppError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", other);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::RemoteUnavailable(reason) => AppError::new(
                ErrorCode::RemoteUnavailable,
                format!("Remote store unavailable: {}", reason),
            ),
            SyncError::DatabaseError(e) => AppError::new(ErrorCode::DatabaseError, e),
            e if e.is_config_error() => AppError::validation(e.to_string()),
            e => AppError::internal(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::import(format!("Invalid JSON: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::internal(format!("I/O error: {}", err))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
