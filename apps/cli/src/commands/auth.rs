//! # Auth Commands
//!
//! A login gate for a single shop, not a security boundary.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  login(username, password)                                              │
//! │     │                                                                   │
//! │     ├── remote "users" doc for username? ── yes ──► argon2 verify       │
//! │     │                                                                   │
//! │     └── no doc / remote unreachable ───────────────► fallback accounts  │
//! │                                                                         │
//! │  success ──► SessionUser stored under the session key until logout      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use gemledger_core::{LocalKey, RemoteQuery, SessionUser};
use gemledger_sync::RemoteDocument;

use crate::context::AppContext;
use crate::error::AppError;

const USERS_COLLECTION: &str = "users";

/// Accounts accepted when the remote store has no entry for the username.
const FALLBACK_ACCOUNTS: [(&str, &str); 2] = [("admin", "admin123"), ("user", "user123")];

const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// Hashing
// =============================================================================

/// Hashes a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn fallback_matches(username: &str, password: &str) -> bool {
    FALLBACK_ACCOUNTS
        .iter()
        .any(|(u, p)| *u == username && *p == password)
}

/// The remote user document, or `None` when absent or unreachable.
async fn remote_user(ctx: &AppContext, username: &str) -> Option<RemoteDocument> {
    let query = RemoteQuery::default().with_equals("username", username);
    match ctx.remote().query_documents(USERS_COLLECTION, &query).await {
        Ok(docs) => docs.into_iter().next(),
        Err(e) => {
            debug!(error = %e, "User lookup skipped, using fallback accounts");
            None
        }
    }
}

async fn check_credentials(ctx: &AppContext, username: &str, password: &str) -> bool {
    match remote_user(ctx, username).await {
        Some(doc) => doc
            .data
            .get("passwordHash")
            .and_then(|v| v.as_str())
            .map(|hash| verify_password(password, hash))
            .unwrap_or(false),
        None => fallback_matches(username, password),
    }
}

// =============================================================================
// Commands
// =============================================================================

pub async fn login(ctx: &AppContext, username: &str, password: &str) -> Result<SessionUser, AppError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::validation("Username and password are required"));
    }

    if !check_credentials(ctx, username, password).await {
        warn!(username = %username, "Login rejected");
        return Err(AppError::auth_failed("Invalid username or password"));
    }

    let user = SessionUser {
        username: username.to_string(),
        login_time: Utc::now(),
    };
    ctx.cache().set_value(LocalKey::Session, &user).await;
    info!(username = %user.username, "Logged in");
    Ok(user)
}

pub async fn logout(ctx: &AppContext) -> Option<SessionUser> {
    let user = current_user(ctx).await;
    ctx.cache().remove_value(LocalKey::Session).await;
    if let Some(ref user) = user {
        info!(username = %user.username, "Logged out");
    }
    user
}

pub async fn current_user(ctx: &AppContext) -> Option<SessionUser> {
    ctx.cache().get_value(LocalKey::Session).await
}

/// Changes the logged-in user's password. Needs the remote store, where the
/// hash lives.
pub async fn change_password(
    ctx: &AppContext,
    current_password: &str,
    new_password: &str,
) -> Result<(), AppError> {
    let user = current_user(ctx)
        .await
        .ok_or_else(|| AppError::auth_failed("Not logged in"))?;

    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "New password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if !ctx.remote().is_online() {
        return Err(gemledger_sync::SyncError::RemoteUnavailable(
            "password changes need the remote store".into(),
        )
        .into());
    }
    if !check_credentials(ctx, &user.username, current_password).await {
        return Err(AppError::auth_failed("Current password is incorrect"));
    }

    let hash = hash_password(new_password)?;
    let now = Utc::now();

    match remote_user(ctx, &user.username).await {
        Some(doc) => {
            ctx.remote()
                .update_document(
                    USERS_COLLECTION,
                    &doc.id,
                    &json!({ "passwordHash": hash, "updatedAt": now }),
                )
                .await?
        }
        None => {
            ctx.remote()
                .add_document(
                    USERS_COLLECTION,
                    &json!({ "username": user.username, "passwordHash": hash, "createdAt": now }),
                )
                .await?;
        }
    }

    info!(username = %user.username, "Password changed");
    Ok(())
}
