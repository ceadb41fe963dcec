//! # Sync Commands

use chrono::{DateTime, Utc};
use serde::Serialize;

use gemledger_sync::{PendingDelete, SyncReport, SyncStatus};

use crate::context::AppContext;
use crate::error::AppError;

/// Runs one reconciliation pass. Fails with `REMOTE_UNAVAILABLE` when
/// offline or when no remote backend is configured.
pub async fn sync_now(ctx: &AppContext) -> Result<SyncReport, AppError> {
    Ok(ctx.agent().sync_now().await?)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(flatten)]
    pub status: SyncStatus,
    pub local_store_ok: bool,
    /// Persisted across runs, unlike `status.lastSync`.
    pub last_completed_sync: Option<DateTime<Utc>>,
    pub pending_deletes: Vec<PendingDelete>,
    pub unsynced_sales: usize,
    pub unsynced_customers: usize,
}

pub async fn status(ctx: &AppContext) -> StatusReport {
    let reconciler = ctx.reconciler();
    StatusReport {
        status: ctx.agent().status().await,
        local_store_ok: ctx.health_check().await,
        last_completed_sync: reconciler.last_sync().await,
        pending_deletes: reconciler.pending_deletes().await,
        unsynced_sales: unsynced::<gemledger_core::Sale>(ctx).await,
        unsynced_customers: unsynced::<gemledger_core::Customer>(ctx).await,
    }
}

async fn unsynced<R: gemledger_core::Record>(ctx: &AppContext) -> usize {
    ctx.cache()
        .get_all::<R>()
        .await
        .iter()
        .filter(|r| r.remote_id().is_none())
        .count()
}
