//! # Sync Agent
//!
//! Background task that runs a reconciliation pass whenever connectivity
//! comes back.
//!
//! ## Agent Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           SyncAgent                                     │
//! │                                                                         │
//! │  start()                                                                │
//! │    │                                                                    │
//! │    ├── sync_on_startup && online ──► Reconciler::sync()                 │
//! │    │                                                                    │
//! │    └── spawn loop ─┬─ Connectivity changed ─┬─ offline → online         │
//! │                    │                        │     └► Reconciler::sync() │
//! │                    │                        └─ online → offline         │
//! │                    │                              └► status only        │
//! │                    └─ shutdown_rx ──► break                             │
//! │                                                                         │
//! │  STATUS EVENTS (SyncEventEmitter):                                      │
//! │  emit_status   - every connectivity change and completed pass           │
//! │  emit_progress - { pushed, failed } after a pass                        │
//! │  emit_error    - pass failed or left records behind                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::reconciler::{Reconciler, SyncReport};
use crate::remote::Connectivity;

// =============================================================================
// Sync Status
// =============================================================================

/// Current sync status for external queries.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Connectivity flag as last observed.
    pub is_online: bool,

    /// Whether a remote backend is configured at all.
    pub remote_enabled: bool,

    /// Completion time of the last successful pass.
    pub last_sync: Option<DateTime<Utc>>,

    pub last_report: Option<SyncReport>,

    /// Last error message (if any).
    pub last_error: Option<String>,

    /// Passes completed since start.
    pub passes: u64,
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Receives agent events (a UI layer, a log sink, a test recorder).
pub trait SyncEventEmitter: Send + Sync {
    fn emit_status(&self, status: &SyncStatus);

    fn emit_progress(&self, pushed: usize, failed: usize);

    fn emit_error(&self, message: &str, retryable: bool);
}

/// No-op event emitter.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &SyncStatus) {}
    fn emit_progress(&self, _pushed: usize, _failed: usize) {}
    fn emit_error(&self, _message: &str, _retryable: bool) {}
}

// =============================================================================
// Sync Agent
// =============================================================================

pub struct SyncAgent {
    config: Arc<SyncConfig>,

    reconciler: Reconciler,

    status: Arc<RwLock<SyncStatus>>,

    emitter: Arc<dyn SyncEventEmitter>,

    shutdown_tx: Option<mpsc::Sender<()>>,

    task: Option<JoinHandle<()>>,
}

impl SyncAgent {
    pub fn new(config: SyncConfig, reconciler: Reconciler) -> Self {
        Self::with_emitter(config, reconciler, Arc::new(NoOpEmitter))
    }

    pub fn with_emitter(
        config: SyncConfig,
        reconciler: Reconciler,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> Self {
        let status = SyncStatus {
            is_online: reconciler.remote().is_online(),
            remote_enabled: reconciler.remote().is_enabled(),
            ..Default::default()
        };

        SyncAgent {
            config: Arc::new(config),
            reconciler,
            status: Arc::new(RwLock::new(status)),
            emitter,
            shutdown_tx: None,
            task: None,
        }
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    /// Runs one pass now and records the outcome in the status.
    pub async fn sync_now(&self) -> SyncResult<SyncReport> {
        run_pass(&self.reconciler, &self.status, self.emitter.as_ref()).await
    }

    /// Starts watching connectivity. Does nothing when no remote backend is
    /// configured or the agent is already running.
    pub async fn start(&mut self) -> SyncResult<()> {
        if self.is_running() {
            debug!("Sync agent already running");
            return Ok(());
        }

        if !self.reconciler.remote().is_enabled() {
            info!("Remote store disabled, sync agent not started");
            return Ok(());
        }

        let connectivity: Connectivity = self.reconciler.remote().connectivity().clone();
        let mut online_rx = connectivity.subscribe();
        let was_online = *online_rx.borrow_and_update();

        info!(
            backend = %self.config.backend(),
            online = was_online,
            "Starting sync agent"
        );

        if self.config.sync.sync_on_startup && was_online {
            if let Err(e) = self.sync_now().await {
                debug!(error = %e, "Startup sync did not complete");
            }
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let reconciler = self.reconciler.clone();
        let status = self.status.clone();
        let emitter = self.emitter.clone();

        self.task = Some(tokio::spawn(async move {
            let mut was_online = was_online;

            loop {
                tokio::select! {
                    changed = online_rx.changed() => {
                        if changed.is_err() {
                            debug!("Connectivity channel closed");
                            break;
                        }

                        let online = *online_rx.borrow_and_update();
                        {
                            let mut s = status.write().await;
                            s.is_online = online;
                        }
                        emitter.emit_status(&status.read().await.clone());

                        if online && !was_online {
                            info!("Back online, reconciling");
                            if let Err(e) = run_pass(&reconciler, &status, emitter.as_ref()).await {
                                debug!(error = %e, "Reconnect sync did not complete");
                            }
                        }
                        was_online = online;
                    }

                    _ = shutdown_rx.recv() => {
                        info!("Sync agent received shutdown");
                        break;
                    }
                }
            }

            info!("Sync agent loop stopped");
        }));

        Ok(())
    }

    /// Stops the background loop and waits for it to finish.
    pub async fn shutdown(&mut self) -> SyncResult<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Sync agent task ended abnormally");
            }
        }

        info!("Sync agent stopped");
        Ok(())
    }
}

async fn run_pass(
    reconciler: &Reconciler,
    status: &RwLock<SyncStatus>,
    emitter: &dyn SyncEventEmitter,
) -> SyncResult<SyncReport> {
    let result = reconciler.sync().await;

    let snapshot = {
        let mut s = status.write().await;
        s.is_online = reconciler.remote().is_online();
        match result {
            Ok(ref report) => {
                s.last_sync = Some(Utc::now());
                s.last_report = Some(report.clone());
                s.passes += 1;
                s.last_error = if report.is_clean() {
                    None
                } else {
                    Some(format!("{} record(s) not pushed", report.failed))
                };
            }
            Err(ref e) => {
                s.last_error = Some(e.to_string());
            }
        }
        s.clone()
    };

    match result {
        Ok(ref report) => {
            emitter.emit_progress(report.pushed, report.failed);
            if !report.is_clean() {
                emitter.emit_error(&format!("{} record(s) not pushed", report.failed), true);
            }
        }
        Err(ref e) => {
            error!(error = %e, "Sync pass failed");
            emitter.emit_error(&e.to_string(), e.is_remote_unavailable());
        }
    }
    emitter.emit_status(&snapshot);

    result
}
