//! Single-flight execution of the pipeline.
//!
//! Both the HTTP trigger and the scheduler go through [`SyncRunner::trigger`].
//! At most one run is in flight at a time; a trigger that arrives while one
//! is running is refused immediately instead of queueing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::error::SyncError;
use crate::models::SyncStats;
use crate::pipeline::SyncPipeline;

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Manual,
    Scheduled,
}

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("sync already running")]
    AlreadyRunning,

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("sync task aborted: {0}")]
    Aborted(String),
}

/// Outcome of the most recent finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: Option<SyncStats>,
    pub error: Option<String>,
}

pub struct SyncRunner {
    pipeline: SyncPipeline,
    running: AtomicBool,
    last_run: RwLock<Option<RunRecord>>,
}

/// Clears the running flag on drop.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncRunner {
    pub fn new(pipeline: SyncPipeline) -> Self {
        Self {
            pipeline,
            running: AtomicBool::new(false),
            last_run: RwLock::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn last_run(&self) -> Option<RunRecord> {
        self.last_run.read().await.clone()
    }

    /// Run the pipeline now unless a run is already in flight.
    #[instrument(level = "info", skip(self))]
    pub async fn trigger(&self, trigger: Trigger) -> Result<SyncStats, TriggerError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Sync already running; refusing trigger");
            return Err(TriggerError::AlreadyRunning);
        }
        let _running = RunningGuard(&self.running);

        let started_at = Utc::now();
        let result = self.pipeline.run().await;

        let record = RunRecord {
            trigger,
            started_at,
            finished_at: Utc::now(),
            stats: result.as_ref().ok().copied(),
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        *self.last_run.write().await = Some(record);

        info!(ok = result.is_ok(), "Sync run recorded");
        result.map_err(TriggerError::from)
    }

    /// Like [`trigger`](Self::trigger), but the run lives on its own task.
    ///
    /// Dropping the returned future (a client hanging up, say) stops the
    /// wait, not the run: it still finishes and records its [`RunRecord`].
    pub async fn trigger_detached(
        self: &Arc<Self>,
        trigger: Trigger,
    ) -> Result<SyncStats, TriggerError> {
        let runner = Arc::clone(self);
        tokio::spawn(async move { runner.trigger(trigger).await })
            .await
            .map_err(|e| TriggerError::Aborted(e.to_string()))?
    }
}
