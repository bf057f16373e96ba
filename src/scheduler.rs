//! Recurring sync on a cron schedule.
//!
//! Accepts standard 5-field crontab expressions as well as the 6/7-field
//! form with a leading seconds field. Schedules are evaluated in the
//! configured timezone.

use chrono_tz::Tz;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info, warn};

use crate::runner::{SyncRunner, Trigger, TriggerError};

/// Prefix 5-field crontab expressions with a zero seconds field.
pub fn normalize_cron(expr: &str) -> String {
    let expr = expr.trim();
    if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

/// The sync job. Failures are logged; the job never panics.
///
/// # Arguments
///
/// * `runner` - Shared runner, so ticks and manual triggers exclude each other
/// * `expr` - Cron expression, 5-field or with a leading seconds field
/// * `tz` - Zone the expression is evaluated in
pub fn sync_job(runner: Arc<SyncRunner>, expr: &str, tz: Tz) -> Result<Job, JobSchedulerError> {
    Job::new_async_tz(normalize_cron(expr).as_str(), tz, move |_uuid, _lock| {
        let runner = runner.clone();
        Box::pin(async move { run_scheduled(&runner).await })
    })
}

/// One scheduled tick. Outcomes are logged, never returned.
pub async fn run_scheduled(runner: &SyncRunner) {
    info!("Scheduled sync starting");
    match runner.trigger(Trigger::Scheduled).await {
        Ok(stats) => info!(?stats, "Scheduled sync finished"),
        Err(TriggerError::AlreadyRunning) => {
            warn!("Previous sync still running; skipping this tick")
        }
        Err(e) => error!(error = %e, "Scheduled sync failed"),
    }
}

/// Start the scheduler with the sync job registered.
pub async fn start(
    runner: Arc<SyncRunner>,
    expr: &str,
    tz: Tz,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    scheduler.add(sync_job(runner, expr, tz)?).await?;
    scheduler.start().await?;

    info!(cron = %normalize_cron(expr), timezone = %tz, "Scheduler started");
    Ok(scheduler)
}
