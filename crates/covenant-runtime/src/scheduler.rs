//! Background scheduler: one tokio task per enabled job, each on its own
//! interval, all stopped by a shared shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use covenant_core::errors::{CovenantError, CovenantResult};

use crate::jobs::Job;
use crate::runtime::CovenantRuntime;

pub struct Scheduler;

/// Running scheduler. Dropping it without `shutdown` leaves the loops
/// running until the tokio runtime stops.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<(Job, JoinHandle<()>)>,
}

impl Scheduler {
    /// Spawn a loop for every job with a non-zero interval. Must be called
    /// from within a tokio runtime.
    pub fn start(runtime: Arc<CovenantRuntime>) -> SchedulerHandle {
        let (shutdown, signal) = watch::channel(false);
        let tasks = Job::ALL
            .into_iter()
            .filter_map(|job| {
                let secs = job.interval_secs(&runtime.config.scheduler);
                if secs == 0 {
                    debug!(job = %job, "job disabled");
                    return None;
                }
                let handle = tokio::spawn(run_loop(
                    runtime.clone(),
                    job,
                    Duration::from_secs(secs),
                    signal.clone(),
                ));
                Some((job, handle))
            })
            .collect::<Vec<_>>();

        info!(jobs = tasks.len(), "scheduler started");
        SchedulerHandle { shutdown, tasks }
    }
}

impl SchedulerHandle {
    pub fn jobs(&self) -> Vec<Job> {
        self.tasks.iter().map(|(job, _)| *job).collect()
    }

    /// Signal every loop to stop and wait for them. A job already running
    /// finishes first.
    pub async fn shutdown(self) -> CovenantResult<()> {
        // Loops that already exited dropped their receivers; nothing to signal.
        let _ = self.shutdown.send(true);
        for (job, handle) in self.tasks {
            handle
                .await
                .map_err(|e| CovenantError::TaskFailed(format!("{job} loop: {e}")))?;
        }
        info!("scheduler stopped");
        Ok(())
    }
}

async fn run_loop(
    runtime: Arc<CovenantRuntime>,
    job: Job,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let rt = runtime.clone();
                match tokio::task::spawn_blocking(move || rt.run_job(job, Utc::now())).await {
                    Ok(Ok(summary)) => debug!(job = %job, produced = summary.produced, "scheduled run done"),
                    Ok(Err(e)) => error!(job = %job, error = %e, "scheduled run failed"),
                    Err(e) => error!(job = %job, error = %e, "scheduled run panicked"),
                }
            }
        }
    }
    debug!(job = %job, "job loop stopped");
}
