//! The periodic batch jobs. Each runs over every enterprise known to the
//! store and is callable on demand as well as from the scheduler.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use covenant_core::config::SchedulerConfig;
use covenant_core::errors::CovenantResult;
use covenant_core::models::{BatchFailure, BatchReport};
use covenant_core::traits::IEnterpriseDirectory;
use covenant_temporal::TimeWindow;

use crate::runtime::CovenantRuntime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Job {
    AnomalySweep,
    RenewalRecompute,
    PatternDetection,
    OverdueSweep,
}

impl Job {
    pub const ALL: [Job; 4] = [
        Job::AnomalySweep,
        Job::RenewalRecompute,
        Job::PatternDetection,
        Job::OverdueSweep,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::AnomalySweep => "anomaly_sweep",
            Self::RenewalRecompute => "renewal_recompute",
            Self::PatternDetection => "pattern_detection",
            Self::OverdueSweep => "overdue_sweep",
        }
    }

    /// Zero means the job is not scheduled.
    pub fn interval_secs(&self, config: &SchedulerConfig) -> u64 {
        match self {
            Self::AnomalySweep => config.anomaly_sweep_secs,
            Self::RenewalRecompute => config.renewal_recompute_secs,
            Self::PatternDetection => config.pattern_detection_secs,
            Self::OverdueSweep => config.overdue_sweep_secs,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Totals of one job run across enterprises.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub job: Job,
    pub enterprises: usize,
    pub processed: usize,
    /// Anomalies recorded, predictions re-tiered, patterns active, or
    /// obligations marked overdue.
    pub produced: usize,
    /// Item names are prefixed with the enterprise id.
    pub failures: Vec<BatchFailure>,
}

impl JobSummary {
    fn new(job: Job) -> Self {
        Self {
            job,
            enterprises: 0,
            processed: 0,
            produced: 0,
            failures: Vec::new(),
        }
    }

    fn absorb<T>(&mut self, enterprise_id: &str, outcome: CovenantResult<BatchReport<T>>) {
        self.enterprises += 1;
        match outcome {
            Ok(report) => {
                self.processed += report.processed;
                self.produced += report.items.len();
                self.failures
                    .extend(report.failures.into_iter().map(|f| BatchFailure {
                        item: format!("{enterprise_id}/{}", f.item),
                        error: f.error,
                    }));
            }
            Err(e) => {
                warn!(job = %self.job, enterprise_id, error = %e, "enterprise skipped");
                self.failures.push(BatchFailure {
                    item: enterprise_id.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}

impl CovenantRuntime {
    /// Run one batch job over every enterprise. Enterprises that fail are
    /// recorded in the summary; only a failure to list enterprises or an
    /// invalid detection window aborts the run.
    pub fn run_job(&self, job: Job, now: DateTime<Utc>) -> CovenantResult<JobSummary> {
        let _span = covenant_observability::batch_span!(job.name()).entered();
        let scheduler = &self.config.scheduler;
        let window = TimeWindow::trailing(now, scheduler.detection_window_days)?;
        let bucket_type = scheduler.bucket_type;

        let mut summary = JobSummary::new(job);
        for enterprise_id in self.store.list_enterprises()? {
            let ent = enterprise_id.as_str();
            match job {
                Job::AnomalySweep => summary.absorb(
                    ent,
                    self.temporal.anomalies.sweep(ent, bucket_type, window, now),
                ),
                Job::RenewalRecompute => {
                    summary.absorb(ent, self.temporal.renewals.recompute(ent, now))
                }
                Job::PatternDetection => summary.absorb(
                    ent,
                    self.temporal
                        .patterns
                        .detect_patterns(ent, bucket_type, window, now),
                ),
                Job::OverdueSweep => summary.absorb(ent, self.obligations.sweep_overdue(ent, now)),
            }
        }

        info!(
            job = %job,
            enterprises = summary.enterprises,
            processed = summary.processed,
            produced = summary.produced,
            failed = summary.failures.len(),
            "batch job finished"
        );
        Ok(summary)
    }

    /// Run every job once, in a fixed order.
    pub fn run_all(&self, now: DateTime<Utc>) -> CovenantResult<Vec<JobSummary>> {
        Job::ALL.iter().map(|job| self.run_job(*job, now)).collect()
    }
}
