use serde::{Deserialize, Serialize};

use super::defaults;
use crate::models::BucketType;

/// Intervals for the periodic batch jobs. A zero interval disables the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub anomaly_sweep_secs: u64,
    pub renewal_recompute_secs: u64,
    pub pattern_detection_secs: u64,
    pub overdue_sweep_secs: u64,
    /// Look-back window for anomaly and pattern passes.
    pub detection_window_days: i64,
    /// Bucket granularity the detection passes read.
    pub bucket_type: BucketType,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            anomaly_sweep_secs: defaults::DEFAULT_ANOMALY_SWEEP_SECS,
            renewal_recompute_secs: defaults::DEFAULT_RENEWAL_RECOMPUTE_SECS,
            pattern_detection_secs: defaults::DEFAULT_PATTERN_DETECTION_SECS,
            overdue_sweep_secs: defaults::DEFAULT_OVERDUE_SWEEP_SECS,
            detection_window_days: defaults::DEFAULT_DETECTION_WINDOW_DAYS,
            bucket_type: BucketType::Month,
        }
    }
}
