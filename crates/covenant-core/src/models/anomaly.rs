use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{AlertSeverity, BucketType};

/// Ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
    Critical,
}

text_enum!(AnomalySeverity {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

impl AnomalySeverity {
    pub fn alert_severity(&self) -> AlertSeverity {
        match self {
            Self::Low => AlertSeverity::Info,
            Self::Medium => AlertSeverity::Warning,
            Self::High | Self::Critical => AlertSeverity::Critical,
        }
    }
}

/// A row in `anomaly_detections`, one per flagged bucket.
///
/// Invariant: `is_resolved` implies `resolved_at.is_some()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AnomalyDetection {
    pub id: String,
    pub enterprise_id: String,
    pub metric_category: String,
    pub bucket_type: BucketType,
    /// Start of the flagged bucket.
    pub bucket_start: DateTime<Utc>,
    pub detected_at: DateTime<Utc>,
    pub severity: AnomalySeverity,
    pub baseline_value: f64,
    pub observed_value: f64,
    /// Signed z-score of the observation against the baseline.
    pub deviation: f64,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    /// An alert is owed for this anomaly and has not been raised yet.
    pub alert_pending: bool,
}

impl AnomalyDetection {
    pub fn resolution_is_consistent(&self) -> bool {
        !self.is_resolved || self.resolved_at.is_some()
    }
}
