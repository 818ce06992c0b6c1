use serde::{Deserialize, Serialize};

use super::defaults;
use crate::models::AnomalySeverity;

/// Anomaly detection configuration. Severity tiers are z-score cut points
/// against the trailing baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Buckets required before the first one can be judged.
    pub min_baseline_points: usize,
    /// Maximum number of trailing buckets in the baseline.
    pub baseline_window: usize,
    pub low_z: f64,
    pub medium_z: f64,
    pub high_z: f64,
    pub critical_z: f64,
    /// Floor on the baseline stddev as a fraction of the baseline mean.
    pub min_relative_stddev: f64,
    /// Anomalies at or above this severity raise a temporal alert.
    pub alert_min_severity: AnomalySeverity,
}

impl AnomalyConfig {
    /// Map an absolute z-score to a severity, `None` below the lowest tier.
    pub fn severity_for(&self, z: f64) -> Option<AnomalySeverity> {
        let z = z.abs();
        if z >= self.critical_z {
            Some(AnomalySeverity::Critical)
        } else if z >= self.high_z {
            Some(AnomalySeverity::High)
        } else if z >= self.medium_z {
            Some(AnomalySeverity::Medium)
        } else if z >= self.low_z {
            Some(AnomalySeverity::Low)
        } else {
            None
        }
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            min_baseline_points: defaults::DEFAULT_MIN_BASELINE_POINTS,
            baseline_window: defaults::DEFAULT_BASELINE_WINDOW,
            low_z: defaults::DEFAULT_LOW_Z,
            medium_z: defaults::DEFAULT_MEDIUM_Z,
            high_z: defaults::DEFAULT_HIGH_Z,
            critical_z: defaults::DEFAULT_CRITICAL_Z,
            min_relative_stddev: defaults::DEFAULT_MIN_RELATIVE_STDDEV,
            alert_min_severity: AnomalySeverity::High,
        }
    }
}
