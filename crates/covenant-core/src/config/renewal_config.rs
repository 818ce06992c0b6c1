use serde::{Deserialize, Serialize};

use super::defaults;
use crate::models::PredictionTier;

/// Renewal forecasting configuration.
///
/// Tier banding: `probability >= high_threshold` is high,
/// `medium_threshold <= probability < high_threshold` is medium, anything
/// lower is low.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewalConfig {
    pub high_threshold: f64,
    pub medium_threshold: f64,
    /// Low-tier predictions due within this many days raise an at-risk alert.
    pub at_risk_horizon_days: i64,
}

impl RenewalConfig {
    /// Tier for an already-validated probability.
    pub fn tier_for(&self, probability: f64) -> PredictionTier {
        if probability >= self.high_threshold {
            PredictionTier::High
        } else if probability >= self.medium_threshold {
            PredictionTier::Medium
        } else {
            PredictionTier::Low
        }
    }
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            high_threshold: defaults::DEFAULT_HIGH_TIER_THRESHOLD,
            medium_threshold: defaults::DEFAULT_MEDIUM_TIER_THRESHOLD,
            at_risk_horizon_days: defaults::DEFAULT_AT_RISK_HORIZON_DAYS,
        }
    }
}
