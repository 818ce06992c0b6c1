use serde::{Deserialize, Serialize};

use super::defaults;

/// Bounds for the dashboard snapshot sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub active_alerts_limit: usize,
    pub anomalies_limit: usize,
    pub top_predictions_limit: usize,
    pub expiry_short_days: i64,
    pub expiry_long_days: i64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            active_alerts_limit: defaults::DEFAULT_ACTIVE_ALERTS_LIMIT,
            anomalies_limit: defaults::DEFAULT_ANOMALIES_LIMIT,
            top_predictions_limit: defaults::DEFAULT_TOP_PREDICTIONS_LIMIT,
            expiry_short_days: defaults::DEFAULT_EXPIRY_SHORT_DAYS,
            expiry_long_days: defaults::DEFAULT_EXPIRY_LONG_DAYS,
        }
    }
}
