pub mod anomaly_config;
pub mod dashboard_config;
pub mod defaults;
pub mod obligation_config;
pub mod observability_config;
pub mod renewal_config;
pub mod scheduler_config;
pub mod storage_config;
pub mod temporal_config;

pub use anomaly_config::AnomalyConfig;
pub use dashboard_config::DashboardConfig;
pub use obligation_config::ObligationConfig;
pub use observability_config::ObservabilityConfig;
pub use renewal_config::RenewalConfig;
pub use scheduler_config::SchedulerConfig;
pub use storage_config::StorageConfig;
pub use temporal_config::{LateEventPolicy, TemporalConfig};

use serde::{Deserialize, Serialize};

use crate::errors::{CovenantError, CovenantResult};

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CovenantConfig {
    pub storage: StorageConfig,
    pub temporal: TemporalConfig,
    pub anomaly: AnomalyConfig,
    pub renewal: RenewalConfig,
    pub obligations: ObligationConfig,
    pub dashboard: DashboardConfig,
    pub scheduler: SchedulerConfig,
    pub observability: ObservabilityConfig,
}

impl CovenantConfig {
    /// Load config from a TOML string. Missing fields use defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Parse and validate in one step.
    pub fn load(toml_str: &str) -> CovenantResult<Self> {
        let config =
            Self::from_toml(toml_str).map_err(|e| CovenantError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engines cannot honor.
    pub fn validate(&self) -> CovenantResult<()> {
        let r = &self.renewal;
        if !(0.0..=1.0).contains(&r.medium_threshold)
            || !(0.0..=1.0).contains(&r.high_threshold)
            || r.medium_threshold >= r.high_threshold
        {
            return Err(CovenantError::ConfigError(format!(
                "renewal thresholds must satisfy 0 <= medium < high <= 1 (medium={}, high={})",
                r.medium_threshold, r.high_threshold
            )));
        }

        let t = &self.temporal;
        if t.classify_threshold_pct <= 0.0 || t.analysis_threshold_pct <= 0.0 {
            return Err(CovenantError::ConfigError(
                "trend thresholds must be positive".to_string(),
            ));
        }
        if t.volatility_cv_threshold <= 0.0 {
            return Err(CovenantError::ConfigError(
                "volatility_cv_threshold must be positive".to_string(),
            ));
        }

        let a = &self.anomaly;
        if !(a.low_z <= a.medium_z && a.medium_z <= a.high_z && a.high_z <= a.critical_z) {
            return Err(CovenantError::ConfigError(
                "anomaly z tiers must be non-decreasing (low <= medium <= high <= critical)"
                    .to_string(),
            ));
        }
        if a.min_baseline_points < 2 {
            return Err(CovenantError::ConfigError(
                "anomaly.min_baseline_points must be at least 2".to_string(),
            ));
        }

        let d = &self.dashboard;
        if d.expiry_short_days <= 0 || d.expiry_short_days > d.expiry_long_days {
            return Err(CovenantError::ConfigError(
                "dashboard expiry windows must satisfy 0 < short <= long".to_string(),
            ));
        }

        if self.obligations.max_graph_nodes == 0 {
            return Err(CovenantError::ConfigError(
                "obligations.max_graph_nodes must be positive".to_string(),
            ));
        }

        if self.scheduler.detection_window_days <= 0 {
            return Err(CovenantError::ConfigError(
                "scheduler.detection_window_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
