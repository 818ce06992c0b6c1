use serde::{Deserialize, Serialize};

use super::defaults;

/// What the bucketer does with an event whose bucket has already closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateEventPolicy {
    /// Fold the event into the closed bucket (additive, matches live ingestion).
    Accept,
    /// Reject with a validation error; closed buckets stay immutable.
    Reject,
}

/// Trend classification and bucketing configuration.
///
/// `classify_threshold_pct` drives the quick series classification;
/// `analysis_threshold_pct` drives the trend analysis behind pattern detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Change percentage (exclusive) above which `classify` reports increasing.
    pub classify_threshold_pct: f64,
    /// Change percentage (exclusive) above which `analyze_trend` reports increasing.
    pub analysis_threshold_pct: f64,
    /// stddev/mean above which a series is volatile.
    pub volatility_cv_threshold: f64,
    /// Series shorter than this never get the volatility override.
    pub min_points_for_volatility: usize,
    /// Width of the forecast band, in change-percentage points.
    pub forecast_band_pct: f64,
    pub late_event_policy: LateEventPolicy,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            classify_threshold_pct: defaults::DEFAULT_CLASSIFY_THRESHOLD_PCT,
            analysis_threshold_pct: defaults::DEFAULT_ANALYSIS_THRESHOLD_PCT,
            volatility_cv_threshold: defaults::DEFAULT_VOLATILITY_CV_THRESHOLD,
            min_points_for_volatility: defaults::DEFAULT_MIN_POINTS_FOR_VOLATILITY,
            forecast_band_pct: defaults::DEFAULT_FORECAST_BAND_PCT,
            late_event_policy: LateEventPolicy::Accept,
        }
    }
}
