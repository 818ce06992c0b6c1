use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Direction of a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    Volatile,
}

text_enum!(TrendDirection {
    Increasing => "increasing",
    Decreasing => "decreasing",
    Stable => "stable",
    Volatile => "volatile",
});

/// Naive one-step-ahead forecast with its band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Forecast {
    pub predicted_value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// 0.5, 0.7 or 0.9 depending on how many points backed the estimate.
    pub confidence: f64,
}

/// Output of trend classification. Pure; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TrendResult {
    pub direction: TrendDirection,
    pub change_percentage: f64,
    pub first_average: f64,
    pub second_average: f64,
    /// stddev / mean over all points (0 when the mean is 0).
    pub coefficient_of_variation: f64,
    pub data_points: usize,
    pub forecast: Forecast,
}
