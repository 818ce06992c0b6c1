use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Confidence band derived from a renewal probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PredictionTier {
    High,
    Medium,
    Low,
}

text_enum!(PredictionTier {
    High => "high",
    Medium => "medium",
    Low => "low",
});

/// A row in `renewal_predictions`. `prediction_tier` always matches the
/// configured banding of `probability`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RenewalPrediction {
    pub id: String,
    pub enterprise_id: String,
    pub contract_id: String,
    pub probability: f64,
    pub prediction_tier: PredictionTier,
    pub predicted_date: Option<DateTime<Utc>>,
    pub predicted_value: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller input for a new prediction. The tier is never caller-supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalPredictionInput {
    pub contract_id: String,
    pub probability: f64,
    pub predicted_date: Option<DateTime<Utc>>,
    pub predicted_value: Option<f64>,
}

/// Aggregate forecast for one calendar quarter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RenewalForecast {
    /// `YYYY-Qn`.
    pub period: String,
    pub period_start: DateTime<Utc>,
    pub predicted_renewals: usize,
    pub predicted_value: f64,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
}
