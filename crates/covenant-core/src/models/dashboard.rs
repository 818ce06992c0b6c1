use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{AnomalyDetection, ExpiryCounts, RenewalPrediction, TemporalAlert};

/// Read-optimized composition of every engine's current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardData {
    pub enterprise_id: String,
    pub generated_at: DateTime<Utc>,
    pub expiring_contracts: ExpiryCounts,
    pub high_confidence_renewals: usize,
    /// Most recent first.
    pub active_alerts: Vec<TemporalAlert>,
    /// Most recent first.
    pub unresolved_anomalies: Vec<AnomalyDetection>,
    /// Highest probability first.
    pub top_predictions: Vec<RenewalPrediction>,
}
