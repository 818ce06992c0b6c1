use chrono::{DateTime, Utc};

use crate::errors::CovenantResult;
use crate::models::{AnomalyDetection, ExpiryCounts, RenewalPrediction, TemporalAlert};

/// The five independent reads a dashboard snapshot fans out to.
pub trait IDashboardSource: Send + Sync {
    fn fetch_expiry_counts(
        &self,
        enterprise_id: &str,
        now: DateTime<Utc>,
        short_window_days: i64,
        long_window_days: i64,
    ) -> CovenantResult<ExpiryCounts>;

    fn fetch_high_tier_count(&self, enterprise_id: &str) -> CovenantResult<usize>;

    fn fetch_active_alerts(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<TemporalAlert>>;

    fn fetch_unresolved_anomalies(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<AnomalyDetection>>;

    fn fetch_top_predictions(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<RenewalPrediction>>;
}
