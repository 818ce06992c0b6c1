//! Storage seams. Every method is enterprise-scoped; no query crosses tenants.
//!
//! Methods named `*_if_*` are conditional writes: they return `false` (or a
//! non-success outcome) instead of writing when the row changed since the
//! caller read it, which is how engines detect lost races.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::errors::CovenantResult;
use crate::models::{
    AlertStatus, AnomalyDetection, BucketType, Contract, ExpiryCounts, Obligation,
    ObligationDependency, ObligationEscalation, ObligationStatus, PatternType, PerformanceRecord,
    PredictionTier, RenewalPrediction, TemporalAlert, TemporalMetric, TemporalPattern,
};

/// One event folded into its bucket.
#[derive(Debug, Clone)]
pub struct BucketWrite {
    pub enterprise_id: String,
    pub metric_category: String,
    pub bucket_type: BucketType,
    pub bucket_start: DateTime<Utc>,
    pub bucket_end: DateTime<Utc>,
    pub value: f64,
    pub dimensions: HashMap<String, String>,
    pub observed_at: DateTime<Utc>,
}

/// Bucketed metric rows (`temporal_metrics`).
pub trait IMetricStorage: Send + Sync {
    /// Create the bucket or fold the value into its running aggregations,
    /// atomically. Returns the row after the write.
    fn upsert_bucket(&self, write: &BucketWrite) -> CovenantResult<TemporalMetric>;

    /// Buckets overlapping `[start, end)`, ascending by `bucket_start`.
    fn get_series(
        &self,
        enterprise_id: &str,
        metric_category: &str,
        bucket_type: BucketType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CovenantResult<Vec<TemporalMetric>>;

    fn list_categories(
        &self,
        enterprise_id: &str,
        bucket_type: BucketType,
    ) -> CovenantResult<Vec<String>>;
}

/// Detected patterns (`temporal_patterns`).
pub trait IPatternStorage: Send + Sync {
    /// Insert or re-activate the pattern keyed by (enterprise, category, type).
    fn upsert_pattern(&self, pattern: &TemporalPattern) -> CovenantResult<TemporalPattern>;

    /// Deactivate every active pattern of the category except `keep`.
    fn deactivate_patterns(
        &self,
        enterprise_id: &str,
        metric_category: &str,
        keep: Option<PatternType>,
    ) -> CovenantResult<usize>;

    fn list_patterns(
        &self,
        enterprise_id: &str,
        active_only: bool,
    ) -> CovenantResult<Vec<TemporalPattern>>;
}

/// Anomaly records (`anomaly_detections`).
pub trait IAnomalyStorage: Send + Sync {
    /// Returns `false` when the bucket was already flagged.
    fn insert_anomaly(&self, anomaly: &AnomalyDetection) -> CovenantResult<bool>;

    fn get_anomaly(&self, enterprise_id: &str, id: &str)
        -> CovenantResult<Option<AnomalyDetection>>;

    /// Resolve only if still unresolved.
    fn resolve_anomaly_if_open(
        &self,
        enterprise_id: &str,
        id: &str,
        resolved_at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> CovenantResult<bool>;

    /// Most recently detected first.
    fn list_unresolved_anomalies(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<AnomalyDetection>>;

    /// Unresolved anomalies of the category whose alert is not raised yet.
    fn list_alert_pending(
        &self,
        enterprise_id: &str,
        metric_category: &str,
    ) -> CovenantResult<Vec<AnomalyDetection>>;

    fn clear_alert_pending(&self, enterprise_id: &str, id: &str) -> CovenantResult<bool>;
}

/// Renewal predictions (`renewal_predictions`).
pub trait IRenewalStorage: Send + Sync {
    fn insert_prediction(&self, prediction: &RenewalPrediction) -> CovenantResult<()>;

    fn get_prediction(
        &self,
        enterprise_id: &str,
        id: &str,
    ) -> CovenantResult<Option<RenewalPrediction>>;

    fn list_predictions(&self, enterprise_id: &str) -> CovenantResult<Vec<RenewalPrediction>>;

    /// Rewrite the tier only if the probability is unchanged since it was read.
    fn update_prediction_tier_if(
        &self,
        enterprise_id: &str,
        id: &str,
        expected_probability: f64,
        tier: PredictionTier,
        updated_at: DateTime<Utc>,
    ) -> CovenantResult<bool>;

    fn count_predictions_by_tier(
        &self,
        enterprise_id: &str,
        tier: PredictionTier,
    ) -> CovenantResult<usize>;

    /// Highest probability first.
    fn top_predictions(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<RenewalPrediction>>;
}

/// Temporal alerts (`temporal_alerts`).
pub trait IAlertStorage: Send + Sync {
    /// Returns `false` when an open alert with the same dedupe key exists.
    fn insert_alert(&self, alert: &TemporalAlert) -> CovenantResult<bool>;

    fn get_alert(&self, enterprise_id: &str, id: &str) -> CovenantResult<Option<TemporalAlert>>;

    /// Persist `alert` only if the stored status still equals `expected`.
    fn update_alert_if_status(
        &self,
        alert: &TemporalAlert,
        expected: AlertStatus,
    ) -> CovenantResult<bool>;

    /// Alerts in `active` status, most recently triggered first.
    fn list_active_alerts(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<TemporalAlert>>;
}

/// Read-only contract mirror (`contracts`).
pub trait IContractStorage: Send + Sync {
    /// Used only by the external sync path and fixtures.
    fn upsert_contract(&self, contract: &Contract) -> CovenantResult<()>;

    fn get_contract(&self, enterprise_id: &str, id: &str) -> CovenantResult<Option<Contract>>;

    fn expiry_counts(
        &self,
        enterprise_id: &str,
        now: DateTime<Utc>,
        short_window_days: i64,
        long_window_days: i64,
    ) -> CovenantResult<ExpiryCounts>;
}

/// Result of an atomic completion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed,
    /// The stored status no longer matched the expected one.
    StatusChanged,
    /// No performance record exists; nothing was written.
    MissingEvidence,
}

/// Obligations and their performance tracking.
pub trait IObligationStorage: Send + Sync {
    fn insert_obligation(&self, obligation: &Obligation) -> CovenantResult<()>;

    fn get_obligation(&self, enterprise_id: &str, id: &str) -> CovenantResult<Option<Obligation>>;

    fn list_obligations(
        &self,
        enterprise_id: &str,
        status: Option<ObligationStatus>,
    ) -> CovenantResult<Vec<Obligation>>;

    fn update_obligation_status_if(
        &self,
        enterprise_id: &str,
        id: &str,
        expected: ObligationStatus,
        target: ObligationStatus,
        updated_at: DateTime<Utc>,
    ) -> CovenantResult<bool>;

    /// Pending or in-progress obligations with `due_date < now`.
    fn list_past_due(
        &self,
        enterprise_id: &str,
        now: DateTime<Utc>,
    ) -> CovenantResult<Vec<Obligation>>;

    fn mark_at_risk(&self, enterprise_id: &str, ids: &[String]) -> CovenantResult<usize>;

    fn insert_performance(&self, record: &PerformanceRecord) -> CovenantResult<()>;

    fn list_performance(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
    ) -> CovenantResult<Vec<PerformanceRecord>>;

    /// In one transaction: check the status, write the optional record,
    /// require at least one record, then mark completed.
    fn complete_obligation_if(
        &self,
        enterprise_id: &str,
        id: &str,
        expected: ObligationStatus,
        completed_at: DateTime<Utc>,
        performance: Option<&PerformanceRecord>,
    ) -> CovenantResult<CompletionOutcome>;
}

/// Result of an acyclicity-checked edge insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyInsert {
    Inserted,
    /// The edge would close a cycle against the edges stored right now.
    WouldCycle,
    Duplicate,
}

/// Obligation dependency edges (`obligation_dependencies`).
pub trait IDependencyStorage: Send + Sync {
    fn list_dependencies(&self, enterprise_id: &str) -> CovenantResult<Vec<ObligationDependency>>;

    /// Re-checks reachability inside the insert transaction.
    fn insert_dependency_if_acyclic(
        &self,
        dependency: &ObligationDependency,
    ) -> CovenantResult<DependencyInsert>;

    fn delete_dependency(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
        depends_on_id: &str,
    ) -> CovenantResult<bool>;
}

/// Snapshot used for the optimistic escalation write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscalationState {
    pub max_level: u8,
    pub count: usize,
}

/// Escalations (`obligation_escalations`).
pub trait IEscalationStorage: Send + Sync {
    fn escalation_state(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
    ) -> CovenantResult<EscalationState>;

    /// Insert only if the obligation still has `expected_count` escalations.
    fn insert_escalation_if_unchanged(
        &self,
        escalation: &ObligationEscalation,
        expected_count: usize,
    ) -> CovenantResult<bool>;

    fn get_escalation(
        &self,
        enterprise_id: &str,
        id: &str,
    ) -> CovenantResult<Option<ObligationEscalation>>;

    /// Oldest first.
    fn list_escalations(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
    ) -> CovenantResult<Vec<ObligationEscalation>>;

    fn resolve_escalation_if_active(
        &self,
        enterprise_id: &str,
        id: &str,
        resolved_at: DateTime<Utc>,
    ) -> CovenantResult<bool>;
}

/// Tenants known to the store; batch jobs iterate these.
pub trait IEnterpriseDirectory: Send + Sync {
    fn list_enterprises(&self) -> CovenantResult<Vec<String>>;
}
