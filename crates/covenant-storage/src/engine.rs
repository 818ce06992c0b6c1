//! StorageEngine: owns the ConnectionPool, runs migrations on open, and
//! implements every storage trait plus the dashboard source.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};

use covenant_core::config::StorageConfig;
use covenant_core::errors::CovenantResult;
use covenant_core::models::{
    AlertStatus, AnomalyDetection, BucketType, Contract, ExpiryCounts, Obligation,
    ObligationDependency, ObligationEscalation, ObligationStatus, PatternType, PerformanceRecord,
    PredictionTier, RenewalPrediction, TemporalAlert, TemporalMetric, TemporalPattern,
};
use covenant_core::traits::{
    BucketWrite, CompletionOutcome, DependencyInsert, EscalationState, IAlertStorage,
    IAnomalyStorage, IContractStorage, IDashboardSource, IDependencyStorage, IEnterpriseDirectory,
    IEscalationStorage, IMetricStorage, IObligationStorage, IPatternStorage, IRenewalStorage,
};

use crate::migrations;
use crate::pool::ConnectionPool;
use crate::queries::{
    alert_ops, anomaly_ops, contract_ops, dependency_ops, enterprise_ops, escalation_ops,
    metric_ops, obligation_ops, pattern_ops, renewal_ops,
};

/// The main storage engine.
pub struct StorageEngine {
    pool: ConnectionPool,
    read_retry_attempts: u32,
    read_retry_backoff: Duration,
}

impl StorageEngine {
    /// Open a storage engine backed by a file on disk.
    pub fn open(path: &Path, config: &StorageConfig) -> CovenantResult<Self> {
        let pool = ConnectionPool::open(path, config.read_pool_size, config.busy_timeout_ms)?;
        Self::initialize(pool, config)
    }

    /// Open an in-memory storage engine (for testing). Reads go through the writer.
    pub fn open_in_memory() -> CovenantResult<Self> {
        let config = StorageConfig::default();
        let pool = ConnectionPool::open_in_memory(config.busy_timeout_ms)?;
        Self::initialize(pool, &config)
    }

    fn initialize(pool: ConnectionPool, config: &StorageConfig) -> CovenantResult<Self> {
        let applied = pool.writer.with_conn(migrations::run_migrations)?;
        tracing::debug!(
            applied,
            path = ?pool.db_path,
            "storage engine ready"
        );
        Ok(Self {
            pool,
            read_retry_attempts: config.read_retry_attempts.max(1),
            read_retry_backoff: Duration::from_millis(config.read_retry_backoff_ms),
        })
    }

    /// Get a reference to the connection pool (for advanced operations).
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Execute an idempotent read on the best available connection, retrying
    /// with a fixed backoff while the database reports busy.
    fn with_reader<F, T>(&self, f: F) -> CovenantResult<T>
    where
        F: Fn(&rusqlite::Connection) -> CovenantResult<T>,
    {
        let mut attempt = 1;
        loop {
            let result = match &self.pool.readers {
                Some(readers) => readers.with_conn(&f),
                None => self.pool.writer.with_conn(&f),
            };
            match result {
                Err(e) if e.is_retryable() && attempt < self.read_retry_attempts => {
                    tracing::debug!(attempt, error = %e, "read hit a busy database, retrying");
                    attempt += 1;
                    std::thread::sleep(self.read_retry_backoff);
                }
                other => return other,
            }
        }
    }

    fn with_writer<F, T>(&self, f: F) -> CovenantResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> CovenantResult<T>,
    {
        self.pool.writer.with_conn(f)
    }
}

impl IMetricStorage for StorageEngine {
    fn upsert_bucket(&self, write: &BucketWrite) -> CovenantResult<TemporalMetric> {
        self.with_writer(|conn| metric_ops::upsert_bucket(conn, write))
    }

    fn get_series(
        &self,
        enterprise_id: &str,
        metric_category: &str,
        bucket_type: BucketType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CovenantResult<Vec<TemporalMetric>> {
        self.with_reader(|conn| {
            metric_ops::get_series(conn, enterprise_id, metric_category, bucket_type, start, end)
        })
    }

    fn list_categories(
        &self,
        enterprise_id: &str,
        bucket_type: BucketType,
    ) -> CovenantResult<Vec<String>> {
        self.with_reader(|conn| metric_ops::list_categories(conn, enterprise_id, bucket_type))
    }
}

impl IPatternStorage for StorageEngine {
    fn upsert_pattern(&self, pattern: &TemporalPattern) -> CovenantResult<TemporalPattern> {
        self.with_writer(|conn| pattern_ops::upsert_pattern(conn, pattern))
    }

    fn deactivate_patterns(
        &self,
        enterprise_id: &str,
        metric_category: &str,
        keep: Option<PatternType>,
    ) -> CovenantResult<usize> {
        self.with_writer(|conn| {
            pattern_ops::deactivate_patterns(conn, enterprise_id, metric_category, keep)
        })
    }

    fn list_patterns(
        &self,
        enterprise_id: &str,
        active_only: bool,
    ) -> CovenantResult<Vec<TemporalPattern>> {
        self.with_reader(|conn| pattern_ops::list_patterns(conn, enterprise_id, active_only))
    }
}

impl IAnomalyStorage for StorageEngine {
    fn insert_anomaly(&self, anomaly: &AnomalyDetection) -> CovenantResult<bool> {
        self.with_writer(|conn| anomaly_ops::insert_anomaly(conn, anomaly))
    }

    fn get_anomaly(
        &self,
        enterprise_id: &str,
        id: &str,
    ) -> CovenantResult<Option<AnomalyDetection>> {
        self.with_reader(|conn| anomaly_ops::get_anomaly(conn, enterprise_id, id))
    }

    fn resolve_anomaly_if_open(
        &self,
        enterprise_id: &str,
        id: &str,
        resolved_at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> CovenantResult<bool> {
        self.with_writer(|conn| {
            anomaly_ops::resolve_anomaly_if_open(conn, enterprise_id, id, resolved_at, notes)
        })
    }

    fn list_unresolved_anomalies(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<AnomalyDetection>> {
        self.with_reader(|conn| anomaly_ops::list_unresolved(conn, enterprise_id, limit))
    }

    fn list_alert_pending(
        &self,
        enterprise_id: &str,
        metric_category: &str,
    ) -> CovenantResult<Vec<AnomalyDetection>> {
        self.with_reader(|conn| {
            anomaly_ops::list_alert_pending(conn, enterprise_id, metric_category)
        })
    }

    fn clear_alert_pending(&self, enterprise_id: &str, id: &str) -> CovenantResult<bool> {
        self.with_writer(|conn| anomaly_ops::clear_alert_pending(conn, enterprise_id, id))
    }
}

impl IRenewalStorage for StorageEngine {
    fn insert_prediction(&self, prediction: &RenewalPrediction) -> CovenantResult<()> {
        self.with_writer(|conn| renewal_ops::insert_prediction(conn, prediction))
    }

    fn get_prediction(
        &self,
        enterprise_id: &str,
        id: &str,
    ) -> CovenantResult<Option<RenewalPrediction>> {
        self.with_reader(|conn| renewal_ops::get_prediction(conn, enterprise_id, id))
    }

    fn list_predictions(&self, enterprise_id: &str) -> CovenantResult<Vec<RenewalPrediction>> {
        self.with_reader(|conn| renewal_ops::list_predictions(conn, enterprise_id))
    }

    fn update_prediction_tier_if(
        &self,
        enterprise_id: &str,
        id: &str,
        expected_probability: f64,
        tier: PredictionTier,
        updated_at: DateTime<Utc>,
    ) -> CovenantResult<bool> {
        self.with_writer(|conn| {
            renewal_ops::update_tier_if(
                conn,
                enterprise_id,
                id,
                expected_probability,
                tier,
                updated_at,
            )
        })
    }

    fn count_predictions_by_tier(
        &self,
        enterprise_id: &str,
        tier: PredictionTier,
    ) -> CovenantResult<usize> {
        self.with_reader(|conn| renewal_ops::count_by_tier(conn, enterprise_id, tier))
    }

    fn top_predictions(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<RenewalPrediction>> {
        self.with_reader(|conn| renewal_ops::top_predictions(conn, enterprise_id, limit))
    }
}

impl IAlertStorage for StorageEngine {
    fn insert_alert(&self, alert: &TemporalAlert) -> CovenantResult<bool> {
        self.with_writer(|conn| alert_ops::insert_alert(conn, alert))
    }

    fn get_alert(&self, enterprise_id: &str, id: &str) -> CovenantResult<Option<TemporalAlert>> {
        self.with_reader(|conn| alert_ops::get_alert(conn, enterprise_id, id))
    }

    fn update_alert_if_status(
        &self,
        alert: &TemporalAlert,
        expected: AlertStatus,
    ) -> CovenantResult<bool> {
        self.with_writer(|conn| alert_ops::update_alert_if_status(conn, alert, expected))
    }

    fn list_active_alerts(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<TemporalAlert>> {
        self.with_reader(|conn| alert_ops::list_active(conn, enterprise_id, limit))
    }
}

impl IContractStorage for StorageEngine {
    fn upsert_contract(&self, contract: &Contract) -> CovenantResult<()> {
        self.with_writer(|conn| contract_ops::upsert_contract(conn, contract))
    }

    fn get_contract(&self, enterprise_id: &str, id: &str) -> CovenantResult<Option<Contract>> {
        self.with_reader(|conn| contract_ops::get_contract(conn, enterprise_id, id))
    }

    fn expiry_counts(
        &self,
        enterprise_id: &str,
        now: DateTime<Utc>,
        short_window_days: i64,
        long_window_days: i64,
    ) -> CovenantResult<ExpiryCounts> {
        self.with_reader(|conn| {
            contract_ops::expiry_counts(
                conn,
                enterprise_id,
                now,
                short_window_days,
                long_window_days,
            )
        })
    }
}

impl IObligationStorage for StorageEngine {
    fn insert_obligation(&self, obligation: &Obligation) -> CovenantResult<()> {
        self.with_writer(|conn| obligation_ops::insert_obligation(conn, obligation))
    }

    fn get_obligation(&self, enterprise_id: &str, id: &str) -> CovenantResult<Option<Obligation>> {
        self.with_reader(|conn| obligation_ops::get_obligation(conn, enterprise_id, id))
    }

    fn list_obligations(
        &self,
        enterprise_id: &str,
        status: Option<ObligationStatus>,
    ) -> CovenantResult<Vec<Obligation>> {
        self.with_reader(|conn| obligation_ops::list_obligations(conn, enterprise_id, status))
    }

    fn update_obligation_status_if(
        &self,
        enterprise_id: &str,
        id: &str,
        expected: ObligationStatus,
        target: ObligationStatus,
        updated_at: DateTime<Utc>,
    ) -> CovenantResult<bool> {
        self.with_writer(|conn| {
            obligation_ops::update_status_if(conn, enterprise_id, id, expected, target, updated_at)
        })
    }

    fn list_past_due(
        &self,
        enterprise_id: &str,
        now: DateTime<Utc>,
    ) -> CovenantResult<Vec<Obligation>> {
        self.with_reader(|conn| obligation_ops::list_past_due(conn, enterprise_id, now))
    }

    fn mark_at_risk(&self, enterprise_id: &str, ids: &[String]) -> CovenantResult<usize> {
        self.pool
            .writer
            .with_immediate_transaction(|tx| obligation_ops::mark_at_risk(tx, enterprise_id, ids))
    }

    fn insert_performance(&self, record: &PerformanceRecord) -> CovenantResult<()> {
        self.with_writer(|conn| obligation_ops::insert_performance(conn, record))
    }

    fn list_performance(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
    ) -> CovenantResult<Vec<PerformanceRecord>> {
        self.with_reader(|conn| {
            obligation_ops::list_performance(conn, enterprise_id, obligation_id)
        })
    }

    fn complete_obligation_if(
        &self,
        enterprise_id: &str,
        id: &str,
        expected: ObligationStatus,
        completed_at: DateTime<Utc>,
        performance: Option<&PerformanceRecord>,
    ) -> CovenantResult<CompletionOutcome> {
        self.pool.writer.with_immediate_transaction(|tx| {
            obligation_ops::complete_obligation_if(
                tx,
                enterprise_id,
                id,
                expected,
                completed_at,
                performance,
            )
        })
    }
}

impl IDependencyStorage for StorageEngine {
    fn list_dependencies(&self, enterprise_id: &str) -> CovenantResult<Vec<ObligationDependency>> {
        self.with_reader(|conn| dependency_ops::list_dependencies(conn, enterprise_id))
    }

    fn insert_dependency_if_acyclic(
        &self,
        dependency: &ObligationDependency,
    ) -> CovenantResult<DependencyInsert> {
        self.pool
            .writer
            .with_immediate_transaction(|tx| dependency_ops::insert_if_acyclic(tx, dependency))
    }

    fn delete_dependency(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
        depends_on_id: &str,
    ) -> CovenantResult<bool> {
        self.with_writer(|conn| {
            dependency_ops::delete_dependency(conn, enterprise_id, obligation_id, depends_on_id)
        })
    }
}

impl IEscalationStorage for StorageEngine {
    fn escalation_state(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
    ) -> CovenantResult<EscalationState> {
        self.with_reader(|conn| escalation_ops::escalation_state(conn, enterprise_id, obligation_id))
    }

    fn insert_escalation_if_unchanged(
        &self,
        escalation: &ObligationEscalation,
        expected_count: usize,
    ) -> CovenantResult<bool> {
        self.with_writer(|conn| {
            escalation_ops::insert_if_unchanged(conn, escalation, expected_count)
        })
    }

    fn get_escalation(
        &self,
        enterprise_id: &str,
        id: &str,
    ) -> CovenantResult<Option<ObligationEscalation>> {
        self.with_reader(|conn| escalation_ops::get_escalation(conn, enterprise_id, id))
    }

    fn list_escalations(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
    ) -> CovenantResult<Vec<ObligationEscalation>> {
        self.with_reader(|conn| {
            escalation_ops::list_escalations(conn, enterprise_id, obligation_id)
        })
    }

    fn resolve_escalation_if_active(
        &self,
        enterprise_id: &str,
        id: &str,
        resolved_at: DateTime<Utc>,
    ) -> CovenantResult<bool> {
        self.with_writer(|conn| {
            escalation_ops::resolve_if_active(conn, enterprise_id, id, resolved_at)
        })
    }
}

impl IEnterpriseDirectory for StorageEngine {
    fn list_enterprises(&self) -> CovenantResult<Vec<String>> {
        self.with_reader(enterprise_ops::list_enterprises)
    }
}

impl IDashboardSource for StorageEngine {
    fn fetch_expiry_counts(
        &self,
        enterprise_id: &str,
        now: DateTime<Utc>,
        short_window_days: i64,
        long_window_days: i64,
    ) -> CovenantResult<ExpiryCounts> {
        self.expiry_counts(enterprise_id, now, short_window_days, long_window_days)
    }

    fn fetch_high_tier_count(&self, enterprise_id: &str) -> CovenantResult<usize> {
        self.count_predictions_by_tier(enterprise_id, PredictionTier::High)
    }

    fn fetch_active_alerts(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<TemporalAlert>> {
        self.list_active_alerts(enterprise_id, limit)
    }

    fn fetch_unresolved_anomalies(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<AnomalyDetection>> {
        self.list_unresolved_anomalies(enterprise_id, limit)
    }

    fn fetch_top_predictions(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<RenewalPrediction>> {
        self.top_predictions(enterprise_id, limit)
    }
}
