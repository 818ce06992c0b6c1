//! Statistical anomaly detection over bucketed metrics.
//!
//! Each closed bucket is judged against the trailing `baseline_window`
//! buckets before it (at least `min_baseline_points`). The score is the
//! z-score of the bucket sum, with the baseline stddev floored at
//! `min_relative_stddev * |mean|` so flat baselines do not flag noise.
//! A bucket is flagged at most once; re-running detection is idempotent.
//! Alerts owed for flagged buckets are tracked on the anomaly row until raised.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use covenant_core::config::AnomalyConfig;
use covenant_core::constants::ALERT_TYPE_ANOMALY;
use covenant_core::errors::{CovenantError, CovenantResult, EntityKind};
use covenant_core::models::{
    AnomalyDetection, BatchFailure, BatchReport, BucketType, Measure, NewAlert, TemporalMetric,
};
use covenant_core::traits::{IAnomalyStorage, IMetricStorage};
use covenant_core::validation::require_non_empty;

use crate::alerts::AlertLifecycle;
use crate::trend::stats;
use crate::window::TimeWindow;

/// Score of one bucket against its baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketScore {
    pub baseline: f64,
    pub observed: f64,
    pub z: f64,
}

/// Score `observed` against `baseline`. `None` when the baseline is too short
/// or carries no spread at all.
pub fn score(baseline: &[f64], observed: f64, config: &AnomalyConfig) -> Option<BucketScore> {
    if baseline.len() < config.min_baseline_points {
        return None;
    }
    let s = stats(baseline);
    let effective_sd = s.stddev.max(s.mean.abs() * config.min_relative_stddev);
    if effective_sd <= f64::EPSILON {
        return None;
    }
    Some(BucketScore {
        baseline: s.mean,
        observed,
        z: (observed - s.mean) / effective_sd,
    })
}

pub struct AnomalyDetector {
    metrics: Arc<dyn IMetricStorage>,
    store: Arc<dyn IAnomalyStorage>,
    alerts: AlertLifecycle,
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(
        metrics: Arc<dyn IMetricStorage>,
        store: Arc<dyn IAnomalyStorage>,
        alerts: AlertLifecycle,
        config: AnomalyConfig,
    ) -> Self {
        Self {
            metrics,
            store,
            alerts,
            config,
        }
    }

    /// Flag anomalous closed buckets of one category within `window`.
    ///
    /// Items are the newly recorded anomalies; buckets flagged by an earlier
    /// run are skipped. Anomalies at or above `alert_min_severity` are stored
    /// owing an alert, and every owed alert of the category is raised before
    /// returning, including ones a previous run failed to raise. A failed
    /// alert is a per-anomaly failure and stays owed for the next run.
    pub fn detect(
        &self,
        enterprise_id: &str,
        metric_category: &str,
        bucket_type: BucketType,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> CovenantResult<BatchReport<AnomalyDetection>> {
        let _span = covenant_observability::detection_span!(enterprise_id, metric_category)
            .entered();
        require_non_empty("enterprise_id", enterprise_id)?;
        require_non_empty("metric_category", metric_category)?;

        let series = self.metrics.get_series(
            enterprise_id,
            metric_category,
            bucket_type,
            window.start,
            window.end,
        )?;
        let closed: Vec<&TemporalMetric> = series.iter().filter(|m| m.is_closed(now)).collect();
        let values: Vec<f64> = closed
            .iter()
            .map(|m| m.aggregations.value(Measure::Sum))
            .collect();

        let mut report = BatchReport::new();
        for (i, bucket) in closed.iter().enumerate() {
            let from = i.saturating_sub(self.config.baseline_window);
            let Some(scored) = score(&values[from..i], values[i], &self.config) else {
                continue;
            };
            let Some(severity) = self.config.severity_for(scored.z) else {
                continue;
            };

            let anomaly = AnomalyDetection {
                id: Uuid::new_v4().to_string(),
                enterprise_id: enterprise_id.to_string(),
                metric_category: metric_category.to_string(),
                bucket_type,
                bucket_start: bucket.bucket_start,
                detected_at: now,
                severity,
                baseline_value: scored.baseline,
                observed_value: scored.observed,
                deviation: scored.z,
                is_resolved: false,
                resolved_at: None,
                resolution_notes: None,
                alert_pending: severity >= self.config.alert_min_severity,
            };

            if !self.store.insert_anomaly(&anomaly)? {
                continue;
            }
            info!(
                bucket = %bucket_type.label(bucket.bucket_start),
                severity = %severity,
                z = scored.z,
                "anomaly recorded"
            );
            report.record_success(anomaly);
        }

        self.raise_owed_alerts(enterprise_id, metric_category, now, &mut report);
        Ok(report)
    }

    /// Run `detect` for every category of the enterprise, logging and
    /// skipping categories that fail.
    pub fn sweep(
        &self,
        enterprise_id: &str,
        bucket_type: BucketType,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> CovenantResult<BatchReport<AnomalyDetection>> {
        let mut report = BatchReport::new();
        for category in self.metrics.list_categories(enterprise_id, bucket_type)? {
            match self.detect(enterprise_id, &category, bucket_type, window, now) {
                Ok(found) => report.merge(found),
                Err(e) => {
                    warn!(category = %category, error = %e, "anomaly detection failed");
                    report.record_failure(category, e);
                }
            }
        }
        Ok(report)
    }

    /// Mark an anomaly resolved. Resolving twice is an invalid transition.
    pub fn resolve(
        &self,
        enterprise_id: &str,
        anomaly_id: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> CovenantResult<AnomalyDetection> {
        require_non_empty("enterprise_id", enterprise_id)?;
        let current = self.get(enterprise_id, anomaly_id)?;
        if current.is_resolved
            || !self
                .store
                .resolve_anomaly_if_open(enterprise_id, anomaly_id, now, notes)?
        {
            return Err(CovenantError::InvalidTransition {
                entity: EntityKind::Anomaly,
                id: anomaly_id.to_string(),
                from: "resolved".to_string(),
                to: "resolved".to_string(),
            });
        }
        self.get(enterprise_id, anomaly_id)
    }

    pub fn get(&self, enterprise_id: &str, anomaly_id: &str) -> CovenantResult<AnomalyDetection> {
        self.store
            .get_anomaly(enterprise_id, anomaly_id)?
            .ok_or_else(|| CovenantError::not_found(EntityKind::Anomaly, anomaly_id))
    }

    /// Most recently detected first.
    pub fn list_unresolved(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<AnomalyDetection>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        self.store.list_unresolved_anomalies(enterprise_id, limit)
    }

    fn raise_owed_alerts(
        &self,
        enterprise_id: &str,
        metric_category: &str,
        now: DateTime<Utc>,
        report: &mut BatchReport<AnomalyDetection>,
    ) {
        let owed = match self.store.list_alert_pending(enterprise_id, metric_category) {
            Ok(owed) => owed,
            Err(e) => {
                warn!(category = %metric_category, error = %e, "could not list owed anomaly alerts");
                report.failures.push(BatchFailure {
                    item: metric_category.to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };

        for anomaly in owed {
            let raised = self
                .raise_alert(&anomaly, now)
                .and_then(|_| self.store.clear_alert_pending(enterprise_id, &anomaly.id));
            match raised {
                Ok(_) => {
                    if let Some(item) = report.items.iter_mut().find(|a| a.id == anomaly.id) {
                        item.alert_pending = false;
                    }
                }
                Err(e) => {
                    warn!(anomaly_id = %anomaly.id, error = %e, "anomaly alert not raised; will retry");
                    report.failures.push(BatchFailure {
                        item: anomaly.id,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    /// The dedupe key is per bucket, so re-raising an alert that is still
    /// open is a no-op.
    fn raise_alert(&self, anomaly: &AnomalyDetection, now: DateTime<Utc>) -> CovenantResult<()> {
        let alert = NewAlert::new(ALERT_TYPE_ANOMALY, anomaly.severity.alert_severity())
            .with_data(json!({
                "anomaly_id": anomaly.id,
                "metric_category": anomaly.metric_category,
                "bucket_type": anomaly.bucket_type,
                "bucket_start": anomaly.bucket_start,
                "baseline_value": anomaly.baseline_value,
                "observed_value": anomaly.observed_value,
                "deviation": anomaly.deviation,
            }))
            .deduped_by(format!(
                "anomaly:{}:{}:{}",
                anomaly.metric_category,
                anomaly.bucket_type,
                anomaly.bucket_start.timestamp()
            ));
        self.alerts.raise(&anomaly.enterprise_id, alert, now)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::models::AnomalySeverity;

    #[test]
    fn short_baseline_is_not_scored() {
        let config = AnomalyConfig::default();
        assert!(score(&[10.0, 10.0], 100.0, &config).is_none());
    }

    #[test]
    fn flat_baseline_uses_relative_floor() {
        let config = AnomalyConfig::default();
        // mean 100, sd 0 -> floor 5; 120 is 4 sigma.
        let s = score(&[100.0, 100.0, 100.0], 120.0, &config).unwrap();
        assert!((s.z - 4.0).abs() < 1e-9);
        assert_eq!(config.severity_for(s.z), Some(AnomalySeverity::Critical));
    }

    #[test]
    fn all_zero_baseline_is_skipped() {
        let config = AnomalyConfig::default();
        assert!(score(&[0.0, 0.0, 0.0], 50.0, &config).is_none());
    }
}
