use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use covenant_core::errors::CovenantResult;
use covenant_core::models::{BatchReport, BucketType, Measure, PatternType, TemporalPattern};
use covenant_core::traits::{IMetricStorage, IPatternStorage};
use covenant_core::validation::require_non_empty;

use crate::trend::TrendClassifier;
use crate::window::TimeWindow;

/// Turns per-category trend analysis into persisted patterns.
///
/// A category holds at most one active pattern. Patterns that stop being
/// observed are deactivated, never deleted.
pub struct PatternDetector {
    metrics: Arc<dyn IMetricStorage>,
    store: Arc<dyn IPatternStorage>,
    classifier: TrendClassifier,
}

impl PatternDetector {
    pub fn new(
        metrics: Arc<dyn IMetricStorage>,
        store: Arc<dyn IPatternStorage>,
        classifier: TrendClassifier,
    ) -> Self {
        Self {
            metrics,
            store,
            classifier,
        }
    }

    /// Items are the patterns active after the pass.
    pub fn detect_patterns(
        &self,
        enterprise_id: &str,
        bucket_type: BucketType,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> CovenantResult<BatchReport<TemporalPattern>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        let mut report = BatchReport::new();
        for category in self.metrics.list_categories(enterprise_id, bucket_type)? {
            match self.detect_category(enterprise_id, &category, bucket_type, window, now) {
                Ok(Some(pattern)) => report.record_success(pattern),
                Ok(None) => report.record_noop(),
                Err(e) => {
                    warn!(category = %category, error = %e, "pattern detection failed");
                    report.record_failure(category, e);
                }
            }
        }
        Ok(report)
    }

    pub fn list_patterns(
        &self,
        enterprise_id: &str,
        active_only: bool,
    ) -> CovenantResult<Vec<TemporalPattern>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        self.store.list_patterns(enterprise_id, active_only)
    }

    fn detect_category(
        &self,
        enterprise_id: &str,
        category: &str,
        bucket_type: BucketType,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> CovenantResult<Option<TemporalPattern>> {
        let _span = covenant_observability::detection_span!(enterprise_id, category).entered();

        let values: Vec<f64> = self
            .metrics
            .get_series(enterprise_id, category, bucket_type, window.start, window.end)?
            .iter()
            .map(|m| m.aggregations.value(Measure::Sum))
            .collect();
        let trend = self.classifier.analyze_trend(&values);

        let Some(pattern_type) = PatternType::from_direction(trend.direction) else {
            let cleared = self.store.deactivate_patterns(enterprise_id, category, None)?;
            debug!(cleared, "series is stable; no active pattern");
            return Ok(None);
        };

        let pattern = self.store.upsert_pattern(&TemporalPattern {
            id: Uuid::new_v4().to_string(),
            enterprise_id: enterprise_id.to_string(),
            metric_category: category.to_string(),
            pattern_type,
            detected_at: now,
            last_observed_at: now,
            is_active: true,
            supporting_data: serde_json::to_value(&trend)?,
        })?;
        self.store
            .deactivate_patterns(enterprise_id, category, Some(pattern_type))?;
        debug!(pattern = %pattern_type, "pattern observed");
        Ok(Some(pattern))
    }
}
