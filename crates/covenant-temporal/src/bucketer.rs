//! MetricBucketer: folds raw events into day/week/month/quarter buckets.
//!
//! Each event lands in exactly one bucket per requested granularity. The
//! store performs the create-or-fold atomically, so concurrent ingestion into
//! the same bucket never loses an update.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use covenant_core::config::{LateEventPolicy, TemporalConfig};
use covenant_core::constants::MAX_BATCH_SIZE;
use covenant_core::errors::{CovenantError, CovenantResult};
use covenant_core::models::{
    BatchReport, BucketType, Measure, MetricEvent, TemporalMetric, TimeSeriesPoint,
};
use covenant_core::traits::{BucketWrite, IMetricStorage};
use covenant_core::validation::{require_finite, require_non_empty};

use crate::window::TimeWindow;

pub struct MetricBucketer {
    store: Arc<dyn IMetricStorage>,
    config: TemporalConfig,
}

impl MetricBucketer {
    pub fn new(store: Arc<dyn IMetricStorage>, config: TemporalConfig) -> Self {
        Self { store, config }
    }

    /// Fold one event into its bucket and return the bucket after the write.
    pub fn ingest(
        &self,
        enterprise_id: &str,
        event: &MetricEvent,
        now: DateTime<Utc>,
    ) -> CovenantResult<TemporalMetric> {
        let _span = covenant_observability::ingest_span!(enterprise_id, event.metric_category)
            .entered();

        require_non_empty("enterprise_id", enterprise_id)?;
        require_non_empty("metric_category", &event.metric_category)?;
        require_finite("value", event.value)?;

        let (bucket_start, bucket_end) = event.bucket_type.bounds(event.occurred_at)?;

        if bucket_end <= now {
            match self.config.late_event_policy {
                LateEventPolicy::Reject => {
                    return Err(CovenantError::ValidationError(format!(
                        "bucket {} for {} closed at {bucket_end}; late events are rejected",
                        event.bucket_type.label(bucket_start),
                        event.metric_category
                    )));
                }
                LateEventPolicy::Accept => {
                    debug!(
                        bucket = %event.bucket_type.label(bucket_start),
                        occurred_at = %event.occurred_at,
                        "folding late event into closed bucket"
                    );
                }
            }
        }

        self.store.upsert_bucket(&BucketWrite {
            enterprise_id: enterprise_id.to_string(),
            metric_category: event.metric_category.clone(),
            bucket_type: event.bucket_type,
            bucket_start,
            bucket_end,
            value: event.value,
            dimensions: event.dimensions.clone(),
            observed_at: now,
        })
    }

    /// Ingest a batch, skipping and reporting events that fail.
    ///
    /// The batch itself is rejected only when it exceeds `MAX_BATCH_SIZE`.
    pub fn ingest_batch(
        &self,
        enterprise_id: &str,
        events: &[MetricEvent],
        now: DateTime<Utc>,
    ) -> CovenantResult<BatchReport<TemporalMetric>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        if events.len() > MAX_BATCH_SIZE {
            return Err(CovenantError::ValidationError(format!(
                "batch of {} events exceeds the limit of {MAX_BATCH_SIZE}",
                events.len()
            )));
        }

        let mut report = BatchReport::new();
        for (index, event) in events.iter().enumerate() {
            match self.ingest(enterprise_id, event, now) {
                Ok(metric) => report.record_success(metric),
                Err(e) => {
                    warn!(index, category = %event.metric_category, error = %e, "skipping event");
                    report.record_failure(format!("event[{index}]"), e);
                }
            }
        }
        Ok(report)
    }

    /// Buckets overlapping `window`, ascending by start. Empty when no data.
    pub fn get_series(
        &self,
        enterprise_id: &str,
        metric_category: &str,
        bucket_type: BucketType,
        window: TimeWindow,
    ) -> CovenantResult<Vec<TemporalMetric>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        require_non_empty("metric_category", metric_category)?;
        // Re-check in case the window was built by hand.
        let window = TimeWindow::new(window.start, window.end)?;
        self.store.get_series(
            enterprise_id,
            metric_category,
            bucket_type,
            window.start,
            window.end,
        )
    }

    /// `get_series` projected onto one aggregation.
    pub fn time_series(
        &self,
        enterprise_id: &str,
        metric_category: &str,
        bucket_type: BucketType,
        window: TimeWindow,
        measure: Measure,
    ) -> CovenantResult<Vec<TimeSeriesPoint>> {
        Ok(self
            .get_series(enterprise_id, metric_category, bucket_type, window)?
            .iter()
            .map(|m| m.to_point(measure))
            .collect())
    }

    pub fn list_categories(
        &self,
        enterprise_id: &str,
        bucket_type: BucketType,
    ) -> CovenantResult<Vec<String>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        self.store.list_categories(enterprise_id, bucket_type)
    }
}
