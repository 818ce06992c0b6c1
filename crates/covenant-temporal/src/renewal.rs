//! Renewal predictions: tiering, quarterly forecasts, periodic recompute.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use covenant_core::config::RenewalConfig;
use covenant_core::constants::ALERT_TYPE_RENEWAL_AT_RISK;
use covenant_core::errors::{CovenantError, CovenantResult, EntityKind};
use covenant_core::models::{
    quarter_label, AlertSeverity, BatchReport, BucketType, NewAlert, PredictionTier,
    RenewalForecast, RenewalPrediction, RenewalPredictionInput,
};
use covenant_core::traits::IRenewalStorage;
use covenant_core::validation::{require_finite, require_non_empty, require_unit_interval};

use crate::alerts::AlertLifecycle;

pub struct RenewalForecaster {
    store: Arc<dyn IRenewalStorage>,
    alerts: AlertLifecycle,
    config: RenewalConfig,
}

impl RenewalForecaster {
    pub fn new(store: Arc<dyn IRenewalStorage>, alerts: AlertLifecycle, config: RenewalConfig) -> Self {
        Self {
            store,
            alerts,
            config,
        }
    }

    /// Validate and store a prediction; the tier is derived from the probability.
    pub fn record_prediction(
        &self,
        enterprise_id: &str,
        input: RenewalPredictionInput,
        now: DateTime<Utc>,
    ) -> CovenantResult<RenewalPrediction> {
        require_non_empty("enterprise_id", enterprise_id)?;
        require_non_empty("contract_id", &input.contract_id)?;
        require_unit_interval("probability", input.probability)?;
        if let Some(value) = input.predicted_value {
            require_finite("predicted_value", value)?;
            if value < 0.0 {
                return Err(CovenantError::ValidationError(format!(
                    "predicted_value must not be negative, got {value}"
                )));
            }
        }

        let prediction = RenewalPrediction {
            id: Uuid::new_v4().to_string(),
            enterprise_id: enterprise_id.to_string(),
            contract_id: input.contract_id,
            probability: input.probability,
            prediction_tier: self.config.tier_for(input.probability),
            predicted_date: input.predicted_date,
            predicted_value: input.predicted_value,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_prediction(&prediction)?;
        debug!(prediction_id = %prediction.id, tier = %prediction.prediction_tier, "prediction recorded");
        Ok(prediction)
    }

    pub fn get(&self, enterprise_id: &str, prediction_id: &str) -> CovenantResult<RenewalPrediction> {
        self.store
            .get_prediction(enterprise_id, prediction_id)?
            .ok_or_else(|| CovenantError::not_found(EntityKind::Prediction, prediction_id))
    }

    /// Per-quarter totals over dated predictions, most recent quarter first,
    /// at most `periods` entries. Undated predictions are left out.
    pub fn forecast(
        &self,
        enterprise_id: &str,
        periods: usize,
    ) -> CovenantResult<Vec<RenewalForecast>> {
        let _span = covenant_observability::forecast_span!(enterprise_id, periods).entered();
        require_non_empty("enterprise_id", enterprise_id)?;
        if periods == 0 {
            return Ok(Vec::new());
        }

        let predictions = self.store.list_predictions(enterprise_id)?;
        Ok(group_by_quarter(&predictions)?
            .into_values()
            .rev()
            .take(periods)
            .collect())
    }

    /// Re-derive every tier from the current thresholds and raise at-risk
    /// alerts for low-tier renewals due within the horizon.
    ///
    /// Items are the predictions whose tier changed. A prediction whose
    /// at-risk alert could not be raised is a failure; the next run retries it.
    pub fn recompute(
        &self,
        enterprise_id: &str,
        now: DateTime<Utc>,
    ) -> CovenantResult<BatchReport<RenewalPrediction>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        let horizon = Duration::try_days(self.config.at_risk_horizon_days).ok_or_else(|| {
            CovenantError::ConfigError("renewal.at_risk_horizon_days is out of range".to_string())
        })?;

        let mut report = BatchReport::new();
        for mut prediction in self.store.list_predictions(enterprise_id)? {
            let tier = self.config.tier_for(prediction.probability);
            let changed = tier != prediction.prediction_tier;

            if changed {
                let applied = self.store.update_prediction_tier_if(
                    enterprise_id,
                    &prediction.id,
                    prediction.probability,
                    tier,
                    now,
                );
                match applied {
                    Ok(true) => {
                        info!(prediction_id = %prediction.id, from = %prediction.prediction_tier, to = %tier, "prediction re-tiered");
                        prediction.prediction_tier = tier;
                        prediction.updated_at = now;
                    }
                    Ok(false) => {
                        let e = CovenantError::conflict(
                            EntityKind::Prediction,
                            &prediction.id,
                            "probability changed during recompute",
                        );
                        warn!(error = %e, "skipping prediction");
                        report.record_failure(prediction.id.clone(), e);
                        continue;
                    }
                    Err(e) => {
                        warn!(prediction_id = %prediction.id, error = %e, "skipping prediction");
                        report.record_failure(prediction.id.clone(), e);
                        continue;
                    }
                }
            }

            if let Err(e) = self.flag_if_at_risk(&prediction, now, horizon) {
                warn!(prediction_id = %prediction.id, error = %e, "at-risk alert failed");
                report.record_failure(prediction.id.clone(), e);
                continue;
            }
            if changed {
                report.record_success(prediction);
            } else {
                report.record_noop();
            }
        }
        Ok(report)
    }

    fn flag_if_at_risk(
        &self,
        prediction: &RenewalPrediction,
        now: DateTime<Utc>,
        horizon: Duration,
    ) -> CovenantResult<()> {
        let due_soon = prediction
            .predicted_date
            .is_some_and(|date| date >= now && date - now <= horizon);
        if prediction.prediction_tier != PredictionTier::Low || !due_soon {
            return Ok(());
        }

        let alert = NewAlert::new(ALERT_TYPE_RENEWAL_AT_RISK, AlertSeverity::Warning)
            .for_contract(&prediction.contract_id)
            .with_data(json!({
                "prediction_id": prediction.id,
                "probability": prediction.probability,
                "predicted_date": prediction.predicted_date,
                "predicted_value": prediction.predicted_value,
            }))
            .deduped_by(format!("renewal_at_risk:{}", prediction.id));
        self.alerts.raise(&prediction.enterprise_id, alert, now)?;
        Ok(())
    }
}

/// Quarter buckets keyed by (year, quarter), ascending.
fn group_by_quarter(
    predictions: &[RenewalPrediction],
) -> CovenantResult<BTreeMap<(i32, u32), RenewalForecast>> {
    let mut quarters: BTreeMap<(i32, u32), RenewalForecast> = BTreeMap::new();
    for prediction in predictions {
        let Some(date) = prediction.predicted_date else {
            continue;
        };
        let key = (date.year(), (date.month() - 1) / 3 + 1);
        let (period_start, _) = BucketType::Quarter.bounds(date)?;
        let entry = quarters.entry(key).or_insert_with(|| RenewalForecast {
            period: quarter_label(date),
            period_start,
            predicted_renewals: 0,
            predicted_value: 0.0,
            high_confidence: 0,
            medium_confidence: 0,
            low_confidence: 0,
        });

        entry.predicted_renewals += 1;
        entry.predicted_value += prediction.predicted_value.unwrap_or(0.0);
        match prediction.prediction_tier {
            PredictionTier::High => entry.high_confidence += 1,
            PredictionTier::Medium => entry.medium_confidence += 1,
            PredictionTier::Low => entry.low_confidence += 1,
        }
    }
    Ok(quarters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn prediction(date: Option<DateTime<Utc>>, tier: PredictionTier, value: f64) -> RenewalPrediction {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        RenewalPrediction {
            id: Uuid::new_v4().to_string(),
            enterprise_id: "ent".to_string(),
            contract_id: "c".to_string(),
            probability: 0.5,
            prediction_tier: tier,
            predicted_date: date,
            predicted_value: Some(value),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn quarters_group_and_skip_undated() {
        let q1 = Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap();
        let q3 = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
        let grouped = group_by_quarter(&[
            prediction(Some(q1), PredictionTier::High, 100.0),
            prediction(Some(q1), PredictionTier::Low, 50.0),
            prediction(Some(q3), PredictionTier::Medium, 10.0),
            prediction(None, PredictionTier::High, 999.0),
        ])
        .unwrap();

        assert_eq!(grouped.len(), 2);
        let first = &grouped[&(2024, 1)];
        assert_eq!(first.period, "2024-Q1");
        assert_eq!(first.predicted_renewals, 2);
        assert_eq!(first.predicted_value, 150.0);
        assert_eq!((first.high_confidence, first.low_confidence), (1, 1));
        assert_eq!(grouped[&(2024, 3)].medium_confidence, 1);
    }
}
