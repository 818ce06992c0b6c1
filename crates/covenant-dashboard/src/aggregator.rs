//! DashboardAggregator: fan-out/fan-in snapshot.
//!
//! The five sections are fetched concurrently on the blocking pool and
//! joined. Any failed section fails the snapshot; a partial dashboard is
//! never returned.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, Instrument};

use covenant_core::config::DashboardConfig;
use covenant_core::errors::{CovenantError, CovenantResult};
use covenant_core::models::DashboardData;
use covenant_core::traits::IDashboardSource;
use covenant_core::validation::require_non_empty;

/// Section names carried by `CovenantError::DashboardSection`.
pub mod sections {
    pub const EXPIRING_CONTRACTS: &str = "expiring_contracts";
    pub const HIGH_CONFIDENCE_RENEWALS: &str = "high_confidence_renewals";
    pub const ACTIVE_ALERTS: &str = "active_alerts";
    pub const UNRESOLVED_ANOMALIES: &str = "unresolved_anomalies";
    pub const TOP_PREDICTIONS: &str = "top_predictions";
}

#[derive(Clone)]
pub struct DashboardAggregator {
    source: Arc<dyn IDashboardSource>,
    config: DashboardConfig,
}

impl DashboardAggregator {
    pub fn new(source: Arc<dyn IDashboardSource>, config: DashboardConfig) -> Self {
        Self { source, config }
    }

    /// Compose the dashboard for one enterprise as of `now`.
    pub async fn snapshot(
        &self,
        enterprise_id: &str,
        now: DateTime<Utc>,
    ) -> CovenantResult<DashboardData> {
        require_non_empty("enterprise_id", enterprise_id)?;
        let span = covenant_observability::dashboard_span!(enterprise_id);

        let cfg = self.config.clone();
        let ent = enterprise_id.to_string();
        let expiring = {
            let ent = ent.clone();
            self.section(sections::EXPIRING_CONTRACTS, move |s| {
                s.fetch_expiry_counts(&ent, now, cfg.expiry_short_days, cfg.expiry_long_days)
            })
        };
        let high_tier = {
            let ent = ent.clone();
            self.section(sections::HIGH_CONFIDENCE_RENEWALS, move |s| {
                s.fetch_high_tier_count(&ent)
            })
        };
        let alerts = {
            let ent = ent.clone();
            self.section(sections::ACTIVE_ALERTS, move |s| {
                s.fetch_active_alerts(&ent, cfg.active_alerts_limit)
            })
        };
        let anomalies = {
            let ent = ent.clone();
            self.section(sections::UNRESOLVED_ANOMALIES, move |s| {
                s.fetch_unresolved_anomalies(&ent, cfg.anomalies_limit)
            })
        };
        let predictions = {
            let ent = ent.clone();
            self.section(sections::TOP_PREDICTIONS, move |s| {
                s.fetch_top_predictions(&ent, cfg.top_predictions_limit)
            })
        };

        let joined = async { tokio::try_join!(expiring, high_tier, alerts, anomalies, predictions) }
            .instrument(span)
            .await?;
        let (
            expiring_contracts,
            high_confidence_renewals,
            active_alerts,
            unresolved_anomalies,
            top_predictions,
        ) = joined;

        debug!(
            enterprise_id = %ent,
            alerts = active_alerts.len(),
            anomalies = unresolved_anomalies.len(),
            "dashboard snapshot composed"
        );
        Ok(DashboardData {
            enterprise_id: ent,
            generated_at: now,
            expiring_contracts,
            high_confidence_renewals,
            active_alerts,
            unresolved_anomalies,
            top_predictions,
        })
    }

    /// Run one section read on the blocking pool, tagging its error with the
    /// section name.
    fn section<T, F>(
        &self,
        section: &'static str,
        read: F,
    ) -> impl Future<Output = CovenantResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&dyn IDashboardSource) -> CovenantResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.source);
        async move {
            tokio::task::spawn_blocking(move || read(store.as_ref()))
                .await
                .map_err(|e| CovenantError::TaskFailed(format!("dashboard section {section}: {e}")))?
                .map_err(|e| CovenantError::DashboardSection {
                    section,
                    source: Box::new(e),
                })
        }
    }
}
