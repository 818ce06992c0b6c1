//! TemporalEngine: wires the temporal components over one store.

use std::sync::Arc;

use covenant_core::config::CovenantConfig;
use covenant_core::traits::{
    IAlertStorage, IAnomalyStorage, IMetricStorage, IPatternStorage, IRenewalStorage,
};

use crate::alerts::AlertLifecycle;
use crate::anomaly::AnomalyDetector;
use crate::bucketer::MetricBucketer;
use crate::patterns::PatternDetector;
use crate::renewal::RenewalForecaster;
use crate::trend::TrendClassifier;

/// Owns every temporal component. Components share the alert lifecycle so
/// detectors and operators see the same alerts.
pub struct TemporalEngine {
    pub bucketer: MetricBucketer,
    pub classifier: TrendClassifier,
    pub anomalies: AnomalyDetector,
    pub renewals: RenewalForecaster,
    pub alerts: AlertLifecycle,
    pub patterns: PatternDetector,
}

impl TemporalEngine {
    pub fn new<S>(store: Arc<S>, config: &CovenantConfig) -> Self
    where
        S: IMetricStorage
            + IPatternStorage
            + IAnomalyStorage
            + IRenewalStorage
            + IAlertStorage
            + 'static,
    {
        let metrics: Arc<dyn IMetricStorage> = store.clone();
        let alerts = AlertLifecycle::new(store.clone());
        let classifier = TrendClassifier::new(config.temporal.clone());

        Self {
            bucketer: MetricBucketer::new(metrics.clone(), config.temporal.clone()),
            anomalies: AnomalyDetector::new(
                metrics.clone(),
                store.clone(),
                alerts.clone(),
                config.anomaly.clone(),
            ),
            renewals: RenewalForecaster::new(store.clone(), alerts.clone(), config.renewal.clone()),
            patterns: PatternDetector::new(metrics, store, classifier.clone()),
            classifier,
            alerts,
        }
    }
}
