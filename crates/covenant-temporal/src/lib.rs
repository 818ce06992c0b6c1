//! # covenant-temporal
//!
//! Time-bucketed metrics and what is derived from them: trend classification,
//! anomaly detection, renewal forecasting, patterns, and the alert lifecycle.

pub mod alerts;
pub mod anomaly;
pub mod bucketer;
pub mod engine;
pub mod patterns;
pub mod renewal;
pub mod trend;
pub mod window;

pub use alerts::AlertLifecycle;
pub use anomaly::AnomalyDetector;
pub use bucketer::MetricBucketer;
pub use engine::TemporalEngine;
pub use patterns::PatternDetector;
pub use renewal::RenewalForecaster;
pub use trend::TrendClassifier;
pub use window::TimeWindow;
