//! Explicit record types, one per logical table, plus derived read models.
//!
//! Enum columns are stored as snake_case strings; `FromStr` is the single
//! parse point used at the store-read edge.

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum stored as text.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::errors::CovenantError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::errors::CovenantError::ValidationError(format!(
                        "unknown {} value: {other}",
                        stringify!($ty)
                    ))),
                }
            }
        }
    };
}

pub mod alert;
pub mod anomaly;
pub mod batch;
pub mod contract;
pub mod dashboard;
pub mod dependency;
pub mod escalation;
pub mod metric;
pub mod obligation;
pub mod pattern;
pub mod renewal;
pub mod trend;

pub use alert::{AlertAction, AlertSeverity, AlertStatus, NewAlert, TemporalAlert};
pub use anomaly::{AnomalyDetection, AnomalySeverity};
pub use batch::{BatchFailure, BatchReport};
pub use contract::{Contract, ContractStatus, ExpiryCounts};
pub use dashboard::DashboardData;
pub use dependency::{
    DependencyGraph, DependencyType, GraphEdge, GraphNode, NodeRelation, ObligationDependency,
};
pub use escalation::{EscalationStatus, ObligationEscalation};
pub use metric::{
    quarter_label, Aggregations, BucketType, Measure, MetricEvent, TemporalMetric, TimeSeriesPoint,
};
pub use obligation::{
    CompletionData, NewObligation, Obligation, ObligationFrequency, ObligationPriority,
    ObligationStatus, PerformanceInput, PerformanceRecord,
};
pub use pattern::{PatternType, TemporalPattern};
pub use renewal::{PredictionTier, RenewalForecast, RenewalPrediction, RenewalPredictionInput};
pub use trend::{Forecast, TrendDirection, TrendResult};
