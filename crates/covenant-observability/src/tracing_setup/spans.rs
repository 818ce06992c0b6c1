//! Span definitions per operation: ingestion, detection, forecasting, alert
//! lifecycle, obligation graph, dashboard, batch jobs.

/// Create an ingestion span.
#[macro_export]
macro_rules! ingest_span {
    ($enterprise_id:expr, $category:expr) => {
        tracing::info_span!("covenant.ingest", enterprise_id = %$enterprise_id, category = %$category)
    };
}

/// Create an anomaly / pattern detection span.
#[macro_export]
macro_rules! detection_span {
    ($enterprise_id:expr, $category:expr) => {
        tracing::info_span!("covenant.detection", enterprise_id = %$enterprise_id, category = %$category)
    };
}

/// Create a renewal forecasting span.
#[macro_export]
macro_rules! forecast_span {
    ($enterprise_id:expr, $periods:expr) => {
        tracing::info_span!("covenant.forecast", enterprise_id = %$enterprise_id, periods = $periods)
    };
}

/// Create an alert lifecycle span.
#[macro_export]
macro_rules! alert_span {
    ($alert_id:expr, $action:expr) => {
        tracing::info_span!("covenant.alert", alert_id = %$alert_id, action = ?$action)
    };
}

/// Create an obligation graph span.
#[macro_export]
macro_rules! obligation_span {
    ($obligation_id:expr, $op:expr) => {
        tracing::info_span!("covenant.obligation", obligation_id = %$obligation_id, op = $op)
    };
}

/// Create a dashboard snapshot span.
#[macro_export]
macro_rules! dashboard_span {
    ($enterprise_id:expr) => {
        tracing::info_span!("covenant.dashboard", enterprise_id = %$enterprise_id)
    };
}

/// Create a scheduled batch job span.
#[macro_export]
macro_rules! batch_span {
    ($job:expr) => {
        tracing::info_span!("covenant.batch", job = $job)
    };
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const INGEST: &str = "covenant.ingest";
    pub const DETECTION: &str = "covenant.detection";
    pub const FORECAST: &str = "covenant.forecast";
    pub const ALERT: &str = "covenant.alert";
    pub const OBLIGATION: &str = "covenant.obligation";
    pub const DASHBOARD: &str = "covenant.dashboard";
    pub const BATCH: &str = "covenant.batch";
}
