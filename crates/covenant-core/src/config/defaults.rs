// Single source of truth for all default values.

// --- Storage ---
pub const DEFAULT_DB_FILENAME: &str = "covenant.db";
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5_000;
pub const DEFAULT_READ_POOL_SIZE: usize = 4;
pub const DEFAULT_READ_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_READ_RETRY_BACKOFF_MS: u64 = 25;

// --- Temporal ---
pub const DEFAULT_CLASSIFY_THRESHOLD_PCT: f64 = 10.0;
pub const DEFAULT_ANALYSIS_THRESHOLD_PCT: f64 = 15.0;
pub const DEFAULT_VOLATILITY_CV_THRESHOLD: f64 = 0.3;
pub const DEFAULT_MIN_POINTS_FOR_VOLATILITY: usize = 3;
pub const DEFAULT_FORECAST_BAND_PCT: f64 = 10.0;

// --- Anomaly ---
pub const DEFAULT_MIN_BASELINE_POINTS: usize = 3;
pub const DEFAULT_BASELINE_WINDOW: usize = 12;
pub const DEFAULT_LOW_Z: f64 = 2.0;
pub const DEFAULT_MEDIUM_Z: f64 = 2.5;
pub const DEFAULT_HIGH_Z: f64 = 3.0;
pub const DEFAULT_CRITICAL_Z: f64 = 4.0;
pub const DEFAULT_MIN_RELATIVE_STDDEV: f64 = 0.05;

// --- Renewal ---
pub const DEFAULT_HIGH_TIER_THRESHOLD: f64 = 0.7;
pub const DEFAULT_MEDIUM_TIER_THRESHOLD: f64 = 0.4;
pub const DEFAULT_AT_RISK_HORIZON_DAYS: i64 = 90;

// --- Obligations ---
pub const DEFAULT_GRAPH_DEPTH: usize = 1;
pub const DEFAULT_MAX_GRAPH_NODES: usize = 200;

// --- Dashboard ---
pub const DEFAULT_ACTIVE_ALERTS_LIMIT: usize = 10;
pub const DEFAULT_ANOMALIES_LIMIT: usize = 5;
pub const DEFAULT_TOP_PREDICTIONS_LIMIT: usize = 5;
pub const DEFAULT_EXPIRY_SHORT_DAYS: i64 = 30;
pub const DEFAULT_EXPIRY_LONG_DAYS: i64 = 90;

// --- Scheduler ---
pub const DEFAULT_ANOMALY_SWEEP_SECS: u64 = 3_600; // 1 hour
pub const DEFAULT_RENEWAL_RECOMPUTE_SECS: u64 = 21_600; // 6 hours
pub const DEFAULT_PATTERN_DETECTION_SECS: u64 = 86_400; // 1 day
pub const DEFAULT_OVERDUE_SWEEP_SECS: u64 = 900; // 15 minutes
pub const DEFAULT_DETECTION_WINDOW_DAYS: i64 = 365;

// --- Observability ---
pub const DEFAULT_LOG_LEVEL: &str = "info";
