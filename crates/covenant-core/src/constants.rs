/// Covenant engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lowest escalation level an obligation can carry.
pub const MIN_ESCALATION_LEVEL: u8 = 1;

/// Highest escalation level. Further escalations stay at this level.
pub const MAX_ESCALATION_LEVEL: u8 = 5;

/// Transparent retries after an optimistic write loses a race.
pub const CONFLICT_RETRIES: usize = 1;

/// Hard cap on obligation graph traversal depth.
pub const MAX_GRAPH_DEPTH: usize = 10;

/// Maximum number of events accepted by one batch ingestion call.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Alert type raised for new anomalies.
pub const ALERT_TYPE_ANOMALY: &str = "anomaly_detected";

/// Alert type raised for low-tier renewals near their predicted date.
pub const ALERT_TYPE_RENEWAL_AT_RISK: &str = "renewal_at_risk";
