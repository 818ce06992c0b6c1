use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum EscalationStatus {
    Active,
    Resolved,
}

text_enum!(EscalationStatus {
    Active => "active",
    Resolved => "resolved",
});

/// A row in `obligation_escalations`. Levels only grow, capped at
/// `MAX_ESCALATION_LEVEL`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ObligationEscalation {
    pub id: String,
    pub enterprise_id: String,
    pub obligation_id: String,
    pub escalation_level: u8,
    pub escalated_to: String,
    pub escalated_by: String,
    pub reason: String,
    pub status: EscalationStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}
