use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle status of a temporal alert.
///
/// ```text
/// active ──► acknowledged ──► resolved | dismissed
///    └────────────────────────► resolved | dismissed
/// ```
/// `resolved` and `dismissed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Dismissed,
}

text_enum!(AlertStatus {
    Active => "active",
    Acknowledged => "acknowledged",
    Resolved => "resolved",
    Dismissed => "dismissed",
});

impl AlertStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Dismissed)
    }

    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, target: AlertStatus) -> bool {
        matches!(
            (self, target),
            (Self::Active, AlertStatus::Acknowledged)
                | (Self::Active, AlertStatus::Resolved)
                | (Self::Active, AlertStatus::Dismissed)
                | (Self::Acknowledged, AlertStatus::Resolved)
                | (Self::Acknowledged, AlertStatus::Dismissed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

text_enum!(AlertSeverity {
    Info => "info",
    Warning => "warning",
    Critical => "critical",
});

/// Operator actions on an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertAction {
    Acknowledge,
    Resolve,
    Dismiss,
}

impl AlertAction {
    pub fn target(&self) -> AlertStatus {
        match self {
            Self::Acknowledge => AlertStatus::Acknowledged,
            Self::Resolve => AlertStatus::Resolved,
            Self::Dismiss => AlertStatus::Dismissed,
        }
    }
}

/// A row in `temporal_alerts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TemporalAlert {
    pub id: String,
    pub enterprise_id: String,
    pub contract_id: Option<String>,
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub triggered_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub alert_data: serde_json::Value,
    /// Open alerts sharing a key are raised once.
    pub dedupe_key: Option<String>,
}

/// Input for raising an alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlert {
    pub contract_id: Option<String>,
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub alert_data: serde_json::Value,
    pub dedupe_key: Option<String>,
}

impl NewAlert {
    pub fn new(alert_type: impl Into<String>, severity: AlertSeverity) -> Self {
        Self {
            contract_id: None,
            alert_type: alert_type.into(),
            severity,
            alert_data: serde_json::json!({}),
            dedupe_key: None,
        }
    }

    pub fn for_contract(mut self, contract_id: impl Into<String>) -> Self {
        self.contract_id = Some(contract_id.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.alert_data = data;
        self
    }

    pub fn deduped_by(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_reject_every_transition() {
        for from in [AlertStatus::Resolved, AlertStatus::Dismissed] {
            for to in [
                AlertStatus::Active,
                AlertStatus::Acknowledged,
                AlertStatus::Resolved,
                AlertStatus::Dismissed,
            ] {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be rejected");
            }
        }
    }

    #[test]
    fn acknowledged_cannot_be_reacknowledged() {
        assert!(!AlertStatus::Acknowledged.can_transition_to(AlertStatus::Acknowledged));
        assert!(AlertStatus::Acknowledged.can_transition_to(AlertStatus::Resolved));
    }
}
