use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ObligationStatus {
    Pending,
    InProgress,
    Completed,
    Overdue,
    Waived,
    Cancelled,
}

text_enum!(ObligationStatus {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    Overdue => "overdue",
    Waived => "waived",
    Cancelled => "cancelled",
});

impl ObligationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Waived | Self::Cancelled)
    }

    /// Transitions available through a plain status update. `Completed` is
    /// deliberately absent: completion goes through the evidence-checked path.
    pub fn can_transition_to(&self, target: ObligationStatus) -> bool {
        use ObligationStatus::*;
        matches!(
            (self, target),
            (Pending, InProgress)
                | (Pending, Overdue)
                | (Pending, Waived)
                | (Pending, Cancelled)
                | (InProgress, Overdue)
                | (InProgress, Waived)
                | (InProgress, Cancelled)
                | (Overdue, InProgress)
                | (Overdue, Waived)
                | (Overdue, Cancelled)
        )
    }

    pub fn can_complete(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress | Self::Overdue)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ObligationPriority {
    Low,
    Medium,
    High,
    Critical,
}

text_enum!(ObligationPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ObligationFrequency {
    OneTime,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

text_enum!(ObligationFrequency {
    OneTime => "one_time",
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
    Quarterly => "quarterly",
    Annually => "annually",
});

/// A row in `obligations`.
///
/// Invariant: `status == Completed` implies `completed_at.is_some()` and at
/// least one row in `obligation_performance_tracking`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Obligation {
    pub id: String,
    pub enterprise_id: String,
    pub contract_id: String,
    pub title: String,
    pub obligation_type: String,
    pub status: ObligationStatus,
    pub priority: ObligationPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub frequency: ObligationFrequency,
    pub responsible_party: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set when an upstream obligation this one depends on slipped.
    pub at_risk: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Obligation {
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.due_date.is_some_and(|due| due < now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewObligation {
    pub contract_id: String,
    pub title: String,
    pub obligation_type: String,
    pub priority: ObligationPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub frequency: ObligationFrequency,
    pub responsible_party: Option<String>,
}

/// A row in `obligation_performance_tracking`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PerformanceRecord {
    pub id: String,
    pub enterprise_id: String,
    pub obligation_id: String,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: String,
    /// 0.0–1.0 when supplied.
    pub quality_score: Option<f64>,
    pub on_time: bool,
    pub notes: Option<String>,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceInput {
    pub recorded_by: String,
    pub quality_score: Option<f64>,
    pub notes: Option<String>,
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// Evidence supplied when marking an obligation completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionData {
    pub completed_by: String,
    /// Defaults to now.
    pub completed_at: Option<DateTime<Utc>>,
    /// Inline performance record; required unless one was recorded earlier.
    pub performance: Option<PerformanceInput>,
}
