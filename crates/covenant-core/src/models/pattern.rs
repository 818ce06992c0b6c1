use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::TrendDirection;

/// Recurring behaviour observed by the pattern detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PatternType {
    SustainedGrowth,
    SustainedDecline,
    HighVolatility,
}

text_enum!(PatternType {
    SustainedGrowth => "sustained_growth",
    SustainedDecline => "sustained_decline",
    HighVolatility => "high_volatility",
});

impl PatternType {
    pub const ALL: [PatternType; 3] = [
        PatternType::SustainedGrowth,
        PatternType::SustainedDecline,
        PatternType::HighVolatility,
    ];

    /// The pattern a trend direction evidences, if any. Stable series carry none.
    pub fn from_direction(direction: TrendDirection) -> Option<Self> {
        match direction {
            TrendDirection::Increasing => Some(Self::SustainedGrowth),
            TrendDirection::Decreasing => Some(Self::SustainedDecline),
            TrendDirection::Volatile => Some(Self::HighVolatility),
            TrendDirection::Stable => None,
        }
    }
}

/// A row in `temporal_patterns`. Deactivated, never deleted, once it stops
/// being observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TemporalPattern {
    pub id: String,
    pub enterprise_id: String,
    pub metric_category: String,
    pub pattern_type: PatternType,
    pub detected_at: DateTime<Utc>,
    pub last_observed_at: DateTime<Utc>,
    pub is_active: bool,
    pub supporting_data: serde_json::Value,
}
