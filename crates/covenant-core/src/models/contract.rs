//! Read-only mirror of the contracts owned by the surrounding system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ContractStatus {
    Draft,
    Active,
    Expired,
    Terminated,
}

text_enum!(ContractStatus {
    Draft => "draft",
    Active => "active",
    Expired => "expired",
    Terminated => "terminated",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Contract {
    pub id: String,
    pub enterprise_id: String,
    pub title: String,
    pub status: ContractStatus,
    pub end_date: Option<DateTime<Utc>>,
    pub value: Option<f64>,
}

/// Active contracts whose end date falls within the two dashboard windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpiryCounts {
    pub short_window_days: i64,
    pub long_window_days: i64,
    pub expiring_short: usize,
    pub expiring_long: usize,
}
