use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use covenant_core::errors::{CovenantError, CovenantResult};

/// Half-open `[start, end)` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Validates `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CovenantResult<Self> {
        if start >= end {
            return Err(CovenantError::ValidationError(format!(
                "window start {start} must be before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` leading up to `now`.
    pub fn trailing(now: DateTime<Utc>, days: i64) -> CovenantResult<Self> {
        let span = Duration::try_days(days).ok_or_else(|| {
            CovenantError::ValidationError(format!("window of {days} days is out of range"))
        })?;
        let start = now.checked_sub_signed(span).ok_or_else(|| {
            CovenantError::ValidationError(format!("window of {days} days is out of range"))
        })?;
        Self::new(start, now)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}
