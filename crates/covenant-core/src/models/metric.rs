//! Time buckets and the metric rows aggregated into them.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::{CovenantError, CovenantResult};

/// Bucket granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum BucketType {
    Day,
    Week,
    Month,
    Quarter,
}

text_enum!(BucketType {
    Day => "day",
    Week => "week",
    Month => "month",
    Quarter => "quarter",
});

impl BucketType {
    /// Half-open `[start, end)` bounds of the bucket containing `ts`.
    ///
    /// Day buckets start at UTC midnight, weeks on ISO Monday, months on the
    /// 1st, quarters on the 1st of January, April, July or October.
    pub fn bounds(&self, ts: DateTime<Utc>) -> CovenantResult<(DateTime<Utc>, DateTime<Utc>)> {
        let date = ts.date_naive();
        let start = match self {
            Self::Day => Some(date),
            Self::Week => date.checked_sub_days(Days::new(
                u64::from(date.weekday().num_days_from_monday()),
            )),
            Self::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
            Self::Quarter => {
                NaiveDate::from_ymd_opt(date.year(), quarter_start_month(date.month()), 1)
            }
        }
        .ok_or_else(|| out_of_range(ts))?;

        let end = match self {
            Self::Day => start.checked_add_days(Days::new(1)),
            Self::Week => start.checked_add_days(Days::new(7)),
            Self::Month => start.checked_add_months(Months::new(1)),
            Self::Quarter => start.checked_add_months(Months::new(3)),
        }
        .ok_or_else(|| out_of_range(ts))?;

        Ok((midnight(start)?, midnight(end)?))
    }

    /// Human label for the bucket starting at `start`:
    /// `2024-01-15`, `2024-W03`, `2024-01`, `2024-Q1`.
    pub fn label(&self, start: DateTime<Utc>) -> String {
        match self {
            Self::Day => start.format("%Y-%m-%d").to_string(),
            Self::Week => {
                let week = start.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Self::Month => start.format("%Y-%m").to_string(),
            Self::Quarter => quarter_label(start),
        }
    }
}

/// `YYYY-Qn` for the calendar quarter containing `ts`.
pub fn quarter_label(ts: DateTime<Utc>) -> String {
    format!("{}-Q{}", ts.year(), (ts.month() - 1) / 3 + 1)
}

fn quarter_start_month(month: u32) -> u32 {
    ((month - 1) / 3) * 3 + 1
}

fn midnight(date: NaiveDate) -> CovenantResult<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| CovenantError::ValidationError(format!("invalid date {date}")))
}

fn out_of_range(ts: DateTime<Utc>) -> CovenantError {
    CovenantError::ValidationError(format!("timestamp {ts} is outside the supported range"))
}

/// Running aggregations of a bucket. All fields are optional at the storage
/// boundary; the bucketer always fills them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Aggregations {
    pub sum: Option<f64>,
    pub average: Option<f64>,
    pub count: Option<u64>,
}

impl Aggregations {
    /// Value of the requested measure, 0 when absent.
    pub fn value(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Sum => self.sum.unwrap_or(0.0),
            Measure::Average => self.average.unwrap_or(0.0),
            Measure::Count => self.count.unwrap_or(0) as f64,
        }
    }
}

/// Which aggregation a time series is projected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Measure {
    Sum,
    Average,
    Count,
}

/// One bucket row in `temporal_metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TemporalMetric {
    pub id: String,
    pub enterprise_id: String,
    pub metric_category: String,
    pub bucket_type: BucketType,
    pub bucket_start: DateTime<Utc>,
    pub bucket_end: DateTime<Utc>,
    pub aggregations: Aggregations,
    pub dimensions: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemporalMetric {
    /// A bucket is closed once its end has passed; closed buckets are final.
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        self.bucket_end <= now
    }

    pub fn to_point(&self, measure: Measure) -> TimeSeriesPoint {
        TimeSeriesPoint {
            timestamp: self.bucket_start,
            value: self.aggregations.value(measure),
            label: self.bucket_type.label(self.bucket_start),
            metadata: serde_json::json!({
                "bucket_end": self.bucket_end,
                "count": self.aggregations.count,
                "dimensions": self.dimensions,
            }),
        }
    }
}

/// A raw timestamped event to aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEvent {
    pub occurred_at: DateTime<Utc>,
    pub metric_category: String,
    pub value: f64,
    pub bucket_type: BucketType,
    #[serde(default)]
    pub dimensions: HashMap<String, String>,
}

impl MetricEvent {
    pub fn new(
        occurred_at: DateTime<Utc>,
        metric_category: impl Into<String>,
        value: f64,
        bucket_type: BucketType,
    ) -> Self {
        Self {
            occurred_at,
            metric_category: metric_category.into(),
            value,
            bucket_type,
            dimensions: HashMap::new(),
        }
    }

    pub fn with_dimension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(key.into(), value.into());
        self
    }
}

/// Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub label: String,
    pub metadata: serde_json::Value,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            label: String::new(),
            metadata: serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
    }

    #[test]
    fn quarter_bounds_cover_three_months() {
        let (start, end) = BucketType::Quarter.bounds(at(2024, 5, 17, 9)).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());
        assert_eq!(BucketType::Quarter.label(start), "2024-Q2");
    }

    #[test]
    fn week_starts_on_monday() {
        // 2024-01-17 is a Wednesday.
        let (start, end) = BucketType::Week.bounds(at(2024, 1, 17, 23)).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 22, 0, 0, 0).unwrap());
        assert_eq!(BucketType::Week.label(start), "2024-W03");
    }

    #[test]
    fn month_end_rolls_over_year() {
        let (start, end) = BucketType::Month.bounds(at(2023, 12, 31, 23)).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(BucketType::Month.label(start), "2023-12");
    }

    #[test]
    fn day_bucket_is_utc_midnight() {
        let (start, end) = BucketType::Day.bounds(at(2024, 2, 29, 12)).unwrap();
        assert_eq!(BucketType::Day.label(start), "2024-02-29");
        assert_eq!(end - start, chrono::Duration::days(1));
    }

    #[test]
    fn bucket_type_parses_from_text() {
        assert_eq!("quarter".parse::<BucketType>().unwrap(), BucketType::Quarter);
        assert!("fortnight".parse::<BucketType>().is_err());
    }
}
