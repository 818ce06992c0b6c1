//! Column encoding shared by the query modules.
//!
//! Timestamps are RFC 3339 with fixed nanosecond width, so text order is
//! time order and values round-trip exactly.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::de::DeserializeOwned;

/// A column whose stored text cannot be decoded into its model type.
#[derive(Debug)]
pub struct CorruptColumn {
    pub table: &'static str,
    pub column: &'static str,
    pub reason: String,
}

impl fmt::Display for CorruptColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.table, self.column, self.reason)
    }
}

impl std::error::Error for CorruptColumn {}

/// Encode a timestamp for storage.
pub fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn fmt_opt_ts(ts: &Option<DateTime<Utc>>) -> Option<String> {
    ts.as_ref().map(fmt_ts)
}

/// Column decoder bound to one table, so errors name where they came from.
#[derive(Clone, Copy)]
pub struct Columns {
    table: &'static str,
}

impl Columns {
    pub const fn of(table: &'static str) -> Self {
        Self { table }
    }

    fn corrupt(&self, idx: usize, column: &'static str, reason: String) -> rusqlite::Error {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(CorruptColumn {
                table: self.table,
                column,
                reason,
            }),
        )
    }

    /// A text-encoded enum.
    pub fn parse<T>(&self, row: &Row<'_>, idx: usize, column: &'static str) -> rusqlite::Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let text: String = row.get(idx)?;
        text.parse::<T>()
            .map_err(|e| self.corrupt(idx, column, e.to_string()))
    }

    pub fn ts(&self, row: &Row<'_>, idx: usize, column: &'static str) -> rusqlite::Result<DateTime<Utc>> {
        let text: String = row.get(idx)?;
        self.decode_ts(&text, idx, column)
    }

    pub fn opt_ts(
        &self,
        row: &Row<'_>,
        idx: usize,
        column: &'static str,
    ) -> rusqlite::Result<Option<DateTime<Utc>>> {
        let text: Option<String> = row.get(idx)?;
        text.map(|t| self.decode_ts(&t, idx, column)).transpose()
    }

    pub fn json<T: DeserializeOwned>(
        &self,
        row: &Row<'_>,
        idx: usize,
        column: &'static str,
    ) -> rusqlite::Result<T> {
        let text: String = row.get(idx)?;
        serde_json::from_str(&text).map_err(|e| self.corrupt(idx, column, e.to_string()))
    }

    /// Integer-encoded booleans.
    pub fn flag(&self, row: &Row<'_>, idx: usize) -> rusqlite::Result<bool> {
        Ok(row.get::<_, i64>(idx)? != 0)
    }

    fn decode_ts(&self, text: &str, idx: usize, column: &'static str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| self.corrupt(idx, column, format!("{text:?}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encoded_timestamps_sort_like_time() {
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(500);
        let c = a + chrono::Duration::seconds(1);
        assert!(fmt_ts(&a) < fmt_ts(&b));
        assert!(fmt_ts(&b) < fmt_ts(&c));
    }
}
