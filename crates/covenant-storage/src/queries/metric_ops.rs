//! Bucket upsert and series reads on `temporal_metrics`.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use covenant_core::errors::CovenantResult;
use covenant_core::models::{Aggregations, BucketType, TemporalMetric};
use covenant_core::traits::BucketWrite;

use crate::row::{fmt_ts, Columns};
use crate::sql_err;

const COLS: Columns = Columns::of("temporal_metrics");

const SELECT_COLUMNS: &str = "id, enterprise_id, metric_category, bucket_type, bucket_start,
    bucket_end, sum_value, average_value, count_value, dimensions, created_at, updated_at";

/// Create the bucket or fold `write.value` into it in a single statement.
/// SQLite evaluates every SET expression against the pre-update row, so the
/// average is computed from the old sum and count.
pub fn upsert_bucket(conn: &Connection, write: &BucketWrite) -> CovenantResult<TemporalMetric> {
    let dimensions = serde_json::to_string(&write.dimensions)?;
    let sql = format!(
        "INSERT INTO temporal_metrics
            (id, enterprise_id, metric_category, bucket_type, bucket_start, bucket_end,
             sum_value, average_value, count_value, dimensions, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, 1, ?8, ?9, ?9)
         ON CONFLICT (enterprise_id, metric_category, bucket_type, bucket_start) DO UPDATE SET
            sum_value = COALESCE(sum_value, 0) + excluded.sum_value,
            count_value = COALESCE(count_value, 0) + 1,
            average_value = (COALESCE(sum_value, 0) + excluded.sum_value)
                / (COALESCE(count_value, 0) + 1),
            updated_at = excluded.updated_at
         RETURNING {SELECT_COLUMNS}"
    );
    conn.query_row(
        &sql,
        params![
            uuid::Uuid::new_v4().to_string(),
            write.enterprise_id,
            write.metric_category,
            write.bucket_type.as_str(),
            fmt_ts(&write.bucket_start),
            fmt_ts(&write.bucket_end),
            write.value,
            dimensions,
            fmt_ts(&write.observed_at),
        ],
        map_metric,
    )
    .map_err(sql_err)
}

/// Buckets overlapping `[start, end)`, oldest first.
pub fn get_series(
    conn: &Connection,
    enterprise_id: &str,
    metric_category: &str,
    bucket_type: BucketType,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> CovenantResult<Vec<TemporalMetric>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM temporal_metrics
         WHERE enterprise_id = ?1 AND metric_category = ?2 AND bucket_type = ?3
           AND bucket_end > ?4 AND bucket_start < ?5
         ORDER BY bucket_start ASC"
    );
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let rows = stmt
        .query_map(
            params![
                enterprise_id,
                metric_category,
                bucket_type.as_str(),
                fmt_ts(&start),
                fmt_ts(&end),
            ],
            map_metric,
        )
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

pub fn list_categories(
    conn: &Connection,
    enterprise_id: &str,
    bucket_type: BucketType,
) -> CovenantResult<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT metric_category FROM temporal_metrics
             WHERE enterprise_id = ?1 AND bucket_type = ?2
             ORDER BY metric_category",
        )
        .map_err(sql_err)?;
    let rows = stmt
        .query_map(params![enterprise_id, bucket_type.as_str()], |row| row.get(0))
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

fn map_metric(row: &Row<'_>) -> rusqlite::Result<TemporalMetric> {
    Ok(TemporalMetric {
        id: row.get(0)?,
        enterprise_id: row.get(1)?,
        metric_category: row.get(2)?,
        bucket_type: COLS.parse(row, 3, "bucket_type")?,
        bucket_start: COLS.ts(row, 4, "bucket_start")?,
        bucket_end: COLS.ts(row, 5, "bucket_end")?,
        aggregations: Aggregations {
            sum: row.get(6)?,
            average: row.get(7)?,
            count: row.get::<_, Option<i64>>(8)?.map(|c| c.max(0) as u64),
        },
        dimensions: COLS.json(row, 9, "dimensions")?,
        created_at: COLS.ts(row, 10, "created_at")?,
        updated_at: COLS.ts(row, 11, "updated_at")?,
    })
}
