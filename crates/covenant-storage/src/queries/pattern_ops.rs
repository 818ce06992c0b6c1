use rusqlite::{params, Connection, Row};

use covenant_core::errors::CovenantResult;
use covenant_core::models::{PatternType, TemporalPattern};

use crate::row::{fmt_ts, Columns};
use crate::sql_err;

const COLS: Columns = Columns::of("temporal_patterns");

const SELECT_COLUMNS: &str = "id, enterprise_id, metric_category, pattern_type, detected_at,
    last_observed_at, is_active, supporting_data";

/// Insert the pattern or refresh it. A re-activated pattern restarts its
/// `detected_at`; a still-active one keeps it.
pub fn upsert_pattern(conn: &Connection, pattern: &TemporalPattern) -> CovenantResult<TemporalPattern> {
    let supporting = serde_json::to_string(&pattern.supporting_data)?;
    let sql = format!(
        "INSERT INTO temporal_patterns
            (id, enterprise_id, metric_category, pattern_type, detected_at,
             last_observed_at, is_active, supporting_data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
         ON CONFLICT (enterprise_id, metric_category, pattern_type) DO UPDATE SET
            detected_at = CASE WHEN is_active = 1 THEN detected_at ELSE excluded.detected_at END,
            last_observed_at = excluded.last_observed_at,
            is_active = 1,
            supporting_data = excluded.supporting_data
         RETURNING {SELECT_COLUMNS}"
    );
    conn.query_row(
        &sql,
        params![
            pattern.id,
            pattern.enterprise_id,
            pattern.metric_category,
            pattern.pattern_type.as_str(),
            fmt_ts(&pattern.detected_at),
            fmt_ts(&pattern.last_observed_at),
            supporting,
        ],
        map_pattern,
    )
    .map_err(sql_err)
}

pub fn deactivate_patterns(
    conn: &Connection,
    enterprise_id: &str,
    metric_category: &str,
    keep: Option<PatternType>,
) -> CovenantResult<usize> {
    conn.execute(
        "UPDATE temporal_patterns SET is_active = 0
         WHERE enterprise_id = ?1 AND metric_category = ?2 AND is_active = 1
           AND (?3 IS NULL OR pattern_type <> ?3)",
        params![enterprise_id, metric_category, keep.map(|k| k.as_str())],
    )
    .map_err(sql_err)
}

pub fn list_patterns(
    conn: &Connection,
    enterprise_id: &str,
    active_only: bool,
) -> CovenantResult<Vec<TemporalPattern>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM temporal_patterns
         WHERE enterprise_id = ?1 AND (?2 = 0 OR is_active = 1)
         ORDER BY metric_category, pattern_type"
    );
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let rows = stmt
        .query_map(params![enterprise_id, active_only], map_pattern)
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

fn map_pattern(row: &Row<'_>) -> rusqlite::Result<TemporalPattern> {
    Ok(TemporalPattern {
        id: row.get(0)?,
        enterprise_id: row.get(1)?,
        metric_category: row.get(2)?,
        pattern_type: COLS.parse(row, 3, "pattern_type")?,
        detected_at: COLS.ts(row, 4, "detected_at")?,
        last_observed_at: COLS.ts(row, 5, "last_observed_at")?,
        is_active: COLS.flag(row, 6)?,
        supporting_data: COLS.json(row, 7, "supporting_data")?,
    })
}
