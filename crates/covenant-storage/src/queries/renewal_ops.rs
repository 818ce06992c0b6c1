use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use covenant_core::errors::CovenantResult;
use covenant_core::models::{PredictionTier, RenewalPrediction};

use crate::row::{fmt_opt_ts, fmt_ts, Columns};
use crate::sql_err;

const COLS: Columns = Columns::of("renewal_predictions");

const SELECT_COLUMNS: &str = "id, enterprise_id, contract_id, probability, prediction_tier,
    predicted_date, predicted_value, created_at, updated_at";

pub fn insert_prediction(conn: &Connection, prediction: &RenewalPrediction) -> CovenantResult<()> {
    conn.execute(
        "INSERT INTO renewal_predictions
            (id, enterprise_id, contract_id, probability, prediction_tier,
             predicted_date, predicted_value, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            prediction.id,
            prediction.enterprise_id,
            prediction.contract_id,
            prediction.probability,
            prediction.prediction_tier.as_str(),
            fmt_opt_ts(&prediction.predicted_date),
            prediction.predicted_value,
            fmt_ts(&prediction.created_at),
            fmt_ts(&prediction.updated_at),
        ],
    )
    .map_err(sql_err)?;
    Ok(())
}

pub fn get_prediction(
    conn: &Connection,
    enterprise_id: &str,
    id: &str,
) -> CovenantResult<Option<RenewalPrediction>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM renewal_predictions WHERE enterprise_id = ?1 AND id = ?2"
    );
    conn.query_row(&sql, params![enterprise_id, id], map_prediction)
        .optional()
        .map_err(sql_err)
}

/// Ordered by predicted date (undated last), then id.
pub fn list_predictions(
    conn: &Connection,
    enterprise_id: &str,
) -> CovenantResult<Vec<RenewalPrediction>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM renewal_predictions
         WHERE enterprise_id = ?1
         ORDER BY predicted_date IS NULL, predicted_date, id"
    );
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let rows = stmt
        .query_map(params![enterprise_id], map_prediction)
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

pub fn update_tier_if(
    conn: &Connection,
    enterprise_id: &str,
    id: &str,
    expected_probability: f64,
    tier: PredictionTier,
    updated_at: DateTime<Utc>,
) -> CovenantResult<bool> {
    let updated = conn
        .execute(
            "UPDATE renewal_predictions SET prediction_tier = ?4, updated_at = ?5
             WHERE enterprise_id = ?1 AND id = ?2 AND probability = ?3",
            params![
                enterprise_id,
                id,
                expected_probability,
                tier.as_str(),
                fmt_ts(&updated_at),
            ],
        )
        .map_err(sql_err)?;
    Ok(updated == 1)
}

pub fn count_by_tier(
    conn: &Connection,
    enterprise_id: &str,
    tier: PredictionTier,
) -> CovenantResult<usize> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM renewal_predictions
             WHERE enterprise_id = ?1 AND prediction_tier = ?2",
            params![enterprise_id, tier.as_str()],
            |row| row.get(0),
        )
        .map_err(sql_err)?;
    Ok(count as usize)
}

pub fn top_predictions(
    conn: &Connection,
    enterprise_id: &str,
    limit: usize,
) -> CovenantResult<Vec<RenewalPrediction>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM renewal_predictions
         WHERE enterprise_id = ?1
         ORDER BY probability DESC, created_at DESC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let rows = stmt
        .query_map(params![enterprise_id, limit as i64], map_prediction)
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

fn map_prediction(row: &Row<'_>) -> rusqlite::Result<RenewalPrediction> {
    Ok(RenewalPrediction {
        id: row.get(0)?,
        enterprise_id: row.get(1)?,
        contract_id: row.get(2)?,
        probability: row.get(3)?,
        prediction_tier: COLS.parse(row, 4, "prediction_tier")?,
        predicted_date: COLS.opt_ts(row, 5, "predicted_date")?,
        predicted_value: row.get(6)?,
        created_at: COLS.ts(row, 7, "created_at")?,
        updated_at: COLS.ts(row, 8, "updated_at")?,
    })
}
