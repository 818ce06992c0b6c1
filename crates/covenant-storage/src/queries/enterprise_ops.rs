use rusqlite::Connection;

use covenant_core::errors::CovenantResult;

use crate::sql_err;

/// Every enterprise id that owns at least one row the batch jobs act on.
pub fn list_enterprises(conn: &Connection) -> CovenantResult<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT enterprise_id FROM temporal_metrics
             UNION SELECT enterprise_id FROM renewal_predictions
             UNION SELECT enterprise_id FROM obligations
             UNION SELECT enterprise_id FROM contracts
             ORDER BY 1",
        )
        .map_err(sql_err)?;
    let rows = stmt.query_map([], |row| row.get(0)).map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}
