//! v004: anomaly_detections.alert_pending.

use rusqlite::Connection;

use covenant_core::errors::CovenantResult;

use crate::sql_err;

pub fn migrate(conn: &Connection) -> CovenantResult<()> {
    conn.execute_batch(
        "
        ALTER TABLE anomaly_detections
            ADD COLUMN alert_pending INTEGER NOT NULL DEFAULT 0;

        CREATE INDEX IF NOT EXISTS idx_anomalies_alert_pending
            ON anomaly_detections(enterprise_id, metric_category)
            WHERE alert_pending = 1 AND is_resolved = 0;
        ",
    )
    .map_err(sql_err)?;
    Ok(())
}
