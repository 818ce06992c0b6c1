//! v002: contracts mirror, renewal_predictions, temporal_alerts.

use rusqlite::Connection;

use covenant_core::errors::CovenantResult;

use crate::sql_err;

pub fn migrate(conn: &Connection) -> CovenantResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS contracts (
            id             TEXT NOT NULL,
            enterprise_id  TEXT NOT NULL,
            title          TEXT NOT NULL,
            status         TEXT NOT NULL,
            end_date       TEXT,
            value          REAL,
            PRIMARY KEY (enterprise_id, id)
        );

        CREATE INDEX IF NOT EXISTS idx_contracts_expiry
            ON contracts(enterprise_id, status, end_date);

        CREATE TABLE IF NOT EXISTS renewal_predictions (
            id               TEXT PRIMARY KEY,
            enterprise_id    TEXT NOT NULL,
            contract_id      TEXT NOT NULL,
            probability      REAL NOT NULL CHECK (probability >= 0.0 AND probability <= 1.0),
            prediction_tier  TEXT NOT NULL CHECK (prediction_tier IN ('high', 'medium', 'low')),
            predicted_date   TEXT,
            predicted_value  REAL,
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_predictions_tier
            ON renewal_predictions(enterprise_id, prediction_tier);
        CREATE INDEX IF NOT EXISTS idx_predictions_probability
            ON renewal_predictions(enterprise_id, probability DESC);

        CREATE TABLE IF NOT EXISTS temporal_alerts (
            id               TEXT PRIMARY KEY,
            enterprise_id    TEXT NOT NULL,
            contract_id      TEXT,
            alert_type       TEXT NOT NULL,
            severity         TEXT NOT NULL CHECK (severity IN ('info', 'warning', 'critical')),
            status           TEXT NOT NULL
                CHECK (status IN ('active', 'acknowledged', 'resolved', 'dismissed')),
            triggered_at     TEXT NOT NULL,
            acknowledged_at  TEXT,
            acknowledged_by  TEXT,
            resolved_at      TEXT,
            resolved_by      TEXT,
            alert_data       TEXT NOT NULL DEFAULT '{}',
            dedupe_key       TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_alerts_status
            ON temporal_alerts(enterprise_id, status, triggered_at);

        -- At most one open alert per dedupe key.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_alerts_open_dedupe
            ON temporal_alerts(enterprise_id, dedupe_key)
            WHERE dedupe_key IS NOT NULL AND status IN ('active', 'acknowledged');
        ",
    )
    .map_err(sql_err)?;
    Ok(())
}
