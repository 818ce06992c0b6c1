//! v003: obligations, obligation_dependencies, obligation_escalations,
//! obligation_performance_tracking.

use rusqlite::Connection;

use covenant_core::errors::CovenantResult;

use crate::sql_err;

pub fn migrate(conn: &Connection) -> CovenantResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS obligations (
            id                 TEXT PRIMARY KEY,
            enterprise_id      TEXT NOT NULL,
            contract_id        TEXT NOT NULL,
            title              TEXT NOT NULL,
            obligation_type    TEXT NOT NULL,
            status             TEXT NOT NULL,
            priority           TEXT NOT NULL,
            due_date           TEXT,
            frequency          TEXT NOT NULL,
            responsible_party  TEXT,
            completed_at       TEXT,
            at_risk            INTEGER NOT NULL DEFAULT 0,
            created_at         TEXT NOT NULL,
            updated_at         TEXT NOT NULL,
            CHECK (status <> 'completed' OR completed_at IS NOT NULL)
        );

        CREATE INDEX IF NOT EXISTS idx_obligations_due
            ON obligations(enterprise_id, status, due_date);

        CREATE TABLE IF NOT EXISTS obligation_dependencies (
            id                TEXT PRIMARY KEY,
            enterprise_id     TEXT NOT NULL,
            obligation_id     TEXT NOT NULL REFERENCES obligations(id) ON DELETE CASCADE,
            depends_on_id     TEXT NOT NULL REFERENCES obligations(id) ON DELETE CASCADE,
            dependency_type   TEXT NOT NULL,
            cascade_on_delay  INTEGER NOT NULL DEFAULT 1,
            created_at        TEXT NOT NULL,
            CHECK (obligation_id <> depends_on_id),
            UNIQUE (enterprise_id, obligation_id, depends_on_id)
        );

        CREATE INDEX IF NOT EXISTS idx_dependencies_upstream
            ON obligation_dependencies(enterprise_id, depends_on_id);

        CREATE TABLE IF NOT EXISTS obligation_escalations (
            id                TEXT PRIMARY KEY,
            enterprise_id     TEXT NOT NULL,
            obligation_id     TEXT NOT NULL REFERENCES obligations(id) ON DELETE CASCADE,
            escalation_level  INTEGER NOT NULL CHECK (escalation_level BETWEEN 1 AND 5),
            escalated_to      TEXT NOT NULL,
            escalated_by      TEXT NOT NULL,
            reason            TEXT NOT NULL,
            status            TEXT NOT NULL CHECK (status IN ('active', 'resolved')),
            created_at        TEXT NOT NULL,
            resolved_at       TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_escalations_obligation
            ON obligation_escalations(enterprise_id, obligation_id, escalation_level);

        CREATE TABLE IF NOT EXISTS obligation_performance_tracking (
            id             TEXT PRIMARY KEY,
            enterprise_id  TEXT NOT NULL,
            obligation_id  TEXT NOT NULL REFERENCES obligations(id) ON DELETE CASCADE,
            recorded_at    TEXT NOT NULL,
            recorded_by    TEXT NOT NULL,
            quality_score  REAL CHECK (quality_score IS NULL OR (quality_score >= 0.0 AND quality_score <= 1.0)),
            on_time        INTEGER NOT NULL,
            notes          TEXT,
            evidence       TEXT NOT NULL DEFAULT '[]'
        );

        CREATE INDEX IF NOT EXISTS idx_performance_obligation
            ON obligation_performance_tracking(enterprise_id, obligation_id);
        ",
    )
    .map_err(sql_err)?;
    Ok(())
}
