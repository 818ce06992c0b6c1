//! Obligation dependency edges with a store-side acyclicity check.

use rusqlite::{params, Connection, OptionalExtension, Row};

use covenant_core::errors::CovenantResult;
use covenant_core::models::ObligationDependency;
use covenant_core::traits::DependencyInsert;

use crate::row::{fmt_ts, Columns};
use crate::sql_err;

const COLS: Columns = Columns::of("obligation_dependencies");

pub fn list_dependencies(
    conn: &Connection,
    enterprise_id: &str,
) -> CovenantResult<Vec<ObligationDependency>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, enterprise_id, obligation_id, depends_on_id, dependency_type,
                    cascade_on_delay, created_at
             FROM obligation_dependencies
             WHERE enterprise_id = ?1
             ORDER BY created_at, id",
        )
        .map_err(sql_err)?;
    let rows = stmt
        .query_map(params![enterprise_id], map_dependency)
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

/// Whether `target` is reachable from `from` by following depends-on edges.
pub fn reaches(
    conn: &Connection,
    enterprise_id: &str,
    from: &str,
    target: &str,
) -> CovenantResult<bool> {
    conn.query_row(
        "WITH RECURSIVE reach(id) AS (
            SELECT ?2
            UNION
            SELECT d.depends_on_id
            FROM obligation_dependencies d
            JOIN reach r ON d.obligation_id = r.id
            WHERE d.enterprise_id = ?1
         )
         SELECT EXISTS (SELECT 1 FROM reach WHERE id = ?3)",
        params![enterprise_id, from, target],
        |row| row.get(0),
    )
    .map_err(sql_err)
}

/// Insert the edge unless it duplicates an existing one or closes a cycle
/// against the edges committed right now. Run inside an immediate
/// transaction so no other writer can slip an edge in between.
pub fn insert_if_acyclic(
    conn: &Connection,
    dependency: &ObligationDependency,
) -> CovenantResult<DependencyInsert> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM obligation_dependencies
             WHERE enterprise_id = ?1 AND obligation_id = ?2 AND depends_on_id = ?3",
            params![
                dependency.enterprise_id,
                dependency.obligation_id,
                dependency.depends_on_id,
            ],
            |row| row.get(0),
        )
        .optional()
        .map_err(sql_err)?;
    if existing.is_some() {
        return Ok(DependencyInsert::Duplicate);
    }

    if reaches(
        conn,
        &dependency.enterprise_id,
        &dependency.depends_on_id,
        &dependency.obligation_id,
    )? {
        return Ok(DependencyInsert::WouldCycle);
    }

    conn.execute(
        "INSERT INTO obligation_dependencies
            (id, enterprise_id, obligation_id, depends_on_id, dependency_type,
             cascade_on_delay, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            dependency.id,
            dependency.enterprise_id,
            dependency.obligation_id,
            dependency.depends_on_id,
            dependency.dependency_type.as_str(),
            dependency.cascade_on_delay,
            fmt_ts(&dependency.created_at),
        ],
    )
    .map_err(sql_err)?;
    Ok(DependencyInsert::Inserted)
}

pub fn delete_dependency(
    conn: &Connection,
    enterprise_id: &str,
    obligation_id: &str,
    depends_on_id: &str,
) -> CovenantResult<bool> {
    let deleted = conn
        .execute(
            "DELETE FROM obligation_dependencies
             WHERE enterprise_id = ?1 AND obligation_id = ?2 AND depends_on_id = ?3",
            params![enterprise_id, obligation_id, depends_on_id],
        )
        .map_err(sql_err)?;
    Ok(deleted == 1)
}

fn map_dependency(row: &Row<'_>) -> rusqlite::Result<ObligationDependency> {
    Ok(ObligationDependency {
        id: row.get(0)?,
        enterprise_id: row.get(1)?,
        obligation_id: row.get(2)?,
        depends_on_id: row.get(3)?,
        dependency_type: COLS.parse(row, 4, "dependency_type")?,
        cascade_on_delay: COLS.flag(row, 5)?,
        created_at: COLS.ts(row, 6, "created_at")?,
    })
}
