//! Schema migrations for the SQLite backend.
//!
//! Versioned migrations set up the bookkeeping tables. The value tables
//! themselves come from the environment's catalog: each one is created on
//! first open and recorded in `catalog` with its layout, so a later open
//! with a conflicting layout is refused instead of silently misread.

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::error::{EnvError, Result};
use crate::traits::TableSpec;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema, then make sure every table of
/// `catalog` exists with the expected layout.
///
/// Idempotent.
pub fn migrate(conn: &mut Connection, catalog: &[TableSpec]) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let tx = conn.transaction()?;

    for version in (current + 1)..=CURRENT_VERSION {
        apply_migration(&tx, version)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![version, now_millis()],
        )?;
    }

    for spec in catalog {
        ensure_table(&tx, spec)?;
    }

    tx.commit()?;
    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(EnvError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: table catalog.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- one row per value table, with its layout
        CREATE TABLE catalog (
            name TEXT PRIMARY KEY,
            dupsort INTEGER NOT NULL,     -- 0=single, 1=sorted duplicates
            created_at INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Create the table for `spec` unless the catalog already records it.
fn ensure_table(tx: &Transaction<'_>, spec: &TableSpec) -> Result<()> {
    if spec.name.is_empty()
        || !spec
            .name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    {
        return Err(EnvError::Migration(format!(
            "invalid table name: {:?}",
            spec.name
        )));
    }

    let recorded: Option<bool> = tx
        .query_row(
            "SELECT dupsort FROM catalog WHERE name = ?1",
            params![spec.name],
            |row| row.get(0),
        )
        .optional()?;

    match recorded {
        Some(dupsort) if dupsort == spec.dupsort => Ok(()),
        Some(_) => Err(EnvError::LayoutMismatch {
            table: spec.name.to_string(),
        }),
        None => {
            let ddl = if spec.dupsort {
                format!(
                    r#"CREATE TABLE "{}" (
                        key BLOB NOT NULL,
                        val BLOB NOT NULL,
                        PRIMARY KEY (key, val)
                    ) WITHOUT ROWID"#,
                    spec.name
                )
            } else {
                format!(
                    r#"CREATE TABLE "{}" (
                        key BLOB NOT NULL PRIMARY KEY,
                        val BLOB NOT NULL
                    ) WITHOUT ROWID"#,
                    spec.name
                )
            };
            tx.execute_batch(&ddl)?;
            tx.execute(
                "INSERT INTO catalog (name, dupsort, created_at) VALUES (?1, ?2, ?3)",
                params![spec.name, spec.dupsort, now_millis()],
            )?;
            Ok(())
        }
    }
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
