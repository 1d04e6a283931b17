//! SQLite implementation of the backend traits.
//!
//! Each catalog table is a `WITHOUT ROWID` table keyed on `key` (single) or
//! `(key, val)` (dupsort). BLOB comparison in SQLite is memcmp, so ordering
//! matches LMDB byte for byte.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use keri_db_core::prefix_successor;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::config::{EnvConfig, SyncMode};
use crate::error::{EnvError, Result};
use crate::migration;
use crate::traits::{Backend, ReadTxn, TableSpec, WriteTxn};

/// SQLite-backed storage engine.
///
/// Thread-safe via an internal Mutex; a transaction holds the lock for its
/// whole lifetime.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    tables: HashSet<&'static str>,
    path: PathBuf,
}

impl SqliteBackend {
    /// Database file name inside the environment directory.
    pub const FILE_NAME: &'static str = "store.sqlite3";

    /// Open (creating if needed) the database in `path` and migrate it to
    /// hold every table of `catalog`.
    pub fn open(path: &Path, catalog: &[TableSpec], config: &EnvConfig) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let mut conn = Connection::open(path.join(Self::FILE_NAME))?;

        let synchronous = match config.sync_mode {
            SyncMode::Full => "FULL",
            SyncMode::NoMetaSync => "NORMAL",
            SyncMode::NoSync => "OFF",
        };
        conn.execute_batch(&format!("PRAGMA synchronous = {}", synchronous))?;

        migration::migrate(&mut conn, catalog)?;

        debug!(path = %path.display(), tables = catalog.len(), "opened sqlite environment");

        Ok(Self {
            conn: Mutex::new(conn),
            tables: catalog.iter().map(|spec| spec.name).collect(),
            path: path.to_path_buf(),
        })
    }

    fn begin(&self, sql: &str) -> Result<SqliteTxn<'_>> {
        let conn = self.conn.lock().map_err(|_| EnvError::Poisoned)?;
        conn.execute_batch(sql)?;
        Ok(SqliteTxn {
            conn,
            tables: &self.tables,
            open: true,
        })
    }
}

impl Backend for SqliteBackend {
    fn read(&self) -> Result<Box<dyn ReadTxn + '_>> {
        Ok(Box::new(self.begin("BEGIN DEFERRED")?))
    }

    fn write(&self) -> Result<Box<dyn WriteTxn + '_>> {
        Ok(Box::new(self.begin("BEGIN IMMEDIATE")?))
    }

    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// A transaction on the locked connection. Rolled back on drop unless
/// committed.
struct SqliteTxn<'a> {
    conn: MutexGuard<'a, Connection>,
    tables: &'a HashSet<&'static str>,
    open: bool,
}

impl SqliteTxn<'_> {
    /// Only names from the catalog ever reach the SQL text.
    fn table<'t>(&self, table: &'t str) -> Result<&'t str> {
        if self.tables.contains(table) {
            Ok(table)
        } else {
            Err(EnvError::UnknownTable(table.to_string()))
        }
    }

    fn query_val(&self, sql: &str, key: &[u8], arg: Option<&[u8]>) -> Result<Option<Vec<u8>>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let row = match arg {
            Some(arg) => stmt.query_row(params![key, arg], |row| row.get(0)),
            None => stmt.query_row(params![key], |row| row.get(0)),
        };
        Ok(row.optional()?)
    }

    fn query_count(&self, sql: &str, key: &[u8], arg: Option<&[u8]>) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let count: i64 = match arg {
            Some(arg) => stmt.query_row(params![key, arg], |row| row.get(0))?,
            None => stmt.query_row(params![key], |row| row.get(0))?,
        };
        Ok(count as usize)
    }
}

impl Drop for SqliteTxn<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "rollback failed");
            }
        }
    }
}

impl ReadTxn for SqliteTxn<'_> {
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let t = self.table(table)?;
        self.query_val(
            &format!(r#"SELECT val FROM "{t}" WHERE key = ?1 ORDER BY val LIMIT 1"#),
            key,
            None,
        )
    }

    fn get_dups(&self, table: &str, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        let t = self.table(table)?;
        let mut stmt = self
            .conn
            .prepare_cached(&format!(r#"SELECT val FROM "{t}" WHERE key = ?1 ORDER BY val"#))?;
        let vals = stmt
            .query_map(params![key], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<Vec<u8>>>>()?;
        Ok(vals)
    }

    fn count_dups(&self, table: &str, key: &[u8]) -> Result<usize> {
        let t = self.table(table)?;
        self.query_count(
            &format!(r#"SELECT COUNT(*) FROM "{t}" WHERE key = ?1"#),
            key,
            None,
        )
    }

    fn next_dup(&self, table: &str, key: &[u8], after: Option<&[u8]>) -> Result<Option<Vec<u8>>> {
        let t = self.table(table)?;
        match after {
            None => self.get(table, key),
            Some(after) => self.query_val(
                &format!(
                    r#"SELECT val FROM "{t}" WHERE key = ?1 AND val > ?2 ORDER BY val LIMIT 1"#
                ),
                key,
                Some(after),
            ),
        }
    }

    fn last_dup(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let t = self.table(table)?;
        self.query_val(
            &format!(r#"SELECT val FROM "{t}" WHERE key = ?1 ORDER BY val DESC LIMIT 1"#),
            key,
            None,
        )
    }

    fn seek(&self, table: &str, from: &[u8], inclusive: bool) -> Result<Option<Vec<u8>>> {
        let t = self.table(table)?;
        let op = if inclusive { ">=" } else { ">" };
        self.query_val(
            &format!(r#"SELECT key FROM "{t}" WHERE key {op} ?1 ORDER BY key LIMIT 1"#),
            from,
            None,
        )
    }

    fn last_with_prefix(&self, table: &str, prefix: &[u8]) -> Result<Option<Vec<u8>>> {
        let t = self.table(table)?;
        let last = match prefix_successor(prefix) {
            Some(end) => self.query_val(
                &format!(
                    r#"SELECT key FROM "{t}" WHERE key >= ?1 AND key < ?2 ORDER BY key DESC LIMIT 1"#
                ),
                prefix,
                Some(end.as_slice()),
            )?,
            None => self.query_val(
                &format!(r#"SELECT key FROM "{t}" WHERE key >= ?1 ORDER BY key DESC LIMIT 1"#),
                prefix,
                None,
            )?,
        };
        Ok(last)
    }

    fn count_prefix(&self, table: &str, prefix: &[u8]) -> Result<usize> {
        let t = self.table(table)?;
        match prefix_successor(prefix) {
            Some(end) => self.query_count(
                &format!(r#"SELECT COUNT(*) FROM "{t}" WHERE key >= ?1 AND key < ?2"#),
                prefix,
                Some(end.as_slice()),
            ),
            None => self.query_count(
                &format!(r#"SELECT COUNT(*) FROM "{t}" WHERE key >= ?1"#),
                prefix,
                None,
            ),
        }
    }
}

impl WriteTxn for SqliteTxn<'_> {
    fn insert(&mut self, table: &str, key: &[u8], val: &[u8]) -> Result<bool> {
        let t = self.table(table)?;
        let n = self.conn.execute(
            &format!(r#"INSERT OR IGNORE INTO "{t}" (key, val) VALUES (?1, ?2)"#),
            params![key, val],
        )?;
        Ok(n == 1)
    }

    fn upsert(&mut self, table: &str, key: &[u8], val: &[u8]) -> Result<bool> {
        let t = self.table(table)?;
        let existed = self.get(table, key)?.is_some();
        self.conn.execute(
            &format!(
                r#"INSERT INTO "{t}" (key, val) VALUES (?1, ?2)
                   ON CONFLICT(key) DO UPDATE SET val = excluded.val"#
            ),
            params![key, val],
        )?;
        Ok(existed)
    }

    fn insert_dup(&mut self, table: &str, key: &[u8], val: &[u8]) -> Result<bool> {
        self.insert(table, key, val)
    }

    fn del(&mut self, table: &str, key: &[u8]) -> Result<bool> {
        let t = self.table(table)?;
        let n = self
            .conn
            .execute(&format!(r#"DELETE FROM "{t}" WHERE key = ?1"#), params![key])?;
        Ok(n > 0)
    }

    fn del_dup(&mut self, table: &str, key: &[u8], val: &[u8]) -> Result<bool> {
        let t = self.table(table)?;
        let n = self.conn.execute(
            &format!(r#"DELETE FROM "{t}" WHERE key = ?1 AND val = ?2"#),
            params![key, val],
        )?;
        Ok(n > 0)
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.open = false;
        Ok(())
    }
}
