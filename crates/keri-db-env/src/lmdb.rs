//! LMDB implementation of the backend traits.
//!
//! This is the primary engine: memory-mapped, one named database per table,
//! `DUP_SORT` for multi-valued tables. Cursor positioning uses the raw
//! `MDB_*` operations so that every lookup is a single seek.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use keri_db_core::prefix_successor;
use lmdb::{
    Cursor, Database, DatabaseFlags, Environment, EnvironmentFlags, RwTransaction, Transaction,
    WriteFlags,
};
use lmdb_sys as ffi;
use tracing::debug;

use crate::config::{EnvConfig, SyncMode};
use crate::error::{EnvError, Result};
use crate::traits::{Backend, ReadTxn, TableSpec, WriteTxn};

/// LMDB-backed storage engine.
pub struct LmdbBackend {
    env: Environment,
    dbs: HashMap<&'static str, Database>,
    path: PathBuf,
}

impl LmdbBackend {
    /// Open (creating if needed) the LMDB environment at `path` and every
    /// table of `catalog`.
    pub fn open(path: &Path, catalog: &[TableSpec], config: &EnvConfig) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let mut builder = Environment::new();
        builder.set_max_dbs(config.max_dbs.max(catalog.len() as u32));
        builder.set_map_size(config.map_size);
        builder.set_max_readers(config.max_readers);

        let mut flags = EnvironmentFlags::empty();
        match config.sync_mode {
            SyncMode::Full => {}
            SyncMode::NoMetaSync => flags.insert(EnvironmentFlags::NO_META_SYNC),
            SyncMode::NoSync => flags.insert(EnvironmentFlags::NO_SYNC),
        }
        builder.set_flags(flags);

        let env = builder.open(path)?;

        let mut dbs = HashMap::with_capacity(catalog.len());
        for spec in catalog {
            let flags = if spec.dupsort {
                DatabaseFlags::DUP_SORT
            } else {
                DatabaseFlags::empty()
            };
            let db = env.create_db(Some(spec.name), flags).map_err(|e| match e {
                lmdb::Error::Incompatible => EnvError::LayoutMismatch {
                    table: spec.name.to_string(),
                },
                other => EnvError::Lmdb(other),
            })?;
            dbs.insert(spec.name, db);
        }

        debug!(path = %path.display(), tables = dbs.len(), "opened lmdb environment");

        Ok(Self {
            env,
            dbs,
            path: path.to_path_buf(),
        })
    }
}

impl Backend for LmdbBackend {
    fn read(&self) -> Result<Box<dyn ReadTxn + '_>> {
        Ok(Box::new(LmdbTxn {
            txn: self.env.begin_ro_txn()?,
            dbs: &self.dbs,
        }))
    }

    fn write(&self) -> Result<Box<dyn WriteTxn + '_>> {
        Ok(Box::new(LmdbTxn {
            txn: self.env.begin_rw_txn()?,
            dbs: &self.dbs,
        }))
    }

    fn kind(&self) -> &'static str {
        "lmdb"
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// A read or write transaction plus the table handles it may touch.
struct LmdbTxn<'env, T> {
    txn: T,
    dbs: &'env HashMap<&'static str, Database>,
}

/// Map `NotFound` to `None`.
fn found<V>(res: lmdb::Result<V>) -> Result<Option<V>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(lmdb::Error::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl<T: Transaction> LmdbTxn<'_, T> {
    fn db(&self, table: &str) -> Result<Database> {
        self.dbs
            .get(table)
            .copied()
            .ok_or_else(|| EnvError::UnknownTable(table.to_string()))
    }
}

impl<T: Transaction> ReadTxn for LmdbTxn<'_, T> {
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let db = self.db(table)?;
        Ok(found(self.txn.get(db, &key))?.map(<[u8]>::to_vec))
    }

    fn get_dups(&self, table: &str, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cursor = self.txn.open_ro_cursor(self.db(table)?)?;
        let mut vals = Vec::new();
        let mut next = found(cursor.get(Some(key), None, ffi::MDB_SET_KEY))?;
        while let Some((_, val)) = next {
            vals.push(val.to_vec());
            next = found(cursor.get(None, None, ffi::MDB_NEXT_DUP))?;
        }
        Ok(vals)
    }

    fn count_dups(&self, table: &str, key: &[u8]) -> Result<usize> {
        let cursor = self.txn.open_ro_cursor(self.db(table)?)?;
        let mut count = 0;
        let mut next = found(cursor.get(Some(key), None, ffi::MDB_SET_KEY))?;
        while next.is_some() {
            count += 1;
            next = found(cursor.get(None, None, ffi::MDB_NEXT_DUP))?;
        }
        Ok(count)
    }

    fn next_dup(&self, table: &str, key: &[u8], after: Option<&[u8]>) -> Result<Option<Vec<u8>>> {
        let cursor = self.txn.open_ro_cursor(self.db(table)?)?;
        let Some(after) = after else {
            let first = found(cursor.get(Some(key), None, ffi::MDB_SET_KEY))?;
            return Ok(first.map(|(_, val)| val.to_vec()));
        };
        // first duplicate >= after, then step past an exact match
        match found(cursor.get(Some(key), Some(after), ffi::MDB_GET_BOTH_RANGE))? {
            None => Ok(None),
            Some((_, val)) if val == after => {
                let next = found(cursor.get(None, None, ffi::MDB_NEXT_DUP))?;
                Ok(next.map(|(_, val)| val.to_vec()))
            }
            Some((_, val)) => Ok(Some(val.to_vec())),
        }
    }

    fn last_dup(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cursor = self.txn.open_ro_cursor(self.db(table)?)?;
        if found(cursor.get(Some(key), None, ffi::MDB_SET_KEY))?.is_none() {
            return Ok(None);
        }
        let last = found(cursor.get(None, None, ffi::MDB_LAST_DUP))?;
        Ok(last.map(|(_, val)| val.to_vec()))
    }

    fn seek(&self, table: &str, from: &[u8], inclusive: bool) -> Result<Option<Vec<u8>>> {
        let cursor = self.txn.open_ro_cursor(self.db(table)?)?;
        // zero-length keys are invalid for MDB_SET_RANGE
        let first = if from.is_empty() {
            found(cursor.get(None, None, ffi::MDB_FIRST))?
        } else {
            found(cursor.get(Some(from), None, ffi::MDB_SET_RANGE))?
        };
        let Some((key, _)) = first else {
            return Ok(None);
        };
        let key = key.unwrap_or(from);
        if inclusive || key != from {
            return Ok(Some(key.to_vec()));
        }
        let next = found(cursor.get(None, None, ffi::MDB_NEXT_NODUP))?;
        Ok(next.and_then(|(key, _)| key).map(<[u8]>::to_vec))
    }

    fn last_with_prefix(&self, table: &str, prefix: &[u8]) -> Result<Option<Vec<u8>>> {
        let cursor = self.txn.open_ro_cursor(self.db(table)?)?;
        let last = match prefix_successor(prefix) {
            Some(end) => match found(cursor.get(Some(end.as_slice()), None, ffi::MDB_SET_RANGE))? {
                Some(_) => found(cursor.get(None, None, ffi::MDB_PREV))?,
                None => found(cursor.get(None, None, ffi::MDB_LAST))?,
            },
            None => found(cursor.get(None, None, ffi::MDB_LAST))?,
        };
        Ok(last
            .and_then(|(key, _)| key)
            .filter(|key| key.starts_with(prefix))
            .map(<[u8]>::to_vec))
    }

    fn count_prefix(&self, table: &str, prefix: &[u8]) -> Result<usize> {
        let cursor = self.txn.open_ro_cursor(self.db(table)?)?;
        let mut next = if prefix.is_empty() {
            found(cursor.get(None, None, ffi::MDB_FIRST))?
        } else {
            found(cursor.get(Some(prefix), None, ffi::MDB_SET_RANGE))?
        };
        let mut count = 0;
        while let Some((key, _)) = next {
            match key {
                Some(key) if key.starts_with(prefix) => count += 1,
                _ => break,
            }
            next = found(cursor.get(None, None, ffi::MDB_NEXT))?;
        }
        Ok(count)
    }
}

impl WriteTxn for LmdbTxn<'_, RwTransaction<'_>> {
    fn insert(&mut self, table: &str, key: &[u8], val: &[u8]) -> Result<bool> {
        let db = self.db(table)?;
        match self.txn.put(db, &key, &val, WriteFlags::NO_OVERWRITE) {
            Ok(()) => Ok(true),
            Err(lmdb::Error::KeyExist) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn upsert(&mut self, table: &str, key: &[u8], val: &[u8]) -> Result<bool> {
        let existed = self.get(table, key)?.is_some();
        let db = self.db(table)?;
        self.txn.put(db, &key, &val, WriteFlags::empty())?;
        Ok(existed)
    }

    fn insert_dup(&mut self, table: &str, key: &[u8], val: &[u8]) -> Result<bool> {
        let db = self.db(table)?;
        match self.txn.put(db, &key, &val, WriteFlags::NO_DUP_DATA) {
            Ok(()) => Ok(true),
            Err(lmdb::Error::KeyExist) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn del(&mut self, table: &str, key: &[u8]) -> Result<bool> {
        let db = self.db(table)?;
        Ok(found(self.txn.del(db, &key, None))?.is_some())
    }

    fn del_dup(&mut self, table: &str, key: &[u8], val: &[u8]) -> Result<bool> {
        let db = self.db(table)?;
        Ok(found(self.txn.del(db, &key, Some(val)))?.is_some())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.txn.commit()?;
        Ok(())
    }
}
