//! Backend traits: the native capabilities every storage engine provides.
//!
//! A backend offers exactly two table layouts:
//! - single: one value per key
//! - dupsort: many values per key, kept in lexicographic byte order
//!
//! Everything richer (insertion order, append logs, replay) is built on top
//! of these in [`crate::tables`] and [`crate::iter`], so it behaves the same
//! on every engine.

use std::path::Path;

use crate::error::Result;

/// A named table in the fixed catalog of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableSpec {
    /// Table name, unique within the catalog.
    pub name: &'static str,
    /// Whether the table keeps sorted duplicate values per key.
    pub dupsort: bool,
}

impl TableSpec {
    /// A table holding one value per key.
    pub const fn single(name: &'static str) -> Self {
        Self {
            name,
            dupsort: false,
        }
    }

    /// A table holding lexicographically sorted duplicates per key.
    pub const fn dups(name: &'static str) -> Self {
        Self {
            name,
            dupsort: true,
        }
    }
}

/// A storage engine with named tables.
///
/// Each call to [`Backend::read`] or [`Backend::write`] starts one short
/// transaction. Only one write transaction is active at a time.
pub trait Backend: Send + Sync {
    /// Begin a read-only transaction against a consistent snapshot.
    fn read(&self) -> Result<Box<dyn ReadTxn + '_>>;

    /// Begin the write transaction, blocking until the writer lock is free.
    fn write(&self) -> Result<Box<dyn WriteTxn + '_>>;

    /// Engine name for logs.
    fn kind(&self) -> &'static str;

    /// Directory holding the engine files.
    fn path(&self) -> &Path;
}

/// Read operations available inside any transaction.
pub trait ReadTxn {
    /// First value at `key`. For dupsort tables this is the smallest duplicate.
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// All duplicates at `key` in lexicographic order.
    fn get_dups(&self, table: &str, key: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// Number of duplicates at `key`.
    fn count_dups(&self, table: &str, key: &[u8]) -> Result<usize>;

    /// Smallest duplicate at `key` strictly greater than `after`, or the
    /// first duplicate when `after` is `None`.
    fn next_dup(&self, table: &str, key: &[u8], after: Option<&[u8]>) -> Result<Option<Vec<u8>>>;

    /// Greatest duplicate at `key`.
    fn last_dup(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// First distinct key at or after `from` (`inclusive`) or strictly after it.
    /// An empty `from` seeks to the start of the table.
    fn seek(&self, table: &str, from: &[u8], inclusive: bool) -> Result<Option<Vec<u8>>>;

    /// Greatest key starting with `prefix`.
    fn last_with_prefix(&self, table: &str, prefix: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Number of entries whose key starts with `prefix`.
    fn count_prefix(&self, table: &str, prefix: &[u8]) -> Result<usize>;
}

/// Write operations. Dropping a write transaction without calling
/// [`WriteTxn::commit`] discards its changes.
pub trait WriteTxn: ReadTxn {
    /// Insert into a single table unless `key` exists. Returns whether inserted.
    fn insert(&mut self, table: &str, key: &[u8], val: &[u8]) -> Result<bool>;

    /// Insert or overwrite in a single table. Returns whether `key` existed.
    fn upsert(&mut self, table: &str, key: &[u8], val: &[u8]) -> Result<bool>;

    /// Add a duplicate unless the exact pair exists. Returns whether added.
    fn insert_dup(&mut self, table: &str, key: &[u8], val: &[u8]) -> Result<bool>;

    /// Remove `key` and all of its values. Returns whether anything was removed.
    fn del(&mut self, table: &str, key: &[u8]) -> Result<bool>;

    /// Remove one duplicate. Returns whether it existed.
    fn del_dup(&mut self, table: &str, key: &[u8], val: &[u8]) -> Result<bool>;

    /// Make the transaction durable.
    fn commit(self: Box<Self>) -> Result<()>;
}
