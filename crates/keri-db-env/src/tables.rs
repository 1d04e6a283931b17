//! Typed views over catalog tables.
//!
//! Every operation runs in its own short transaction; read-modify-write
//! operations (ordered insertion, log append) run entirely inside one write
//! transaction so concurrent writers cannot interleave.

use keri_db_core::{on_key, partition_prefix, split_on_key, strip_proem, with_proem, Ordinal};
use tracing::{debug, warn};

use crate::env::Environment;
use crate::error::{EnvError, Result};
use crate::iter::{BatchIter, DupIter, IoItemsIter, OrdItems, PreItems, PreWalk, Walk};
use crate::traits::{ReadTxn, WriteTxn};

/// A table with one value per key.
#[derive(Clone, Copy)]
pub struct SingleTable<'env> {
    env: &'env Environment,
    name: &'static str,
}

impl<'env> SingleTable<'env> {
    pub(crate) fn new(env: &'env Environment, name: &'static str) -> Self {
        Self { env, name }
    }

    /// Table name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Value at `key`.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        self.env
            .read_with(self.name, false, |txn| txn.get(self.name, key.as_ref()))
    }

    /// Write `val` unless `key` already has a value. Returns whether written.
    pub fn put(&self, key: impl AsRef<[u8]>, val: impl AsRef<[u8]>) -> Result<bool> {
        self.env.write_with(self.name, false, |txn| {
            txn.insert(self.name, key.as_ref(), val.as_ref())
        })
    }

    /// Write `val`, replacing any existing value. Returns whether `key`
    /// existed before.
    pub fn set(&self, key: impl AsRef<[u8]>, val: impl AsRef<[u8]>) -> Result<bool> {
        self.env.write_with(self.name, false, |txn| {
            txn.upsert(self.name, key.as_ref(), val.as_ref())
        })
    }

    /// Remove `key`. Returns whether it existed.
    pub fn del(&self, key: impl AsRef<[u8]>) -> Result<bool> {
        self.env
            .write_with(self.name, false, |txn| txn.del(self.name, key.as_ref()))
    }
}

/// A table with many values per key, kept in lexicographic order.
#[derive(Clone, Copy)]
pub struct DupTable<'env> {
    env: &'env Environment,
    name: &'static str,
}

impl<'env> DupTable<'env> {
    pub(crate) fn new(env: &'env Environment, name: &'static str) -> Self {
        Self { env, name }
    }

    /// Table name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Add every value not already present. Returns whether any was added.
    pub fn put<I, V>(&self, key: impl AsRef<[u8]>, vals: I) -> Result<bool>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        let key = key.as_ref();
        self.env.write_with(self.name, true, |txn| {
            let mut added = false;
            for val in vals {
                added |= txn.insert_dup(self.name, key, val.as_ref())?;
            }
            Ok(added)
        })
    }

    /// Add one value. Returns whether it was new.
    pub fn add(&self, key: impl AsRef<[u8]>, val: impl AsRef<[u8]>) -> Result<bool> {
        self.env.write_with(self.name, true, |txn| {
            txn.insert_dup(self.name, key.as_ref(), val.as_ref())
        })
    }

    /// All values at `key`, smallest first.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Vec<Vec<u8>>> {
        self.env
            .read_with(self.name, true, |txn| txn.get_dups(self.name, key.as_ref()))
    }

    /// Lazily iterate the values at `key`. Deleting yielded values while
    /// iterating is safe.
    pub fn iter(&self, key: impl AsRef<[u8]>) -> DupIter<'env> {
        DupIter::new(self.env, self.name, key.as_ref().to_vec(), false)
    }

    /// Number of values at `key`.
    pub fn count(&self, key: impl AsRef<[u8]>) -> Result<usize> {
        self.env
            .read_with(self.name, true, |txn| txn.count_dups(self.name, key.as_ref()))
    }

    /// Remove `key` and all its values. Returns whether anything was removed.
    pub fn del(&self, key: impl AsRef<[u8]>) -> Result<bool> {
        self.env
            .write_with(self.name, true, |txn| txn.del(self.name, key.as_ref()))
    }

    /// Remove one value. Returns whether it was present.
    pub fn del_val(&self, key: impl AsRef<[u8]>, val: impl AsRef<[u8]>) -> Result<bool> {
        self.env.write_with(self.name, true, |txn| {
            txn.del_dup(self.name, key.as_ref(), val.as_ref())
        })
    }
}

/// A table with many values per key, kept in insertion order.
///
/// Values are stored behind an ordinal proem; callers never see it. The
/// same value is never stored twice under one key.
#[derive(Clone, Copy)]
pub struct IoDupTable<'env> {
    env: &'env Environment,
    name: &'static str,
}

/// Add `val` at `key` behind the next ordinal unless its content is present.
fn add_ordered<T>(txn: &mut T, table: &str, key: &[u8], val: &[u8]) -> Result<bool>
where
    T: WriteTxn + ?Sized,
{
    let mut last = None;
    for dup in txn.get_dups(table, key)? {
        let (n, content) = strip_proem(&dup)?;
        if content == val {
            return Ok(false);
        }
        last = Some(n);
    }
    let next = match last {
        None => 0,
        Some(n) => n.checked_add(1).ok_or(EnvError::OrdinalExhausted)?,
    };
    txn.insert_dup(table, key, &with_proem(next, val))
}

/// Stored bytes (proem included) of the duplicate whose content is `val`.
fn find_ordered<T>(txn: &T, table: &str, key: &[u8], val: &[u8]) -> Result<Option<Vec<u8>>>
where
    T: ReadTxn + ?Sized,
{
    for dup in txn.get_dups(table, key)? {
        if strip_proem(&dup)?.1 == val {
            return Ok(Some(dup));
        }
    }
    Ok(None)
}

pub(crate) fn strip_all(dups: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>> {
    dups.iter()
        .map(|dup| Ok::<_, EnvError>(strip_proem(dup)?.1.to_vec()))
        .collect()
}

impl<'env> IoDupTable<'env> {
    pub(crate) fn new(env: &'env Environment, name: &'static str) -> Self {
        Self { env, name }
    }

    /// Table name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append each value not already present, in the given order. Returns
    /// whether any was added.
    pub fn put<I, V>(&self, key: impl AsRef<[u8]>, vals: I) -> Result<bool>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        let key = key.as_ref();
        self.env.write_with(self.name, true, |txn| {
            let mut added = false;
            for val in vals {
                added |= add_ordered(&mut *txn, self.name, key, val.as_ref())?;
            }
            Ok(added)
        })
    }

    /// Append one value. Returns whether it was new.
    pub fn add(&self, key: impl AsRef<[u8]>, val: impl AsRef<[u8]>) -> Result<bool> {
        self.env.write_with(self.name, true, |txn| {
            add_ordered(txn, self.name, key.as_ref(), val.as_ref())
        })
    }

    /// All values at `key` in insertion order.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Vec<Vec<u8>>> {
        self.env.read_with(self.name, true, |txn| {
            strip_all(txn.get_dups(self.name, key.as_ref())?)
        })
    }

    /// Lazily iterate the values at `key` in insertion order.
    pub fn iter(&self, key: impl AsRef<[u8]>) -> DupIter<'env> {
        DupIter::new(self.env, self.name, key.as_ref().to_vec(), true)
    }

    /// Most recently added value at `key`.
    pub fn last(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        self.env.read_with(self.name, true, |txn| {
            match txn.last_dup(self.name, key.as_ref())? {
                Some(dup) => Ok(Some(strip_proem(&dup)?.1.to_vec())),
                None => Ok(None),
            }
        })
    }

    /// Number of values at `key`.
    pub fn count(&self, key: impl AsRef<[u8]>) -> Result<usize> {
        self.env
            .read_with(self.name, true, |txn| txn.count_dups(self.name, key.as_ref()))
    }

    /// Remove `key` and all its values. Returns whether anything was removed.
    pub fn del(&self, key: impl AsRef<[u8]>) -> Result<bool> {
        self.env
            .write_with(self.name, true, |txn| txn.del(self.name, key.as_ref()))
    }

    /// Remove the value whose content is `val`. Returns whether it was present.
    pub fn del_val(&self, key: impl AsRef<[u8]>, val: impl AsRef<[u8]>) -> Result<bool> {
        let key = key.as_ref();
        self.env.write_with(self.name, true, |txn| {
            match find_ordered(&*txn, self.name, key, val.as_ref())? {
                Some(stored) => txn.del_dup(self.name, key, &stored),
                None => Ok(false),
            }
        })
    }

    /// All `(key, value)` pairs of the first key at or after `key` (strictly
    /// after when `skip`), values in insertion order. Empty when there is no
    /// such key.
    pub fn items_next(&self, key: impl AsRef<[u8]>, skip: bool) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.env.read_with(self.name, true, |txn| {
            let Some(found) = txn.seek(self.name, key.as_ref(), !skip)? else {
                return Ok(Vec::new());
            };
            let vals = strip_all(txn.get_dups(self.name, &found)?)?;
            Ok(vals.into_iter().map(|val| (found.clone(), val)).collect())
        })
    }

    /// Lazy form of [`IoDupTable::items_next`]. Deleting yielded values while
    /// iterating is safe.
    pub fn items_next_iter(&self, key: impl AsRef<[u8]>, skip: bool) -> IoItemsIter<'env> {
        IoItemsIter::new(self.env, self.name, key.as_ref().to_vec(), skip)
    }

    /// Every distinct key from `key` onward with its values in insertion
    /// order, one key per item.
    pub fn batches(&self, key: impl AsRef<[u8]>, skip: bool) -> BatchIter<'env> {
        BatchIter::new(self.env, self.name, key.as_ref().to_vec(), skip)
    }

    /// All values at `sn_key(pre, 0)`, `sn_key(pre, 1)`, ... in order,
    /// stopping at the first sequence number with no values.
    pub fn vals_all_pre_iter(&self, pre: impl AsRef<[u8]>) -> PreWalk<'env> {
        PreWalk::new(self.env, self.name, pre.as_ref().to_vec(), Walk::Dense)
    }

    /// The last-added value at each of `sn_key(pre, 0)`, `sn_key(pre, 1)`,
    /// ... stopping at the first gap.
    pub fn last_all_pre_iter(&self, pre: impl AsRef<[u8]>) -> PreWalk<'env> {
        PreWalk::new(self.env, self.name, pre.as_ref().to_vec(), Walk::DenseLast)
    }

    /// All values at every key of `pre` in key order, skipping gaps.
    pub fn vals_any_pre_iter(&self, pre: impl AsRef<[u8]>) -> PreWalk<'env> {
        PreWalk::new(self.env, self.name, pre.as_ref().to_vec(), Walk::Sparse)
    }
}

/// An append-only log keyed by `(prefix, ordinal)`.
///
/// [`OrdLog::append`] assigns the next ordinal under a prefix; the rest of
/// the single-table API is available for maintenance.
#[derive(Clone, Copy)]
pub struct OrdLog<'env> {
    table: SingleTable<'env>,
}

impl<'env> OrdLog<'env> {
    pub(crate) fn new(env: &'env Environment, name: &'static str) -> Self {
        Self {
            table: SingleTable::new(env, name),
        }
    }

    /// Table name.
    pub fn name(&self) -> &'static str {
        self.table.name
    }

    /// Append `val` under `pre` and return its ordinal: one past the greatest
    /// ordinal already used under `pre`, or zero for a new prefix.
    pub fn append(&self, pre: impl AsRef<[u8]>, val: impl AsRef<[u8]>) -> Result<Ordinal> {
        let pre = pre.as_ref();
        let name = self.table.name;
        let on = self.table.env.write_with(name, false, |txn| {
            let next = match txn.last_with_prefix(name, &partition_prefix(pre))? {
                None => 0,
                Some(last) => split_on_key(&last)?
                    .1
                    .checked_add(1)
                    .ok_or(EnvError::OrdinalExhausted)?,
            };
            let key = on_key(pre, next);
            if !txn.insert(name, &key, val.as_ref())? {
                warn!(table = name, on = %next, "append slot already taken");
                return Err(EnvError::Corrupt(format!(
                    "ordinal {} of {} already in {}",
                    next,
                    String::from_utf8_lossy(pre),
                    name
                )));
            }
            Ok(next)
        })?;
        debug!(table = name, on = %on, "appended");
        Ok(on)
    }

    /// Number of entries under `pre`.
    pub fn count_pre(&self, pre: impl AsRef<[u8]>) -> Result<usize> {
        let name = self.table.name;
        self.table.env.read_with(name, false, |txn| {
            txn.count_prefix(name, &partition_prefix(pre.as_ref()))
        })
    }

    /// Value at `key`.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        self.table.get(key)
    }

    /// Write `val` unless `key` already has a value.
    pub fn put(&self, key: impl AsRef<[u8]>, val: impl AsRef<[u8]>) -> Result<bool> {
        self.table.put(key, val)
    }

    /// Write `val`, replacing any existing value.
    pub fn set(&self, key: impl AsRef<[u8]>, val: impl AsRef<[u8]>) -> Result<bool> {
        self.table.set(key, val)
    }

    /// Remove `key`.
    pub fn del(&self, key: impl AsRef<[u8]>) -> Result<bool> {
        self.table.del(key)
    }

    /// `(ordinal, value)` entries of `pre` from ordinal `on` onward.
    pub fn items_pre(&self, pre: impl AsRef<[u8]>, on: Ordinal) -> PreItems<'env> {
        let pre = pre.as_ref();
        PreItems::new(OrdItems::new(
            self.table.env,
            self.table.name,
            on_key(pre, on),
            true,
            Some(partition_prefix(pre)),
        ))
    }

    /// `(prefix, ordinal, value)` entries of every prefix, starting at
    /// `resume` (or strictly after it when `skip`). An empty `resume` starts
    /// at the beginning.
    pub fn items_all(&self, resume: impl AsRef<[u8]>, skip: bool) -> OrdItems<'env> {
        OrdItems::new(
            self.table.env,
            self.table.name,
            resume.as_ref().to_vec(),
            !skip,
            None,
        )
    }
}
