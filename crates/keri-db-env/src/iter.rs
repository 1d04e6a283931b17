//! Lazy, resumable iterators over table contents.
//!
//! No iterator holds a transaction between items. Each step opens a short
//! read transaction and re-seeks just past the last position it yielded, so
//! callers may write to (and delete from) the table while iterating, and a
//! long replay never pins an old snapshot.

use std::collections::VecDeque;

use keri_db_core::{partition_prefix, sn_key, split_on_key, strip_proem, Ordinal};

use crate::env::Environment;
use crate::error::{EnvError, Result};
use crate::tables::strip_all;

/// Values at one key of a dupsort table.
///
/// For insertion-ordered tables the proem is stripped from each item.
pub struct DupIter<'env> {
    env: &'env Environment,
    table: &'static str,
    key: Vec<u8>,
    ordered: bool,
    // last stored value yielded, proem included
    last: Option<Vec<u8>>,
    done: bool,
}

impl<'env> DupIter<'env> {
    pub(crate) fn new(env: &'env Environment, table: &'static str, key: Vec<u8>, ordered: bool) -> Self {
        Self {
            env,
            table,
            key,
            ordered,
            last: None,
            done: false,
        }
    }

    fn step(&mut self) -> Result<Option<Vec<u8>>> {
        let next = self.env.read_with(self.table, true, |txn| {
            txn.next_dup(self.table, &self.key, self.last.as_deref())
        })?;
        let Some(stored) = next else {
            return Ok(None);
        };
        let item = if self.ordered {
            strip_proem(&stored)?.1.to_vec()
        } else {
            stored.clone()
        };
        self.last = Some(stored);
        Ok(Some(item))
    }
}

impl Iterator for DupIter<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// `(key, value)` pairs of the first key at or after a starting key, values
/// in insertion order.
pub struct IoItemsIter<'env> {
    env: &'env Environment,
    table: &'static str,
    from: Vec<u8>,
    skip: bool,
    // resolved on the first step
    vals: Option<(Vec<u8>, DupIter<'env>)>,
    done: bool,
}

impl<'env> IoItemsIter<'env> {
    pub(crate) fn new(env: &'env Environment, table: &'static str, from: Vec<u8>, skip: bool) -> Self {
        Self {
            env,
            table,
            from,
            skip,
            vals: None,
            done: false,
        }
    }

    fn step(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        if self.vals.is_none() {
            let found = self.env.read_with(self.table, true, |txn| {
                txn.seek(self.table, &self.from, !self.skip)
            })?;
            let Some(key) = found else {
                return Ok(None);
            };
            let iter = DupIter::new(self.env, self.table, key.clone(), true);
            self.vals = Some((key, iter));
        }
        let Some((key, iter)) = self.vals.as_mut() else {
            return Ok(None);
        };
        match iter.next() {
            Some(val) => Ok(Some((key.clone(), val?))),
            None => Ok(None),
        }
    }
}

impl Iterator for IoItemsIter<'_> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Every distinct key from a starting key onward, each with all its values
/// in insertion order.
pub struct BatchIter<'env> {
    env: &'env Environment,
    table: &'static str,
    from: Vec<u8>,
    inclusive: bool,
    done: bool,
}

impl<'env> BatchIter<'env> {
    pub(crate) fn new(env: &'env Environment, table: &'static str, from: Vec<u8>, skip: bool) -> Self {
        Self {
            env,
            table,
            from,
            inclusive: !skip,
            done: false,
        }
    }

    fn step(&mut self) -> Result<Option<(Vec<u8>, Vec<Vec<u8>>)>> {
        let batch = self.env.read_with(self.table, true, |txn| {
            match txn.seek(self.table, &self.from, self.inclusive)? {
                Some(key) => {
                    let vals = strip_all(txn.get_dups(self.table, &key)?)?;
                    Ok(Some((key, vals)))
                }
                None => Ok(None),
            }
        })?;
        if let Some((key, _)) = &batch {
            self.from = key.clone();
            self.inclusive = false;
        }
        Ok(batch)
    }
}

impl Iterator for BatchIter<'_> {
    type Item = Result<(Vec<u8>, Vec<Vec<u8>>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// How a [`PreWalk`] moves through the keys of one prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Every value at sn 0, 1, 2, ... until the first empty sn.
    Dense,
    /// The last value at sn 0, 1, 2, ... until the first empty sn.
    DenseLast,
    /// Every value at every key of the prefix, skipping gaps.
    Sparse,
}

/// Values under one identifier prefix of an insertion-ordered table.
pub struct PreWalk<'env> {
    env: &'env Environment,
    table: &'static str,
    pre: Vec<u8>,
    walk: Walk,
    sn: Ordinal,
    // sparse walk position: last key read
    cursor: Option<Vec<u8>>,
    pending: VecDeque<Vec<u8>>,
    done: bool,
}

impl<'env> PreWalk<'env> {
    pub(crate) fn new(env: &'env Environment, table: &'static str, pre: Vec<u8>, walk: Walk) -> Self {
        Self {
            env,
            table,
            pre,
            walk,
            sn: 0,
            cursor: None,
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Load the values of the next key into `pending`. Returns false at the end.
    fn fill(&mut self) -> Result<bool> {
        match self.walk {
            Walk::Dense | Walk::DenseLast => {
                let key = sn_key(&self.pre, self.sn);
                let dups = self
                    .env
                    .read_with(self.table, true, |txn| txn.get_dups(self.table, &key))?;
                if dups.is_empty() {
                    return Ok(false);
                }
                let mut vals = strip_all(dups)?;
                if self.walk == Walk::DenseLast {
                    vals = vals.pop().into_iter().collect();
                }
                self.pending.extend(vals);
                self.sn = self.sn.checked_add(1).ok_or(EnvError::OrdinalExhausted)?;
                Ok(true)
            }
            Walk::Sparse => {
                let prefix = partition_prefix(&self.pre);
                let (from, inclusive) = match &self.cursor {
                    Some(last) => (last.clone(), false),
                    None => (prefix.clone(), true),
                };
                let batch = self.env.read_with(self.table, true, |txn| {
                    match txn.seek(self.table, &from, inclusive)? {
                        Some(key) if key.starts_with(&prefix) => {
                            let vals = strip_all(txn.get_dups(self.table, &key)?)?;
                            Ok(Some((key, vals)))
                        }
                        _ => Ok(None),
                    }
                })?;
                match batch {
                    Some((key, vals)) => {
                        self.cursor = Some(key);
                        self.pending.extend(vals);
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }
}

impl Iterator for PreWalk<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(val) = self.pending.pop_front() {
                return Some(Ok(val));
            }
            if self.done {
                return None;
            }
            match self.fill() {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// `(prefix, ordinal, value)` entries of an ordinal log in key order.
pub struct OrdItems<'env> {
    env: &'env Environment,
    table: &'static str,
    from: Vec<u8>,
    inclusive: bool,
    prefix: Option<Vec<u8>>,
    done: bool,
}

impl<'env> OrdItems<'env> {
    pub(crate) fn new(
        env: &'env Environment,
        table: &'static str,
        from: Vec<u8>,
        inclusive: bool,
        prefix: Option<Vec<u8>>,
    ) -> Self {
        Self {
            env,
            table,
            from,
            inclusive,
            prefix,
            done: false,
        }
    }

    fn step(&mut self) -> Result<Option<(Vec<u8>, Ordinal, Vec<u8>)>> {
        let entry = self.env.read_with(self.table, false, |txn| {
            let Some(key) = txn.seek(self.table, &self.from, self.inclusive)? else {
                return Ok(None);
            };
            if let Some(prefix) = &self.prefix {
                if !key.starts_with(prefix) {
                    return Ok(None);
                }
            }
            let val = txn.get(self.table, &key)?.ok_or_else(|| {
                EnvError::Corrupt(format!("{} lost key during seek", self.table))
            })?;
            Ok(Some((key, val)))
        })?;
        let Some((key, val)) = entry else {
            return Ok(None);
        };
        let (pre, on) = split_on_key(&key)?;
        let item = (pre.to_vec(), on, val);
        self.from = key;
        self.inclusive = false;
        Ok(Some(item))
    }
}

impl Iterator for OrdItems<'_> {
    type Item = Result<(Vec<u8>, Ordinal, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// `(ordinal, value)` entries of one prefix of an ordinal log.
pub struct PreItems<'env> {
    inner: OrdItems<'env>,
}

impl<'env> PreItems<'env> {
    pub(crate) fn new(inner: OrdItems<'env>) -> Self {
        Self { inner }
    }
}

impl Iterator for PreItems<'_> {
    type Item = Result<(Ordinal, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|item| item.map(|(_, on, val)| (on, val)))
    }
}
