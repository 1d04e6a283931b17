//! Composite key codec.
//!
//! Keys are `pre || sep || suffix` where `pre` never contains either
//! separator. Splitting therefore insists on exactly one separator, which
//! also rejects keys built by nesting one composite key inside another.

use chrono::{DateTime, FixedOffset};

use crate::error::{KeyError, Result};
use crate::time::from_iso8601;

/// Sequence numbers and ordinals: 32 hex digits cap them at `2^128 - 1`.
pub type Ordinal = u128;

/// Number of hex digits in an encoded ordinal.
pub const ORDINAL_WIDTH: usize = 32;

/// Separator for sn, on and digest keys.
pub const DOT: u8 = b'.';

/// Separator for datetime keys.
pub const PIPE: u8 = b'|';

/// Length of the insertion-order proem: ordinal digits plus a trailing dot.
pub const PROEM_LEN: usize = ORDINAL_WIDTH + 1;

fn join(pre: &[u8], sep: u8, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(pre.len() + 1 + suffix.len());
    key.extend_from_slice(pre);
    key.push(sep);
    key.extend_from_slice(suffix);
    key
}

fn encode_ordinal(n: Ordinal) -> String {
    format!("{:032x}", n)
}

/// `pre . %032x(n)`, the shared layout of sn and on keys.
pub fn seq_key(pre: impl AsRef<[u8]>, n: Ordinal) -> Vec<u8> {
    join(pre.as_ref(), DOT, encode_ordinal(n).as_bytes())
}

/// Key of an identifier's event at sequence number `sn`.
pub fn sn_key(pre: impl AsRef<[u8]>, sn: Ordinal) -> Vec<u8> {
    seq_key(pre, sn)
}

/// Key of an entry at ordinal `on` of an append log.
pub fn on_key(pre: impl AsRef<[u8]>, on: Ordinal) -> Vec<u8> {
    seq_key(pre, on)
}

/// `pre . dig`
pub fn dg_key(pre: impl AsRef<[u8]>, dig: impl AsRef<[u8]>) -> Vec<u8> {
    join(pre.as_ref(), DOT, dig.as_ref())
}

/// `pre | dts`
pub fn dt_key(pre: impl AsRef<[u8]>, dts: impl AsRef<[u8]>) -> Vec<u8> {
    join(pre.as_ref(), PIPE, dts.as_ref())
}

/// Split `key` at its single `sep` byte.
pub fn split_key<K>(key: &K, sep: u8) -> Result<(&[u8], &[u8])>
where
    K: AsRef<[u8]> + ?Sized,
{
    let key = key.as_ref();
    let found = key.iter().filter(|b| **b == sep).count();
    if found != 1 {
        return Err(KeyError::Separator {
            sep: sep as char,
            found,
        });
    }
    // exactly one occurrence
    let at = key.iter().position(|b| *b == sep).unwrap_or(0);
    Ok((&key[..at], &key[at + 1..]))
}

fn parse_ordinal(digits: &[u8]) -> Result<Ordinal> {
    if digits.len() != ORDINAL_WIDTH {
        return Err(KeyError::OrdinalWidth {
            expected: ORDINAL_WIDTH,
            got: digits.len(),
        });
    }
    let text = std::str::from_utf8(digits)?;
    if !text.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
        return Err(KeyError::NotAnOrdinal(text.to_string()));
    }
    Ordinal::from_str_radix(text, 16).map_err(|_| KeyError::NotAnOrdinal(text.to_string()))
}

/// Split an sn key into prefix and sequence number.
pub fn split_sn_key<K>(key: &K) -> Result<(&[u8], Ordinal)>
where
    K: AsRef<[u8]> + ?Sized,
{
    let (pre, suffix) = split_key(key, DOT)?;
    Ok((pre, parse_ordinal(suffix)?))
}

/// Split an on key into prefix and ordinal.
pub fn split_on_key<K>(key: &K) -> Result<(&[u8], Ordinal)>
where
    K: AsRef<[u8]> + ?Sized,
{
    split_sn_key(key)
}

/// Split a datetime key into prefix and parsed timestamp.
pub fn split_dt_key<K>(key: &K) -> Result<(&[u8], DateTime<FixedOffset>)>
where
    K: AsRef<[u8]> + ?Sized,
{
    let (pre, dts) = split_key(key, PIPE)?;
    Ok((pre, from_iso8601(std::str::from_utf8(dts)?)?))
}

/// Range prefix covering every sn/on/digest key of `pre`.
pub fn partition_prefix(pre: impl AsRef<[u8]>) -> Vec<u8> {
    join(pre.as_ref(), DOT, &[])
}

/// Smallest byte string greater than every string starting with `prefix`.
///
/// `None` when no such bound exists (empty or all `0xff`).
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// Ordinal proem stored in front of insertion-ordered duplicates.
pub fn ordinal_proem(n: Ordinal) -> Vec<u8> {
    let mut proem = encode_ordinal(n).into_bytes();
    proem.push(DOT);
    proem
}

/// `proem(n) || val`
pub fn with_proem(n: Ordinal, val: &[u8]) -> Vec<u8> {
    let mut out = ordinal_proem(n);
    out.extend_from_slice(val);
    out
}

/// Split a stored duplicate into its ordinal and caller-visible value.
pub fn strip_proem(val: &[u8]) -> Result<(Ordinal, &[u8])> {
    if val.len() < PROEM_LEN || val[ORDINAL_WIDTH] != DOT {
        return Err(KeyError::Proem(val.len()));
    }
    let n = parse_ordinal(&val[..ORDINAL_WIDTH])?;
    Ok((n, &val[PROEM_LEN..]))
}
