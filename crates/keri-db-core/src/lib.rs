//! # KERI DB Core
//!
//! Pure key codec for the KERI event store.
//!
//! This crate contains no I/O and no storage. It turns identifier prefixes,
//! sequence numbers, ordinals, digests and timestamps into byte-comparable
//! composite keys, and back.
//!
//! ## Key Formats
//!
//! | key | layout |
//! |-----|--------|
//! | sn / on key | `pre . %032x` |
//! | digest key | `pre . dig` |
//! | datetime key | `pre \| dts` |
//!
//! Ordinals are fixed-width lowercase hex so that lexicographic byte order
//! equals numeric order. Every component accepts `impl AsRef<[u8]>`, so text
//! and raw bytes produce identical keys.
//!
//! ```rust
//! use keri_db_core::keys::{sn_key, split_sn_key};
//!
//! let key = sn_key("BWzwEHHzq7K0gzQPYGGwTmuupUhPx5_yZ-Wk1x4ejhcc", 3);
//! let (pre, sn) = split_sn_key(&key).unwrap();
//! assert_eq!(pre, b"BWzwEHHzq7K0gzQPYGGwTmuupUhPx5_yZ-Wk1x4ejhcc");
//! assert_eq!(sn, 3);
//! ```

pub mod error;
pub mod keys;
pub mod time;

pub use error::{KeyError, Result};
pub use keys::{
    dg_key, dt_key, on_key, ordinal_proem, partition_prefix, prefix_successor, seq_key, sn_key,
    split_dt_key, split_key, split_on_key, split_sn_key, strip_proem, with_proem, Ordinal, DOT,
    ORDINAL_WIDTH, PIPE, PROEM_LEN,
};
pub use time::{from_iso8601, now_iso8601, to_iso8601};
