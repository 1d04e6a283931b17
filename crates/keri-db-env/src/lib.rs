//! # KERI DB Environment
//!
//! Storage environment for the KERI event store: a named directory holding
//! a fixed catalog of tables, backed by LMDB or SQLite.
//!
//! ## Overview
//!
//! Engines implement the small [`Backend`] trait (single and sorted-duplicate
//! tables, short transactions, seeks). On top of it the environment offers
//! four table views with identical behavior on every engine:
//!
//! - [`SingleTable`] - one value per key, write-once `put` and overwriting `set`
//! - [`DupTable`] - many values per key in lexicographic order
//! - [`IoDupTable`] - many values per key in insertion order, plus replay
//!   helpers over sequence-number keys
//! - [`OrdLog`] - append-only log with per-prefix ordinals and resumable
//!   replay
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keri_db_env::{Environment, TableSpec};
//!
//! const CATALOG: &[TableSpec] = &[TableSpec::single("evts"), TableSpec::dups("sigs")];
//!
//! let mut env = Environment::temporary("demo", CATALOG).unwrap();
//! env.single("evts").put(b"pre.dig", b"{}").unwrap();
//! env.dups("sigs").put(b"pre.dig", [b"sig1", b"sig0"]).unwrap();
//! assert_eq!(env.dups("sigs").get(b"pre.dig").unwrap()[0], b"sig0");
//! env.close(true).unwrap();
//! ```
//!
//! ## Design Notes
//!
//! - **No held snapshots**: iterators re-seek in a fresh read transaction
//!   per item, so writes and deletes during iteration are safe
//! - **Atomic read-modify-write**: ordered insertion and log append run in
//!   one write transaction
//! - **Missing is not an error**: absent keys read as `None` or empty

pub mod config;
pub mod env;
pub mod error;
pub mod iter;
pub mod lmdb;
pub mod migration;
pub mod sqlite;
pub mod tables;
pub mod traits;

pub use config::{BackendKind, EnvConfig, SyncMode};
pub use env::{Environment, ALT_TAIL_DIR, DEFAULT_NAME, HEAD_DIR, TAIL_DIR};
pub use error::{EnvError, Result};
pub use iter::{BatchIter, DupIter, IoItemsIter, OrdItems, PreItems, PreWalk, Walk};
pub use self::lmdb::LmdbBackend;
pub use sqlite::SqliteBackend;
pub use tables::{DupTable, IoDupTable, OrdLog, SingleTable};
pub use traits::{Backend, ReadTxn, TableSpec, WriteTxn};
