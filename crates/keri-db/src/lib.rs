//! # KERI DB
//!
//! Durable storage for Key Event Receipt Infrastructure: key event logs,
//! signatures, receipts, first-seen order and escrows, as a fixed catalog
//! of tables over one storage environment.
//!
//! ## Overview
//!
//! - [`Baser`] - the event store; one accessor per table
//! - [`Lifecycle`] - open/close/is-open for an external scheduler
//! - [`Doer`], [`BaserDoer`], [`drive`] - a minimal tokio driver that keeps a
//!   store open while running and always closes it on the way out
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keri_db::{dg_key, sn_key, Baser};
//!
//! let pre = "BWzwEHHzq7K0gzQPYGGwTmuupUhPx5_yZ-Wk1x4ejhcc";
//! let dig = "EGAPkzNZMtX-QiVgbRbyAIZGoXvbGv9IPb0foWTZvI_4";
//!
//! let mut db = Baser::temporary("demo").unwrap();
//! db.evts().put(dg_key(pre, dig), br#"{"v":"KERI10JSON0000e6_"}"#).unwrap();
//! db.kels().add(sn_key(pre, 0), dig).unwrap();
//! assert_eq!(db.append_fe(pre, dig).unwrap(), 0);
//! db.close(true).unwrap();
//! ```
//!
//! ## Re-exports
//!
//! - `keri_db::core` - key codec and timestamps
//! - `keri_db::env` - environment, backends and table views

pub mod baser;
pub mod error;
pub mod lifecycle;

pub use keri_db_core as core;
pub use keri_db_env as env;

pub use baser::{Baser, CATALOG_VERSION};
pub use error::{DbError, Result};
pub use lifecycle::{drive, BaserDoer, Doer, Lifecycle};

pub use keri_db_core::{
    dg_key, dt_key, now_iso8601, on_key, sn_key, split_dt_key, split_key, split_on_key,
    split_sn_key, Ordinal,
};
pub use keri_db_env::{BackendKind, EnvConfig, EnvError, Environment, SyncMode};
