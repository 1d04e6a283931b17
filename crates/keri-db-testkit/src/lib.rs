//! # KERI DB Testkit
//!
//! Testing utilities for the KERI event store.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: pinned key bytes for each key kind
//! - **Generators**: Proptest strategies for prefixes, digests, ordinals and timestamps
//! - **Fixtures**: a signing controller with its own temporary store
//!
//! ## Golden Vectors
//!
//! ```rust
//! use keri_db_testkit::vectors::{all_vectors, verify_all_vectors};
//!
//! assert!(verify_all_vectors().is_ok());
//! for vector in all_vectors() {
//!     println!("{}: {}", vector.name, vector.expected);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use keri_db_core::{sn_key, split_sn_key};
//! use keri_db_testkit::generators::{prefix, sn};
//!
//! proptest! {
//!     #[test]
//!     fn sn_key_splits(pre in prefix(), sn in sn()) {
//!         let key = sn_key(&pre, sn);
//!         prop_assert_eq!(split_sn_key(&key).unwrap(), (pre.as_bytes(), sn));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use keri_db_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let icp = fixture.make_event(0, None);
//! fixture.store_event(&icp).unwrap();
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{digest, multi_party_fixtures, prefix, TestEvent, TestFixture};
pub use vectors::{all_vectors, verify_all_vectors, vectors_json, KeyKind, KeyVector};
