//! The event store: a fixed catalog of KERI tables over one environment.
//!
//! Keys are built with the codec in [`keri_db_core`]:
//! - `dg_key(pre, dig)` for event bodies, timestamps, signatures, receipts
//! - `sn_key(pre, sn)` for the key event logs and most escrows
//! - `on_key(pre, on)` for the first-seen log
//!
//! The store never parses event content.

use std::path::Path;

use keri_db_core::{dg_key, Ordinal};
use keri_db_env::{
    DupTable, EnvConfig, Environment, IoDupTable, OrdItems, OrdLog, PreItems, PreWalk,
    SingleTable, TableSpec, DEFAULT_NAME,
};
use tracing::debug;

use crate::error::Result;

/// Version of [`Baser::CATALOG`]. Bumped whenever a table is added or
/// changes layout.
pub const CATALOG_VERSION: u32 = 2;

/// KERI event store.
pub struct Baser {
    env: Environment,
}

impl Baser {
    /// Every table of the store, with its layout.
    pub const CATALOG: &'static [TableSpec] = &[
        // event bodies, first-seen datetimes, seal source couples
        TableSpec::single("evts"),
        TableSpec::single("dtss"),
        TableSpec::single("aess"),
        // signatures and receipts
        TableSpec::dups("sigs"),
        TableSpec::dups("wigs"),
        TableSpec::dups("rcts"),
        TableSpec::dups("vrcs"),
        // first-seen log
        TableSpec::single("fels"),
        // key event logs
        TableSpec::dups("kels"),
        TableSpec::dups("dels"),
        // escrows
        TableSpec::dups("pses"),
        TableSpec::dups("pwes"),
        TableSpec::dups("pdes"),
        TableSpec::dups("ooes"),
        TableSpec::dups("ures"),
        TableSpec::dups("uwes"),
        TableSpec::dups("vres"),
        TableSpec::dups("ldes"),
    ];

    /// Create a closed store. Call [`Baser::reopen`] to open it.
    pub fn new(name: impl Into<String>, temp: bool, config: EnvConfig) -> Self {
        Self {
            env: Environment::new(name, temp, config, Self::CATALOG),
        }
    }

    /// Create and open a store.
    pub fn open(name: impl Into<String>, temp: bool, config: EnvConfig) -> Result<Self> {
        let env = Environment::open(name, temp, config, Self::CATALOG)?;
        debug!(name = env.name(), version = CATALOG_VERSION, "baser opened");
        Ok(Self { env })
    }

    /// Open a temporary store with the default configuration.
    pub fn temporary(name: impl Into<String>) -> Result<Self> {
        Self::open(name, true, EnvConfig::default())
    }

    /// Open the store named [`DEFAULT_NAME`] under the configured head
    /// directory.
    pub fn open_default(config: EnvConfig) -> Result<Self> {
        Self::open(DEFAULT_NAME, false, config)
    }

    /// Underlying environment.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Open the store, or reopen it in place.
    pub fn reopen(&mut self) -> Result<()> {
        Ok(self.env.reopen()?)
    }

    /// Close the store. With `clear`, or when temporary, its directory is
    /// removed.
    pub fn close(&mut self, clear: bool) -> Result<()> {
        Ok(self.env.close(clear)?)
    }

    pub fn is_open(&self) -> bool {
        self.env.is_open()
    }

    pub fn name(&self) -> &str {
        self.env.name()
    }

    pub fn is_temp(&self) -> bool {
        self.env.is_temp()
    }

    pub fn path(&self) -> Option<&Path> {
        self.env.path()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Serialized events by `dg_key(pre, dig)`.
    pub fn evts(&self) -> SingleTable<'_> {
        self.env.single("evts")
    }

    /// First-seen ISO-8601 datetime of each event by `dg_key(pre, dig)`.
    pub fn dtss(&self) -> SingleTable<'_> {
        self.env.single("dtss")
    }

    /// Authorizing seal source couple (`snu + dig` of the delegating event)
    /// by `dg_key(pre, dig)`.
    pub fn aess(&self) -> SingleTable<'_> {
        self.env.single("aess")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Signatures and receipts
    // ─────────────────────────────────────────────────────────────────────────

    /// Fully qualified indexed controller signatures by `dg_key(pre, dig)`.
    pub fn sigs(&self) -> DupTable<'_> {
        self.env.dups("sigs")
    }

    /// Indexed witness signatures by `dg_key(pre, dig)`.
    pub fn wigs(&self) -> DupTable<'_> {
        self.env.dups("wigs")
    }

    /// Nontransferable receipt couples (`pre + cig`) by `dg_key(pre, dig)`.
    pub fn rcts(&self) -> DupTable<'_> {
        self.env.dups("rcts")
    }

    /// Transferable validator receipt quadruples (`pre + snu + dig + sig`)
    /// by `dg_key(pre, dig)`.
    pub fn vrcs(&self) -> DupTable<'_> {
        self.env.dups("vrcs")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logs
    // ─────────────────────────────────────────────────────────────────────────

    /// First-seen event log: digests by `on_key(pre, on)` in arrival order.
    pub fn fels(&self) -> OrdLog<'_> {
        self.env.ord_log("fels")
    }

    /// Key event log: digests of every event variant seen at
    /// `sn_key(pre, sn)`, in insertion order.
    pub fn kels(&self) -> IoDupTable<'_> {
        self.env.io_dups("kels")
    }

    /// Duplicitous event log by `sn_key(pre, sn)`.
    pub fn dels(&self) -> IoDupTable<'_> {
        self.env.io_dups("dels")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Escrows
    // ─────────────────────────────────────────────────────────────────────────

    /// Partial signature escrow.
    pub fn pses(&self) -> IoDupTable<'_> {
        self.env.io_dups("pses")
    }

    /// Partial witness escrow.
    pub fn pwes(&self) -> IoDupTable<'_> {
        self.env.io_dups("pwes")
    }

    /// Partial delegation escrow.
    pub fn pdes(&self) -> IoDupTable<'_> {
        self.env.io_dups("pdes")
    }

    /// Out-of-order escrow.
    pub fn ooes(&self) -> IoDupTable<'_> {
        self.env.io_dups("ooes")
    }

    /// Unverified nontransferable receipt escrow.
    pub fn ures(&self) -> IoDupTable<'_> {
        self.env.io_dups("ures")
    }

    /// Unverified witness receipt escrow.
    pub fn uwes(&self) -> IoDupTable<'_> {
        self.env.io_dups("uwes")
    }

    /// Unverified transferable receipt escrow.
    pub fn vres(&self) -> IoDupTable<'_> {
        self.env.io_dups("vres")
    }

    /// Likely duplicitous event escrow.
    pub fn ldes(&self) -> IoDupTable<'_> {
        self.env.io_dups("ldes")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Replay
    // ─────────────────────────────────────────────────────────────────────────

    /// Every KEL digest of `pre` in sn order, all variants per sn, stopping at
    /// the first missing sn.
    pub fn kel_iter(&self, pre: impl AsRef<[u8]>) -> PreWalk<'_> {
        self.kels().vals_all_pre_iter(pre)
    }

    /// The last KEL digest of `pre` at each sn, i.e. the establishment
    /// history as currently accepted.
    pub fn kel_est_iter(&self, pre: impl AsRef<[u8]>) -> PreWalk<'_> {
        self.kels().last_all_pre_iter(pre)
    }

    /// Every DEL digest of `pre`. Duplicity is sparse, so sn gaps are skipped.
    pub fn del_iter(&self, pre: impl AsRef<[u8]>) -> PreWalk<'_> {
        self.dels().vals_any_pre_iter(pre)
    }

    /// Record `dig` as the next first-seen event of `pre`. Returns its ordinal.
    pub fn append_fe(&self, pre: impl AsRef<[u8]>, dig: impl AsRef<[u8]>) -> Result<Ordinal> {
        Ok(self.fels().append(pre, dig)?)
    }

    /// First-seen `(on, dig)` entries of `pre` from ordinal `on`.
    pub fn fel_items(&self, pre: impl AsRef<[u8]>, on: Ordinal) -> PreItems<'_> {
        self.fels().items_pre(pre, on)
    }

    /// First-seen `(pre, on, dig)` entries of every identifier from `resume`,
    /// for an external feed that persists its own resume key.
    pub fn fel_items_all(&self, resume: impl AsRef<[u8]>, skip: bool) -> OrdItems<'_> {
        self.fels().items_all(resume, skip)
    }

    /// Serialized event by prefix and digest.
    pub fn event(&self, pre: impl AsRef<[u8]>, dig: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        Ok(self.evts().get(dg_key(pre, dig))?)
    }
}

impl std::fmt::Debug for Baser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Baser").field("env", &self.env).finish()
    }
}
