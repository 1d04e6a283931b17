//! Lifecycle surface for schedulers.
//!
//! Storage stays synchronous. A scheduler only sees [`Lifecycle`] (open,
//! close, is-open) or drives a [`Doer`] through [`drive`], which guarantees
//! the exit step runs however the loop ends.

use std::time::Duration;

use async_trait::async_trait;
use keri_db_env::Environment;
use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::baser::Baser;
use crate::error::{DbError, Result};

/// Open/close/is-open, the whole contract between a store and a scheduler.
pub trait Lifecycle {
    /// Open, or reopen in place.
    fn reopen(&mut self) -> Result<()>;

    /// Release the store; `clear` also removes its directory.
    fn close(&mut self, clear: bool) -> Result<()>;

    fn is_open(&self) -> bool;
}

impl Lifecycle for Environment {
    fn reopen(&mut self) -> Result<()> {
        Ok(Environment::reopen(self)?)
    }

    fn close(&mut self, clear: bool) -> Result<()> {
        Ok(Environment::close(self, clear)?)
    }

    fn is_open(&self) -> bool {
        Environment::is_open(self)
    }
}

impl Lifecycle for Baser {
    fn reopen(&mut self) -> Result<()> {
        Baser::reopen(self)
    }

    fn close(&mut self, clear: bool) -> Result<()> {
        Baser::close(self, clear)
    }

    fn is_open(&self) -> bool {
        Baser::is_open(self)
    }
}

/// A unit of work driven by a cooperative scheduler.
#[async_trait]
pub trait Doer: Send {
    /// Called once before the first [`Doer::recur`].
    async fn enter(&mut self) -> Result<()>;

    /// Called once per tick with the time elapsed since entry. Returns `true`
    /// when the doer is done.
    async fn recur(&mut self, tyme: Duration) -> Result<bool>;

    /// Called once at the end, on every exit path.
    async fn exit(&mut self) -> Result<()>;
}

/// Keeps a store open while it is driven and closes it on exit.
///
/// Temporary stores are cleared on exit; persistent ones are kept.
pub struct BaserDoer<L: Lifecycle + Send = Baser> {
    store: L,
    clear: bool,
}

impl BaserDoer<Baser> {
    pub fn new(baser: Baser) -> Self {
        let clear = baser.is_temp();
        Self {
            store: baser,
            clear,
        }
    }
}

impl<L: Lifecycle + Send> BaserDoer<L> {
    /// Wrap any lifecycle, clearing on exit when `clear` is set.
    pub fn with_clear(store: L, clear: bool) -> Self {
        Self { store, clear }
    }

    pub fn store(&self) -> &L {
        &self.store
    }

    pub fn into_inner(self) -> L {
        self.store
    }
}

#[async_trait]
impl<L: Lifecycle + Send> Doer for BaserDoer<L> {
    async fn enter(&mut self) -> Result<()> {
        if !self.store.is_open() {
            self.store.reopen()?;
        }
        Ok(())
    }

    async fn recur(&mut self, _tyme: Duration) -> Result<bool> {
        // done once something else closed the store
        Ok(!self.store.is_open())
    }

    async fn exit(&mut self) -> Result<()> {
        self.store.close(self.clear)
    }
}

/// Run `doer` every `tock` until it reports done, `limit` elapses, or
/// `shutdown` turns `true` (or its sender goes away).
///
/// `exit` always runs once `enter` has been attempted; the first error wins.
pub async fn drive<D>(
    doer: &mut D,
    tock: Duration,
    limit: Option<Duration>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    D: Doer + ?Sized,
{
    if tock.is_zero() {
        return Err(DbError::Scheduler("tock must be positive".to_string()));
    }

    let started = Instant::now();
    let outcome = async {
        doer.enter().await?;
        debug!(?tock, ?limit, "doer entered");

        let mut ticker = interval(tock);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                info!("shutdown requested");
                return Ok(());
            }
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("shutdown sender dropped");
                        return Ok(());
                    }
                    continue;
                }
            }

            let tyme = started.elapsed();
            if limit.map_or(false, |limit| tyme >= limit) {
                debug!(?tyme, "limit reached");
                return Ok(());
            }
            if doer.recur(tyme).await? {
                debug!(?tyme, "doer done");
                return Ok(());
            }
        }
    }
    .await;

    let exited = doer.exit().await;
    if let Err(e) = &exited {
        warn!(error = %e, "doer exit failed");
    }
    outcome.and(exited)
}
