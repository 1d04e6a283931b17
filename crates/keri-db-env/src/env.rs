//! The storage environment: a named directory holding one backend and a
//! fixed catalog of tables.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::{BackendKind, EnvConfig};
use crate::error::{EnvError, Result};
use crate::lmdb::LmdbBackend;
use crate::sqlite::SqliteBackend;
use crate::tables::{DupTable, IoDupTable, OrdLog, SingleTable};
use crate::traits::{Backend, ReadTxn, TableSpec, WriteTxn};

/// Default head directory for persistent stores.
pub const HEAD_DIR: &str = "/usr/local/var";

/// Path below the head directory.
pub const TAIL_DIR: &str = "keri/db";

/// Fallback below the home directory when [`HEAD_DIR`] is not writable.
pub const ALT_TAIL_DIR: &str = ".keri/db";

/// Name used when none is given.
pub const DEFAULT_NAME: &str = "main";

struct Opened {
    backend: Box<dyn Backend>,
    path: PathBuf,
    // removed from disk when dropped
    temp_dir: Option<TempDir>,
}

/// A named storage environment.
///
/// Table views borrow the environment, so it cannot be closed while a view
/// or iterator is alive. Any access after [`Environment::close`] fails with
/// [`EnvError::NotOpen`].
pub struct Environment {
    name: String,
    temp: bool,
    config: EnvConfig,
    catalog: Vec<TableSpec>,
    opened: Option<Opened>,
    // temporary directory kept across a failed reopen
    parked: Option<(PathBuf, TempDir)>,
}

impl Environment {
    /// Create a closed environment. Call [`Environment::reopen`] to open it.
    pub fn new(name: impl Into<String>, temp: bool, config: EnvConfig, catalog: &[TableSpec]) -> Self {
        Self {
            name: name.into(),
            temp,
            config,
            catalog: catalog.to_vec(),
            opened: None,
            parked: None,
        }
    }

    /// Create and open an environment.
    pub fn open(
        name: impl Into<String>,
        temp: bool,
        config: EnvConfig,
        catalog: &[TableSpec],
    ) -> Result<Self> {
        let mut env = Self::new(name, temp, config, catalog);
        env.reopen()?;
        Ok(env)
    }

    /// Open a temporary environment with the default configuration. Its
    /// directory is removed on close.
    pub fn temporary(name: impl Into<String>, catalog: &[TableSpec]) -> Result<Self> {
        Self::open(name, true, EnvConfig::default(), catalog)
    }

    /// Open the backend, creating the directory and tables as needed.
    ///
    /// Reopening an open environment releases and reacquires the backend at
    /// the same path. A closed temporary environment gets a fresh directory,
    /// unless a previous reopen failed, in which case its directory is
    /// retried.
    pub fn reopen(&mut self) -> Result<()> {
        let (path, temp_dir) = match self.opened.take() {
            Some(opened) => {
                let Opened { backend, path, temp_dir } = opened;
                drop(backend);
                (path, temp_dir)
            }
            None => match self.parked.take() {
                Some((path, temp_dir)) => (path, Some(temp_dir)),
                None => self.resolve_path()?,
            },
        };

        let backend = match self.open_backend(&path) {
            Ok(backend) => backend,
            Err(e) => {
                if let Some(temp_dir) = temp_dir {
                    warn!(name = %self.name, error = %e, "reopen failed, keeping temporary directory");
                    self.parked = Some((path, temp_dir));
                }
                return Err(e);
            }
        };

        info!(
            name = %self.name,
            path = %path.display(),
            backend = backend.kind(),
            temp = self.temp,
            "environment opened"
        );

        self.opened = Some(Opened {
            backend,
            path,
            temp_dir,
        });
        Ok(())
    }

    /// Close the environment. With `clear`, or when temporary, its directory
    /// is removed. Closing a closed environment is a no-op.
    pub fn close(&mut self, clear: bool) -> Result<()> {
        let Some(Opened { backend, path, temp_dir }) = self.opened.take() else {
            if let Some((_, temp_dir)) = self.parked.take() {
                temp_dir.close()?;
            }
            return Ok(());
        };
        drop(backend);

        if let Some(temp_dir) = temp_dir {
            temp_dir.close()?;
        } else if clear {
            match std::fs::remove_dir_all(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!(name = %self.name, path = %path.display(), clear, "environment closed");
        Ok(())
    }

    /// Whether the environment is open.
    pub fn is_open(&self) -> bool {
        self.opened.is_some()
    }

    /// Environment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the environment lives in a temporary directory.
    pub fn is_temp(&self) -> bool {
        self.temp
    }

    /// Directory of the open environment.
    pub fn path(&self) -> Option<&Path> {
        self.opened.as_ref().map(|o| o.backend.path())
    }

    /// Configuration the environment opens with.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Table catalog.
    pub fn catalog(&self) -> &[TableSpec] {
        &self.catalog
    }

    /// Single-valued table view.
    pub fn single(&self, name: &'static str) -> SingleTable<'_> {
        SingleTable::new(self, name)
    }

    /// Lexicographic duplicates table view.
    pub fn dups(&self, name: &'static str) -> DupTable<'_> {
        DupTable::new(self, name)
    }

    /// Insertion-ordered duplicates table view.
    pub fn io_dups(&self, name: &'static str) -> IoDupTable<'_> {
        IoDupTable::new(self, name)
    }

    /// Append-only ordinal log view.
    pub fn ord_log(&self, name: &'static str) -> OrdLog<'_> {
        OrdLog::new(self, name)
    }

    fn backend(&self) -> Result<&dyn Backend> {
        self.opened
            .as_ref()
            .map(|o| o.backend.as_ref())
            .ok_or_else(|| EnvError::NotOpen {
                name: self.name.clone(),
            })
    }

    /// Check that `table` is in the catalog with the layout a view expects.
    fn check(&self, table: &str, dupsort: bool) -> Result<()> {
        match self.catalog.iter().find(|spec| spec.name == table) {
            Some(spec) if spec.dupsort == dupsort => Ok(()),
            Some(_) => Err(EnvError::LayoutMismatch {
                table: table.to_string(),
            }),
            None => Err(EnvError::UnknownTable(table.to_string())),
        }
    }

    /// Run `f` in a short read transaction on `table`.
    pub(crate) fn read_with<'a, T>(
        &'a self,
        table: &str,
        dupsort: bool,
        f: impl FnOnce(&(dyn ReadTxn + 'a)) -> Result<T>,
    ) -> Result<T> {
        self.check(table, dupsort)?;
        let txn = self.backend()?.read()?;
        f(&*txn)
    }

    /// Run `f` in a write transaction on `table`, committing if it succeeds.
    pub(crate) fn write_with<'a, T>(
        &'a self,
        table: &str,
        dupsort: bool,
        f: impl FnOnce(&mut (dyn WriteTxn + 'a)) -> Result<T>,
    ) -> Result<T> {
        self.check(table, dupsort)?;
        let mut txn = self.backend()?.write()?;
        let out = f(&mut *txn)?;
        txn.commit()?;
        Ok(out)
    }

    fn open_backend(&self, path: &Path) -> Result<Box<dyn Backend>> {
        Ok(match self.config.backend {
            BackendKind::Lmdb => Box::new(LmdbBackend::open(path, &self.catalog, &self.config)?),
            BackendKind::Sqlite => Box::new(SqliteBackend::open(path, &self.catalog, &self.config)?),
        })
    }

    fn resolve_path(&self) -> Result<(PathBuf, Option<TempDir>)> {
        if self.temp {
            let temp_dir = tempfile::Builder::new()
                .prefix("keri_db_")
                .suffix("_test")
                .tempdir()?;
            let path = temp_dir.path().join(TAIL_DIR).join(&self.name);
            std::fs::create_dir_all(&path)?;
            return Ok((path, Some(temp_dir)));
        }

        let path = match &self.config.head_dir {
            Some(head) => head.join(TAIL_DIR).join(&self.name),
            None => {
                let primary = Path::new(HEAD_DIR).join(TAIL_DIR).join(&self.name);
                match std::fs::create_dir_all(&primary) {
                    Ok(()) => primary,
                    Err(e) => {
                        let home = std::env::var_os("HOME").ok_or_else(|| {
                            io::Error::new(io::ErrorKind::NotFound, "no home directory")
                        })?;
                        warn!(
                            path = %primary.display(),
                            error = %e,
                            "head directory unavailable, using home directory"
                        );
                        PathBuf::from(home).join(ALT_TAIL_DIR).join(&self.name)
                    }
                }
            }
        };
        std::fs::create_dir_all(&path)?;
        debug!(path = %path.display(), "resolved environment path");
        Ok((path, None))
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        if let Err(e) = self.close(false) {
            warn!(name = %self.name, error = %e, "close on drop failed");
        }
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.name)
            .field("temp", &self.temp)
            .field("path", &self.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &[TableSpec] = &[TableSpec::single("vals"), TableSpec::dups("dups")];

    #[test]
    fn test_temporary_lifecycle() {
        let mut env = Environment::temporary("test", CATALOG).unwrap();
        assert!(env.is_open());
        assert!(env.is_temp());
        assert_eq!(env.name(), "test");

        let path = env.path().unwrap().to_path_buf();
        assert!(path.ends_with("keri/db/test"));
        assert!(path.exists());
        let root = path
            .ancestors()
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("keri_db_") && n.ends_with("_test"))
                    .unwrap_or(false)
            })
            .map(Path::to_path_buf);
        assert!(root.is_some());

        env.close(false).unwrap();
        assert!(!env.is_open());
        assert!(env.path().is_none());
        assert!(!path.exists());

        // closing twice is harmless
        env.close(true).unwrap();
    }

    #[test]
    fn test_not_open_after_close() {
        let mut env = Environment::temporary("test", CATALOG).unwrap();
        env.single("vals").put(b"k", b"v").unwrap();
        env.close(true).unwrap();

        let err = env.single("vals").get(b"k").unwrap_err();
        assert!(matches!(err, EnvError::NotOpen { name } if name == "test"));
    }

    #[test]
    fn test_persistent_reopen_keeps_data() {
        let head = tempfile::tempdir().unwrap();
        for backend in [BackendKind::Lmdb, BackendKind::Sqlite] {
            let config = EnvConfig::default()
                .with_head_dir(head.path())
                .with_backend(backend);
            let name = format!("persist_{:?}", backend).to_lowercase();

            let mut env = Environment::open(name.as_str(), false, config, CATALOG).unwrap();
            let path = env.path().unwrap().to_path_buf();
            assert_eq!(path, head.path().join("keri/db").join(&name));
            assert!(env.single("vals").put(b"k", b"v").unwrap());

            env.close(false).unwrap();
            assert!(path.exists());

            env.reopen().unwrap();
            assert_eq!(env.single("vals").get(b"k").unwrap(), Some(b"v".to_vec()));

            // reopening while open keeps the same store
            env.reopen().unwrap();
            assert_eq!(env.path(), Some(path.as_path()));
            assert_eq!(env.single("vals").get(b"k").unwrap(), Some(b"v".to_vec()));

            env.close(true).unwrap();
            assert!(!path.exists());
        }
    }

    #[test]
    fn test_failed_reopen_keeps_temporary_store() {
        let config = EnvConfig::default().with_backend(BackendKind::Sqlite);
        let mut env = Environment::open("test", true, config, CATALOG).unwrap();
        env.single("vals").put(b"k", b"v").unwrap();
        let path = env.path().unwrap().to_path_buf();

        // a directory where the database file belongs cannot be opened
        let file = path.join(SqliteBackend::FILE_NAME);
        std::fs::remove_file(&file).unwrap();
        std::fs::create_dir(&file).unwrap();

        assert!(env.reopen().is_err());
        assert!(!env.is_open());
        assert!(path.exists());

        // the same directory is retried, then removed on close
        std::fs::remove_dir(&file).unwrap();
        env.reopen().unwrap();
        assert_eq!(env.path(), Some(path.as_path()));
        env.close(false).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_table_and_layout() {
        let env = Environment::temporary("test", CATALOG).unwrap();
        assert!(matches!(
            env.single("nope").get(b"k"),
            Err(EnvError::UnknownTable(_))
        ));
        assert!(matches!(
            env.single("dups").get(b"k"),
            Err(EnvError::LayoutMismatch { .. })
        ));
    }
}
