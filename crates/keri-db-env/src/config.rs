//! Environment configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which storage engine backs an environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Memory-mapped LMDB with native dupsort tables.
    #[default]
    Lmdb,
    /// SQLite tables emulating the same single/dupsort layouts.
    Sqlite,
}

/// Durability of commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Flush data and metadata on every commit.
    #[default]
    Full,
    /// Skip the metadata flush; a crash may roll back the last commit.
    NoMetaSync,
    /// Leave flushing to the OS.
    NoSync,
}

/// Configuration for an [`Environment`](crate::Environment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Head directory for persistent stores. Stores live at
    /// `<head_dir>/keri/db/<name>`. Defaults to `/usr/local/var`, falling
    /// back to the home directory when that is not writable.
    #[serde(default)]
    pub head_dir: Option<PathBuf>,

    /// Storage engine.
    #[serde(default)]
    pub backend: BackendKind,

    /// Maximum LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Maximum concurrent LMDB readers.
    #[serde(default = "default_max_readers")]
    pub max_readers: u32,

    /// Maximum number of named LMDB tables.
    #[serde(default = "default_max_dbs")]
    pub max_dbs: u32,

    /// Commit durability.
    #[serde(default)]
    pub sync_mode: SyncMode,
}

fn default_map_size() -> usize {
    100 * 1024 * 1024
}

fn default_max_readers() -> u32 {
    126
}

fn default_max_dbs() -> u32 {
    32
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            head_dir: None,
            backend: BackendKind::default(),
            map_size: default_map_size(),
            max_readers: default_max_readers(),
            max_dbs: default_max_dbs(),
            sync_mode: SyncMode::default(),
        }
    }
}

impl EnvConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Use a specific head directory.
    pub fn with_head_dir(mut self, head_dir: impl Into<PathBuf>) -> Self {
        self.head_dir = Some(head_dir.into());
        self
    }

    /// Use a specific backend.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Set the commit durability.
    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let cfg = EnvConfig::from_json("{}").unwrap();
        assert_eq!(cfg.backend, BackendKind::Lmdb);
        assert_eq!(cfg.sync_mode, SyncMode::Full);
        assert_eq!(cfg.map_size, 100 * 1024 * 1024);
        assert_eq!(cfg.max_dbs, 32);
        assert!(cfg.head_dir.is_none());
    }

    #[test]
    fn test_json_overrides() {
        let cfg = EnvConfig::from_json(
            r#"{"backend":"sqlite","sync_mode":"no_meta_sync","head_dir":"/srv/keri"}"#,
        )
        .unwrap();
        assert_eq!(cfg.backend, BackendKind::Sqlite);
        assert_eq!(cfg.sync_mode, SyncMode::NoMetaSync);
        assert_eq!(cfg.head_dir, Some(PathBuf::from("/srv/keri")));
    }

    #[test]
    fn test_bad_json() {
        assert!(EnvConfig::from_json(r#"{"backend":"rocks"}"#).is_err());
    }
}
