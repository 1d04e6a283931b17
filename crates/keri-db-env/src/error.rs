//! Error types for the storage environment.

use keri_db_core::KeyError;
use thiserror::Error;

/// Errors that can occur during environment and table operations.
///
/// A missing key is never an error: reads return `None` or an empty
/// sequence, and write-once collisions return `false`.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Malformed composite key or proem.
    #[error("key error: {0}")]
    Key(#[from] KeyError),

    /// Error from the LMDB engine.
    #[error("lmdb error: {0}")]
    Lmdb(#[from] lmdb::Error),

    /// Error from the SQLite engine.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error (directories, temp paths).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// The environment was used before open or after close.
    #[error("environment {name} is not open")]
    NotOpen { name: String },

    /// Table name is not part of the opened catalog.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// Table exists on disk with a different single/duplicate layout.
    #[error("table {table} already exists with a different layout")]
    LayoutMismatch { table: String },

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// No ordinal left to assign under this key or prefix.
    #[error("ordinal space exhausted")]
    OrdinalExhausted,

    /// Stored data violates an invariant of its table.
    #[error("corrupt table data: {0}")]
    Corrupt(String),

    /// A backend lock was poisoned by a panicking writer.
    #[error("backend lock poisoned")]
    Poisoned,
}

/// Result type for environment operations.
pub type Result<T> = std::result::Result<T, EnvError>;
