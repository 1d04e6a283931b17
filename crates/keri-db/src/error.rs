//! Error types for the event store.

use keri_db_env::EnvError;
use thiserror::Error;

/// Errors that can occur during event store operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Storage environment error.
    #[error("storage error: {0}")]
    Env(#[from] EnvError),

    /// The lifecycle driver failed or was misused.
    #[error("scheduler error: {0}")]
    Scheduler(String),
}

impl DbError {
    /// Whether this is the usage error of touching a closed store.
    pub fn is_not_open(&self) -> bool {
        matches!(self, DbError::Env(EnvError::NotOpen { .. }))
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, DbError>;
