//! Error types for the key codec.

use thiserror::Error;

/// Errors raised while splitting or decoding composite keys.
///
/// Composing keys never fails; only decoding does.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The separator did not occur exactly once.
    #[error("expected exactly one {sep:?} separator in key, found {found}")]
    Separator { sep: char, found: usize },

    /// Ordinal suffix has the wrong number of hex digits.
    #[error("ordinal must be {expected} hex digits, got {got}")]
    OrdinalWidth { expected: usize, got: usize },

    /// Ordinal suffix is not a non-negative hexadecimal integer.
    #[error("not an ordinal: {0:?}")]
    NotAnOrdinal(String),

    /// Stored value is missing its insertion-order proem.
    #[error("malformed ordinal proem in value of {0} bytes")]
    Proem(usize),

    /// Key component is not valid UTF-8 where text is required.
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Datetime suffix is not an ISO-8601 timestamp.
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, KeyError>;
