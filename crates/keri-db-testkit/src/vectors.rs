//! Golden key vectors.
//!
//! Stores written by other implementations must stay readable, so the byte
//! layout of every key kind is pinned here.

use serde::Serialize;

use keri_db_core::{dg_key, dt_key, on_key, sn_key, Ordinal};

pub const PRE: &str = "BWzwEHHzq7K0gzQPYGGwTmuupUhPx5_yZ-Wk1x4ejhcc";
pub const DIG: &str = "EGAPkzNZMtX-QiVgbRbyAIZGoXvbGv9IPb0foWTZvI_4";
pub const DTS: &str = "2021-02-13T19:16:50.750302+00:00";

/// Which key builder a vector exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    Sn,
    On,
    Dg,
    Dt,
}

/// A golden key vector.
#[derive(Debug, Clone, Serialize)]
pub struct KeyVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub kind: KeyKind,
    pub pre: &'static str,
    /// Ordinal for sn and on keys.
    pub ordinal: Ordinal,
    /// Digest or timestamp for dg and dt keys.
    pub suffix: &'static str,
    /// Expected key bytes.
    pub expected: &'static str,
}

impl KeyVector {
    /// Build the key this vector describes.
    pub fn build(&self) -> Vec<u8> {
        match self.kind {
            KeyKind::Sn => sn_key(self.pre, self.ordinal),
            KeyKind::On => on_key(self.pre, self.ordinal),
            KeyKind::Dg => dg_key(self.pre, self.suffix),
            KeyKind::Dt => dt_key(self.pre, self.suffix),
        }
    }
}

/// Get all golden key vectors.
pub fn all_vectors() -> Vec<KeyVector> {
    vec![
        KeyVector {
            name: "sn key at zero",
            kind: KeyKind::Sn,
            pre: PRE,
            ordinal: 0,
            suffix: "",
            expected: "BWzwEHHzq7K0gzQPYGGwTmuupUhPx5_yZ-Wk1x4ejhcc.00000000000000000000000000000000",
        },
        KeyVector {
            name: "sn key at one",
            kind: KeyKind::Sn,
            pre: PRE,
            ordinal: 1,
            suffix: "",
            expected: "BWzwEHHzq7K0gzQPYGGwTmuupUhPx5_yZ-Wk1x4ejhcc.00000000000000000000000000000001",
        },
        KeyVector {
            name: "sn key is lowercase hex",
            kind: KeyKind::Sn,
            pre: PRE,
            ordinal: 0xa0,
            suffix: "",
            expected: "BWzwEHHzq7K0gzQPYGGwTmuupUhPx5_yZ-Wk1x4ejhcc.000000000000000000000000000000a0",
        },
        KeyVector {
            name: "on key at maximum ordinal",
            kind: KeyKind::On,
            pre: PRE,
            ordinal: Ordinal::MAX,
            suffix: "",
            expected: "BWzwEHHzq7K0gzQPYGGwTmuupUhPx5_yZ-Wk1x4ejhcc.ffffffffffffffffffffffffffffffff",
        },
        KeyVector {
            name: "digest key",
            kind: KeyKind::Dg,
            pre: PRE,
            ordinal: 0,
            suffix: DIG,
            expected: "BWzwEHHzq7K0gzQPYGGwTmuupUhPx5_yZ-Wk1x4ejhcc.EGAPkzNZMtX-QiVgbRbyAIZGoXvbGv9IPb0foWTZvI_4",
        },
        KeyVector {
            name: "datetime key",
            kind: KeyKind::Dt,
            pre: PRE,
            ordinal: 0,
            suffix: DTS,
            expected: "BWzwEHHzq7K0gzQPYGGwTmuupUhPx5_yZ-Wk1x4ejhcc|2021-02-13T19:16:50.750302+00:00",
        },
    ]
}

/// Verify that every vector builds its expected key.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in all_vectors() {
        let key = vector.build();
        if key != vector.expected.as_bytes() {
            return Err(format!(
                "{}: expected {}, got {}",
                vector.name,
                vector.expected,
                String::from_utf8_lossy(&key)
            ));
        }
    }
    Ok(())
}

/// All vectors as pretty JSON, for sharing with other implementations.
pub fn vectors_json() -> String {
    serde_json::to_string_pretty(&all_vectors()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_are_unique() {
        let vectors = all_vectors();
        let mut names: Vec<_> = vectors.iter().map(|v| v.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), vectors.len());
    }

    #[test]
    fn test_verify_all_vectors() {
        verify_all_vectors().unwrap();
    }

    #[test]
    fn test_vectors_json() {
        let json: serde_json::Value = serde_json::from_str(&vectors_json()).unwrap();
        assert_eq!(json[0]["kind"], "sn");
        assert_eq!(json.as_array().unwrap().len(), all_vectors().len());
    }
}
