use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::StorageError;

/// SHA-256 digest identifying a stored image.
///
/// Identical uploads share one hash, so several restaurants may point at the
/// same stored file.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Lowercase 64-character hex form, as persisted in the database.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Relative on-disk location: `ab/cdef…` (two-character shard directory).
    pub fn shard_path(&self) -> PathBuf {
        let hex = self.to_hex();
        let (prefix, rest) = hex.split_at(2);
        PathBuf::from(prefix).join(rest)
    }
}

impl FromStr for ContentHash {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(StorageError::InvalidHash(format!(
                "expected 64 hex characters, got {}",
                s.len()
            )));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| StorageError::InvalidHash(format!("invalid hex: {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
