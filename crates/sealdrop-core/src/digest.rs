//! Content digest module
//!
//! Every uploaded payload is identified by the SHA-256 digest of its exact
//! bytes. The digest is computed once, before any storage or ledger call, and
//! the same value flows through storage metadata, the index, and the anchor
//! transaction. Rendering is always lowercase hex without a prefix.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use sha2::{Digest as _, Sha256};

/// Length of a digest in raw bytes.
pub const DIGEST_LEN: usize = 32;

/// Length of a digest rendered as hex.
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// SHA-256 digest of a payload's exact bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex rendering without a prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(DigestError::InvalidLength {
                expected: DIGEST_HEX_LEN,
                actual: s.len(),
            });
        }
        let raw = hex::decode(s).map_err(|_| DigestError::InvalidHex)?;
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }
}

impl serde::Serialize for Digest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Digest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("digest must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("digest contains non-hex characters")]
    InvalidHex,
}

/// Compute the digest of a fully buffered payload.
pub fn digest_bytes(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Digest(hasher.finalize().into())
}

/// Incremental digest computation for payloads consumed in chunks.
///
/// Feeding the same bytes in any chunking produces the same digest as
/// [`digest_bytes`] over the concatenation.
pub struct DigestHasher {
    inner: Sha256,
}

impl DigestHasher {
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    pub fn finalize(self) -> Digest {
        Digest(self.inner.finalize().into())
    }
}

impl Default for DigestHasher {
    fn default() -> Self {
        Self::new()
    }
}
