//! Anchor signing
//!
//! Anchors are signed with Ed25519 over the raw 32 digest bytes (not the hex
//! rendering). The signing identity's account id is the hex of its verifying
//! key, so any party holding a digest, signature, and account id can check
//! the signature offline.

use sealdrop_core::{AccountId, Digest, Signature};

/// Signing errors
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("No usable key material for signing identity")]
    NoKeyMaterial,

    #[error("Malformed signing key: {0}")]
    MalformedKey(String),
}

/// A signing identity for anchor submissions.
pub trait Signer: Send + Sync {
    /// Ledger account this identity signs as.
    fn account(&self) -> AccountId;

    /// Sign a digest for anchoring.
    fn sign(&self, digest: &Digest) -> Result<Signature, SigningError>;
}

/// Ed25519 signing identity
pub struct Ed25519Signer {
    key: ed25519_dalek::SigningKey,
}

impl Ed25519Signer {
    /// Generate a new random signing identity.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self {
            key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create from a raw 32-byte seed.
    pub fn from_seed_bytes(seed: [u8; 32]) -> Self {
        Self {
            key: ed25519_dalek::SigningKey::from_bytes(&seed),
        }
    }

    /// Create from a hex-encoded 32-byte seed, with or without a `0x` prefix.
    pub fn from_seed_hex(seed: &str) -> Result<Self, SigningError> {
        let hex_part = seed.strip_prefix("0x").unwrap_or(seed);
        let raw = hex::decode(hex_part)
            .map_err(|_| SigningError::MalformedKey("seed is not valid hex".to_string()))?;
        let seed: [u8; 32] = raw.try_into().map_err(|v: Vec<u8>| {
            SigningError::MalformedKey(format!("seed must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self::from_seed_bytes(seed))
    }

    /// Raw public key bytes.
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }
}

impl Signer for Ed25519Signer {
    fn account(&self) -> AccountId {
        AccountId::from_key_bytes(&self.verifying_key_bytes())
    }

    fn sign(&self, digest: &Digest) -> Result<Signature, SigningError> {
        use ed25519_dalek::Signer as _;
        let signature = self.key.sign(digest.as_bytes());
        Ok(Signature::from_bytes(signature.to_bytes()))
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signer({})", self.account())
    }
}

/// Verify a signature over a digest against an account id.
///
/// Returns false for malformed account ids and non-verifying signatures
/// alike; the caller only needs to know whether this (account, digest,
/// signature) triple holds.
pub fn verify_signature(account: &AccountId, digest: &Digest, signature: &Signature) -> bool {
    use ed25519_dalek::Verifier as _;

    let hex_part = account.as_str().strip_prefix("0x").unwrap_or(account.as_str());
    let raw = match hex::decode(hex_part) {
        Ok(raw) => raw,
        Err(_) => return false,
    };
    let key_bytes: [u8; 32] = match raw.try_into() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let verifying_key = match ed25519_dalek::VerifyingKey::from_bytes(&key_bytes) {
        Ok(key) => key,
        Err(_) => return false,
    };

    let signature = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    verifying_key.verify(digest.as_bytes(), &signature).is_ok()
}
