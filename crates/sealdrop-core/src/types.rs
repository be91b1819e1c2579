//! Core domain types
//!
//! This module provides the types shared across all Sealdrop components:
//! object locators handed out by the store, ledger identities and anchor
//! artifacts, and the indexed file record that ties them together.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::digest::Digest;

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

/// Public locator for a durably stored object.
///
/// With the remote backend this is the share link returned after the
/// visibility grant; with the local backend it is a URL under the configured
/// base. The locator is only considered valid once the object is readable
/// through it without further authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectLocator(String);

impl ObjectLocator {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for ObjectLocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Ledger identity derived from an Ed25519 public key.
///
/// Rendered as `0x` followed by 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub const KEY_LEN: usize = 32;

    pub fn from_key_bytes(key: &[u8; Self::KEY_LEN]) -> Self {
        Self(format!("0x{}", hex::encode(key)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = strip_hex_prefix(s);
        if hex_part.len() != Self::KEY_LEN * 2 {
            return Err(IdentityError::InvalidLength {
                expected: Self::KEY_LEN * 2,
                actual: hex_part.len(),
            });
        }
        let raw = hex::decode(hex_part).map_err(|_| IdentityError::InvalidHex)?;
        Ok(Self(format!("0x{}", hex::encode(raw))))
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("account id must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("account id contains non-hex characters")]
    InvalidHex,
}

/// Reference to a submitted anchor transaction.
///
/// Issued by the ledger on submission and used for every later status poll.
/// Well-formed references are `0x` followed by 64 hex characters, but the
/// reference is treated as opaque once issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(String);

impl TxRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wellformed(&self) -> bool {
        let hex_part = match self.0.strip_prefix("0x") {
            Some(rest) => rest,
            None => return false,
        };
        hex_part.len() == 64 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl Display for TxRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Ed25519 signature over the raw digest bytes.
///
/// Rendered as `0x` followed by 128 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; Signature::LEN]);

impl Signature {
    pub const LEN: usize = 64;

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Signature({})", self.to_hex())
    }
}

impl FromStr for Signature {
    type Err = SignatureFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = strip_hex_prefix(s);
        if hex_part.len() != Self::LEN * 2 {
            return Err(SignatureFormatError::InvalidLength {
                expected: Self::LEN * 2,
                actual: hex_part.len(),
            });
        }
        let raw = hex::decode(hex_part).map_err(|_| SignatureFormatError::InvalidHex)?;
        let mut bytes = [0u8; Self::LEN];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }
}

impl Serialize for Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureFormatError {
    #[error("signature must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("signature contains non-hex characters")]
    InvalidHex,
}

/// Lifecycle of an anchor transaction after submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorStatus {
    Pending,
    Confirmed,
    Failed,
}

impl AnchorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorStatus::Pending => "pending",
            AnchorStatus::Confirmed => "confirmed",
            AnchorStatus::Failed => "failed",
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, AnchorStatus::Pending)
    }
}

impl FromStr for AnchorStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AnchorStatus::Pending),
            "confirmed" => Ok(AnchorStatus::Confirmed),
            "failed" => Ok(AnchorStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid anchor status: {}", s)),
        }
    }
}

impl Display for AnchorStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Proof that a digest was submitted to the ledger.
///
/// Returned by the ledger client on submission and attached to the file
/// record. The status starts as `Pending` and is updated as confirmation is
/// observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorReceipt {
    pub digest: Digest,
    pub signature: Signature,
    pub tx: TxRef,
    pub status: AnchorStatus,
}

/// One indexed upload: name, locator, digest, and anchor state.
///
/// Uploads are never deduplicated, so several records may carry the same
/// digest while each keeps its own locator and anchor reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub file_name: String,
    pub locator: ObjectLocator,
    pub object_key: String,
    pub digest: Digest,
    pub anchor: Option<AnchorReceipt>,
    pub created_at: DateTime<Utc>,
    pub anchored_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub fn anchor_status(&self) -> Option<AnchorStatus> {
        self.anchor.as_ref().map(|a| a.status)
    }

    pub fn tx_ref(&self) -> Option<&TxRef> {
        self.anchor.as_ref().map(|a| &a.tx)
    }
}

/// Outcome of checking a digest against the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    pub digest: Digest,
    pub exists: bool,
    pub owner: Option<AccountId>,
    pub signature: Option<Signature>,
}

impl VerificationResult {
    pub fn absent(digest: Digest) -> Self {
        Self {
            digest,
            exists: false,
            owner: None,
            signature: None,
        }
    }

    pub fn anchored(digest: Digest, owner: AccountId, signature: Signature) -> Self {
        Self {
            digest,
            exists: true,
            owner: Some(owner),
            signature: Some(signature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::digest_bytes;

    #[test]
    fn account_id_round_trips_with_prefix() {
        let id = AccountId::from_key_bytes(&[7u8; 32]);
        assert!(id.as_str().starts_with("0x"));
        let parsed: AccountId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn account_id_parse_accepts_bare_hex() {
        let id = AccountId::from_key_bytes(&[7u8; 32]);
        let bare = id.as_str().trim_start_matches("0x").to_string();
        let parsed: AccountId = bare.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn account_id_rejects_wrong_length() {
        let err = "0xabcd".parse::<AccountId>().unwrap_err();
        assert!(matches!(err, IdentityError::InvalidLength { .. }));
    }

    #[test]
    fn signature_round_trips_through_hex() {
        let sig = Signature::from_bytes([0xab; 64]);
        let parsed: Signature = sig.to_hex().parse().unwrap();
        assert_eq!(parsed, sig);
    }

    #[test]
    fn signature_rejects_non_hex() {
        let err = format!("0x{}", "g".repeat(128))
            .parse::<Signature>()
            .unwrap_err();
        assert_eq!(err, SignatureFormatError::InvalidHex);
    }

    #[test]
    fn tx_ref_wellformedness() {
        assert!(TxRef::new(format!("0x{}", "ab".repeat(32))).is_wellformed());
        assert!(!TxRef::new("N/A").is_wellformed());
        assert!(!TxRef::new(format!("0x{}", "ab".repeat(16))).is_wellformed());
        assert!(!TxRef::new("ab".repeat(33)).is_wellformed());
    }

    #[test]
    fn anchor_status_round_trips() {
        for status in [
            AnchorStatus::Pending,
            AnchorStatus::Confirmed,
            AnchorStatus::Failed,
        ] {
            let parsed: AnchorStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("mined".parse::<AnchorStatus>().is_err());
    }

    #[test]
    fn only_pending_is_unsettled() {
        assert!(!AnchorStatus::Pending.is_settled());
        assert!(AnchorStatus::Confirmed.is_settled());
        assert!(AnchorStatus::Failed.is_settled());
    }

    #[test]
    fn file_record_serializes_digest_and_signature_as_hex() {
        let digest = digest_bytes(b"record");
        let record = FileRecord {
            id: Uuid::new_v4(),
            file_name: "report.pdf".to_string(),
            locator: ObjectLocator::new("https://files.example/abc"),
            object_key: "abc".to_string(),
            digest,
            anchor: Some(AnchorReceipt {
                digest,
                signature: Signature::from_bytes([1u8; 64]),
                tx: TxRef::new(format!("0x{}", "cd".repeat(32))),
                status: AnchorStatus::Pending,
            }),
            created_at: Utc::now(),
            anchored_at: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["digest"], serde_json::json!(digest.to_hex()));
        assert_eq!(
            json["anchor"]["signature"],
            serde_json::json!(format!("0x{}", "01".repeat(64)))
        );
        assert_eq!(json["anchor"]["status"], serde_json::json!("pending"));
    }
}
