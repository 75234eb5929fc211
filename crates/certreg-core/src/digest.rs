//! # Content Digest: Content-Addressed Identifiers
//!
//! `ContentDigest` is the self-describing `algorithm:hex` identifier used for
//! both kinds of content addressing in the registry:
//!
//! - **Documents** are opaque. [`sha256_document()`] hashes their raw bytes,
//!   so identical uploads always map to the same reference.
//! - **Structured values** (record fingerprints, identifier seeds) are hashed
//!   through [`sha256_digest()`], which only accepts [`CanonicalBytes`].
//!
//! The string form is `sha256:<64 lowercase hex>`.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::CoreError;

/// The hash algorithm used to produce a content digest.
///
/// Only SHA-256 is produced today. The tag travels with every digest so a
/// future algorithm can coexist with stored references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            other => Err(CoreError::InvalidDigest(format!(
                "unsupported digest algorithm {other:?}"
            ))),
        }
    }
}

/// A content-addressed digest with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest {
    algorithm: DigestAlgorithm,
    bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a content digest from raw bytes and algorithm.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// The hash algorithm that produced this digest.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The raw 32-byte digest value.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Render the digest as a lowercase hex string (no algorithm prefix).
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a bare 64-character hex digest, assuming SHA-256.
    pub fn from_hex(hex: &str) -> Result<Self, CoreError> {
        let bytes = decode_hex32(hex)?;
        Ok(Self::new(DigestAlgorithm::Sha256, bytes))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl FromStr for ContentDigest {
    type Err = CoreError;

    /// Parse `algorithm:hex`. A bare hex string is rejected so that stored
    /// references always stay self-describing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algorithm, hex) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidDigest(format!("missing algorithm prefix in {s:?}")))?;
        let algorithm = algorithm.parse::<DigestAlgorithm>()?;
        let bytes = decode_hex32(hex)?;
        Ok(Self::new(algorithm, bytes))
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    sha256_raw(data.as_bytes())
}

/// Compute the content address of an opaque document.
///
/// Documents are hashed exactly as stored. Two uploads of identical bytes
/// always yield the same digest.
pub fn sha256_document(document: &[u8]) -> ContentDigest {
    sha256_raw(document)
}

fn sha256_raw(data: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}

/// Decode exactly 32 bytes from 64 hex characters (case-insensitive).
pub(crate) fn decode_hex32(hex: &str) -> Result<[u8; 32], CoreError> {
    let hex = hex.trim();
    if hex.len() != 64 {
        return Err(CoreError::InvalidDigest(format!(
            "digest must be 64 hex chars, got {}",
            hex.len()
        )));
    }
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CoreError::InvalidDigest(
            "digest contains non-hex characters".into(),
        ));
    }
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|e| {
            CoreError::InvalidDigest(format!("invalid hex at position {}: {e}", i * 2))
        })?;
    }
    Ok(out)
}
