//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the three identifiers the registry passes around.
//! You cannot hand a `ContentRef` to something expecting a `CertificateId`,
//! and none of them can be built from an unchecked string.
//!
//! | Type | Textual form | Assigned by |
//! |---|---|---|
//! | [`CertificateId`] | `0x` + 64 lowercase hex | the ledger |
//! | [`ActorId`] | 1..=128 printable chars, lowercased | the deployment |
//! | [`ContentRef`] | `sha256:` + 64 lowercase hex | the content store |

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::canonical::CanonicalBytes;
use crate::digest::{decode_hex32, sha256_digest, sha256_document, ContentDigest};
use crate::error::CoreError;

/// Maximum length of an actor identity, in characters.
pub const ACTOR_ID_MAX_LEN: usize = 128;

// -- CertificateId ----------------------------------------------------------

/// Identifier of a certificate record.
///
/// Only the ledger mints these, through [`CertificateId::derive()`]. Callers
/// obtain them from `issue` or parse them from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CertificateId([u8; 32]);

impl CertificateId {
    /// Derive the identifier for the `sequence`-th record of `namespace`.
    ///
    /// The id is SHA-256 over the JCS bytes of
    /// `{"namespace": namespace, "sequence": sequence}`.
    pub fn derive(namespace: &str, sequence: u64) -> Result<Self, CoreError> {
        let seed = CanonicalBytes::new(&serde_json::json!({
            "namespace": namespace,
            "sequence": sequence,
        }))?;
        Ok(Self(*sha256_digest(&seed).as_bytes()))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex without the `0x` prefix.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for CertificateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl FromStr for CertificateId {
    type Err = CoreError;

    /// Accepts `0x`-prefixed or bare 64-char hex, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        decode_hex32(hex)
            .map(Self)
            .map_err(|_| CoreError::InvalidIdentifier {
                kind: "certificate id",
                reason: format!("expected 0x followed by 64 hex characters, got {s:?}"),
            })
    }
}

// -- ActorId ----------------------------------------------------------------

/// Identity of a caller: an account address, key id, or service name.
///
/// Normalized to ASCII lowercase so `0xABC` and `0xabc` are the same actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(String);

impl ActorId {
    /// Validate and normalize an actor identity.
    ///
    /// Leading and trailing whitespace is trimmed. The remainder must be
    /// 1 to 128 characters with no interior whitespace or control characters.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let trimmed = raw.as_ref().trim();
        let invalid = |reason: String| CoreError::InvalidIdentifier {
            kind: "actor id",
            reason,
        };
        if trimmed.is_empty() {
            return Err(invalid("must not be empty".into()));
        }
        let len = trimmed.chars().count();
        if len > ACTOR_ID_MAX_LEN {
            return Err(invalid(format!(
                "must be at most {ACTOR_ID_MAX_LEN} characters, got {len}"
            )));
        }
        if let Some(c) = trimmed.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid(format!("contains disallowed character {c:?}")));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ActorId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ActorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// -- ContentRef -------------------------------------------------------------

/// Content address of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentRef(ContentDigest);

impl ContentRef {
    /// The reference a content store must return for `document`.
    pub fn for_document(document: &[u8]) -> Self {
        Self(sha256_document(document))
    }

    pub fn from_digest(digest: ContentDigest) -> Self {
        Self(digest)
    }

    pub fn digest(&self) -> &ContentDigest {
        &self.0
    }

    /// Bare hex digest, used as a storage key by backends.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ContentRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<ContentDigest>()
            .map(Self)
            .map_err(|e| CoreError::InvalidIdentifier {
                kind: "content ref",
                reason: e.to_string(),
            })
    }
}

// Identifiers serialize as their display strings.
macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(CertificateId);
string_serde!(ActorId);
string_serde!(ContentRef);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certificate_id_derivation_is_deterministic() {
        let a = CertificateId::derive("certreg", 1).unwrap();
        let b = CertificateId::derive("certreg", 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn certificate_id_differs_by_sequence_and_namespace() {
        let a = CertificateId::derive("certreg", 1).unwrap();
        let b = CertificateId::derive("certreg", 2).unwrap();
        let c = CertificateId::derive("other", 1).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn certificate_id_display_shape() {
        let id = CertificateId::derive("certreg", 42).unwrap();
        let s = id.to_string();
        assert!(s.starts_with("0x"));
        assert_eq!(s.len(), 66);
        assert!(s[2..].bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn certificate_id_parse_variants() {
        let id = CertificateId::derive("certreg", 3).unwrap();
        assert_eq!(id.to_string().parse::<CertificateId>().unwrap(), id);
        assert_eq!(id.to_hex().parse::<CertificateId>().unwrap(), id);
        assert_eq!(
            format!("0X{}", id.to_hex().to_uppercase()).parse::<CertificateId>().unwrap(),
            id
        );
    }

    #[test]
    fn certificate_id_parse_rejects_bad_input() {
        let non_hex = format!("0x{}", "g".repeat(64));
        let inputs: [&str; 5] = ["", "0x", "0x1234", "not-an-id", &non_hex];
        for bad in inputs {
            let err = bad.parse::<CertificateId>().unwrap_err();
            assert!(matches!(err, CoreError::InvalidIdentifier { kind: "certificate id", .. }));
        }
    }

    #[test]
    fn actor_id_normalizes_case_and_trims() {
        let a = ActorId::new("  0xAbCdEf  ").unwrap();
        assert_eq!(a.as_str(), "0xabcdef");
        assert_eq!(a, ActorId::new("0xABCDEF").unwrap());
    }

    #[test]
    fn actor_id_rejects_empty_and_blank() {
        assert!(ActorId::new("").is_err());
        assert!(ActorId::new("   ").is_err());
    }

    #[test]
    fn actor_id_rejects_interior_whitespace_and_controls() {
        assert!(ActorId::new("alice smith").is_err());
        assert!(ActorId::new("alice\tsmith").is_err());
        assert!(ActorId::new("alice\u{0}").is_err());
    }

    #[test]
    fn actor_id_length_limit() {
        assert!(ActorId::new("a".repeat(ACTOR_ID_MAX_LEN)).is_ok());
        assert!(ActorId::new("a".repeat(ACTOR_ID_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn actor_id_allows_non_ascii_letters() {
        let a = ActorId::new("registrar@université").unwrap();
        assert_eq!(a.as_str(), "registrar@université");
    }

    #[test]
    fn content_ref_for_identical_bytes_is_identical() {
        assert_eq!(ContentRef::for_document(b"doc"), ContentRef::for_document(b"doc"));
        assert_ne!(ContentRef::for_document(b"doc"), ContentRef::for_document(b"doc2"));
    }

    #[test]
    fn content_ref_parse_and_display() {
        let r = ContentRef::for_document(b"diploma");
        let parsed: ContentRef = r.to_string().parse().unwrap();
        assert_eq!(parsed, r);
        assert!("sha256:nothex".parse::<ContentRef>().is_err());
    }

    #[test]
    fn identifiers_serialize_as_strings() {
        let id = CertificateId::derive("certreg", 1).unwrap();
        let actor = ActorId::new("Registrar").unwrap();
        let cref = ContentRef::for_document(b"x");
        let v = serde_json::json!({"id": id, "actor": actor, "content_ref": cref});
        assert_eq!(v["id"], id.to_string());
        assert_eq!(v["actor"], "registrar");
        assert_eq!(v["content_ref"], cref.to_string());
    }

    #[test]
    fn actor_deserialization_validates() {
        assert!(serde_json::from_str::<ActorId>("\"\"").is_err());
        let a: ActorId = serde_json::from_str("\"Bob\"").unwrap();
        assert_eq!(a.as_str(), "bob");
    }
}
