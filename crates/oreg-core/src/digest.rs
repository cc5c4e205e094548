//! # Content Hash — Composite `scheme:hexdigest` Values
//!
//! Defines `HashAlgorithm` and `HashValue`, the self-describing content hash
//! attached to stored documents and covered by their signed download links.
//!
//! ## Parsing Order
//!
//! A raw string is checked in a fixed order, each stage failing with its own
//! message:
//!
//! 1. scheme must be one of `md5`, `sha1`, `sha256`, `sha512`
//!    (`Hash type is not supported.`),
//! 2. digest length must equal the scheme's hex length
//!    (`Hash value is wrong length.`),
//! 3. digest must be hexadecimal — a conversion failure
//!    (`Hash value is not hexadecimal.`).
//!
//! A value that passes renders back to the identical string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

pub(crate) const MSG_UNSUPPORTED: &str = "Hash type is not supported.";
pub(crate) const MSG_WRONG_LENGTH: &str = "Hash value is wrong length.";
pub(crate) const MSG_NOT_HEX: &str = "Hash value is not hexadecimal.";

/// The hash algorithms accepted in a composite hash value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// MD5 — 128-bit digest.
    Md5,
    /// SHA-1 — 160-bit digest.
    Sha1,
    /// SHA-256 — 256-bit digest.
    Sha256,
    /// SHA-512 — 512-bit digest.
    Sha512,
}

impl HashAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [HashAlgorithm; 4] = [Self::Md5, Self::Sha1, Self::Sha256, Self::Sha512];

    /// Returns the scheme prefix used in the composite string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Look up an algorithm by its scheme prefix.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == scheme)
    }

    /// Length of the digest in hex characters.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content hash with its algorithm tag, e.g. `md5:0cc175b9c0f1b6a831c399e269772661`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashValue {
    algorithm: HashAlgorithm,
    digest: String,
}

impl HashValue {
    /// Parse a composite `scheme:hexdigest` string.
    ///
    /// # Errors
    ///
    /// `TypeError::Validation` for an unsupported scheme or a digest of the
    /// wrong length, `TypeError::Conversion` for a non-hexadecimal digest.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let (scheme, digest) = raw
            .split_once(':')
            .ok_or_else(|| TypeError::Validation(MSG_UNSUPPORTED.to_string()))?;
        let algorithm = HashAlgorithm::from_scheme(scheme)
            .ok_or_else(|| TypeError::Validation(MSG_UNSUPPORTED.to_string()))?;
        if digest.len() != algorithm.hex_len() {
            return Err(TypeError::Validation(MSG_WRONG_LENGTH.to_string()));
        }
        if !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TypeError::Conversion(MSG_NOT_HEX.to_string()));
        }
        Ok(Self {
            algorithm,
            digest: digest.to_string(),
        })
    }

    /// The algorithm tag.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The hex digest, exactly as supplied.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.digest)
    }
}

impl FromStr for HashValue {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for HashValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HashValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_round_trips_unchanged() {
        let raw = format!("md5:{}", uuid::Uuid::new_v4().simple());
        let parsed = HashValue::parse(&raw).unwrap();
        assert_eq!(parsed.to_string(), raw);
        assert_eq!(parsed.algorithm(), HashAlgorithm::Md5);
    }

    #[test]
    fn unsupported_schemes() {
        for raw in ["test", ":", "test:", "bogus:xyz"] {
            assert_eq!(
                HashValue::parse(raw),
                Err(TypeError::Validation(MSG_UNSUPPORTED.to_string())),
                "{raw}"
            );
        }
    }

    #[test]
    fn wrong_length() {
        assert_eq!(
            HashValue::parse("sha512:"),
            Err(TypeError::Validation(MSG_WRONG_LENGTH.to_string()))
        );
        assert!(HashValue::parse("sha1:abc").is_err());
    }

    #[test]
    fn not_hexadecimal_is_conversion_failure() {
        let raw = format!("md5:{}", "-".repeat(32));
        let err = HashValue::parse(&raw).unwrap_err();
        assert!(err.is_conversion());
        assert_eq!(err.message(), MSG_NOT_HEX);
    }

    #[test]
    fn length_checked_before_alphabet() {
        // Too short and non-hex: the length message wins.
        let err = HashValue::parse("md5:zz").unwrap_err();
        assert_eq!(err.message(), MSG_WRONG_LENGTH);
    }

    #[test]
    fn uppercase_hex_kept_verbatim() {
        let raw = format!("sha1:{}", "ABCDEF0123".repeat(4));
        assert_eq!(HashValue::parse(&raw).unwrap().to_string(), raw);
    }

    #[test]
    fn serde_as_plain_string() {
        let h = HashValue::parse(&format!("sha256:{}", "0f".repeat(32))).unwrap();
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{h}\""));
        let back: HashValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
        assert!(serde_json::from_str::<HashValue>("\"sha512:\"").is_err());
    }
}
