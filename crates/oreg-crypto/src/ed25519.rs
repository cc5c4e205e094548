//! # Ed25519 Keys and Signatures
//!
//! Key material for signing document links.
//!
//! ## Security Invariant
//!
//! - Signing input MUST be `&CanonicalBytes`. A link signature can only be
//!   produced over the JCS form of the link payload, so any verifier can
//!   rebuild the signed bytes exactly.
//! - Private keys are never serialized or logged. `Ed25519KeyPair` does not
//!   implement `Serialize` and its `Debug` output hides the key.
//!
//! ## Key Ids
//!
//! A [`KeyId`] is the first 8 hex characters of the public key. It travels
//! in every signed URL so the verifier can pick the right key from its
//! keyring.

use std::fmt;

use ed25519_dalek::{Signer, Verifier};
use oreg_core::{CanonicalBytes, CryptoError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of a key id in hex characters.
pub const KEY_ID_LEN: usize = 8;

/// An Ed25519 public key (32 bytes).
///
/// Serializes as a hex-encoded string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

/// An Ed25519 signature (64 bytes). Serializes as a hex-encoded string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519Signature(pub [u8; 64]);

/// An Ed25519 key pair for signing operations.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

/// Short identifier of a verification key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyId(String);

// ---------------------------------------------------------------------------
// KeyId
// ---------------------------------------------------------------------------

impl KeyId {
    /// Parse an 8-character hex key id.
    pub fn parse(raw: &str) -> Result<Self, CryptoError> {
        if raw.len() != KEY_ID_LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CryptoError::KeyError(format!(
                "key id must be {KEY_ID_LEN} hex chars, got {raw:?}"
            )));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for KeyId {
    type Error = CryptoError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<KeyId> for String {
    fn from(id: KeyId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Ed25519PublicKey
// ---------------------------------------------------------------------------

impl Ed25519PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a public key from a 64-character hex string.
    pub fn from_hex(raw: &str) -> Result<Self, CryptoError> {
        let raw = raw.trim();
        if raw.len() != 64 {
            return Err(CryptoError::KeyError(format!(
                "public key hex must be 64 chars, got {}",
                raw.len()
            )));
        }
        let mut arr = [0u8; 32];
        hex::decode_to_slice(raw, &mut arr)
            .map_err(|e| CryptoError::KeyError(format!("invalid public key hex: {e}")))?;
        Ok(Self(arr))
    }

    /// The key id carried in signed links.
    pub fn key_id(&self) -> KeyId {
        KeyId(self.to_hex()[..KEY_ID_LEN].to_string())
    }

    /// Convert to a dalek verifying key, checking the point is valid.
    pub fn to_verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::KeyError(format!("invalid public key: {e}")))
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", self.key_id())
    }
}

impl fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Ed25519Signature
// ---------------------------------------------------------------------------

impl Ed25519Signature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a signature from a 128-character hex string.
    pub fn from_hex(raw: &str) -> Result<Self, CryptoError> {
        let raw = raw.trim();
        if raw.len() != 128 {
            return Err(CryptoError::VerificationFailed(format!(
                "signature hex must be 128 chars, got {}",
                raw.len()
            )));
        }
        let mut arr = [0u8; 64];
        hex::decode_to_slice(raw, &mut arr)
            .map_err(|e| CryptoError::VerificationFailed(format!("invalid signature hex: {e}")))?;
        Ok(Self(arr))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Signature({}...)", &self.to_hex()[..KEY_ID_LEN])
    }
}

impl fmt::Display for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Ed25519KeyPair
// ---------------------------------------------------------------------------

impl Ed25519KeyPair {
    /// Generate a new random key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Key pair from a raw 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Key pair from a 64-character hex seed.
    pub fn from_seed_hex(raw: &str) -> Result<Self, CryptoError> {
        let raw = raw.trim();
        if raw.len() != 64 {
            return Err(CryptoError::KeyError(format!(
                "signing key seed must be 64 hex chars, got {}",
                raw.len()
            )));
        }
        let mut seed = [0u8; 32];
        hex::decode_to_slice(raw, &mut seed)
            .map_err(|e| CryptoError::KeyError(format!("invalid signing key hex: {e}")))?;
        Ok(Self::from_seed(&seed))
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn key_id(&self) -> KeyId {
        self.public_key().key_id()
    }

    /// Sign canonical bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(data.as_bytes()).to_bytes())
    }
}

impl fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}

/// Verify a signature over canonical bytes.
pub fn verify(
    data: &CanonicalBytes,
    signature: &Ed25519Signature,
    verifying_key: &ed25519_dalek::VerifyingKey,
) -> Result<(), CryptoError> {
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key
        .verify(data.as_bytes(), &sig)
        .map_err(|e| CryptoError::VerificationFailed(format!("Ed25519 verification failed: {e}")))
}
