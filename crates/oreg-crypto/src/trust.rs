//! # Document Link Trust Chain
//!
//! Signs and verifies the download URLs of stored documents.
//!
//! A signed link has the shape
//!
//! ```text
//! <base>/<id>?Hash=<hash>&KeyID=<kid>&Issued=<epoch secs>&Signature=<hex>
//! ```
//!
//! The signature covers the JCS form of `{"hash", "id", "issued"}`, so the
//! verifier rebuilds the signed bytes from the URL alone. `Hash` is omitted
//! when the document has no content hash; the payload then carries `null`.
//!
//! ## Rotation
//!
//! A chain has exactly one active signing key. Its keyring holds every key
//! that was ever active plus keys registered for verification only. Chains
//! are immutable: `rotate`, `register` and `retire` return a new chain, and
//! [`SharedTrustChain`] swaps the whole snapshot under a lock.

use std::fmt;
use std::sync::Arc;

use oreg_core::{CanonicalBytes, CryptoError, DocumentIdentity, HashValue, LinkSigner, Timestamp};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::ed25519::{verify, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, KeyId};
use crate::keyring::Keyring;

/// Query parameter names of a signed link. Fixed once published.
pub const PARAM_HASH: &str = "Hash";
pub const PARAM_KEY_ID: &str = "KeyID";
pub const PARAM_ISSUED: &str = "Issued";
pub const PARAM_SIGNATURE: &str = "Signature";

/// Why a document reference was not trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UntrustedReason {
    /// The link names a key id absent from the keyring.
    UnknownKey,
    /// The link could not be parsed.
    Malformed,
    /// The signature does not match the link contents.
    SignatureMismatch,
    /// The link is older than the configured maximum age.
    Expired,
}

impl fmt::Display for UntrustedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnknownKey => "unknown key",
            Self::Malformed => "malformed",
            Self::SignatureMismatch => "signature mismatch",
            Self::Expired => "expired",
        })
    }
}

/// A document link failed verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("untrusted document reference ({reason}): {detail}")]
pub struct UntrustedReferenceError {
    pub reason: UntrustedReason,
    pub detail: String,
}

impl UntrustedReferenceError {
    fn new(reason: UntrustedReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    fn malformed(detail: impl Into<String>) -> Self {
        Self::new(UntrustedReason::Malformed, detail)
    }
}

/// The bytes a link signature covers.
#[derive(Serialize)]
struct LinkPayload<'a> {
    id: &'a str,
    hash: Option<String>,
    issued: i64,
}

impl LinkPayload<'_> {
    fn canonical(&self) -> Result<CanonicalBytes, CryptoError> {
        CanonicalBytes::new(self).map_err(|e| CryptoError::Payload(e.to_string()))
    }
}

/// A link that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedLink {
    pub document: DocumentIdentity,
    pub key_id: KeyId,
    pub issued: Timestamp,
}

/// One active signing key plus the keys trusted for verification.
#[derive(Clone)]
pub struct TrustChain {
    active: Arc<Ed25519KeyPair>,
    keyring: Keyring,
    max_age_secs: Option<i64>,
}

impl TrustChain {
    /// Chain signing with `active`; its own key is trusted.
    pub fn new(active: Ed25519KeyPair) -> Self {
        Self {
            keyring: Keyring::with_key(active.public_key()),
            active: Arc::new(active),
            max_age_secs: None,
        }
    }

    /// Also trust every key in `keys`.
    ///
    /// # Errors
    ///
    /// `CryptoError::KeyError` if a key's id is already held by a different
    /// key.
    pub fn with_verification_keys(
        mut self,
        keys: impl IntoIterator<Item = Ed25519PublicKey>,
    ) -> Result<Self, CryptoError> {
        for key in keys {
            self.keyring.insert(key)?;
        }
        Ok(self)
    }

    /// Reject links issued more than `secs` seconds before verification.
    #[must_use]
    pub fn with_max_age(mut self, secs: u64) -> Self {
        self.max_age_secs = Some(i64::try_from(secs).unwrap_or(i64::MAX));
        self
    }

    pub fn active_key_id(&self) -> KeyId {
        self.active.key_id()
    }

    pub fn active_public_key(&self) -> Ed25519PublicKey {
        self.active.public_key()
    }

    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    pub fn max_age_secs(&self) -> Option<i64> {
        self.max_age_secs
    }

    /// Sign a link to `document` under `base`, issued now.
    pub fn sign(&self, document: &DocumentIdentity, base: &Url) -> Result<Url, CryptoError> {
        self.sign_at(document, base, Timestamp::now())
    }

    /// Sign a link to `document` under `base` with an explicit issue time.
    pub fn sign_at(
        &self,
        document: &DocumentIdentity,
        base: &Url,
        issued: Timestamp,
    ) -> Result<Url, CryptoError> {
        let hash = document.hash.as_ref().map(HashValue::to_string);
        let payload = LinkPayload {
            id: &document.id,
            hash: hash.clone(),
            issued: issued.epoch_secs(),
        };
        let signature = self.active.sign(&payload.canonical()?);

        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| CryptoError::Payload(format!("base URL cannot carry a path: {base}")))?
            .pop_if_empty()
            .push(&document.id);
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            if let Some(hash) = &hash {
                query.append_pair(PARAM_HASH, hash);
            }
            query
                .append_pair(PARAM_KEY_ID, self.active.key_id().as_str())
                .append_pair(PARAM_ISSUED, &issued.epoch_secs().to_string())
                .append_pair(PARAM_SIGNATURE, &signature.to_hex());
        }
        tracing::debug!(document = %document.id, key_id = %self.active.key_id(), "signed document link");
        Ok(url)
    }

    /// Verify a signed link against the keyring, now.
    pub fn verify(&self, url: &str) -> Result<VerifiedLink, UntrustedReferenceError> {
        self.verify_at(url, Timestamp::now())
    }

    /// Verify a signed link as of `now`.
    ///
    /// The signature is checked before the age, so a forged link always
    /// reports a mismatch rather than expiry.
    pub fn verify_at(&self, url: &str, now: Timestamp) -> Result<VerifiedLink, UntrustedReferenceError> {
        let result = self.check(url, now);
        match &result {
            Ok(link) => {
                tracing::debug!(document = %link.document.id, key_id = %link.key_id, "verified document link")
            }
            Err(e) => tracing::warn!(reason = %e.reason, detail = %e.detail, "rejected document link"),
        }
        result
    }

    fn check(&self, url: &str, now: Timestamp) -> Result<VerifiedLink, UntrustedReferenceError> {
        let parsed = ParsedLink::parse(url)?;
        let key = self.keyring.get(&parsed.key_id).ok_or_else(|| {
            UntrustedReferenceError::new(
                UntrustedReason::UnknownKey,
                format!("key id {} is not in the keyring", parsed.key_id),
            )
        })?;
        let verifying_key = key
            .to_verifying_key()
            .map_err(|e| UntrustedReferenceError::new(UntrustedReason::UnknownKey, e.to_string()))?;

        let payload = LinkPayload {
            id: &parsed.document.id,
            hash: parsed.document.hash.as_ref().map(HashValue::to_string),
            issued: parsed.issued.epoch_secs(),
        };
        let canonical = payload
            .canonical()
            .map_err(|e| UntrustedReferenceError::malformed(e.to_string()))?;
        verify(&canonical, &parsed.signature, &verifying_key).map_err(|e| {
            UntrustedReferenceError::new(UntrustedReason::SignatureMismatch, e.to_string())
        })?;

        if let Some(max_age) = self.max_age_secs {
            let age = now.epoch_secs().saturating_sub(parsed.issued.epoch_secs());
            if age > max_age {
                return Err(UntrustedReferenceError::new(
                    UntrustedReason::Expired,
                    format!("issued {age}s ago, limit is {max_age}s"),
                ));
            }
        }

        Ok(VerifiedLink {
            document: parsed.document,
            key_id: parsed.key_id,
            issued: parsed.issued,
        })
    }

    /// A chain signing with `next`; the current key stays trusted.
    ///
    /// Fails if `next` collides with the id of a different trusted key.
    pub fn rotate(&self, next: Ed25519KeyPair) -> Result<Self, CryptoError> {
        let mut keyring = self.keyring.clone();
        keyring.insert(next.public_key())?;
        Ok(Self {
            active: Arc::new(next),
            keyring,
            max_age_secs: self.max_age_secs,
        })
    }

    /// A chain that also trusts `key` for verification.
    pub fn register(&self, key: Ed25519PublicKey) -> Result<Self, CryptoError> {
        let mut next = self.clone();
        next.keyring.insert(key)?;
        Ok(next)
    }

    /// A chain that no longer trusts `id`. The active key cannot be retired.
    pub fn retire(&self, id: &KeyId) -> Result<Self, CryptoError> {
        if *id == self.active.key_id() {
            return Err(CryptoError::KeyError(format!("key {id} is the active signing key")));
        }
        let mut next = self.clone();
        if next.keyring.remove(id).is_none() {
            return Err(CryptoError::KeyError(format!("key {id} is not in the keyring")));
        }
        Ok(next)
    }
}

impl fmt::Debug for TrustChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustChain")
            .field("active", &self.active.key_id())
            .field("keyring", &self.keyring.key_ids().collect::<Vec<_>>())
            .field("max_age_secs", &self.max_age_secs)
            .finish()
    }
}

/// The pieces of a signed link URL.
struct ParsedLink {
    document: DocumentIdentity,
    key_id: KeyId,
    issued: Timestamp,
    signature: Ed25519Signature,
}

impl ParsedLink {
    fn parse(raw: &str) -> Result<Self, UntrustedReferenceError> {
        let url = Url::parse(raw).map_err(|e| UntrustedReferenceError::malformed(format!("not a URL: {e}")))?;
        let id = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| UntrustedReferenceError::malformed("missing document id"))?
            .to_string();

        let mut hash = None;
        let mut key_id = None;
        let mut issued = None;
        let mut signature = None;
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                PARAM_HASH => hash = Some(value.into_owned()),
                PARAM_KEY_ID => key_id = Some(value.into_owned()),
                PARAM_ISSUED => issued = Some(value.into_owned()),
                PARAM_SIGNATURE => signature = Some(value.into_owned()),
                _ => {}
            }
        }

        let require = |value: Option<String>, name: &str| {
            value.ok_or_else(|| UntrustedReferenceError::malformed(format!("missing {name}")))
        };
        let key_id = KeyId::parse(&require(key_id, PARAM_KEY_ID)?)
            .map_err(|e| UntrustedReferenceError::malformed(e.to_string()))?;
        let issued = require(issued, PARAM_ISSUED)?
            .parse::<i64>()
            .map_err(|e| UntrustedReferenceError::malformed(format!("bad {PARAM_ISSUED}: {e}")))
            .and_then(|secs| {
                Timestamp::from_epoch_secs(secs)
                    .map_err(|e| UntrustedReferenceError::malformed(e.message().to_string()))
            })?;
        let signature = Ed25519Signature::from_hex(&require(signature, PARAM_SIGNATURE)?)
            .map_err(|e| UntrustedReferenceError::malformed(e.to_string()))?;
        let hash = hash
            .map(|h| HashValue::parse(&h))
            .transpose()
            .map_err(|e| UntrustedReferenceError::malformed(format!("bad {PARAM_HASH}: {}", e.message())))?;

        Ok(Self {
            document: DocumentIdentity::new(id, hash),
            key_id,
            issued,
            signature,
        })
    }
}

/// A trust chain that can be rotated while links are being verified.
///
/// Readers take an `Arc` snapshot; writers build a new chain and swap it in,
/// so no reader ever sees a half-updated keyring.
#[derive(Clone)]
pub struct SharedTrustChain {
    current: Arc<RwLock<Arc<TrustChain>>>,
}

impl SharedTrustChain {
    pub fn new(chain: TrustChain) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(chain))),
        }
    }

    pub fn snapshot(&self) -> Arc<TrustChain> {
        Arc::clone(&self.current.read())
    }

    /// Make `next` the active key. Returns the new active key id.
    ///
    /// On error the current chain stays in place.
    pub fn rotate(&self, next: Ed25519KeyPair) -> Result<KeyId, CryptoError> {
        let mut guard = self.current.write();
        let chain = guard.rotate(next)?;
        let id = chain.active_key_id();
        tracing::info!(key_id = %id, keyring = chain.keyring().len(), "rotated signing key");
        *guard = Arc::new(chain);
        Ok(id)
    }

    pub fn register(&self, key: Ed25519PublicKey) -> Result<(), CryptoError> {
        let mut guard = self.current.write();
        let chain = guard.register(key)?;
        *guard = Arc::new(chain);
        Ok(())
    }

    pub fn retire(&self, id: &KeyId) -> Result<(), CryptoError> {
        let mut guard = self.current.write();
        let chain = guard.retire(id)?;
        tracing::info!(key_id = %id, "retired verification key");
        *guard = Arc::new(chain);
        Ok(())
    }

    pub fn verify(&self, url: &str) -> Result<VerifiedLink, UntrustedReferenceError> {
        self.snapshot().verify(url)
    }
}

impl fmt::Debug for SharedTrustChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedTrustChain").field(&*self.snapshot()).finish()
    }
}

/// Signs document URLs under the document service base URL.
#[derive(Debug, Clone)]
pub struct DocumentLinker {
    chain: SharedTrustChain,
    base: Url,
}

impl DocumentLinker {
    pub fn new(chain: SharedTrustChain, base: &str) -> Result<Self, CryptoError> {
        let base = Url::parse(base)
            .map_err(|e| CryptoError::KeyError(format!("invalid document service URL {base:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(CryptoError::KeyError(format!(
                "document service URL {base} cannot carry a path"
            )));
        }
        Ok(Self { chain, base })
    }

    pub fn chain(&self) -> &SharedTrustChain {
        &self.chain
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn sign_document_url(&self, document: &DocumentIdentity) -> Result<String, CryptoError> {
        Ok(self.chain.snapshot().sign(document, &self.base)?.to_string())
    }

    pub fn verify_document_url(&self, url: &str) -> Result<VerifiedLink, UntrustedReferenceError> {
        self.chain.verify(url)
    }
}

impl LinkSigner for DocumentLinker {
    fn sign_link(&self, document: &DocumentIdentity) -> Result<String, CryptoError> {
        self.sign_document_url(document)
    }
}
