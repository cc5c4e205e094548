//! Trust configuration: the document signing key, extra verification keys,
//! and the document service base URL.
//!
//! Loaded from YAML or from environment variables. A missing or malformed
//! signing key is a startup error; only [`TrustConfig::build_ephemeral_chain`]
//! generates a throwaway key, and it says so loudly.

use std::path::{Path, PathBuf};

use oreg_core::CryptoError;
use serde::{Deserialize, Serialize};

use crate::ed25519::Ed25519KeyPair;
use crate::keyring::parse_key_list;
use crate::trust::{DocumentLinker, SharedTrustChain, TrustChain};

pub const ENV_DOCKEY: &str = "OREG_DOCKEY";
pub const ENV_DOCKEYS: &str = "OREG_DOCKEYS";
pub const ENV_DOCSERVICE_URL: &str = "OREG_DOCSERVICE_URL";
pub const ENV_LINK_TTL_SECS: &str = "OREG_LINK_TTL_SECS";

/// Startup trust settings.
///
/// Custom `Debug` redacts the signing seed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrustConfig {
    /// Hex-encoded 32-byte Ed25519 seed of the active signing key.
    pub dockey: Option<String>,
    /// Hex public keys trusted for verification, separated by NUL or comma.
    pub dockeys: Option<String>,
    /// Base URL signed document links are issued under.
    pub docservice_url: Option<String>,
    /// Maximum accepted link age in seconds.
    pub link_ttl_secs: Option<u64>,
}

impl std::fmt::Debug for TrustConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustConfig")
            .field("dockey", &self.dockey.as_ref().map(|_| "[REDACTED]"))
            .field("dockeys", &self.dockeys)
            .field("docservice_url", &self.docservice_url)
            .field("link_ttl_secs", &self.link_ttl_secs)
            .finish()
    }
}

/// Trust configuration could not be loaded or applied.
#[derive(Debug, thiserror::Error)]
pub enum KeyConfigError {
    #[error("document signing key is not configured (set OREG_DOCKEY or `dockey`)")]
    MissingSigningKey,
    #[error("invalid document signing key: {0}")]
    InvalidSigningKey(#[source] CryptoError),
    #[error("invalid verification key list: {0}")]
    InvalidVerificationKeys(#[source] CryptoError),
    #[error("document service URL is not configured (set OREG_DOCSERVICE_URL or `docservice_url`)")]
    MissingDocserviceUrl,
    #[error("invalid document service URL: {0}")]
    InvalidDocserviceUrl(#[source] CryptoError),
    #[error("invalid OREG_LINK_TTL_SECS value {value:?}: {reason}")]
    InvalidTtl { value: String, reason: String },
    #[error("failed to read trust config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse trust config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TrustConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, KeyConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, KeyConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| KeyConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Load from the process environment.
    ///
    /// Variables: `OREG_DOCKEY`, `OREG_DOCKEYS`, `OREG_DOCSERVICE_URL`,
    /// `OREG_LINK_TTL_SECS`. Unset variables leave the field empty.
    pub fn from_env() -> Result<Self, KeyConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, KeyConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let link_ttl_secs = match non_empty(ENV_LINK_TTL_SECS) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| KeyConfigError::InvalidTtl {
                value: raw.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };
        Ok(Self {
            dockey: non_empty(ENV_DOCKEY),
            dockeys: non_empty(ENV_DOCKEYS),
            docservice_url: non_empty(ENV_DOCSERVICE_URL),
            link_ttl_secs,
        })
    }

    /// Fields set in `other` take precedence.
    #[must_use]
    pub fn overlay(self, other: TrustConfig) -> Self {
        Self {
            dockey: other.dockey.or(self.dockey),
            dockeys: other.dockeys.or(self.dockeys),
            docservice_url: other.docservice_url.or(self.docservice_url),
            link_ttl_secs: other.link_ttl_secs.or(self.link_ttl_secs),
        }
    }

    /// The trust chain for the configured signing key.
    pub fn build_chain(&self) -> Result<TrustChain, KeyConfigError> {
        let seed = self.dockey.as_deref().ok_or(KeyConfigError::MissingSigningKey)?;
        let active = Ed25519KeyPair::from_seed_hex(seed).map_err(KeyConfigError::InvalidSigningKey)?;
        self.assemble(active)
    }

    /// A trust chain with a freshly generated signing key.
    ///
    /// Links signed by it cannot be verified after the process exits.
    pub fn build_ephemeral_chain(&self) -> Result<TrustChain, KeyConfigError> {
        tracing::warn!(
            "generating ephemeral document signing key; \
             links signed with it will not verify after restart"
        );
        self.assemble(Ed25519KeyPair::generate())
    }

    fn assemble(&self, active: Ed25519KeyPair) -> Result<TrustChain, KeyConfigError> {
        let extra = match &self.dockeys {
            Some(raw) => parse_key_list(raw).map_err(KeyConfigError::InvalidVerificationKeys)?,
            None => Vec::new(),
        };
        let mut chain = TrustChain::new(active)
            .with_verification_keys(extra)
            .map_err(KeyConfigError::InvalidVerificationKeys)?;
        if let Some(ttl) = self.link_ttl_secs {
            chain = chain.with_max_age(ttl);
        }
        let keyring: Vec<String> = chain.keyring().key_ids().map(ToString::to_string).collect();
        tracing::info!(
            active = %chain.active_key_id(),
            keyring = ?keyring,
            link_ttl_secs = ?self.link_ttl_secs,
            "document trust chain ready"
        );
        Ok(chain)
    }

    /// A linker over `chain` for the configured document service.
    pub fn build_linker(&self, chain: TrustChain) -> Result<DocumentLinker, KeyConfigError> {
        let base = self
            .docservice_url
            .as_deref()
            .ok_or(KeyConfigError::MissingDocserviceUrl)?;
        DocumentLinker::new(SharedTrustChain::new(chain), base).map_err(KeyConfigError::InvalidDocserviceUrl)
    }
}
