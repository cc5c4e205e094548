//! # oreg-crypto — Document Link Trust
//!
//! Signed download links for stored documents:
//!
//! - **Ed25519** keys and signatures over `CanonicalBytes` link payloads.
//! - **Keyring** of verification keys indexed by 8-character key id.
//! - **TrustChain**: one active signing key, URL signing and verification,
//!   rotation without invalidating links signed by earlier keys.
//! - **TrustConfig**: startup configuration from YAML or the environment.
//!
//! ## Crate Policy
//!
//! - Depends only on `oreg-core` internally.
//! - Private key material is never serialized or logged.
//! - Tests use real Ed25519 keys, never mocked signatures.

pub mod config;
pub mod ed25519;
pub mod keyring;
pub mod trust;

pub use config::{KeyConfigError, TrustConfig};
pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, KeyId};
pub use keyring::{parse_key_list, Keyring};
pub use trust::{
    DocumentLinker, SharedTrustChain, TrustChain, UntrustedReason, UntrustedReferenceError,
    VerifiedLink,
};
