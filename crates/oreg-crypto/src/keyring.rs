//! # Verification Keyring
//!
//! Maps key ids to the public keys that may verify a document link. The
//! keyring only grows through rotation and registration; keys leave it
//! through an explicit retire. A key id is an 8-hex prefix of the public
//! key, so two distinct keys can share one; such a key is refused rather
//! than allowed to displace the trusted one.

use std::collections::BTreeMap;

use oreg_core::CryptoError;

use crate::ed25519::{Ed25519PublicKey, KeyId};

/// Public keys indexed by key id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyring {
    keys: BTreeMap<KeyId, Ed25519PublicKey>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyring holding just `key`.
    pub fn with_key(key: Ed25519PublicKey) -> Self {
        let mut keys = BTreeMap::new();
        keys.insert(key.key_id(), key);
        Self { keys }
    }

    /// Keyring from a key list. See [`parse_key_list`].
    pub fn from_list(raw: &str) -> Result<Self, CryptoError> {
        let mut ring = Self::new();
        for key in parse_key_list(raw)? {
            ring.insert(key)?;
        }
        Ok(ring)
    }

    /// Add a key under its own id, returning the id.
    ///
    /// Re-adding a key already present is a no-op.
    ///
    /// # Errors
    ///
    /// `CryptoError::KeyError` if a different key already holds the id; the
    /// keyring is left unchanged.
    pub fn insert(&mut self, key: Ed25519PublicKey) -> Result<KeyId, CryptoError> {
        let id = key.key_id();
        match self.keys.get(&id) {
            Some(existing) if *existing == key => {}
            Some(_) => {
                tracing::warn!(key_id = %id, "refused key colliding with a trusted key id");
                return Err(CryptoError::KeyError(format!(
                    "key id {id} already belongs to a different key"
                )));
            }
            None => {
                self.keys.insert(id.clone(), key);
            }
        }
        Ok(id)
    }

    pub fn get(&self, id: &KeyId) -> Option<&Ed25519PublicKey> {
        self.keys.get(id)
    }

    pub fn remove(&mut self, id: &KeyId) -> Option<Ed25519PublicKey> {
        self.keys.remove(id)
    }

    pub fn contains(&self, id: &KeyId) -> bool {
        self.keys.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key_ids(&self) -> impl Iterator<Item = &KeyId> {
        self.keys.keys()
    }
}

/// Parse a list of hex public keys separated by NUL bytes or commas.
///
/// Blank entries are skipped, so a trailing separator is harmless.
pub fn parse_key_list(raw: &str) -> Result<Vec<Ed25519PublicKey>, CryptoError> {
    raw.split(['\0', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Ed25519PublicKey::from_hex)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ed25519::Ed25519KeyPair;

    #[test]
    fn insert_indexes_by_prefix() {
        let kp = Ed25519KeyPair::from_seed(&[1; 32]);
        let mut ring = Keyring::new();
        let id = ring.insert(kp.public_key()).unwrap();
        assert_eq!(id, kp.key_id());
        assert_eq!(ring.insert(kp.public_key()).unwrap(), id);
        assert_eq!(ring.get(&id), Some(&kp.public_key()));
        assert!(ring.contains(&id));
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.remove(&id), Some(kp.public_key()));
        assert!(ring.is_empty());
    }

    #[test]
    fn parses_nul_and_comma_lists() {
        let a = Ed25519KeyPair::from_seed(&[1; 32]).public_key();
        let b = Ed25519KeyPair::from_seed(&[2; 32]).public_key();
        let c = Ed25519KeyPair::from_seed(&[3; 32]).public_key();
        let raw = format!("{}\0{}, {},", a.to_hex(), b.to_hex(), c.to_hex());
        let ring = Keyring::from_list(&raw).unwrap();
        assert_eq!(ring.len(), 3);
        let ids: Vec<_> = ring.key_ids().cloned().collect();
        let mut expected = vec![a.key_id(), b.key_id(), c.key_id()];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn colliding_key_id_is_refused() {
        let trusted = Ed25519PublicKey::from_bytes([0xab; 32]);
        let mut impostor = [0xab; 32];
        impostor[31] = 0xcd;
        let impostor = Ed25519PublicKey::from_bytes(impostor);
        assert_eq!(trusted.key_id(), impostor.key_id());

        let mut ring = Keyring::with_key(trusted.clone());
        assert!(matches!(ring.insert(impostor.clone()), Err(CryptoError::KeyError(_))));
        assert_eq!(ring.get(&trusted.key_id()), Some(&trusted));
        assert_eq!(ring.len(), 1);

        let raw = format!("{},{}", trusted.to_hex(), impostor.to_hex());
        assert!(matches!(Keyring::from_list(&raw), Err(CryptoError::KeyError(_))));
        let repeated = format!("{0},{0}", trusted.to_hex());
        assert_eq!(Keyring::from_list(&repeated).unwrap().len(), 1);
    }

    #[test]
    fn empty_list_is_empty_ring() {
        assert!(Keyring::from_list("").unwrap().is_empty());
        assert!(parse_key_list("\0,").unwrap().is_empty());
    }

    #[test]
    fn malformed_entry_fails_whole_list() {
        let a = Ed25519KeyPair::from_seed(&[1; 32]).public_key();
        let raw = format!("{},deadbeef", a.to_hex());
        assert!(matches!(
            Keyring::from_list(&raw),
            Err(CryptoError::KeyError(_))
        ));
    }
}
