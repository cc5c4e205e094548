//! # Classification Registry
//!
//! The live set of item-classification schemes and their codes.
//!
//! Item classifications check their scheme and code against this registry
//! every time they are validated; nothing is cached on the entity, so codes
//! registered or removed at runtime take effect on the next validation.
//!
//! The registry is the one mutable collaborator of the model layer and is
//! guarded by a read/write lock, the same pattern as the keyed stores used
//! elsewhere in the workspace.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

/// Scheme an item classification falls back to when none is supplied.
pub const DEFAULT_ITEM_CLASSIFICATION: &str = "CPV";

/// Errors loading a registry from JSON.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryLoadError {
    #[error("classification registry must be a mapping of scheme to codes")]
    NotAMapping,
    #[error("codes for scheme {0} must be a list of strings")]
    BadCodes(String),
}

/// Thread-safe mapping of classification scheme to its registered codes.
#[derive(Debug, Default)]
pub struct ClassificationRegistry {
    schemes: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl ClassificationRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `{"CPV": ["44617100-9", ...], "CAV-PS": [...]}`.
    pub fn from_json(raw: &Value) -> Result<Self, RegistryLoadError> {
        let map = raw.as_object().ok_or(RegistryLoadError::NotAMapping)?;
        let registry = Self::new();
        for (scheme, codes) in map {
            let codes = codes
                .as_array()
                .ok_or_else(|| RegistryLoadError::BadCodes(scheme.clone()))?;
            let mut set = BTreeSet::new();
            for code in codes {
                let code = code
                    .as_str()
                    .ok_or_else(|| RegistryLoadError::BadCodes(scheme.clone()))?;
                set.insert(code.to_string());
            }
            registry.schemes.write().insert(scheme.clone(), set);
        }
        Ok(registry)
    }

    /// Register a scheme with its codes, replacing any previous code set.
    pub fn register<I, S>(&self, scheme: impl Into<String>, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = codes.into_iter().map(Into::into).collect();
        self.schemes.write().insert(scheme.into(), set);
    }

    /// Add a single code to a scheme, creating the scheme if needed.
    pub fn add_code(&self, scheme: &str, code: impl Into<String>) {
        self.schemes
            .write()
            .entry(scheme.to_string())
            .or_default()
            .insert(code.into());
    }

    /// Remove a code. Returns whether it was registered.
    pub fn remove_code(&self, scheme: &str, code: &str) -> bool {
        self.schemes
            .write()
            .get_mut(scheme)
            .map(|codes| codes.remove(code))
            .unwrap_or(false)
    }

    /// Drop a scheme entirely. Returns whether it was registered.
    pub fn remove_scheme(&self, scheme: &str) -> bool {
        self.schemes.write().remove(scheme).is_some()
    }

    pub fn has_scheme(&self, scheme: &str) -> bool {
        self.schemes.read().contains_key(scheme)
    }

    /// Whether `code` is currently registered under `scheme`.
    pub fn contains(&self, scheme: &str, code: &str) -> bool {
        self.schemes
            .read()
            .get(scheme)
            .is_some_and(|codes| codes.contains(code))
    }

    /// Registered scheme names, sorted.
    pub fn schemes(&self) -> Vec<String> {
        self.schemes.read().keys().cloned().collect()
    }

    /// Codes registered under a scheme, sorted. Empty for an unknown scheme.
    pub fn codes(&self, scheme: &str) -> Vec<String> {
        self.schemes
            .read()
            .get(scheme)
            .map(|codes| codes.iter().cloned().collect())
            .unwrap_or_default()
    }
}
