//! # Entity Storage Seam
//!
//! The model layer does not own persistence. It talks to storage through
//! [`EntityStore`]: fetch a stored entity by id, or put one back stating the
//! revision the caller last saw. A stale revision is reported as
//! [`StoreError::Conflict`]; resolving it is the caller's business.
//!
//! Entities are stored in their default-role serialized form, so a fetched
//! record is turned back into a [`Model`] with [`Model::create`].
//!
//! [`InMemoryStore`] is the reference implementation, used by tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::Model;

/// A stored entity and its revision counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntity {
    pub rev: u64,
    pub data: Value,
}

/// Storage failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("revision conflict on {id}: expected {expected:?}, found {actual:?}")]
    Conflict {
        id: String,
        expected: Option<u64>,
        actual: Option<u64>,
    },
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Narrow interface to an entity store.
pub trait EntityStore: Send + Sync {
    /// The stored entity, or `None` if the id is unknown.
    fn fetch(&self, id: &str) -> Result<Option<StoredEntity>, StoreError>;

    /// Store an entity. `expected_rev` is the revision the caller fetched,
    /// `None` for a new entity. Returns the new revision.
    fn put(&self, id: &str, entity: &Model, expected_rev: Option<u64>) -> Result<u64, StoreError>;
}

/// Thread-safe, cloneable in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    data: Arc<RwLock<HashMap<String, StoredEntity>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl EntityStore for InMemoryStore {
    fn fetch(&self, id: &str) -> Result<Option<StoredEntity>, StoreError> {
        Ok(self.data.read().get(id).cloned())
    }

    fn put(&self, id: &str, entity: &Model, expected_rev: Option<u64>) -> Result<u64, StoreError> {
        let mut guard = self.data.write();
        let actual = guard.get(id).map(|stored| stored.rev);
        if actual != expected_rev {
            tracing::debug!(id, ?expected_rev, ?actual, "rejected stale write");
            return Err(StoreError::Conflict {
                id: id.to_string(),
                expected: expected_rev,
                actual,
            });
        }
        let rev = actual.map_or(1, |r| r + 1);
        let data = entity.serialize(None).unwrap_or(Value::Null);
        guard.insert(id.to_string(), StoredEntity { rev, data });
        Ok(rev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ModelContext;
    use crate::ocds;
    use serde_json::json;

    fn address(country: &str) -> Model {
        Model::create(&ocds::address(), &json!({"countryName": country}), &ModelContext::new()).unwrap()
    }

    #[test]
    fn put_then_fetch() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.put("a1", &address("Україна"), None), Ok(1));
        let stored = store.fetch("a1").unwrap().unwrap();
        assert_eq!(stored.rev, 1);
        assert_eq!(stored.data, json!({"countryName": "Україна"}));
        assert_eq!(store.fetch("missing"), Ok(None));
    }

    #[test]
    fn stale_revision_conflicts() {
        let store = InMemoryStore::new();
        store.put("a1", &address("A"), None).unwrap();
        assert_eq!(store.put("a1", &address("B"), Some(1)), Ok(2));
        let err = store.put("a1", &address("C"), Some(1)).unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                id: "a1".into(),
                expected: Some(1),
                actual: Some(2),
            }
        );
        assert!(store.put("a1", &address("C"), None).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clones_share_state() {
        let store = InMemoryStore::new();
        let other = store.clone();
        store.put("a1", &address("A"), None).unwrap();
        assert!(other.fetch("a1").unwrap().is_some());
    }
}
