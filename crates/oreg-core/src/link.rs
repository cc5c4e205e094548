//! # Document Link Seam
//!
//! The model layer renders a document's download URL without knowing how
//! links are signed. It hands the document's immutable identity to a
//! [`LinkSigner`]; the trust chain in `oreg-crypto` is the production
//! implementation.

use serde::{Deserialize, Serialize};

use crate::digest::HashValue;
use crate::error::CryptoError;

/// The identity fields of a stored document covered by a link signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentIdentity {
    /// Document id (32-hex token).
    pub id: String,
    /// Content hash, when known.
    pub hash: Option<HashValue>,
}

impl DocumentIdentity {
    /// Identity for a document id and optional content hash.
    pub fn new(id: impl Into<String>, hash: Option<HashValue>) -> Self {
        Self {
            id: id.into(),
            hash,
        }
    }
}

/// Mints signed download URLs for documents.
pub trait LinkSigner: Send + Sync {
    /// A signed URL for the document, issued now.
    fn sign_link(&self, document: &DocumentIdentity) -> Result<String, CryptoError>;
}
