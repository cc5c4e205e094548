//! # Error Types — Grouped Field Errors
//!
//! Defines the error types used throughout the registry. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Field-level failures come in two kinds: conversion (a raw value cannot
//!   be coerced to the declared type) and validation (a typed value breaks a
//!   business rule). Both are reported through an [`ErrorTree`] that groups
//!   messages by field path, nested paths included.
//! - An [`ErrorTree`] serializes to the familiar
//!   `{"field": ["message"], "nested": {"inner": ["message"]}}` shape.
//! - Cryptographic errors fail loudly with full context.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in signed payloads.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error in cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// The signed payload could not be canonicalized.
    #[error("payload error: {0}")]
    Payload(String),
}

/// Failure of a single scalar conversion.
///
/// Scalar types distinguish values that cannot be read at all
/// (`Conversion`) from values that parse but are not acceptable
/// (`Validation`). Model import reports both as conversion failures of
/// the field, since neither can populate it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// The raw value cannot be coerced to the declared type.
    #[error("{0}")]
    Conversion(String),

    /// The value was read but is not acceptable for the type.
    #[error("{0}")]
    Validation(String),
}

impl TypeError {
    /// The human-readable message, regardless of kind.
    pub fn message(&self) -> &str {
        match self {
            Self::Conversion(m) | Self::Validation(m) => m,
        }
    }

    /// Whether this is a conversion (coercion) failure.
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion(_))
    }
}

// ---------------------------------------------------------------------------
// ErrorTree
// ---------------------------------------------------------------------------

/// Error messages grouped by field path.
///
/// A node holds the messages raised against the node itself plus one child
/// node per failing field. List elements are keyed by their decimal index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorTree {
    messages: Vec<String>,
    children: BTreeMap<String, ErrorTree>,
}

impl ErrorTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// A leaf holding a single message.
    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            messages: vec![msg.into()],
            children: BTreeMap::new(),
        }
    }

    /// Whether no message is recorded anywhere in the tree.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.children.values().all(ErrorTree::is_empty)
    }

    /// Record a message against this node.
    pub fn push_message(&mut self, msg: impl Into<String>) {
        self.messages.push(msg.into());
    }

    /// Record a message against the named child field.
    pub fn push(&mut self, field: impl Into<String>, msg: impl Into<String>) {
        self.children
            .entry(field.into())
            .or_default()
            .messages
            .push(msg.into());
    }

    /// Attach a nested tree under the named field. Empty trees are dropped.
    pub fn nest(&mut self, field: impl Into<String>, child: ErrorTree) {
        if child.is_empty() {
            return;
        }
        let slot = self.children.entry(field.into()).or_default();
        slot.merge(child);
    }

    /// Merge another tree into this one, concatenating messages per path.
    pub fn merge(&mut self, other: ErrorTree) {
        self.messages.extend(other.messages);
        for (field, child) in other.children {
            self.nest(field, child);
        }
    }

    /// Messages recorded against this node.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// The child node for a field, if any error was recorded there.
    pub fn get(&self, field: &str) -> Option<&ErrorTree> {
        self.children.get(field)
    }

    /// Messages at a dotted path (`"identifier.id"`, `"additionalIdentifiers.0.id"`).
    pub fn at(&self, path: &str) -> &[String] {
        let mut node = self;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            match node.children.get(segment) {
                Some(child) => node = child,
                None => return &[],
            }
        }
        &node.messages
    }

    /// Names of the fields holding errors at this level.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Flatten into `(dotted path, messages)` pairs, depth first.
    pub fn flatten(&self) -> Vec<(String, Vec<String>)> {
        let mut out = Vec::new();
        self.flatten_into(String::new(), &mut out);
        out
    }

    fn flatten_into(&self, prefix: String, out: &mut Vec<(String, Vec<String>)>) {
        if !self.messages.is_empty() {
            out.push((prefix.clone(), self.messages.clone()));
        }
        for (field, child) in &self.children {
            let path = if prefix.is_empty() {
                field.clone()
            } else {
                format!("{prefix}.{field}")
            };
            child.flatten_into(path, out);
        }
    }

    /// Render as a JSON value in the grouped `{field: [messages]}` shape.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for ErrorTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.children.is_empty() {
            return self.messages.serialize(serializer);
        }
        let extra = usize::from(!self.messages.is_empty());
        let mut map = serializer.serialize_map(Some(self.children.len() + extra))?;
        // Messages raised against a node that also has failing children
        // are kept under the empty key.
        if !self.messages.is_empty() {
            map.serialize_entry("", &self.messages)?;
        }
        for (field, child) in &self.children {
            if !child.is_empty() {
                map.serialize_entry(field, child)?;
            }
        }
        map.end()
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flat = self.flatten();
        for (i, (path, messages)) in flat.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            let path = if path.is_empty() { "(root)" } else { path.as_str() };
            write!(f, "{path}: {}", messages.join(" "))?;
        }
        Ok(())
    }
}

/// Raw input could not be converted; every failing field is reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("conversion failed: {errors}")]
pub struct ConversionError {
    /// Messages grouped by field path.
    pub errors: ErrorTree,
}

impl ConversionError {
    /// Wrap a grouped error tree.
    pub fn new(errors: ErrorTree) -> Self {
        Self { errors }
    }
}

/// Validation of typed values failed; every failing field is reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failed: {errors}")]
pub struct ValidationError {
    /// Messages grouped by field path.
    pub errors: ErrorTree,
}

impl ValidationError {
    /// Wrap a grouped error tree.
    pub fn new(errors: ErrorTree) -> Self {
        Self { errors }
    }
}
