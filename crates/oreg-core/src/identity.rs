//! # Identifier Generation
//!
//! Entities that default their `id` receive it from an injected
//! [`IdGenerator`] rather than from a construction side effect, so tests can
//! substitute a deterministic sequence.
//!
//! Generated identifiers are 32-character lowercase hex tokens, the shape
//! also required of document ids and `relatedItem` / `relatedLot` references.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::digest::{MSG_NOT_HEX, MSG_WRONG_LENGTH};
use crate::error::TypeError;

/// Length of a generated identifier token in hex characters.
pub const TOKEN_LEN: usize = 32;

/// Capability producing fresh identifier tokens.
pub trait IdGenerator: Send + Sync {
    /// A fresh 32-character hex token.
    fn generate(&self) -> String;
}

/// Random tokens from UUIDv4, rendered without hyphens.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidHexGenerator;

impl IdGenerator for UuidHexGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Deterministic tokens `000…01`, `000…02`, … for tests and fixtures.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// A sequence whose first token is `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{n:032x}")
    }
}

/// Check that a value is a 32-character hex token.
pub fn check_hex_token(raw: &str) -> Result<(), TypeError> {
    if raw.len() != TOKEN_LEN {
        return Err(TypeError::Validation(MSG_WRONG_LENGTH.to_string()));
    }
    if !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(TypeError::Conversion(MSG_NOT_HEX.to_string()));
    }
    Ok(())
}
