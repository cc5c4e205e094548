//! # oreg-core — Foundational Types for the Procurement Registry
//!
//! This crate is the leaf of the registry workspace. It defines the scalar
//! primitives every entity definition is built from, and the error shapes
//! every other crate reports through.
//!
//! ## Key Design Principles
//!
//! 1. **Grouped errors, never first-error-only.** Conversion and validation
//!    failures are collected into an [`ErrorTree`] keyed by field path, so a
//!    caller sees every broken field of a nested aggregate at once.
//!
//! 2. **`CanonicalBytes` newtype.** Every byte sequence that is signed or
//!    verified flows through `CanonicalBytes::new()`. A signed document link
//!    can therefore be recomputed bit-for-bit by any verifier.
//!
//! 3. **Self-describing content hashes.** [`HashValue`] carries its algorithm
//!    tag (`md5:…`, `sha256:…`) and can only be built through a parser that
//!    checks scheme, length and hex alphabet, in that order.
//!
//! 4. **One timezone for output.** [`IsoDateTime`] normalizes every instant
//!    to the configured registry offset; formatting never silently clamps.
//!
//! 5. **Injected capabilities.** Identifier generation ([`IdGenerator`]) and
//!    the wall clock ([`Clock`]) are values passed in by the caller, keeping
//!    entity construction deterministic under test.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `oreg-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod link;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{HashAlgorithm, HashValue};
pub use error::{ConversionError, CryptoError, ErrorTree, TypeError, ValidationError};
pub use identity::{check_hex_token, IdGenerator, SequentialIdGenerator, UuidHexGenerator};
pub use link::{DocumentIdentity, LinkSigner};
pub use temporal::{Clock, FixedClock, IsoDateTime, SystemClock, Timestamp};
