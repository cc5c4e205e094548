//! # oreg-cli — Registry Command-Line Interface
//!
//! Provides the `oreg` binary for operators and integration pipelines.
//!
//! ## Subcommands
//!
//! - `oreg entity validate` — Convert and validate a JSON entity, print its
//!   role projection or the grouped errors.
//! - `oreg entity list` — Known entity types.
//! - `oreg link sign` / `oreg link verify` — Signed document download URLs.
//! - `oreg keygen` — Generate a document signing key.
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; registry behavior lives in the domain
//!   crates.
//! - Handlers return an exit code: 0 on success, 1 when the input was
//!   rejected. Operational failures surface as `anyhow` errors.

pub mod config;
pub mod entity;
pub mod keygen;
pub mod link;

use std::path::{Path, PathBuf};

/// Resolve a path that may be relative to a base directory.
///
/// Absolute paths are returned as-is. A relative path is taken relative to
/// `base` when it exists there, otherwise relative to the current directory.
pub fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let based = base.join(path);
    if based.exists() {
        based
    } else {
        path.to_path_buf()
    }
}
