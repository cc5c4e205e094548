//! # Link Subcommand
//!
//! Signs and verifies document download URLs with the configured trust
//! chain.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use oreg_core::{check_hex_token, DocumentIdentity, HashValue};
use oreg_crypto::{DocumentLinker, UntrustedReferenceError, VerifiedLink};

use crate::config::CliConfig;

/// Arguments for the `oreg link` subcommand.
#[derive(Args, Debug)]
pub struct LinkArgs {
    #[command(subcommand)]
    pub command: LinkCommand,
}

#[derive(Subcommand, Debug)]
pub enum LinkCommand {
    /// Print a signed download URL for a document.
    Sign {
        /// Document id (32 hex chars).
        #[arg(value_name = "ID")]
        id: String,
        /// Content hash, e.g. `md5:0cc175b9c0f1b6a831c399e269772661`.
        #[arg(long)]
        hash: Option<String>,
    },
    /// Check a signed download URL against the keyring.
    Verify {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run_link(args: &LinkArgs, config: &CliConfig, ephemeral: bool) -> Result<u8> {
    let linker = config.linker(ephemeral)?;
    match &args.command {
        LinkCommand::Sign { id, hash } => {
            println!("{}", sign_link(&linker, id, hash.as_deref())?);
            Ok(0)
        }
        LinkCommand::Verify { url } => match verify_link(&linker, url) {
            Ok(link) => {
                println!("{}", describe(&link));
                Ok(0)
            }
            Err(e) => {
                println!("UNTRUSTED: {}: {}", e.reason, e.detail);
                Ok(1)
            }
        },
    }
}

/// A signed URL for the document `id` with optional content hash.
pub fn sign_link(linker: &DocumentLinker, id: &str, hash: Option<&str>) -> Result<String> {
    check_hex_token(id).map_err(|e| anyhow::anyhow!("invalid document id {id:?}: {}", e.message()))?;
    let hash = hash
        .map(HashValue::parse)
        .transpose()
        .map_err(|e| anyhow::anyhow!("invalid hash: {}", e.message()))?;
    linker
        .sign_document_url(&DocumentIdentity::new(id, hash))
        .context("failed to sign document link")
}

pub fn verify_link(linker: &DocumentLinker, url: &str) -> Result<VerifiedLink, UntrustedReferenceError> {
    linker.verify_document_url(url)
}

fn describe(link: &VerifiedLink) -> String {
    let mut out = format!(
        "OK: document {} signed by key {} at {}",
        link.document.id, link.key_id, link.issued
    );
    if let Some(hash) = &link.document.hash {
        out.push_str(&format!(" (hash {hash})"));
    }
    out
}
