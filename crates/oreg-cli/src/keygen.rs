//! # Keygen Subcommand
//!
//! Generates a document signing key. The seed goes into `OREG_DOCKEY` or
//! the `trust.dockey` config entry; the public key goes into the
//! `dockeys` list of every verifier that must accept this key's links.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use oreg_crypto::Ed25519KeyPair;

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Write `<prefix>.key` and `<prefix>.pub` into this directory instead
    /// of printing the seed.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Prefix for the key filenames.
    #[arg(long, default_value = "oreg")]
    pub prefix: String,
}

/// Hex seed, public key and key id of a new signing key.
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    pub seed_hex: String,
    pub public_hex: String,
    pub key_id: String,
}

pub fn generate() -> GeneratedKey {
    let seed: [u8; 32] = rand::random();
    let pair = Ed25519KeyPair::from_seed(&seed);
    GeneratedKey {
        seed_hex: hex::encode(seed),
        public_hex: pair.public_key().to_hex(),
        key_id: pair.key_id().to_string(),
    }
}

pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let key = generate();
    match &args.output {
        Some(dir) => {
            let (key_path, pub_path) = write_key(&key, dir, &args.prefix)?;
            println!("OK: generated Ed25519 document signing key {}", key.key_id);
            println!("  Seed:        {}", key_path.display());
            println!("  Public key:  {}", pub_path.display());
        }
        None => {
            println!("dockey: {}", key.seed_hex);
            println!("public key: {}", key.public_hex);
            println!("key id: {}", key.key_id);
        }
    }
    Ok(0)
}

/// Write the seed and public key files, returning their paths.
pub fn write_key(key: &GeneratedKey, dir: &Path, prefix: &str) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
    let key_path = dir.join(format!("{prefix}.key"));
    let pub_path = dir.join(format!("{prefix}.pub"));
    std::fs::write(&key_path, &key.seed_hex)
        .with_context(|| format!("failed to write seed: {}", key_path.display()))?;
    std::fs::write(&pub_path, &key.public_hex)
        .with_context(|| format!("failed to write public key: {}", pub_path.display()))?;
    Ok((key_path, pub_path))
}
