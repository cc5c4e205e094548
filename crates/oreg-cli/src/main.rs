//! # oreg CLI entry point
//!
//! Parses command-line arguments, loads configuration and dispatches to
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use oreg_cli::config::CliConfig;
use oreg_cli::entity::{run_entity, EntityArgs};
use oreg_cli::keygen::{run_keygen, KeygenArgs};
use oreg_cli::link::{run_link, LinkArgs};

/// Procurement registry toolchain.
///
/// Validates registry entities, signs and verifies document download links,
/// and generates document signing keys.
#[derive(Parser, Debug)]
#[command(name = "oreg", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Path to the YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Generate a throwaway signing key when none is configured.
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate and project registry entities.
    Entity(EntityArgs),

    /// Sign or verify document download links.
    Link(LinkArgs),

    /// Generate a document signing key.
    Keygen(KeygenArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!("oreg CLI starting");

    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Entity(args) => CliConfig::load(cli.config.as_deref())
            .and_then(|config| run_entity(args, &config, cli.ephemeral)),
        Commands::Link(args) => CliConfig::load(cli.config.as_deref())
            .and_then(|config| run_link(args, &config, cli.ephemeral)),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
