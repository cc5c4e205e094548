//! # Entity Subcommand
//!
//! Converts a raw JSON entity into its declared type, validates it, and
//! prints either the role projection or the grouped field errors.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde_json::{json, Value};

use oreg_core::LinkSigner;
use oreg_model::{ocds, Model, ModelContext};

use crate::config::CliConfig;

/// Arguments for the `oreg entity` subcommand.
#[derive(Args, Debug)]
pub struct EntityArgs {
    #[command(subcommand)]
    pub command: EntityCommand,
}

#[derive(Subcommand, Debug)]
pub enum EntityCommand {
    /// Validate a JSON entity and print its projection.
    Validate {
        /// Entity type name, e.g. `Organization`.
        #[arg(value_name = "ENTITY")]
        entity: String,
        /// Path to the JSON document, or `-` for stdin.
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Role to project through.
        #[arg(long)]
        role: Option<String>,
        /// Render computed document URLs with the configured trust chain.
        #[arg(long)]
        sign: bool,
    },
    /// List the known entity types and their fields.
    List,
}

/// Result of checking one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityOutcome {
    /// The entity is valid; its projection (`null` when empty).
    Rendered(Value),
    /// Conversion or validation failed.
    Rejected { stage: &'static str, errors: Value },
}

impl EntityOutcome {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Rendered(value) => value.clone(),
            Self::Rejected { stage, errors } => json!({"stage": stage, "errors": errors}),
        }
    }
}

pub fn run_entity(args: &EntityArgs, config: &CliConfig, ephemeral: bool) -> Result<u8> {
    match &args.command {
        EntityCommand::List => {
            println!("{}", serde_json::to_string_pretty(&list_entities())?);
            Ok(0)
        }
        EntityCommand::Validate {
            entity,
            file,
            role,
            sign,
        } => {
            let raw = read_json(file)?;
            let ctx = config.model_context()?;
            let linker = if *sign {
                Some(config.linker(ephemeral)?)
            } else {
                None
            };
            let signer = linker.as_ref().map(|l| l as &dyn LinkSigner);
            let outcome = check_entity(entity, &raw, role.as_deref(), &ctx, signer)?;
            println!("{}", serde_json::to_string_pretty(&outcome.to_json())?);
            Ok(match outcome {
                EntityOutcome::Rendered(_) => 0,
                EntityOutcome::Rejected { .. } => 1,
            })
        }
    }
}

/// Convert, validate and project one entity.
///
/// # Errors
///
/// Fails only for an unknown entity type; rejected input is an
/// [`EntityOutcome::Rejected`].
pub fn check_entity(
    entity: &str,
    raw: &Value,
    role: Option<&str>,
    ctx: &ModelContext,
    signer: Option<&dyn LinkSigner>,
) -> Result<EntityOutcome> {
    let Some(ty) = ocds::by_name(entity) else {
        bail!("unknown entity type {entity:?}; see `oreg entity list`");
    };
    let model = match Model::create(&ty, raw, ctx) {
        Ok(model) => model,
        Err(e) => {
            tracing::debug!(entity, errors = %e.errors, "conversion failed");
            return Ok(EntityOutcome::Rejected {
                stage: "conversion",
                errors: e.errors.to_json(),
            });
        }
    };
    if let Err(e) = model.validate(ctx) {
        tracing::debug!(entity, errors = %e.errors, "validation failed");
        return Ok(EntityOutcome::Rejected {
            stage: "validation",
            errors: e.errors.to_json(),
        });
    }
    let rendered = match signer {
        Some(signer) => model.serialize_signed(role, signer),
        None => model.serialize(role),
    };
    Ok(EntityOutcome::Rendered(rendered.unwrap_or(Value::Null)))
}

/// Entity names mapped to their field names and declared roles.
pub fn list_entities() -> Value {
    let entries = ocds::all_types()
        .iter()
        .map(|ty| {
            let fields: Vec<&str> = ty.fields().iter().map(|f| f.name()).collect();
            let roles: Vec<&str> = ty.roles().roles().collect();
            (ty.name().to_string(), json!({"fields": fields, "roles": roles}))
        })
        .collect::<serde_json::Map<_, _>>();
    Value::Object(entries)
}

fn read_json(path: &Path) -> Result<Value> {
    let content = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read document: {}", path.display()))?
    };
    serde_json::from_str(&content).with_context(|| format!("failed to parse JSON: {}", path.display()))
}
