//! # Configuration
//!
//! One YAML file configures both layers:
//!
//! ```yaml
//! model:
//!   timezone: "+02:00"
//!   default_currency: UAH
//! classifications:
//!   CPV: ["44617100-9", "70123100-9"]
//! classifications_file: cpv.json
//! trust:
//!   dockey: "<64 hex chars>"
//!   docservice_url: http://docs.example/get
//! ```
//!
//! `OREG_*` environment variables override the `trust` section.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use oreg_crypto::{DocumentLinker, TrustChain, TrustConfig};
use oreg_model::{ClassificationRegistry, ModelContext, ModelSettings};

/// Contents of the `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub model: ModelSettings,
    pub trust: TrustConfig,
    /// Inline classification codes by scheme.
    pub classifications: BTreeMap<String, Vec<String>>,
    /// JSON file of classification codes by scheme, relative to the config.
    pub classifications_file: Option<PathBuf>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl CliConfig {
    /// Load the config file (if any) and overlay the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// As [`CliConfig::load`], reading variables through `lookup`.
    pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config: {}", path.display()))?;
                let mut config = Self::from_yaml_str(&raw)
                    .with_context(|| format!("failed to parse config: {}", path.display()))?;
                config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                config
            }
            None => Self::default(),
        };
        let env = TrustConfig::from_lookup(lookup).context("invalid trust environment")?;
        config.trust = std::mem::take(&mut config.trust).overlay(env);
        tracing::debug!(trust = ?config.trust, model = ?config.model, "loaded configuration");
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// The model context for these settings, with the classification
    /// registry populated.
    pub fn model_context(&self) -> Result<ModelContext> {
        let registry = match &self.classifications_file {
            Some(file) => {
                let path = crate::resolve_path(file, &self.base_dir);
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read classifications: {}", path.display()))?;
                let value: serde_json::Value = serde_json::from_str(&raw)
                    .with_context(|| format!("failed to parse JSON: {}", path.display()))?;
                ClassificationRegistry::from_json(&value)
                    .with_context(|| format!("invalid classifications: {}", path.display()))?
            }
            None => ClassificationRegistry::new(),
        };
        for (scheme, codes) in &self.classifications {
            for code in codes {
                registry.add_code(scheme, code);
            }
        }
        let ctx = ModelContext::from_settings(&self.model).context("invalid model settings")?;
        tracing::info!(
            schemes = ?registry.schemes(),
            timezone = %self.model.timezone,
            "model context ready"
        );
        Ok(ctx.with_classifications(Arc::new(registry)))
    }

    /// The trust chain, failing on a missing key unless `ephemeral`.
    pub fn trust_chain(&self, ephemeral: bool) -> Result<TrustChain> {
        let chain = if ephemeral {
            self.trust.build_ephemeral_chain()?
        } else {
            self.trust.build_chain()?
        };
        Ok(chain)
    }

    pub fn linker(&self, ephemeral: bool) -> Result<DocumentLinker> {
        let chain = self.trust_chain(ephemeral)?;
        Ok(self.trust.build_linker(chain)?)
    }
}
