//! Capabilities entity conversion and validation depend on.
//!
//! A [`ModelContext`] is passed explicitly into `create`, `import_data` and
//! `validate`. It carries the registry timezone, the id generator, the clock
//! that stamps creation times, and the live classification registry.

use std::fmt;
use std::sync::Arc;

use oreg_core::{Clock, IdGenerator, IsoDateTime, SystemClock, TypeError, UuidHexGenerator};
use serde::{Deserialize, Serialize};

use crate::registry::ClassificationRegistry;

/// Currency applied to monetary values that do not state one.
pub const DEFAULT_CURRENCY: &str = "UAH";

/// Deployment settings for the model layer, typically read from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Registry offset, `+02:00` style or `Z`.
    pub timezone: String,
    /// Three-letter currency code used as the `Value.currency` default.
    pub default_currency: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            timezone: "Z".to_string(),
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// Explicit context for model operations.
#[derive(Clone)]
pub struct ModelContext {
    dates: IsoDateTime,
    default_currency: String,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    classifications: Arc<ClassificationRegistry>,
}

impl ModelContext {
    /// UTC, random ids, the system clock, and an empty classification registry.
    pub fn new() -> Self {
        Self {
            dates: IsoDateTime::utc(),
            default_currency: DEFAULT_CURRENCY.to_string(),
            ids: Arc::new(UuidHexGenerator),
            clock: Arc::new(SystemClock),
            classifications: Arc::new(ClassificationRegistry::new()),
        }
    }

    /// Build a context from deployment settings.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::Conversion` if the timezone offset is malformed.
    pub fn from_settings(settings: &ModelSettings) -> Result<Self, TypeError> {
        let offset = IsoDateTime::parse_offset(&settings.timezone)?;
        Ok(Self::new()
            .with_timezone(IsoDateTime::new(offset))
            .with_default_currency(settings.default_currency.clone()))
    }

    pub fn with_timezone(mut self, dates: IsoDateTime) -> Self {
        self.dates = dates;
        self
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_classifications(mut self, registry: Arc<ClassificationRegistry>) -> Self {
        self.classifications = registry;
        self
    }

    /// The registry timezone converter.
    pub fn dates(&self) -> &IsoDateTime {
        &self.dates
    }

    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    /// A fresh identifier token.
    pub fn generate_id(&self) -> String {
        self.ids.generate()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn classifications(&self) -> &ClassificationRegistry {
        &self.classifications
    }
}

impl Default for ModelContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelContext")
            .field("offset", &self.dates.offset())
            .field("default_currency", &self.default_currency)
            .field("schemes", &self.classifications.schemes())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oreg_core::SequentialIdGenerator;

    #[test]
    fn settings_build_context() {
        let settings = ModelSettings {
            timezone: "+02:00".into(),
            default_currency: "EUR".into(),
        };
        let ctx = ModelContext::from_settings(&settings).unwrap();
        assert_eq!(ctx.dates().offset().local_minus_utc(), 7200);
        assert_eq!(ctx.default_currency(), "EUR");
    }

    #[test]
    fn bad_timezone_is_rejected() {
        let settings = ModelSettings {
            timezone: "Mars/Olympus".into(),
            ..ModelSettings::default()
        };
        assert!(ModelContext::from_settings(&settings).is_err());
    }

    #[test]
    fn injected_generator_is_used() {
        let ctx = ModelContext::new().with_id_generator(Arc::new(SequentialIdGenerator::starting_at(7)));
        assert_eq!(ctx.generate_id(), format!("{:032x}", 7));
    }

    #[test]
    fn settings_default_from_partial_yaml_shape() {
        let settings: ModelSettings = serde_json::from_str(r#"{"timezone": "+03:00"}"#).unwrap();
        assert_eq!(settings.default_currency, DEFAULT_CURRENCY);
    }
}
