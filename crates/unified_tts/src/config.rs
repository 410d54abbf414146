//! Configuration for the TTS façade
//!
//! Two caller-supplied sources are merged here into one [`EffectiveConfig`]:
//!
//! 1. `providers` : nested per-provider option tables
//! 2. `overrides` : flat `<provider>_<option>` entries, which win over (1)
//!
//! Environment variables are the third source; each provider consults them
//! during its own construction, only for values the first two left unset.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::registry::ProviderRegistry;
use crate::types::OptionMap;

/// Caller-supplied configuration for all providers
///
/// # Example (TOML)
///
/// ```toml
/// [providers.openai]
/// api_key = "sk-..."
/// voice = "alloy"
///
/// [overrides]
/// openai_voice = "nova"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Nested options keyed by provider name
    #[serde(default)]
    pub providers: BTreeMap<String, OptionMap>,

    /// Flat `<provider>_<option>` overrides
    #[serde(default)]
    pub overrides: BTreeMap<String, Value>,
}

impl TtsConfig {
    /// Create an empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .build()?;
        settings.try_deserialize()
    }

    /// Merge a table of options for one provider
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>, options: &OptionMap) -> Self {
        self.providers
            .entry(provider.into())
            .or_default()
            .merge(options);
        self
    }

    /// Set a single nested option for one provider
    #[must_use]
    pub fn with_provider_option(
        mut self,
        provider: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.providers
            .entry(provider.into())
            .or_default()
            .insert(key, value);
        self
    }

    /// Add a flat `<provider>_<option>` override
    #[must_use]
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Merge the nested tables and the flat overrides for the providers the
    /// registry knows about.
    ///
    /// Unknown providers in the nested tables are ignored; overrides with an
    /// unknown prefix are dropped with a warning.
    pub fn resolve(&self, registry: &ProviderRegistry) -> EffectiveConfig {
        let mut effective: BTreeMap<String, OptionMap> = BTreeMap::new();

        for (provider, options) in &self.providers {
            if registry.contains(provider) {
                effective.entry(provider.clone()).or_default().merge(options);
            } else {
                debug!(provider = %provider, "Ignoring configuration for unknown provider");
            }
        }

        for (key, value) in &self.overrides {
            match split_override_key(key) {
                Some((provider, option)) if registry.contains(provider) => {
                    effective
                        .entry(provider.to_string())
                        .or_default()
                        .insert(option, value.clone());
                },
                _ => warn!(key = %key, "Dropping override with unrecognized provider prefix"),
            }
        }

        EffectiveConfig(effective)
    }
}

/// Split `openai_api_key` into `("openai", "api_key")` at the first underscore
fn split_override_key(key: &str) -> Option<(&str, &str)> {
    key.split_once('_')
        .filter(|(provider, option)| !provider.is_empty() && !option.is_empty())
}

/// Fully merged options, one map per known provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveConfig(BTreeMap<String, OptionMap>);

impl EffectiveConfig {
    /// Settings for `provider`; empty when nothing was configured
    #[must_use]
    pub fn settings_for(&self, provider: &str) -> OptionMap {
        self.0.get(provider).cloned().unwrap_or_default()
    }

    /// Check whether any option was supplied for `provider`
    #[must_use]
    pub fn contains(&self, provider: &str) -> bool {
        self.0.contains_key(provider)
    }

    /// Names of the providers with an entry
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
