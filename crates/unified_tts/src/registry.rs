//! Provider registry
//!
//! A fixed, ordered list of provider names and the factories that build
//! them. The built-in registry is created once per process and never mutated.

use std::sync::LazyLock;

use tracing::warn;

use crate::error::ConfigurationError;
use crate::ports::{EnvironmentPort, TextToSpeech};
use crate::providers::{CartesiaProvider, OpenAIProvider};
use crate::types::OptionMap;

/// Builds a provider from its effective settings
///
/// Only configuration failures are reported; the façade turns them into
/// "provider unavailable".
pub type ProviderFactory =
    fn(&OptionMap, &dyn EnvironmentPort) -> Result<Box<dyn TextToSpeech>, ConfigurationError>;

/// Name and factory of one provider
#[derive(Debug, Clone, Copy)]
pub struct ProviderDescriptor {
    name: &'static str,
    factory: ProviderFactory,
}

impl ProviderDescriptor {
    /// Create a descriptor
    ///
    /// `name` must be non-empty and free of underscores; the registry skips
    /// descriptors that break this.
    #[must_use]
    pub const fn new(name: &'static str, factory: ProviderFactory) -> Self {
        Self { name, factory }
    }

    /// Registry key
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Run the factory
    pub fn build(
        &self,
        settings: &OptionMap,
        env: &dyn EnvironmentPort,
    ) -> Result<Box<dyn TextToSpeech>, ConfigurationError> {
        (self.factory)(settings, env)
    }
}

/// Ordered, read-only set of provider descriptors
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    descriptors: Vec<ProviderDescriptor>,
}

static BUILTIN: LazyLock<ProviderRegistry> = LazyLock::new(|| {
    ProviderRegistry::new(vec![
        ProviderDescriptor::new(OpenAIProvider::NAME, OpenAIProvider::factory),
        ProviderDescriptor::new(CartesiaProvider::NAME, CartesiaProvider::factory),
    ])
});

impl ProviderRegistry {
    /// Create a registry from descriptors, keeping their order.
    ///
    /// A later descriptor with an already-registered name is ignored, and so
    /// is any descriptor whose name is empty or contains an underscore.
    #[must_use]
    pub fn new(descriptors: Vec<ProviderDescriptor>) -> Self {
        let mut unique: Vec<ProviderDescriptor> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if descriptor.name.is_empty() || descriptor.name.contains('_') {
                warn!(provider = descriptor.name, "Skipping provider with unusable name");
                continue;
            }
            if !unique.iter().any(|d| d.name == descriptor.name) {
                unique.push(descriptor);
            }
        }
        Self {
            descriptors: unique,
        }
    }

    /// The registry of every vendor this crate supports
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Check whether `name` is a registered provider
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Descriptor for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProviderDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Registered names, in registry order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.iter().map(ProviderDescriptor::name)
    }

    /// Iterate over descriptors in registry order
    pub fn iter(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.descriptors.iter()
    }

    /// Number of registered providers
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
