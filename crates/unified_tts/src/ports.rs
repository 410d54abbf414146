//! Port definitions for speech synthesis
//!
//! Defines the traits (ports) that vendor adapters implement and the
//! read-only environment lookup the providers consume.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::error::TtsError;
use crate::types::SynthesisRequest;

/// Port for Text-to-Speech (TTS) vendor integrations
///
/// One implementation exists per vendor. Instances are immutable after
/// construction and hold their own credential and client.
///
/// # Example
///
/// ```ignore
/// use unified_tts::{SynthesisRequest, TextToSpeech};
///
/// async fn speak(tts: &dyn TextToSpeech) -> Result<Vec<u8>, TtsError> {
///     let request = SynthesisRequest::new("Hello!", tts.name()).with_option("voice", "nova");
///     Ok(tts.synthesize(&request).await?.to_vec())
/// }
/// ```
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Registry name of this provider (e.g. "openai")
    fn name(&self) -> &'static str;

    /// Convert text to encoded audio bytes
    ///
    /// Uses `request.text`, `request.output_format` and `request.options`;
    /// the target provider name and output path are the façade's concern.
    ///
    /// # Errors
    ///
    /// Returns `TtsError::Synthesis` if the vendor call fails.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, TtsError>;
}

/// Read-only lookup of named environment variables
#[cfg_attr(test, automock)]
pub trait EnvironmentPort: Send + Sync {
    /// Value of `name`, or `None` when unset
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentPort for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

/// Fixed set of variables, for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment(HashMap<String, String>);

impl MapEnvironment {
    /// Create an empty environment
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable, returning `self` for chaining
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl EnvironmentPort for MapEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}
