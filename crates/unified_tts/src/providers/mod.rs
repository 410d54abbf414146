//! Speech synthesis provider implementations
//!
//! Contains concrete implementations of the `TextToSpeech` port, one per
//! vendor, plus the construction helpers they share.

pub mod cartesia;
pub mod openai;

use std::time::Duration;

use reqwest::Client;
use secrecy::SecretString;
use tracing::debug;

use crate::error::{ConfigurationError, SynthesisError};
use crate::ports::EnvironmentPort;
use crate::types::OptionMap;

pub use cartesia::CartesiaProvider;
pub use openai::{OpenAIClient, OpenAIProvider};

/// Credential from the settings, else from `env_var`
///
/// An empty string counts as missing.
pub(crate) fn resolve_api_key(
    label: &str,
    settings: &OptionMap,
    env: &dyn EnvironmentPort,
    env_var: &str,
) -> Result<SecretString, ConfigurationError> {
    let configured = settings
        .get_str("api_key")
        .map_err(|reason| invalid_setting(label, "api_key", reason))?
        .filter(|key| !key.is_empty())
        .map(str::to_owned);

    if configured.is_some() {
        debug!(provider = label, "Using API key from configuration");
    }

    configured
        .or_else(|| env.var(env_var).filter(|key| !key.is_empty()))
        .map(SecretString::from)
        .ok_or_else(|| ConfigurationError::MissingCredential {
            provider: label.to_string(),
            env_var: env_var.to_string(),
        })
}

/// HTTP client with an optional request timeout
pub(crate) fn build_http_client(
    provider: &str,
    timeout_ms: Option<u64>,
) -> Result<Client, ConfigurationError> {
    let mut builder = Client::builder();
    if let Some(ms) = timeout_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    builder.build().map_err(|e| ConfigurationError::Client {
        provider: provider.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn invalid_setting(
    provider: &str,
    key: &str,
    reason: impl Into<String>,
) -> ConfigurationError {
    ConfigurationError::InvalidOption {
        provider: provider.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn invalid_call_option(provider: &str, key: &str, reason: &str) -> SynthesisError {
    SynthesisError::new(provider, format!("Invalid option '{key}': {reason}"))
}

/// String setting with a fallback
pub(crate) fn string_setting(
    provider: &str,
    settings: &OptionMap,
    key: &str,
    default: &str,
) -> Result<String, ConfigurationError> {
    Ok(settings
        .get_str(key)
        .map_err(|reason| invalid_setting(provider, key, reason))?
        .unwrap_or(default)
        .to_string())
}

/// Optional `timeout_ms` setting; zero is rejected
pub(crate) fn timeout_setting(
    provider: &str,
    settings: &OptionMap,
) -> Result<Option<u64>, ConfigurationError> {
    match settings
        .get_u64("timeout_ms")
        .map_err(|reason| invalid_setting(provider, "timeout_ms", reason))?
    {
        Some(0) => Err(invalid_setting(
            provider,
            "timeout_ms",
            "must be greater than 0",
        )),
        other => Ok(other),
    }
}
