//! Error taxonomy for the TTS façade
//!
//! Every fallible operation in this crate returns [`TtsError`], so callers can
//! match broadly on the root or narrowly on a single kind.

use std::path::PathBuf;

use thiserror::Error;

/// Maximum number of characters of a vendor response body kept in messages
pub const MAX_ERROR_BODY_CHARS: usize = 200;

/// Root error for all TTS operations
#[derive(Debug, Error)]
pub enum TtsError {
    /// Provider could not be set up (construction time only)
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Requested provider is not in the active set
    #[error(
        "Provider '{requested}' not found or not initialized. Available providers: {available:?}"
    )]
    ProviderNotFound {
        /// Name the caller asked for
        requested: String,
        /// Names of the providers that are active
        available: Vec<String>,
    },

    /// Vendor call failed
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// Writing the synthesized audio to disk failed
    #[error("Failed to save audio to '{}': {source}", path.display())]
    Io {
        /// Target path of the write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Provider construction failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// No credential was supplied and the environment fallback was empty
    #[error(
        "{provider} API key is missing. Set the '{env_var}' environment variable or pass 'api_key'"
    )]
    MissingCredential {
        /// Provider name
        provider: String,
        /// Environment variable that was consulted
        env_var: String,
    },

    /// A configuration option has the wrong type or an out-of-range value
    #[error("Invalid option '{key}' for provider '{provider}': {reason}")]
    InvalidOption {
        /// Provider name
        provider: String,
        /// Option key
        key: String,
        /// What is wrong with it
        reason: String,
    },

    /// The vendor client or HTTP session could not be created
    #[error("Failed to initialize {provider} client: {reason}")]
    Client {
        /// Provider name
        provider: String,
        /// Underlying cause
        reason: String,
    },
}

/// A vendor call failed
///
/// Vendor detail (status code, response body) lives only in `message`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Synthesis with provider '{provider}' failed: {message}")]
pub struct SynthesisError {
    /// Provider that failed
    pub provider: String,
    /// Human-readable cause
    pub message: String,
}

impl SynthesisError {
    /// Create a new synthesis error
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Truncate a vendor response body for inclusion in an error message
pub fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
