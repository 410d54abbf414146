//! Unified TTS façade
//!
//! Builds every registered provider once, keeps the ones that configured
//! successfully, and dispatches synthesis calls to them by name.
//!
//! ```text
//! SynthesisRequest
//!     │
//!     ▼
//! ┌──────────────────────────────┐
//! │          UnifiedTts          │
//! │  active set lookup by name   │──▶ ProviderNotFound
//! └──────────────────────────────┘
//!     │
//!     ▼
//!  provider.synthesize ──────────────▶ Synthesis
//!     │
//!     ├── output path ──▶ write file ──▶ Saved / Io
//!     └── no path ─────────────────────▶ Audio
//! ```

use std::path::Path;

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use crate::config::TtsConfig;
use crate::error::{SynthesisError, TtsError};
use crate::ports::{EnvironmentPort, ProcessEnvironment, TextToSpeech};
use crate::registry::ProviderRegistry;
use crate::types::{SynthesisOutcome, SynthesisRequest};

struct ActiveProvider {
    name: &'static str,
    provider: Box<dyn TextToSpeech>,
}

/// One call surface over every configured TTS provider
pub struct UnifiedTts {
    active: Vec<ActiveProvider>,
}

impl std::fmt::Debug for UnifiedTts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiedTts")
            .field("active", &self.list_available_providers())
            .finish()
    }
}

impl UnifiedTts {
    /// Build every built-in provider, reading credentials from the process
    /// environment when the configuration has none.
    pub fn new(config: &TtsConfig) -> Self {
        Self::with_registry(ProviderRegistry::builtin(), config, &ProcessEnvironment)
    }

    /// Build every provider of `registry`
    ///
    /// A provider whose construction fails is logged and left out; this
    /// never fails, even when no provider ends up active.
    pub fn with_registry(
        registry: &ProviderRegistry,
        config: &TtsConfig,
        env: &dyn EnvironmentPort,
    ) -> Self {
        let effective = config.resolve(registry);
        let mut active = Vec::with_capacity(registry.len());

        for descriptor in registry.iter() {
            let name = descriptor.name();
            match descriptor.build(&effective.settings_for(name), env) {
                Ok(provider) => {
                    info!(provider = name, "Successfully initialized provider");
                    active.push(ActiveProvider { name, provider });
                },
                Err(e) => {
                    warn!(
                        provider = name,
                        error = %e,
                        "Failed to initialize provider; it will be unavailable"
                    );
                },
            }
        }

        Self { active }
    }

    /// Names of the successfully initialized providers, in registry order
    pub fn list_available_providers(&self) -> Vec<String> {
        self.active.iter().map(|p| p.name.to_string()).collect()
    }

    /// Check whether `name` is in the active set
    pub fn is_available(&self, name: &str) -> bool {
        self.provider(name).is_some()
    }

    fn provider(&self, name: &str) -> Option<&dyn TextToSpeech> {
        self.active
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.provider.as_ref())
    }

    /// Synthesize `request.text` with the named provider
    ///
    /// With an output path the audio is written there (parent directories
    /// are created) and [`SynthesisOutcome::Saved`] is returned; otherwise the
    /// bytes come back as [`SynthesisOutcome::Audio`].
    ///
    /// # Errors
    ///
    /// - `TtsError::ProviderNotFound` if the provider is not active
    /// - `TtsError::Synthesis` if the provider fails, whatever its error kind
    /// - `TtsError::Io` if the output file cannot be written
    #[instrument(skip(self, request), fields(provider = %request.provider, text_len = request.text.len()))]
    pub async fn synthesize(
        &self,
        mut request: SynthesisRequest,
    ) -> Result<SynthesisOutcome, TtsError> {
        let Some(provider) = self.provider(&request.provider) else {
            return Err(TtsError::ProviderNotFound {
                requested: request.provider,
                available: self.list_available_providers(),
            });
        };

        request.normalize_output_format();

        let audio = match provider.synthesize(&request).await {
            Ok(audio) => audio,
            Err(TtsError::Synthesis(e)) => return Err(e.into()),
            Err(other) => {
                return Err(SynthesisError::new(
                    request.provider.as_str(),
                    format!("Unexpected error during synthesis: {other}"),
                )
                .into());
            },
        };

        let Some(path) = request.output_path else {
            debug!(bytes = audio.len(), "Returning audio to caller");
            return Ok(SynthesisOutcome::Audio(audio));
        };

        save_audio(&path, &audio)
            .await
            .map_err(|source| TtsError::Io {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), bytes = audio.len(), "Audio saved");
        Ok(SynthesisOutcome::Saved {
            path,
            bytes_written: audio.len(),
        })
    }
}

async fn save_audio(path: &Path, audio: &Bytes) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, audio).await
}
