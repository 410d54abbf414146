//! Unified TTS - one call surface over several Text-to-Speech vendors
//!
//! Callers pick a provider by name and get encoded audio back, either as
//! bytes or written to a file. Each vendor sits behind the `TextToSpeech`
//! port; the façade only sees the registry and the port.
//!
//! # Architecture
//!
//! This crate follows the ports & adapters pattern:
//! - `ports` defines the provider and environment traits
//! - `providers` contains the vendor adapters (OpenAI, Cartesia)
//! - `registry` maps provider names to factories
//! - `config` merges nested settings with flat `provider_key` overrides
//! - `facade` builds the active providers and dispatches calls
//!
//! # Example
//!
//! ```ignore
//! use unified_tts::{SynthesisRequest, TtsConfig, UnifiedTts};
//!
//! let config = TtsConfig::new().with_override("openai_voice", "nova");
//! let tts = UnifiedTts::new(&config);
//! println!("Available: {:?}", tts.list_available_providers());
//!
//! let request = SynthesisRequest::new("Hello, world!", "openai").with_output_path("hello.mp3");
//! tts.synthesize(request).await?;
//! ```

pub mod config;
pub mod error;
pub mod facade;
pub mod ports;
pub mod providers;
pub mod registry;
pub mod types;

pub use config::{EffectiveConfig, TtsConfig};
pub use error::{ConfigurationError, SynthesisError, TtsError};
pub use facade::UnifiedTts;
pub use ports::{EnvironmentPort, MapEnvironment, ProcessEnvironment, TextToSpeech};
pub use providers::{CartesiaProvider, OpenAIProvider};
pub use registry::{ProviderDescriptor, ProviderFactory, ProviderRegistry};
pub use types::{AudioFormat, OptionMap, SynthesisOutcome, SynthesisRequest};
