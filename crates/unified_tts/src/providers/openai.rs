//! OpenAI Speech Provider
//!
//! Implements `TextToSpeech` on top of a small typed client for the
//! `/audio/speech` endpoint. The client is created once at construction and
//! reused for every call.
//!
//! # Settings
//!
//! | key             | default                     |
//! |-----------------|-----------------------------|
//! | `api_key`       | `OPENAI_API_KEY` env var    |
//! | `base_url`      | `https://api.openai.com/v1` |
//! | `organization`  | none                        |
//! | `timeout_ms`    | none                        |
//! | `voice`         | `alloy`                     |
//! | `model`         | `tts-1`                     |
//! | `speed`         | `1.0` (0.25 to 4.0)         |
//! | `output_format` | `mp3`                       |
//!
//! Per call, `voice`, `model`, `speed` and `response_format` may be passed as
//! options; `response_format` beats the request's output format.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use super::{
    build_http_client, invalid_call_option, invalid_setting, resolve_api_key, string_setting,
    timeout_setting,
};
use crate::error::{ConfigurationError, SynthesisError, TtsError, truncate_body};
use crate::ports::{EnvironmentPort, TextToSpeech};
use crate::types::{OptionMap, SynthesisRequest};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_VOICE: &str = "alloy";
const DEFAULT_MODEL: &str = "tts-1";
const DEFAULT_FORMAT: &str = "mp3";
const DEFAULT_SPEED: f64 = 1.0;
const SPEED_RANGE: std::ops::RangeInclusive<f64> = 0.25..=4.0;

/// Environment variable consulted when no `api_key` setting is given
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Parameters of one `/audio/speech` call
#[derive(Debug, Serialize)]
pub struct SpeechParams<'a> {
    /// TTS model
    pub model: &'a str,
    /// Text to speak
    pub input: &'a str,
    /// Voice name
    pub voice: &'a str,
    /// Audio container (mp3, opus, aac, flac, wav, pcm)
    pub response_format: &'a str,
    /// Speed multiplier
    pub speed: f64,
}

/// Failure of an OpenAI API call
#[derive(Debug, Error)]
pub enum OpenAIApiError {
    /// The API answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status
        status: StatusCode,
        /// Error message from the body, or the truncated raw body
        message: String,
    },
    /// The request never produced a usable response
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// OpenAI API error response
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Minimal OpenAI audio client
#[derive(Debug)]
pub struct OpenAIClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
    organization: Option<String>,
}

impl OpenAIClient {
    /// Create a client for `base_url`
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        organization: Option<String>,
        timeout_ms: Option<u64>,
    ) -> Result<Self, ConfigurationError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http: build_http_client(OpenAIProvider::NAME, timeout_ms)?,
            api_key,
            base_url,
            organization,
        })
    }

    /// Base URL the client talks to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.base_url)
    }

    /// Create speech audio, buffering the whole response body
    pub async fn create_speech(&self, params: &SpeechParams<'_>) -> Result<Bytes, OpenAIApiError> {
        let mut request = self
            .http
            .post(self.speech_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(params);

        if let Some(organization) = &self.organization {
            request = request.header("OpenAI-Organization", organization);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map_or_else(|_| truncate_body(&body), |e| truncate_body(&e.error.message));
            return Err(OpenAIApiError::Status { status, message });
        }

        Ok(response.bytes().await?)
    }
}

/// OpenAI text-to-speech provider
#[derive(Debug)]
pub struct OpenAIProvider {
    client: OpenAIClient,
    default_voice: String,
    default_model: String,
    default_speed: f64,
    default_format: String,
}

impl OpenAIProvider {
    /// Registry name
    pub const NAME: &'static str = "openai";

    /// Create the provider from its effective settings
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if no API key is available or a setting
    /// is invalid.
    pub fn new(settings: &OptionMap, env: &dyn EnvironmentPort) -> Result<Self, ConfigurationError> {
        let api_key = resolve_api_key("OpenAI", settings, env, API_KEY_ENV)?;

        let base_url = string_setting(Self::NAME, settings, "base_url", DEFAULT_BASE_URL)?;
        let organization = settings
            .get_str("organization")
            .map_err(|reason| invalid_setting(Self::NAME, "organization", reason))?
            .map(str::to_owned);
        let timeout_ms = timeout_setting(Self::NAME, settings)?;

        let default_speed = settings
            .get_f64("speed")
            .map_err(|reason| invalid_setting(Self::NAME, "speed", reason))?
            .unwrap_or(DEFAULT_SPEED);
        if !SPEED_RANGE.contains(&default_speed) {
            return Err(invalid_setting(
                Self::NAME,
                "speed",
                format!("must be between 0.25 and 4.0, got {default_speed}"),
            ));
        }

        let client = OpenAIClient::new(api_key, base_url, organization, timeout_ms)?;

        Ok(Self {
            client,
            default_voice: string_setting(Self::NAME, settings, "voice", DEFAULT_VOICE)?,
            default_model: string_setting(Self::NAME, settings, "model", DEFAULT_MODEL)?,
            default_speed,
            default_format: string_setting(Self::NAME, settings, "output_format", DEFAULT_FORMAT)?,
        })
    }

    /// Registry factory
    pub fn factory(
        settings: &OptionMap,
        env: &dyn EnvironmentPort,
    ) -> Result<Box<dyn TextToSpeech>, ConfigurationError> {
        Ok(Box::new(Self::new(settings, env)?))
    }

    /// Voice used when a call does not name one
    #[must_use]
    pub fn default_voice(&self) -> &str {
        &self.default_voice
    }

    /// Model used when a call does not name one
    #[must_use]
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Speed used when a call does not set one
    #[must_use]
    pub const fn default_speed(&self) -> f64 {
        self.default_speed
    }

    /// Format used when neither the call nor its options name one
    #[must_use]
    pub fn default_format(&self) -> &str {
        &self.default_format
    }

    fn call_str<'a>(
        options: &'a OptionMap,
        key: &str,
        default: &'a str,
    ) -> Result<&'a str, SynthesisError> {
        Ok(options
            .get_str(key)
            .map_err(|reason| invalid_call_option(Self::NAME, key, &reason))?
            .unwrap_or(default))
    }
}

#[async_trait]
impl TextToSpeech for OpenAIProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[instrument(skip(self, request), fields(text_len = request.text.len()))]
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, TtsError> {
        if request.text.is_empty() {
            return Err(SynthesisError::new(Self::NAME, "Text cannot be empty").into());
        }

        let options = &request.options;
        let format_default = request
            .output_format
            .as_deref()
            .unwrap_or(&self.default_format);

        let speed = options
            .get_f64("speed")
            .map_err(|reason| invalid_call_option(Self::NAME, "speed", &reason))?
            .unwrap_or(self.default_speed);
        if !SPEED_RANGE.contains(&speed) {
            return Err(invalid_call_option(
                Self::NAME,
                "speed",
                &format!("must be between 0.25 and 4.0, got {speed}"),
            )
            .into());
        }

        let params = SpeechParams {
            model: Self::call_str(options, "model", &self.default_model)?,
            input: &request.text,
            voice: Self::call_str(options, "voice", &self.default_voice)?,
            response_format: Self::call_str(options, "response_format", format_default)?,
            speed,
        };

        debug!(
            model = params.model,
            voice = params.voice,
            format = params.response_format,
            "Synthesizing speech with OpenAI TTS"
        );

        let audio = self.client.create_speech(&params).await.map_err(|e| {
            let message = match e {
                OpenAIApiError::Status { .. } => format!("OpenAI API error during synthesis: {e}"),
                OpenAIApiError::Transport(_) => {
                    format!("An unexpected error occurred during OpenAI synthesis: {e}")
                },
            };
            SynthesisError::new(Self::NAME, message)
        })?;

        debug!(audio_size = audio.len(), "Speech synthesis complete");
        Ok(audio)
    }
}
