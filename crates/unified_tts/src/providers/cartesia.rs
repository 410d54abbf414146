//! Cartesia Speech Provider
//!
//! Talks to the Cartesia `/tts/bytes` endpoint directly over HTTP: a JSON
//! payload is POSTed with bearer authentication and the response body is
//! returned as the audio.
//!
//! # Settings
//!
//! | key            | default                                |
//! |----------------|----------------------------------------|
//! | `api_key`      | `CARTESIA_API_KEY` env var             |
//! | `api_endpoint` | `https://api.cartesia.ai/tts/bytes`    |
//! | `version`      | `2024-06-10` (`Cartesia-Version`)      |
//! | `timeout_ms`   | none                                   |
//! | `voice_id`     | `c61e634d-5f60-4949-b3e6-c886016bdf5f` |
//! | `model_id`     | `sonic-english`                        |
//! | `output_format`| `wav`                                  |
//! | `sample_rate`  | `24000`                                |
//!
//! Per call, `voice_id`, `model_id`, `sample_rate` and `language` may be
//! passed as options.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, instrument};

use super::{
    build_http_client, invalid_call_option, invalid_setting, resolve_api_key, string_setting,
    timeout_setting,
};
use crate::error::{ConfigurationError, SynthesisError, TtsError, truncate_body};
use crate::ports::{EnvironmentPort, TextToSpeech};
use crate::types::{AudioFormat, OptionMap, SynthesisRequest};

const DEFAULT_API_ENDPOINT: &str = "https://api.cartesia.ai/tts/bytes";
const DEFAULT_API_VERSION: &str = "2024-06-10";
const DEFAULT_VOICE_ID: &str = "c61e634d-5f60-4949-b3e6-c886016bdf5f";
const DEFAULT_MODEL_ID: &str = "sonic-english";
const DEFAULT_FORMAT: &str = "wav";
const DEFAULT_SAMPLE_RATE: u32 = 24_000;
const MP3_BIT_RATE: u32 = 128_000;

/// Environment variable consulted when no `api_key` setting is given
pub const API_KEY_ENV: &str = "CARTESIA_API_KEY";

/// Cartesia TTS request body
#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    model_id: &'a str,
    transcript: &'a str,
    voice: VoiceSpec<'a>,
    output_format: OutputFormat<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct VoiceSpec<'a> {
    mode: &'static str,
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct OutputFormat<'a> {
    container: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<&'static str>,
    sample_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    bit_rate: Option<u32>,
}

impl<'a> OutputFormat<'a> {
    /// Map a format hint to Cartesia's container/encoding pair
    fn for_hint(hint: &'a str, sample_rate: u32) -> Self {
        let (container, encoding, bit_rate) = match hint.parse::<AudioFormat>() {
            Ok(AudioFormat::Mp3) => ("mp3", None, Some(MP3_BIT_RATE)),
            Ok(AudioFormat::Wav) => ("wav", Some("pcm_s16le"), None),
            Ok(AudioFormat::Pcm) => ("raw", Some("pcm_s16le"), None),
            // Anything else is passed through for the API to judge
            _ => (hint, None, None),
        };
        Self {
            container,
            encoding,
            sample_rate,
            bit_rate,
        }
    }
}

/// Cartesia text-to-speech provider
#[derive(Debug)]
pub struct CartesiaProvider {
    client: Client,
    api_key: SecretString,
    api_endpoint: String,
    api_version: String,
    default_voice_id: String,
    default_model_id: String,
    default_format: String,
    default_sample_rate: u32,
}

impl CartesiaProvider {
    /// Registry name
    pub const NAME: &'static str = "cartesia";

    /// Create the provider from its effective settings
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if no API key is available or a setting
    /// is invalid.
    pub fn new(settings: &OptionMap, env: &dyn EnvironmentPort) -> Result<Self, ConfigurationError> {
        let api_key = resolve_api_key("Cartesia", settings, env, API_KEY_ENV)?;

        let default_sample_rate = settings
            .get_u32("sample_rate")
            .map_err(|reason| invalid_setting(Self::NAME, "sample_rate", reason))?
            .unwrap_or(DEFAULT_SAMPLE_RATE);
        if default_sample_rate == 0 {
            return Err(invalid_setting(
                Self::NAME,
                "sample_rate",
                "must be greater than 0",
            ));
        }

        let client = build_http_client(Self::NAME, timeout_setting(Self::NAME, settings)?)?;
        debug!("Using HTTP session for Cartesia API calls");

        Ok(Self {
            client,
            api_key,
            api_endpoint: string_setting(Self::NAME, settings, "api_endpoint", DEFAULT_API_ENDPOINT)?,
            api_version: string_setting(Self::NAME, settings, "version", DEFAULT_API_VERSION)?,
            default_voice_id: string_setting(Self::NAME, settings, "voice_id", DEFAULT_VOICE_ID)?,
            default_model_id: string_setting(Self::NAME, settings, "model_id", DEFAULT_MODEL_ID)?,
            default_format: string_setting(Self::NAME, settings, "output_format", DEFAULT_FORMAT)?,
            default_sample_rate,
        })
    }

    /// Registry factory
    pub fn factory(
        settings: &OptionMap,
        env: &dyn EnvironmentPort,
    ) -> Result<Box<dyn TextToSpeech>, ConfigurationError> {
        Ok(Box::new(Self::new(settings, env)?))
    }

    /// Endpoint the provider posts to
    #[must_use]
    pub fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    /// Voice used when a call does not name one
    #[must_use]
    pub fn default_voice_id(&self) -> &str {
        &self.default_voice_id
    }

    /// Model used when a call does not name one
    #[must_use]
    pub fn default_model_id(&self) -> &str {
        &self.default_model_id
    }

    /// Sample rate used when a call does not set one
    #[must_use]
    pub const fn default_sample_rate(&self) -> u32 {
        self.default_sample_rate
    }

    fn request_error(detail: impl std::fmt::Display) -> SynthesisError {
        SynthesisError::new(Self::NAME, format!("Cartesia API request error: {detail}"))
    }
}

#[async_trait]
impl TextToSpeech for CartesiaProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[instrument(skip(self, request), fields(text_len = request.text.len()))]
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, TtsError> {
        if request.text.is_empty() {
            return Err(SynthesisError::new(Self::NAME, "Text cannot be empty").into());
        }

        let options = &request.options;
        let str_option = |key: &str, default: &str| -> Result<String, SynthesisError> {
            Ok(options
                .get_str(key)
                .map_err(|reason| invalid_call_option(Self::NAME, key, &reason))?
                .unwrap_or(default)
                .to_string())
        };

        let voice_id = str_option("voice_id", &self.default_voice_id)?;
        let model_id = str_option("model_id", &self.default_model_id)?;
        let language = options
            .get_str("language")
            .map_err(|reason| invalid_call_option(Self::NAME, "language", &reason))?;
        let sample_rate = options
            .get_u32("sample_rate")
            .map_err(|reason| invalid_call_option(Self::NAME, "sample_rate", &reason))?
            .unwrap_or(self.default_sample_rate);
        if sample_rate == 0 {
            return Err(
                invalid_call_option(Self::NAME, "sample_rate", "must be greater than 0").into(),
            );
        }
        let format = request
            .output_format
            .as_deref()
            .unwrap_or(&self.default_format);

        let payload = TtsRequest {
            model_id: &model_id,
            transcript: &request.text,
            voice: VoiceSpec {
                mode: "id",
                id: &voice_id,
            },
            output_format: OutputFormat::for_hint(format, sample_rate),
            language,
        };

        debug!(
            model_id = %model_id,
            voice_id = %voice_id,
            format = format,
            sample_rate = sample_rate,
            "Synthesizing speech with Cartesia"
        );

        let response = self
            .client
            .post(&self.api_endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .header("Cartesia-Version", &self.api_version)
            .json(&payload)
            .send()
            .await
            .map_err(Self::request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::request_error(format!(
                "Status Code: {}, Response: {}",
                status.as_u16(),
                truncate_body(&body)
            ))
            .into());
        }

        let audio = response.bytes().await.map_err(|e| {
            SynthesisError::new(
                Self::NAME,
                format!("An unexpected error occurred during Cartesia synthesis: {e}"),
            )
        })?;

        debug!(audio_size = audio.len(), "Speech synthesis complete");
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MapEnvironment;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_provider(mock_server: &MockServer) -> CartesiaProvider {
        let settings = OptionMap::new()
            .with("api_key", "test-cartesia-key")
            .with("api_endpoint", format!("{}/tts/bytes", mock_server.uri()));
        CartesiaProvider::new(&settings, &MapEnvironment::new()).unwrap()
    }

    mod config_tests {
        use super::*;

        #[test]
        fn new_fails_without_api_key() {
            let result = CartesiaProvider::new(&OptionMap::new(), &MapEnvironment::new());

            assert!(matches!(
                result,
                Err(ConfigurationError::MissingCredential { ref env_var, .. }) if env_var == API_KEY_ENV
            ));
        }

        #[test]
        fn new_reads_api_key_from_environment() {
            let env = MapEnvironment::new().with(API_KEY_ENV, "ck-env");
            assert!(CartesiaProvider::new(&OptionMap::new(), &env).is_ok());
        }

        #[test]
        fn defaults() {
            let settings = OptionMap::new().with("api_key", "ck-test");
            let provider = CartesiaProvider::new(&settings, &MapEnvironment::new()).unwrap();

            assert_eq!(provider.api_endpoint(), "https://api.cartesia.ai/tts/bytes");
            assert_eq!(provider.default_voice_id(), DEFAULT_VOICE_ID);
            assert_eq!(provider.default_model_id(), "sonic-english");
            assert_eq!(provider.default_sample_rate(), 24_000);
        }

        #[test]
        fn zero_sample_rate_is_rejected() {
            let settings = OptionMap::new().with("api_key", "ck-test").with("sample_rate", 0);

            let result = CartesiaProvider::new(&settings, &MapEnvironment::new());

            assert!(matches!(
                result,
                Err(ConfigurationError::InvalidOption { ref key, .. }) if key == "sample_rate"
            ));
        }
    }

    mod format_tests {
        use super::*;

        #[test]
        fn wav_uses_pcm_encoding() {
            let format = OutputFormat::for_hint("wav", 24_000);
            assert_eq!(format.container, "wav");
            assert_eq!(format.encoding, Some("pcm_s16le"));
            assert_eq!(format.bit_rate, None);
        }

        #[test]
        fn mp3_sets_bit_rate() {
            let format = OutputFormat::for_hint("mp3", 44_100);
            assert_eq!(format.container, "mp3");
            assert_eq!(format.encoding, None);
            assert_eq!(format.bit_rate, Some(MP3_BIT_RATE));
            assert_eq!(format.sample_rate, 44_100);
        }

        #[test]
        fn raw_pcm_uses_raw_container() {
            let format = OutputFormat::for_hint("pcm", 16_000);
            assert_eq!(format.container, "raw");
            assert_eq!(format.encoding, Some("pcm_s16le"));
        }

        #[test]
        fn unknown_hint_is_passed_through() {
            let format = OutputFormat::for_hint("mulaw", 8_000);
            assert_eq!(format.container, "mulaw");
            assert_eq!(format.encoding, None);
        }
    }

    mod tts_tests {
        use super::*;

        #[tokio::test]
        async fn synthesize_posts_payload_with_bearer_auth() {
            let mock_server = MockServer::start().await;
            let audio_bytes = b"RIFF....WAVE".to_vec();

            Mock::given(method("POST"))
                .and(path("/tts/bytes"))
                .and(header("authorization", "Bearer test-cartesia-key"))
                .and(header("Cartesia-Version", DEFAULT_API_VERSION))
                .and(header("content-type", "application/json"))
                .and(body_json(serde_json::json!({
                    "model_id": "sonic-english",
                    "transcript": "Hello from Cartesia",
                    "voice": { "mode": "id", "id": DEFAULT_VOICE_ID },
                    "output_format": {
                        "container": "wav",
                        "encoding": "pcm_s16le",
                        "sample_rate": 24000
                    }
                })))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(audio_bytes.clone()))
                .expect(1)
                .mount(&mock_server)
                .await;

            let provider = create_test_provider(&mock_server);
            let request = SynthesisRequest::new("Hello from Cartesia", "cartesia");

            let audio = provider.synthesize(&request).await.unwrap();

            assert_eq!(audio.as_ref(), audio_bytes.as_slice());
        }

        #[tokio::test]
        async fn call_options_are_applied() {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/tts/bytes"))
                .and(body_json(serde_json::json!({
                    "model_id": "sonic-2",
                    "transcript": "Bonjour",
                    "voice": { "mode": "id", "id": "voice-fr" },
                    "output_format": {
                        "container": "mp3",
                        "sample_rate": 44100,
                        "bit_rate": 128000
                    },
                    "language": "fr"
                })))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xFB]))
                .expect(1)
                .mount(&mock_server)
                .await;

            let provider = create_test_provider(&mock_server);
            let request = SynthesisRequest::new("Bonjour", "cartesia")
                .with_output_format("mp3")
                .with_option("voice_id", "voice-fr")
                .with_option("model_id", "sonic-2")
                .with_option("sample_rate", 44_100)
                .with_option("language", "fr");

            assert!(provider.synthesize(&request).await.is_ok());
        }

        #[tokio::test]
        async fn error_status_includes_code_and_truncated_body() {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/tts/bytes"))
                .respond_with(ResponseTemplate::new(400).set_body_string("y".repeat(500)))
                .expect(1)
                .mount(&mock_server)
                .await;

            let provider = create_test_provider(&mock_server);
            let request = SynthesisRequest::new("Test", "cartesia");

            let Err(TtsError::Synthesis(e)) = provider.synthesize(&request).await else {
                panic!("Expected synthesis error");
            };

            assert_eq!(e.provider, "cartesia");
            assert!(e.message.contains("Status Code: 400"));
            assert!(e.message.contains(&"y".repeat(200)));
            assert!(!e.message.contains(&"y".repeat(201)));
        }

        #[tokio::test]
        async fn connection_failure_maps_to_synthesis_error() {
            let settings = OptionMap::new()
                .with("api_key", "ck-test")
                .with("api_endpoint", "http://127.0.0.1:1/tts/bytes");
            let provider = CartesiaProvider::new(&settings, &MapEnvironment::new()).unwrap();
            let request = SynthesisRequest::new("Test", "cartesia");

            let result = provider.synthesize(&request).await;

            match result {
                Err(TtsError::Synthesis(e)) => {
                    assert!(e.message.starts_with("Cartesia API request error"));
                },
                other => panic!("Expected synthesis error, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn empty_text_fails() {
            let mock_server = MockServer::start().await;
            let provider = create_test_provider(&mock_server);

            let result = provider.synthesize(&SynthesisRequest::new("", "cartesia")).await;

            assert!(matches!(result, Err(TtsError::Synthesis(_))));
        }

        #[tokio::test]
        async fn invalid_sample_rate_option_fails() {
            let mock_server = MockServer::start().await;
            let provider = create_test_provider(&mock_server);
            let request =
                SynthesisRequest::new("Test", "cartesia").with_option("sample_rate", "high");

            let result = provider.synthesize(&request).await;

            assert!(matches!(result, Err(TtsError::Synthesis(_))));
        }

        #[tokio::test]
        async fn zero_sample_rate_option_fails_without_request() {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1]))
                .expect(0)
                .mount(&mock_server)
                .await;

            let provider = create_test_provider(&mock_server);
            let request = SynthesisRequest::new("Test", "cartesia").with_option("sample_rate", 0);

            match provider.synthesize(&request).await {
                Err(TtsError::Synthesis(e)) => {
                    assert_eq!(e.provider, "cartesia");
                    assert!(e.message.contains("Invalid option 'sample_rate'"));
                },
                other => panic!("Expected synthesis error, got {other:?}"),
            }
        }
    }
}
