//! Types for speech synthesis
//!
//! Contains audio formats, the option map shared by provider settings and
//! per-call options, and the request/outcome pair of a synthesis call.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known audio container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    /// MP3 format
    Mp3,
    /// Opus codec
    Opus,
    /// AAC format
    Aac,
    /// FLAC format (lossless)
    Flac,
    /// WAV format (uncompressed)
    Wav,
    /// Raw PCM samples without a container
    Pcm,
}

impl AudioFormat {
    /// Format name as sent to vendors
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::Wav => "wav",
            Self::Pcm => "pcm",
        }
    }

    /// Guess the format from a file path's extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" | "mpeg" => Ok(Self::Mp3),
            "opus" | "ogg" => Ok(Self::Opus),
            "aac" | "m4a" => Ok(Self::Aac),
            "flac" => Ok(Self::Flac),
            "wav" | "wave" => Ok(Self::Wav),
            "pcm" | "raw" => Ok(Self::Pcm),
            other => Err(format!("unknown audio format: {other}")),
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String-keyed option values (strings, numbers, booleans)
///
/// Used both for a provider's effective settings and for per-call options.
/// Typed getters return `Err(reason)` when a value is present but has the
/// wrong type; callers turn the reason into the error kind of their phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionMap(Map<String, Value>);

impl OptionMap {
    /// Create an empty option map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, returning `self` for chaining
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set an option, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Merge every entry of `other` into `self`; `other` wins on conflicts
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Remove an option
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Raw value lookup
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Check whether a key is set
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Check if the map is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// String option; `null` counts as absent
    pub fn get_str(&self, key: &str) -> Result<Option<&str>, String> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(format!("expected a string, got {other}")),
        }
    }

    /// Floating point option; numeric strings are accepted
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, String> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| format!("expected a number, got {n}")),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("expected a number, got \"{s}\"")),
            Some(other) => Err(format!("expected a number, got {other}")),
        }
    }

    /// Unsigned integer option; numeric strings are accepted
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, String> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| format!("expected a non-negative integer, got {n}")),
            Some(Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| format!("expected a non-negative integer, got \"{s}\"")),
            Some(other) => Err(format!("expected a non-negative integer, got {other}")),
        }
    }

    /// `u32` option, range-checked
    pub fn get_u32(&self, key: &str) -> Result<Option<u32>, String> {
        self.get_u64(key)?
            .map(|v| u32::try_from(v).map_err(|_| format!("value {v} is out of range")))
            .transpose()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for OptionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One synthesis call, as handed to the façade
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Text to synthesize
    pub text: String,
    /// Registry name of the target provider
    pub provider: String,
    /// Write the audio here instead of returning it
    pub output_path: Option<PathBuf>,
    /// Per-call output format override (provider-specific name)
    pub output_format: Option<String>,
    /// Vendor-specific options (voice, model, speed, ...)
    pub options: OptionMap,
}

impl SynthesisRequest {
    /// Create a request for `provider` with no overrides
    #[must_use]
    pub fn new(text: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            output_path: None,
            output_format: None,
            options: OptionMap::new(),
        }
    }

    /// Save the audio to `path`
    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Override the provider's default output format
    #[must_use]
    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    /// Add a vendor-specific option
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key, value);
        self
    }

    /// Replace all vendor-specific options
    #[must_use]
    pub fn with_options(mut self, options: OptionMap) -> Self {
        self.options = options;
        self
    }

    /// Fold an `output_format` entry of the options into the request.
    ///
    /// The explicit field wins; the entry is removed from the options either way.
    pub(crate) fn normalize_output_format(&mut self) {
        let from_options = self.options.remove("output_format");
        if self.output_format.is_none()
            && let Some(Value::String(format)) = from_options
        {
            self.output_format = Some(format);
        }
    }
}

/// Result of a successful synthesis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// Raw audio returned to the caller (no output path given)
    Audio(Bytes),
    /// Audio was written to a file; no bytes are returned
    Saved {
        /// Path that was written
        path: PathBuf,
        /// Number of bytes written
        bytes_written: usize,
    },
}

impl SynthesisOutcome {
    /// Audio bytes, if the call returned them
    #[must_use]
    pub fn into_audio(self) -> Option<Bytes> {
        match self {
            Self::Audio(bytes) => Some(bytes),
            Self::Saved { .. } => None,
        }
    }

    /// Check whether the audio was written to a file
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod audio_format_tests {
        use super::*;

        #[test]
        fn parses_common_names() {
            assert_eq!("mp3".parse::<AudioFormat>(), Ok(AudioFormat::Mp3));
            assert_eq!("WAV".parse::<AudioFormat>(), Ok(AudioFormat::Wav));
            assert_eq!("m4a".parse::<AudioFormat>(), Ok(AudioFormat::Aac));
            assert_eq!("raw".parse::<AudioFormat>(), Ok(AudioFormat::Pcm));
            assert!("midi".parse::<AudioFormat>().is_err());
        }

        #[test]
        fn infers_from_path() {
            assert_eq!(
                AudioFormat::from_path(Path::new("out/audio.mp3")),
                Some(AudioFormat::Mp3)
            );
            assert_eq!(
                AudioFormat::from_path(Path::new("speech.flac")),
                Some(AudioFormat::Flac)
            );
            assert_eq!(AudioFormat::from_path(Path::new("speech")), None);
            assert_eq!(AudioFormat::from_path(Path::new("speech.txt")), None);
        }

    }

    mod option_map_tests {
        use super::*;

        #[test]
        fn typed_getters_read_matching_values() {
            let options = OptionMap::new()
                .with("voice", "nova")
                .with("speed", 1.5)
                .with("sample_rate", 44_100);

            assert_eq!(options.get_str("voice"), Ok(Some("nova")));
            assert_eq!(options.get_f64("speed"), Ok(Some(1.5)));
            assert_eq!(options.get_u32("sample_rate"), Ok(Some(44_100)));
            assert_eq!(options.get_str("model"), Ok(None));
        }

        #[test]
        fn typed_getters_reject_wrong_types() {
            let options = OptionMap::new().with("voice", 3).with("speed", "fast");

            assert!(options.get_str("voice").is_err());
            assert!(options.get_f64("speed").is_err());
        }

        #[test]
        fn numeric_strings_are_accepted() {
            let options = OptionMap::new()
                .with("speed", "1.25")
                .with("sample_rate", "22050");

            assert_eq!(options.get_f64("speed"), Ok(Some(1.25)));
            assert_eq!(options.get_u32("sample_rate"), Ok(Some(22_050)));
        }

        #[test]
        fn null_counts_as_absent() {
            let options = OptionMap::new().with("voice", Value::Null);
            assert_eq!(options.get_str("voice"), Ok(None));
        }

        #[test]
        fn u32_rejects_out_of_range() {
            let options = OptionMap::new().with("sample_rate", u64::from(u32::MAX) + 1);
            assert!(options.get_u32("sample_rate").is_err());
        }

        #[test]
        fn merge_overwrites_existing_keys() {
            let mut base = OptionMap::new().with("voice", "alloy").with("model", "tts-1");
            base.merge(&OptionMap::new().with("voice", "nova"));

            assert_eq!(base.get_str("voice"), Ok(Some("nova")));
            assert_eq!(base.get_str("model"), Ok(Some("tts-1")));
        }
    }

    mod request_tests {
        use super::*;

        #[test]
        fn explicit_output_format_wins_over_option() {
            let mut request = SynthesisRequest::new("hi", "openai")
                .with_output_format("wav")
                .with_option("output_format", "flac");

            request.normalize_output_format();

            assert_eq!(request.output_format.as_deref(), Some("wav"));
            assert!(!request.options.contains_key("output_format"));
        }

        #[test]
        fn option_output_format_used_when_no_explicit_format() {
            let mut request =
                SynthesisRequest::new("hi", "openai").with_option("output_format", "flac");

            request.normalize_output_format();

            assert_eq!(request.output_format.as_deref(), Some("flac"));
            assert!(request.options.is_empty());
        }
    }

    #[test]
    fn outcome_accessors() {
        let audio = SynthesisOutcome::Audio(Bytes::from_static(b"ABC"));
        assert!(!audio.is_saved());
        assert_eq!(audio.into_audio(), Some(Bytes::from_static(b"ABC")));

        let saved = SynthesisOutcome::Saved {
            path: PathBuf::from("out.mp3"),
            bytes_written: 3,
        };
        assert!(saved.is_saved());
        assert_eq!(saved.into_audio(), None);
    }
}
