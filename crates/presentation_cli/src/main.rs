//! Unified TTS CLI
//!
//! Command-line front end for listing providers and synthesizing speech.

#![allow(clippy::print_stdout)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unified_tts::{AudioFormat, SynthesisOutcome, SynthesisRequest, TtsConfig, UnifiedTts};

/// Unified TTS CLI
#[derive(Parser)]
#[command(name = "unified-tts")]
#[command(author, version, about = "Text-to-speech across multiple vendors", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// TOML file with [providers.<name>] and [overrides] tables
    #[arg(short, long, env = "UNIFIED_TTS_CONFIG")]
    config: Option<PathBuf>,

    /// Flat override in the form provider_key=value (repeatable)
    ///
    /// Example: -s openai_voice=nova -s cartesia_sample_rate=44100
    #[arg(short = 's', long = "set", value_parser = parse_key_value)]
    overrides: Vec<(String, Value)>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List providers that initialized successfully
    Providers,

    /// Synthesize text with one provider
    ///
    /// Writes to --output when given, raw audio bytes to stdout otherwise.
    /// Example: unified-tts synthesize "Hello" -p openai -o hello.mp3
    Synthesize {
        /// Text to speak
        text: String,

        /// Provider name (see `providers`)
        #[arg(short, long)]
        provider: String,

        /// Output file; parent directories are created
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format hint (inferred from the output extension if omitted)
        #[arg(short, long)]
        format: Option<String>,

        /// Per-call provider option in the form key=value (repeatable)
        #[arg(long = "option", value_parser = parse_key_value)]
        options: Vec<(String, Value)>,
    },
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Parse `key=value`, reading the value as a JSON scalar when possible
fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }

    let value = match serde_json::from_str::<Value>(value) {
        Ok(parsed) if !parsed.is_array() && !parsed.is_object() => parsed,
        _ => Value::String(value.to_string()),
    };
    Ok((key.to_string(), value))
}

/// Load the optional config file, then apply command-line overrides on top
fn load_config(path: Option<&Path>, overrides: Vec<(String, Value)>) -> anyhow::Result<TtsConfig> {
    let mut config = match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration file");
            TtsConfig::from_file(path)
                .with_context(|| format!("Failed to load config from '{}'", path.display()))?
        },
        None => TtsConfig::new(),
    };

    for (key, value) in overrides {
        config = config.with_override(key, value);
    }
    Ok(config)
}

fn build_request(
    text: String,
    provider: String,
    output: Option<PathBuf>,
    format: Option<String>,
    options: Vec<(String, Value)>,
) -> SynthesisRequest {
    let format = format.or_else(|| {
        output
            .as_deref()
            .and_then(AudioFormat::from_path)
            .map(|f| f.as_str().to_string())
    });

    let mut request = SynthesisRequest::new(text, provider).with_options(options.into_iter().collect());
    if let Some(path) = output {
        request = request.with_output_path(path);
    }
    if let Some(format) = format {
        request = request.with_output_format(format);
    }
    request
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays free for audio
    let filter = log_filter_from_verbosity(cli.verbose);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(cli.config.as_deref(), cli.overrides)?;
    let tts = UnifiedTts::new(&config);

    match cli.command {
        Commands::Providers => {
            for name in tts.list_available_providers() {
                println!("{name}");
            }
        },

        Commands::Synthesize {
            text,
            provider,
            output,
            format,
            options,
        } => {
            let request = build_request(text, provider, output, format, options);

            match tts.synthesize(request).await? {
                SynthesisOutcome::Saved {
                    path,
                    bytes_written,
                } => {
                    info!(path = %path.display(), bytes_written, "Synthesis complete");
                    println!("✅ Saved {bytes_written} bytes to {}", path.display());
                },
                SynthesisOutcome::Audio(audio) => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&audio).await?;
                    stdout.flush().await?;
                },
            }
        },
    }

    Ok(())
}
