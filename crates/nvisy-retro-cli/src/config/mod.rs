//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── config: PathBuf             # JSON configuration file
//! ├── overrides: RetroOverrides   # per-field Retro overrides
//! └── encoder / pretty            # output selection
//! ```
//!
//! All options can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.

mod overrides;

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use nvisy_retro::{RetroConfig, RetroConfigSource};
pub use overrides::RetroOverrides;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "nvisy-retro")]
#[command(about = "Validate and resolve Retro model configurations")]
#[command(version)]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, env = "RETRO_CONFIG")]
    pub config: PathBuf,

    /// Retro field overrides applied on top of the file.
    #[clap(flatten)]
    pub overrides: RetroOverrides,

    /// Print the retrieval encoder configuration instead of the full record.
    #[arg(long)]
    pub encoder: bool,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pub pretty: bool,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Reads the configuration file, applies overrides and validates the result.
    pub fn load(&self) -> anyhow::Result<RetroConfig> {
        let mut source = RetroConfigSource::from_path(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;

        self.overrides.apply(&mut source);

        source.build().context("invalid retro configuration")
    }

    /// Renders the selected output as JSON.
    pub fn render(&self, config: &RetroConfig) -> anyhow::Result<String> {
        if !self.encoder {
            return config
                .to_json_string(self.pretty)
                .context("failed to serialize retro configuration");
        }

        let encoder = config
            .encoder_config()
            .context("invalid retrieval encoder configuration")?;
        let json = if self.pretty {
            serde_json::to_string_pretty(&encoder)
        } else {
            serde_json::to_string(&encoder)
        };
        json.context("failed to serialize encoder configuration")
    }

    /// Logs build information at debug level.
    pub fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Logs the resolved configuration at info level.
    pub fn log(&self, config: &RetroConfig) {
        let transformer = &config.transformer;

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            path = %self.config.display(),
            num_layers = transformer.num_layers,
            hidden_size = transformer.hidden_size,
            num_attention_heads = transformer.num_attention_heads,
            "Transformer configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            project_dir = ?config.retro_project_dir,
            chunk_length = config.chunk_length(),
            num_neighbors = config.retro_num_neighbors,
            num_retrieved_chunks = config.retro_num_retrieved_chunks,
            retrieved_length = config.retro_retrieved_length,
            split = %config.retro_split_preprocessing,
            verify_neighbor_count = config.retro_verify_neighbor_count,
            "Retro configuration"
        );

        match config.split_weights() {
            Ok(weights) => tracing::info!(
                target: TRACING_TARGET_CONFIG,
                train = weights[0],
                valid = weights[1],
                test = weights[2],
                "Preprocessing split"
            ),
            Err(error) => tracing::warn!(
                target: TRACING_TARGET_CONFIG,
                error = %error,
                "Preprocessing split is not a weight list"
            ),
        }
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
