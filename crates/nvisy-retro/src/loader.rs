//! Loading configurations from JSON.
//!
//! Files hold one flat object with the transformer keys and the `retro_*`
//! keys side by side:
//!
//! ```json
//! {
//!     "num_layers": 12,
//!     "hidden_size": 768,
//!     "num_attention_heads": 12,
//!     "retro_chunk_length": 64,
//!     "retro_split_preprocessing": "98,2,0"
//! }
//! ```
//!
//! Parsed values go through [`RetroConfigBuilder`], so loaded and
//! programmatically built configurations are validated identically.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::TRACING_TARGET_LOADER;
use crate::error::{ConfigError, Result};
use crate::retro::{RetroConfig, RetroConfigBuilder};
use crate::split::DatasetSplit;
use crate::transformer::{TransformerConfig, TransformerConfigBuilder};

/// Unvalidated transformer settings as read from a file.
///
/// Every key is optional here so that missing values are reported by
/// [`TransformerConfigBuilder`] rather than by the JSON parser.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransformerConfigSource {
    /// See [`TransformerConfig::num_layers`].
    #[serde(default)]
    pub num_layers: Option<usize>,
    /// See [`TransformerConfig::hidden_size`].
    #[serde(default)]
    pub hidden_size: Option<usize>,
    /// See [`TransformerConfig::num_attention_heads`].
    #[serde(default)]
    pub num_attention_heads: Option<usize>,
    /// See [`TransformerConfig::num_query_groups`].
    #[serde(default)]
    pub num_query_groups: Option<usize>,
    /// See [`TransformerConfig::ffn_hidden_size`].
    #[serde(default)]
    pub ffn_hidden_size: Option<usize>,
    /// See [`TransformerConfig::kv_channels`].
    #[serde(default)]
    pub kv_channels: Option<usize>,
    /// See [`TransformerConfig::hidden_dropout`].
    #[serde(default)]
    pub hidden_dropout: Option<f64>,
    /// See [`TransformerConfig::attention_dropout`].
    #[serde(default)]
    pub attention_dropout: Option<f64>,
    /// See [`TransformerConfig::tensor_model_parallel_size`].
    #[serde(default)]
    pub tensor_model_parallel_size: Option<usize>,
    /// See [`TransformerConfig::pipeline_model_parallel_size`].
    #[serde(default)]
    pub pipeline_model_parallel_size: Option<usize>,
    /// See [`TransformerConfig::fp16`].
    #[serde(default)]
    pub fp16: Option<bool>,
    /// See [`TransformerConfig::bf16`].
    #[serde(default)]
    pub bf16: Option<bool>,
}

impl TransformerConfigSource {
    /// Converts the source into a builder holding every supplied field.
    pub fn into_builder(self) -> TransformerConfigBuilder {
        let mut builder = TransformerConfig::builder();

        if let Some(num_layers) = self.num_layers {
            builder = builder.with_num_layers(num_layers);
        }
        if let Some(hidden_size) = self.hidden_size {
            builder = builder.with_hidden_size(hidden_size);
        }
        if let Some(num_heads) = self.num_attention_heads {
            builder = builder.with_num_attention_heads(num_heads);
        }
        if let Some(groups) = self.num_query_groups {
            builder = builder.with_num_query_groups(groups);
        }
        if let Some(size) = self.ffn_hidden_size {
            builder = builder.with_ffn_hidden_size(size);
        }
        if let Some(channels) = self.kv_channels {
            builder = builder.with_kv_channels(channels);
        }
        if let Some(dropout) = self.hidden_dropout {
            builder = builder.with_hidden_dropout(dropout);
        }
        if let Some(dropout) = self.attention_dropout {
            builder = builder.with_attention_dropout(dropout);
        }
        if let Some(size) = self.tensor_model_parallel_size {
            builder = builder.with_tensor_model_parallel_size(size);
        }
        if let Some(size) = self.pipeline_model_parallel_size {
            builder = builder.with_pipeline_model_parallel_size(size);
        }
        if let Some(fp16) = self.fp16 {
            builder = builder.with_fp16(fp16);
        }
        if let Some(bf16) = self.bf16 {
            builder = builder.with_bf16(bf16);
        }

        builder
    }

    /// Builds and validates the transformer configuration.
    pub fn build(self) -> Result<TransformerConfig> {
        self.into_builder().build()
    }
}

/// Unvalidated configuration as read from a file.
///
/// Retro fields left `None` take the builder defaults. Callers may adjust fields
/// (for example from command-line overrides) before calling
/// [`RetroConfigSource::build`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetroConfigSource {
    /// Base transformer settings.
    #[serde(flatten)]
    pub transformer: TransformerConfigSource,

    /// See [`RetroConfig::retro_project_dir`].
    #[serde(default)]
    pub retro_project_dir: Option<PathBuf>,
    /// See [`RetroConfig::retro_block_size`].
    #[serde(default)]
    pub retro_block_size: Option<usize>,
    /// See [`RetroConfig::retro_chunk_length`].
    #[serde(default)]
    pub retro_chunk_length: Option<usize>,
    /// See [`RetroConfig::retro_encoder_num_layers`].
    #[serde(default)]
    pub retro_encoder_num_layers: Option<usize>,
    /// See [`RetroConfig::retro_encoder_hidden_dropout`].
    #[serde(default)]
    pub retro_encoder_hidden_dropout: Option<f64>,
    /// See [`RetroConfig::retro_encoder_attention_dropout`].
    #[serde(default)]
    pub retro_encoder_attention_dropout: Option<f64>,
    /// See [`RetroConfig::retro_neighbor_dirs`].
    #[serde(default)]
    pub retro_neighbor_dirs: Option<BTreeMap<DatasetSplit, String>>,
    /// See [`RetroConfig::retro_num_neighbors`].
    #[serde(default)]
    pub retro_num_neighbors: Option<usize>,
    /// See [`RetroConfig::retro_num_retrieved_chunks`].
    #[serde(default)]
    pub retro_num_retrieved_chunks: Option<usize>,
    /// Accepted for compatibility; always replaced by the derived value.
    #[serde(default)]
    pub retro_retrieved_length: Option<usize>,
    /// See [`RetroConfig::retro_split_preprocessing`].
    #[serde(default)]
    pub retro_split_preprocessing: Option<String>,
    /// See [`RetroConfig::retro_verify_neighbor_count`].
    #[serde(default)]
    pub retro_verify_neighbor_count: Option<bool>,

    #[serde(flatten)]
    unknown: BTreeMap<String, serde_json::Value>,
}

impl RetroConfigSource {
    /// Parses a source from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let source: Self = serde_json::from_str(json)?;

        if let Some(key) = source.unknown.keys().next() {
            return Err(ConfigError::invalid_value(
                "config",
                format!("unknown key `{key}`"),
            ));
        }

        Ok(source)
    }

    /// Reads and parses a source from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(
            target: TRACING_TARGET_LOADER,
            path = %path.display(),
            "reading retro configuration"
        );

        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Converts the source into a builder holding every supplied field.
    ///
    /// The base transformer settings are built first, so their errors are
    /// returned before any Retro field is looked at.
    pub fn into_builder(self) -> Result<RetroConfigBuilder> {
        let transformer = self.transformer.build()?;
        let mut builder = RetroConfig::builder().with_transformer(transformer);

        if let Some(dir) = self.retro_project_dir {
            builder = builder.with_retro_project_dir(dir);
        }
        if let Some(block_size) = self.retro_block_size {
            builder = builder.with_retro_block_size(block_size);
        }
        if let Some(chunk_length) = self.retro_chunk_length {
            builder = builder.with_retro_chunk_length(chunk_length);
        }
        if let Some(num_layers) = self.retro_encoder_num_layers {
            builder = builder.with_retro_encoder_num_layers(num_layers);
        }
        if let Some(dropout) = self.retro_encoder_hidden_dropout {
            builder = builder.with_retro_encoder_hidden_dropout(dropout);
        }
        if let Some(dropout) = self.retro_encoder_attention_dropout {
            builder = builder.with_retro_encoder_attention_dropout(dropout);
        }
        if let Some(dirs) = self.retro_neighbor_dirs {
            builder = builder.with_retro_neighbor_dirs(dirs);
        }
        if let Some(num_neighbors) = self.retro_num_neighbors {
            builder = builder.with_retro_num_neighbors(num_neighbors);
        }
        if let Some(num_chunks) = self.retro_num_retrieved_chunks {
            builder = builder.with_retro_num_retrieved_chunks(num_chunks);
        }
        if let Some(length) = self.retro_retrieved_length {
            builder = builder.with_retro_retrieved_length(length);
        }
        if let Some(split) = self.retro_split_preprocessing {
            builder = builder.with_retro_split_preprocessing(split);
        }
        if let Some(verify) = self.retro_verify_neighbor_count {
            builder = builder.with_retro_verify_neighbor_count(verify);
        }

        Ok(builder)
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<RetroConfig> {
        self.into_builder()?.build()
    }
}

impl RetroConfig {
    /// Parses and validates a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        RetroConfigSource::from_json_str(json)?.build()
    }

    /// Reads, parses and validates a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        RetroConfigSource::from_path(path)?.build()
    }

    /// Serializes the configuration as a flat JSON object.
    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}
