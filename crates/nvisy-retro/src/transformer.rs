//! Base transformer configuration.
//!
//! [`TransformerConfig`] carries the architecture and parallelism settings
//! shared by the Retro decoder and its retrieval encoder. Building it runs a
//! validation pass and fills in the derived sizes that were left unset.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::check;
use crate::error::{ConfigError, Result};

/// Architecture settings of a transformer stack.
///
/// The optional sizes (`num_query_groups`, `ffn_hidden_size`, `kv_channels`)
/// are always `Some` on a value returned by [`TransformerConfigBuilder::build`]
/// or by the loaders.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(
    name = "TransformerConfigBuilder",
    pattern = "owned",
    setter(prefix = "with"),
    build_fn(private, name = "build_unchecked", error = "ConfigError")
)]
#[must_use = "config does nothing unless you use it"]
pub struct TransformerConfig {
    /// Number of transformer layers.
    pub num_layers: usize,
    /// Hidden (model) dimension.
    pub hidden_size: usize,
    /// Number of attention heads.
    pub num_attention_heads: usize,

    /// Number of key/value groups for grouped-query attention.
    ///
    /// Defaults to `num_attention_heads` (plain multi-head attention).
    #[builder(setter(strip_option), default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_query_groups: Option<usize>,

    /// Feed-forward inner dimension. Defaults to `4 * hidden_size`.
    #[builder(setter(strip_option), default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffn_hidden_size: Option<usize>,

    /// Per-head projection size. Defaults to `hidden_size / num_attention_heads`.
    #[builder(setter(strip_option), default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kv_channels: Option<usize>,

    /// Dropout applied to hidden states.
    #[builder(default = "0.1")]
    #[serde(default = "default_dropout")]
    pub hidden_dropout: f64,

    /// Dropout applied to attention probabilities.
    #[builder(default = "0.1")]
    #[serde(default = "default_dropout")]
    pub attention_dropout: f64,

    /// Tensor model parallel degree.
    #[builder(default = "1")]
    #[serde(default = "default_parallel_size")]
    pub tensor_model_parallel_size: usize,

    /// Pipeline model parallel degree.
    #[builder(default = "1")]
    #[serde(default = "default_parallel_size")]
    pub pipeline_model_parallel_size: usize,

    /// Run in fp16 mixed precision.
    #[builder(default)]
    #[serde(default)]
    pub fp16: bool,

    /// Run in bf16 mixed precision.
    #[builder(default)]
    #[serde(default)]
    pub bf16: bool,
}

fn default_dropout() -> f64 {
    0.1
}

fn default_parallel_size() -> usize {
    1
}

impl TransformerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> TransformerConfigBuilder {
        TransformerConfigBuilder::default()
    }

    /// Validates the settings and fills in unset derived sizes.
    ///
    /// Running it on an already finalized value is a no-op.
    pub(crate) fn finalize(mut self) -> Result<Self> {
        check::positive("num_layers", self.num_layers)?;
        check::positive("hidden_size", self.hidden_size)?;
        check::positive("num_attention_heads", self.num_attention_heads)?;
        check::positive("tensor_model_parallel_size", self.tensor_model_parallel_size)?;
        check::positive(
            "pipeline_model_parallel_size",
            self.pipeline_model_parallel_size,
        )?;
        check::dropout("hidden_dropout", self.hidden_dropout)?;
        check::dropout("attention_dropout", self.attention_dropout)?;

        if self.fp16 && self.bf16 {
            return Err(ConfigError::invalid_value(
                "bf16",
                "only one of fp16 and bf16 can be enabled",
            ));
        }

        check::divisible(
            "num_attention_heads",
            self.num_attention_heads,
            "tensor_model_parallel_size",
            self.tensor_model_parallel_size,
        )?;

        let ffn_hidden_size = match self.ffn_hidden_size {
            Some(size) => size,
            None => self.hidden_size.checked_mul(4).ok_or(ConfigError::Overflow {
                derived: "ffn_hidden_size",
                lhs: 4,
                rhs: self.hidden_size,
            })?,
        };
        check::positive("ffn_hidden_size", ffn_hidden_size)?;
        self.ffn_hidden_size = Some(ffn_hidden_size);

        let kv_channels = self
            .kv_channels
            .unwrap_or(self.hidden_size / self.num_attention_heads);
        check::positive("kv_channels", kv_channels)?;
        self.kv_channels = Some(kv_channels);

        let num_query_groups = self.num_query_groups.unwrap_or(self.num_attention_heads);
        check::positive("num_query_groups", num_query_groups)?;
        check::divisible(
            "num_query_groups",
            num_query_groups,
            "tensor_model_parallel_size",
            self.tensor_model_parallel_size,
        )?;
        self.num_query_groups = Some(num_query_groups);

        Ok(self)
    }

    /// Returns the feed-forward inner dimension.
    pub fn ffn_hidden_size(&self) -> usize {
        self.ffn_hidden_size.unwrap_or(4 * self.hidden_size)
    }

    /// Returns the per-head projection size.
    pub fn kv_channels(&self) -> usize {
        self.kv_channels
            .unwrap_or(self.hidden_size / self.num_attention_heads.max(1))
    }

    /// Returns the number of key/value groups.
    pub fn num_query_groups(&self) -> usize {
        self.num_query_groups.unwrap_or(self.num_attention_heads)
    }
}

impl TransformerConfigBuilder {
    /// Builds and validates the configuration, deriving unset sizes.
    pub fn build(self) -> Result<TransformerConfig> {
        self.build_unchecked()?.finalize()
    }
}
