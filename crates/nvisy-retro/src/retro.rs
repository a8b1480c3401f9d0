//! Retro model configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::Serialize;

use crate::error::{ConfigError, Result};
use crate::split::{DatasetSplit, SplitWeights, parse_split_weights};
use crate::transformer::TransformerConfig;
use crate::{TRACING_TARGET_CONFIG, check};

/// Configuration of a retrieval-augmented (Retro) transformer.
///
/// Wraps a validated [`TransformerConfig`] and adds the retrieval settings.
/// Values are produced by [`RetroConfigBuilder::build`] or the loaders, which
/// validate the base configuration first, then the Retro fields, and derive
/// [`retro_retrieved_length`](Self::retro_retrieved_length).
#[derive(Debug, Clone, PartialEq, Builder, Serialize)]
#[builder(
    name = "RetroConfigBuilder",
    pattern = "owned",
    setter(prefix = "with"),
    build_fn(private, name = "build_unchecked", error = "ConfigError")
)]
#[must_use = "config does nothing unless you use it"]
pub struct RetroConfig {
    /// Base transformer settings.
    #[serde(flatten)]
    pub transformer: TransformerConfig,

    /// Root directory of the preprocessed retrieval data.
    ///
    /// Built during preprocessing; holds the chunk database and the
    /// pretraining neighbors.
    #[builder(setter(into, strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retro_project_dir: Option<PathBuf>,

    /// Number of records per preprocessed data file.
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retro_block_size: Option<usize>,

    /// Token length of one retrieval chunk used by chunked cross-attention.
    ///
    /// Always set on a built configuration.
    #[builder(setter(strip_option), default)]
    pub retro_chunk_length: Option<usize>,

    /// Number of layers of the retrieval encoder.
    #[builder(default = "2")]
    pub retro_encoder_num_layers: usize,

    /// Hidden dropout of the retrieval encoder.
    #[builder(default = "0.1")]
    pub retro_encoder_hidden_dropout: f64,

    /// Attention dropout of the retrieval encoder.
    #[builder(default = "0.1")]
    pub retro_encoder_attention_dropout: f64,

    /// Directory names of the saved neighbor id files per split.
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retro_neighbor_dirs: Option<BTreeMap<DatasetSplit, String>>,

    /// Number of neighbors retrieved per chunk during pretraining.
    #[builder(default = "2")]
    pub retro_num_neighbors: usize,

    /// Number of chunks retrieved per neighbor (neighbor and continuation).
    #[builder(default = "2")]
    pub retro_num_retrieved_chunks: usize,

    /// Total retrieved tokens per neighbor.
    ///
    /// Always `retro_num_retrieved_chunks * retro_chunk_length`. A value passed
    /// to the builder is discarded.
    #[builder(default)]
    pub retro_retrieved_length: usize,

    /// Data split descriptor used during preprocessing, e.g. `"98,2,0"`.
    #[builder(setter(into))]
    pub retro_split_preprocessing: String,

    /// Check that the dataset length matches the saved neighbor count.
    #[builder(default = "true")]
    pub retro_verify_neighbor_count: bool,
}

impl RetroConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RetroConfigBuilder {
        RetroConfigBuilder::default()
    }

    /// Validates the Retro fields and derives the retrieved length.
    fn finalize(mut self, supplied_retrieved_length: Option<usize>) -> Result<Self> {
        let chunk_length = self
            .retro_chunk_length
            .ok_or(ConfigError::MissingOperand {
                derived: "retro_retrieved_length",
                operand: "retro_chunk_length",
            })?;

        check::positive("retro_chunk_length", chunk_length)?;
        check::positive("retro_num_retrieved_chunks", self.retro_num_retrieved_chunks)?;
        check::positive("retro_num_neighbors", self.retro_num_neighbors)?;
        check::positive("retro_encoder_num_layers", self.retro_encoder_num_layers)?;
        if let Some(block_size) = self.retro_block_size {
            check::positive("retro_block_size", block_size)?;
        }
        check::dropout(
            "retro_encoder_hidden_dropout",
            self.retro_encoder_hidden_dropout,
        )?;
        check::dropout(
            "retro_encoder_attention_dropout",
            self.retro_encoder_attention_dropout,
        )?;

        let retrieved_length = self
            .retro_num_retrieved_chunks
            .checked_mul(chunk_length)
            .ok_or(ConfigError::Overflow {
                derived: "retro_retrieved_length",
                lhs: self.retro_num_retrieved_chunks,
                rhs: chunk_length,
            })?;

        if let Some(supplied) = supplied_retrieved_length
            && supplied != retrieved_length
        {
            tracing::debug!(
                target: TRACING_TARGET_CONFIG,
                supplied,
                derived = retrieved_length,
                "discarding supplied retro_retrieved_length"
            );
        }
        self.retro_retrieved_length = retrieved_length;

        Ok(self)
    }

    /// Returns the retrieval chunk length.
    pub fn chunk_length(&self) -> usize {
        self.retro_chunk_length.unwrap_or_default()
    }

    /// Returns the `(neighbors, tokens)` shape of the retrieved context of one chunk.
    pub fn retrieved_chunk_shape(&self) -> (usize, usize) {
        (self.retro_num_neighbors, self.retro_retrieved_length)
    }

    /// Parses [`retro_split_preprocessing`](Self::retro_split_preprocessing)
    /// into normalized train/valid/test weights.
    pub fn split_weights(&self) -> Result<SplitWeights> {
        parse_split_weights(&self.retro_split_preprocessing)
    }

    /// Returns the neighbor directory of `split` inside the project directory.
    ///
    /// `None` when the project directory or the split's entry is unset.
    pub fn neighbor_dir(&self, split: DatasetSplit) -> Option<PathBuf> {
        let project_dir = self.retro_project_dir.as_deref()?;
        let dir = self.retro_neighbor_dirs.as_ref()?.get(&split)?;
        Some(project_dir.join(dir))
    }

    /// Returns the project directory, if set.
    pub fn project_dir(&self) -> Option<&Path> {
        self.retro_project_dir.as_deref()
    }

    /// Returns the transformer configuration of the retrieval encoder.
    ///
    /// The encoder shares the base settings and replaces depth and dropouts
    /// with the `retro_encoder_*` values.
    pub fn encoder_config(&self) -> Result<TransformerConfig> {
        TransformerConfig {
            num_layers: self.retro_encoder_num_layers,
            hidden_dropout: self.retro_encoder_hidden_dropout,
            attention_dropout: self.retro_encoder_attention_dropout,
            ..self.transformer.clone()
        }
        .finalize()
    }

    /// Checks a dataset length against the number of saved neighbor entries.
    ///
    /// Skipped when `retro_verify_neighbor_count` is disabled.
    pub fn verify_neighbor_count(&self, dataset_len: usize, neighbor_len: usize) -> Result<()> {
        if !self.retro_verify_neighbor_count {
            tracing::debug!(
                target: TRACING_TARGET_CONFIG,
                dataset_len,
                neighbor_len,
                "neighbor count verification disabled"
            );
            return Ok(());
        }

        if dataset_len != neighbor_len {
            return Err(ConfigError::NeighborCountMismatch {
                dataset_len,
                neighbor_len,
            });
        }
        Ok(())
    }
}

impl RetroConfigBuilder {
    /// Builds and validates the configuration.
    ///
    /// The base transformer configuration is validated first; its errors are
    /// returned unchanged and the Retro fields are not checked.
    pub fn build(mut self) -> Result<RetroConfig> {
        let transformer = self
            .transformer
            .take()
            .ok_or(ConfigError::MissingField {
                field: "transformer",
            })?;
        self.transformer = Some(transformer.finalize()?);

        let supplied_retrieved_length = self.retro_retrieved_length;
        self.build_unchecked()?.finalize(supplied_retrieved_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn transformer() -> TransformerConfig {
        TransformerConfig::builder()
            .with_num_layers(12)
            .with_hidden_size(768)
            .with_num_attention_heads(12)
            .build()
            .expect("Valid transformer config")
    }

    fn retro() -> RetroConfigBuilder {
        RetroConfig::builder()
            .with_transformer(transformer())
            .with_retro_split_preprocessing("0.98,0.01,0.01")
    }

    #[test]
    fn test_retrieved_length_is_derived() {
        for chunk_length in [1, 64, 4096] {
            for num_chunks in [1, 2, 7] {
                let config = retro()
                    .with_retro_chunk_length(chunk_length)
                    .with_retro_num_retrieved_chunks(num_chunks)
                    .build()
                    .expect("Valid config");

                assert_eq!(config.retro_retrieved_length, chunk_length * num_chunks);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = retro()
            .with_retro_chunk_length(4096)
            .with_retro_num_retrieved_chunks(2)
            .build()
            .expect("Valid config");

        assert_eq!(config.retro_encoder_num_layers, 2);
        assert_eq!(config.retro_encoder_hidden_dropout, 0.1);
        assert_eq!(config.retro_encoder_attention_dropout, 0.1);
        assert_eq!(config.retro_num_neighbors, 2);
        assert_eq!(config.retro_num_retrieved_chunks, 2);
        assert!(config.retro_verify_neighbor_count);
        assert_eq!(config.retro_project_dir, None);
        assert_eq!(config.retro_block_size, None);
        assert_eq!(config.retro_neighbor_dirs, None);
        assert_eq!(config.retro_retrieved_length, 8192);
    }

    #[test]
    fn test_missing_split_preprocessing() {
        let error = RetroConfig::builder()
            .with_transformer(transformer())
            .with_retro_chunk_length(64)
            .build()
            .unwrap_err();

        assert!(matches!(
            error,
            ConfigError::MissingField {
                field: "retro_split_preprocessing"
            }
        ));
    }

    #[test]
    fn test_supplied_retrieved_length_is_overwritten() {
        let config = retro()
            .with_retro_chunk_length(64)
            .with_retro_num_retrieved_chunks(2)
            .with_retro_retrieved_length(999)
            .build()
            .expect("Valid config");

        assert_eq!(config.retro_retrieved_length, 128);
    }

    #[test]
    fn test_missing_chunk_length() {
        let error = retro()
            .with_retro_num_retrieved_chunks(2)
            .build()
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::MissingOperand);
    }

    #[test]
    fn test_missing_transformer() {
        let error = RetroConfig::builder()
            .with_retro_chunk_length(64)
            .with_retro_split_preprocessing("98,2,0")
            .build()
            .unwrap_err();

        assert!(matches!(
            error,
            ConfigError::MissingField {
                field: "transformer"
            }
        ));
    }

    #[test]
    fn test_base_errors_take_precedence() {
        let mut invalid = transformer();
        invalid.fp16 = true;
        invalid.bf16 = true;

        let error = RetroConfig::builder()
            .with_transformer(invalid)
            .build()
            .unwrap_err();

        assert!(matches!(error, ConfigError::InvalidValue { field: "bf16", .. }));
    }

    #[test]
    fn test_base_derivation_runs_on_supplied_transformer() {
        let mut base = transformer();
        base.ffn_hidden_size = None;

        let config = retro()
            .with_transformer(base)
            .with_retro_chunk_length(64)
            .build()
            .expect("Valid config");

        assert_eq!(config.transformer.ffn_hidden_size, Some(3072));
    }

    #[test]
    fn test_overflow() {
        let error = retro()
            .with_retro_chunk_length(usize::MAX)
            .with_retro_num_retrieved_chunks(2)
            .build()
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Overflow);
    }

    #[test]
    fn test_range_checks() {
        assert!(retro().with_retro_chunk_length(0).build().is_err());
        assert!(
            retro()
                .with_retro_chunk_length(64)
                .with_retro_num_neighbors(0)
                .build()
                .is_err()
        );
        assert!(
            retro()
                .with_retro_chunk_length(64)
                .with_retro_encoder_hidden_dropout(2.0)
                .build()
                .is_err()
        );
        assert!(
            retro()
                .with_retro_chunk_length(64)
                .with_retro_block_size(0)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_identical_inputs_build_identical_configs() {
        let build = || {
            retro()
                .with_retro_chunk_length(64)
                .with_retro_project_dir("/data/retro")
                .build()
                .expect("Valid config")
        };
        let first = build();
        let second = build();
        assert_eq!(first, second);

        let mut changed = first.clone();
        changed.retro_num_neighbors = 10;
        assert_eq!(first.retro_num_neighbors, 2);
        assert_ne!(changed, first);
    }

    #[test]
    fn test_neighbor_dir() {
        let dirs = BTreeMap::from([
            (DatasetSplit::Train, "train_neighbors".to_owned()),
            (DatasetSplit::Valid, "valid_neighbors".to_owned()),
        ]);
        let config = retro()
            .with_retro_chunk_length(64)
            .with_retro_project_dir("/data/retro")
            .with_retro_neighbor_dirs(dirs)
            .build()
            .expect("Valid config");

        assert_eq!(
            config.neighbor_dir(DatasetSplit::Train),
            Some(PathBuf::from("/data/retro/train_neighbors"))
        );
        assert_eq!(config.neighbor_dir(DatasetSplit::Test), None);
    }

    #[test]
    fn test_neighbor_dir_without_project_dir() {
        let dirs = BTreeMap::from([(DatasetSplit::Train, "train".to_owned())]);
        let config = retro()
            .with_retro_chunk_length(64)
            .with_retro_neighbor_dirs(dirs)
            .build()
            .expect("Valid config");

        assert_eq!(config.neighbor_dir(DatasetSplit::Train), None);
    }

    #[test]
    fn test_encoder_config() {
        let config = retro()
            .with_retro_chunk_length(64)
            .with_retro_encoder_num_layers(3)
            .with_retro_encoder_attention_dropout(0.2)
            .build()
            .expect("Valid config");
        let encoder = config.encoder_config().expect("Valid encoder config");

        assert_eq!(encoder.num_layers, 3);
        assert_eq!(encoder.hidden_dropout, 0.1);
        assert_eq!(encoder.attention_dropout, 0.2);
        assert_eq!(encoder.hidden_size, config.transformer.hidden_size);
        assert_eq!(config.transformer.num_layers, 12);
    }

    #[test]
    fn test_verify_neighbor_count() {
        let config = retro()
            .with_retro_chunk_length(64)
            .build()
            .expect("Valid config");

        assert!(config.verify_neighbor_count(100, 100).is_ok());
        let error = config.verify_neighbor_count(100, 99).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NeighborCountMismatch);

        let unchecked = retro()
            .with_retro_chunk_length(64)
            .with_retro_verify_neighbor_count(false)
            .build()
            .expect("Valid config");
        assert!(unchecked.verify_neighbor_count(100, 99).is_ok());
    }

    #[test]
    fn test_split_weights_and_shape() {
        let config = retro()
            .with_retro_chunk_length(64)
            .with_retro_num_neighbors(4)
            .build()
            .expect("Valid config");

        let weights = config.split_weights().expect("Valid split");
        assert!((weights[0] - 0.98).abs() < 1e-9);
        assert_eq!(config.retrieved_chunk_shape(), (4, 128));
        assert_eq!(config.chunk_length(), 64);
    }
}
