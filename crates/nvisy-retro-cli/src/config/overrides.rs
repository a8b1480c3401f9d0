//! Command-line overrides for Retro fields.
//!
//! Each override replaces the corresponding value read from the
//! configuration file before the configuration is validated.
//!
//! # Example
//!
//! ```bash
//! nvisy-retro --config retro.json --retro-chunk-length 64 \
//!     --retro-neighbor-dir train=train_neighbors
//! ```

use std::path::PathBuf;

use clap::Args;
use nvisy_retro::{DatasetSplit, RetroConfigSource};

use crate::TRACING_TARGET_CONFIG;

/// Retro fields that can be set from arguments or environment variables.
#[derive(Debug, Clone, Default, Args)]
pub struct RetroOverrides {
    /// Root directory of the preprocessed retrieval data.
    #[arg(long, env = "RETRO_PROJECT_DIR")]
    pub retro_project_dir: Option<PathBuf>,

    /// Number of records per preprocessed data file.
    #[arg(long, env = "RETRO_BLOCK_SIZE")]
    pub retro_block_size: Option<usize>,

    /// Token length of one retrieval chunk.
    #[arg(long, env = "RETRO_CHUNK_LENGTH")]
    pub retro_chunk_length: Option<usize>,

    /// Number of layers of the retrieval encoder.
    #[arg(long, env = "RETRO_ENCODER_NUM_LAYERS")]
    pub retro_encoder_num_layers: Option<usize>,

    /// Hidden dropout of the retrieval encoder.
    #[arg(long, env = "RETRO_ENCODER_HIDDEN_DROPOUT")]
    pub retro_encoder_hidden_dropout: Option<f64>,

    /// Attention dropout of the retrieval encoder.
    #[arg(long, env = "RETRO_ENCODER_ATTENTION_DROPOUT")]
    pub retro_encoder_attention_dropout: Option<f64>,

    /// Neighbor directory of one split, as `SPLIT=DIR` (repeatable).
    #[arg(long = "retro-neighbor-dir", value_parser = parse_neighbor_dir)]
    pub retro_neighbor_dirs: Vec<(DatasetSplit, String)>,

    /// Number of neighbors retrieved per chunk.
    #[arg(long, env = "RETRO_NUM_NEIGHBORS")]
    pub retro_num_neighbors: Option<usize>,

    /// Number of chunks retrieved per neighbor.
    #[arg(long, env = "RETRO_NUM_RETRIEVED_CHUNKS")]
    pub retro_num_retrieved_chunks: Option<usize>,

    /// Data split descriptor used during preprocessing, e.g. "98,2,0".
    #[arg(long, env = "RETRO_SPLIT_PREPROCESSING")]
    pub retro_split_preprocessing: Option<String>,

    /// Check dataset length against the saved neighbor count.
    #[arg(long, env = "RETRO_VERIFY_NEIGHBOR_COUNT")]
    pub retro_verify_neighbor_count: Option<bool>,
}

/// Parses a `SPLIT=DIR` pair.
fn parse_neighbor_dir(value: &str) -> Result<(DatasetSplit, String), String> {
    let (split, dir) = value
        .split_once('=')
        .ok_or_else(|| format!("expected SPLIT=DIR, got `{value}`"))?;

    let split = split
        .trim()
        .parse::<DatasetSplit>()
        .map_err(|_| format!("unknown split `{split}`, expected train, valid or test"))?;

    let dir = dir.trim();
    if dir.is_empty() {
        return Err(format!("empty directory for split `{split}`"));
    }

    Ok((split, dir.to_owned()))
}

impl RetroOverrides {
    /// Writes every supplied override into `source`.
    pub fn apply(&self, source: &mut RetroConfigSource) {
        let mut applied = Vec::new();

        if let Some(dir) = &self.retro_project_dir {
            source.retro_project_dir = Some(dir.clone());
            applied.push("retro_project_dir");
        }
        if let Some(block_size) = self.retro_block_size {
            source.retro_block_size = Some(block_size);
            applied.push("retro_block_size");
        }
        if let Some(chunk_length) = self.retro_chunk_length {
            source.retro_chunk_length = Some(chunk_length);
            applied.push("retro_chunk_length");
        }
        if let Some(num_layers) = self.retro_encoder_num_layers {
            source.retro_encoder_num_layers = Some(num_layers);
            applied.push("retro_encoder_num_layers");
        }
        if let Some(dropout) = self.retro_encoder_hidden_dropout {
            source.retro_encoder_hidden_dropout = Some(dropout);
            applied.push("retro_encoder_hidden_dropout");
        }
        if let Some(dropout) = self.retro_encoder_attention_dropout {
            source.retro_encoder_attention_dropout = Some(dropout);
            applied.push("retro_encoder_attention_dropout");
        }
        if !self.retro_neighbor_dirs.is_empty() {
            let dirs = source.retro_neighbor_dirs.get_or_insert_default();
            dirs.extend(self.retro_neighbor_dirs.iter().cloned());
            applied.push("retro_neighbor_dirs");
        }
        if let Some(num_neighbors) = self.retro_num_neighbors {
            source.retro_num_neighbors = Some(num_neighbors);
            applied.push("retro_num_neighbors");
        }
        if let Some(num_chunks) = self.retro_num_retrieved_chunks {
            source.retro_num_retrieved_chunks = Some(num_chunks);
            applied.push("retro_num_retrieved_chunks");
        }
        if let Some(split) = &self.retro_split_preprocessing {
            source.retro_split_preprocessing = Some(split.clone());
            applied.push("retro_split_preprocessing");
        }
        if let Some(verify) = self.retro_verify_neighbor_count {
            source.retro_verify_neighbor_count = Some(verify);
            applied.push("retro_verify_neighbor_count");
        }

        if !applied.is_empty() {
            tracing::debug!(
                target: TRACING_TARGET_CONFIG,
                fields = ?applied,
                "applied command-line overrides"
            );
        }
    }
}
