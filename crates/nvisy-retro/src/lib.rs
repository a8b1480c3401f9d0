#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod check;
mod error;
mod loader;
mod retro;
mod split;
mod transformer;

#[doc(hidden)]
pub mod prelude;

pub use error::{ConfigError, ErrorKind, Result};
pub use loader::{RetroConfigSource, TransformerConfigSource};
pub use retro::{RetroConfig, RetroConfigBuilder};
pub use split::{DatasetSplit, SplitWeights, parse_split_weights};
pub use transformer::{TransformerConfig, TransformerConfigBuilder};

/// Tracing target for configuration building.
pub const TRACING_TARGET_CONFIG: &str = "nvisy_retro::config";

/// Tracing target for configuration loading.
pub const TRACING_TARGET_LOADER: &str = "nvisy_retro::loader";
