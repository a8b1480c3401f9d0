//! Convenient re-exports for common use.

pub use crate::error::{ConfigError, ErrorKind, Result};
pub use crate::loader::{RetroConfigSource, TransformerConfigSource};
pub use crate::retro::{RetroConfig, RetroConfigBuilder};
pub use crate::split::DatasetSplit;
pub use crate::transformer::{TransformerConfig, TransformerConfigBuilder};
