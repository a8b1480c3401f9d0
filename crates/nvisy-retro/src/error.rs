//! Configuration error types.

use derive_builder::UninitializedFieldError;
use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Result type alias for configuration operations.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Categories of configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// A required field was not supplied.
    MissingField,
    /// An operand of a derived field was not supplied.
    MissingOperand,
    /// A supplied value is out of range.
    InvalidValue,
    /// A derived value does not fit its integer type.
    Overflow,
    /// The preprocessing split descriptor is malformed.
    InvalidSplit,
    /// Dataset and saved neighbors disagree in length.
    NeighborCountMismatch,
    /// Reading a configuration file failed.
    Io,
    /// Configuration (de)serialization failed.
    Serialization,
}

/// Errors raised while building, loading or checking a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was not supplied.
    #[error("missing required field `{field}`")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A derived field cannot be computed because an operand is absent.
    #[error("cannot derive `{derived}`: `{operand}` is not set")]
    MissingOperand {
        /// Name of the derived field.
        derived: &'static str,
        /// Name of the absent operand.
        operand: &'static str,
    },

    /// A supplied value is out of range.
    #[error("invalid value for `{field}`: {message}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with the value.
        message: String,
    },

    /// A derived value overflowed.
    #[error("`{derived}` overflows: {lhs} * {rhs}")]
    Overflow {
        /// Name of the derived field.
        derived: &'static str,
        /// Left operand.
        lhs: usize,
        /// Right operand.
        rhs: usize,
    },

    /// The preprocessing split descriptor is malformed.
    #[error("invalid split `{split}`: {message}")]
    InvalidSplit {
        /// The descriptor as supplied.
        split: String,
        /// What is wrong with it.
        message: String,
    },

    /// Dataset length disagrees with the saved neighbor count.
    #[error("dataset has {dataset_len} samples but {neighbor_len} neighbor entries were saved")]
    NeighborCountMismatch {
        /// Number of samples in the dataset.
        dataset_len: usize,
        /// Number of saved neighbor entries.
        neighbor_len: usize,
    },

    /// Reading a configuration file failed.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an [`ConfigError::InvalidValue`] error.
    pub fn invalid_value(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }

    /// Creates an [`ConfigError::InvalidSplit`] error.
    pub fn invalid_split(split: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSplit {
            split: split.into(),
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField { .. } => ErrorKind::MissingField,
            Self::MissingOperand { .. } => ErrorKind::MissingOperand,
            Self::InvalidValue { .. } => ErrorKind::InvalidValue,
            Self::Overflow { .. } => ErrorKind::Overflow,
            Self::InvalidSplit { .. } => ErrorKind::InvalidSplit,
            Self::NeighborCountMismatch { .. } => ErrorKind::NeighborCountMismatch,
            Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind().into()
    }
}

impl From<UninitializedFieldError> for ConfigError {
    fn from(error: UninitializedFieldError) -> Self {
        Self::MissingField {
            field: error.field_name(),
        }
    }
}
