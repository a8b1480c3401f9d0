//! Range checks shared by the configuration records.

use crate::error::{ConfigError, Result};

/// Fails unless `value` is non-zero.
pub(crate) fn positive(field: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::invalid_value(field, "must be greater than 0"));
    }
    Ok(())
}

/// Fails unless `value` is a probability in `[0, 1]`.
pub(crate) fn dropout(field: &'static str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid_value(
            field,
            format!("{value} is not in [0, 1]"),
        ));
    }
    Ok(())
}

/// Fails unless `value` is a multiple of `divisor`.
pub(crate) fn divisible(
    field: &'static str,
    value: usize,
    divisor_name: &'static str,
    divisor: usize,
) -> Result<()> {
    if value % divisor != 0 {
        return Err(ConfigError::invalid_value(
            field,
            format!("{value} is not divisible by {divisor_name} ({divisor})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive() {
        assert!(positive("num_layers", 1).is_ok());
        assert!(positive("num_layers", 0).is_err());
    }

    #[test]
    fn test_dropout_bounds() {
        assert!(dropout("hidden_dropout", 0.0).is_ok());
        assert!(dropout("hidden_dropout", 1.0).is_ok());
        assert!(dropout("hidden_dropout", -0.1).is_err());
        assert!(dropout("hidden_dropout", 1.5).is_err());
        assert!(dropout("hidden_dropout", f64::NAN).is_err());
    }

    #[test]
    fn test_divisible() {
        assert!(divisible("num_attention_heads", 12, "tensor_model_parallel_size", 4).is_ok());
        assert!(divisible("num_attention_heads", 12, "tensor_model_parallel_size", 5).is_err());
    }
}
