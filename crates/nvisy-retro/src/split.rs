//! Dataset splits and the preprocessing split descriptor.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::error::{ConfigError, Result};

/// One partition of a dataset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumCount,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DatasetSplit {
    /// Training partition.
    Train,
    /// Validation partition.
    Valid,
    /// Test partition.
    Test,
}

/// Normalized train/valid/test weights parsed from a split descriptor.
pub type SplitWeights = [f64; DatasetSplit::COUNT];

static SPLIT_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.0-9]+").expect("split number pattern is valid")
});

/// Parses a split descriptor such as `"98,2,0"` or `"0.98,0.01,0.01"`.
///
/// Every run of digits and dots is read as one weight. Missing trailing
/// weights count as zero and the result is normalized to sum to one.
pub fn parse_split_weights(split: &str) -> Result<SplitWeights> {
    let mut weights = [0.0; DatasetSplit::COUNT];
    let mut count = 0;

    for found in SPLIT_NUMBER.find_iter(split) {
        if count == weights.len() {
            return Err(ConfigError::invalid_split(
                split,
                format!("expected at most {} weights", weights.len()),
            ));
        }

        let weight = found.as_str().parse::<f64>().map_err(|e| {
            ConfigError::invalid_split(split, format!("`{}`: {e}", found.as_str()))
        })?;
        if !weight.is_finite() {
            return Err(ConfigError::invalid_split(
                split,
                format!("`{}` is out of range", found.as_str()),
            ));
        }

        weights[count] = weight;
        count += 1;
    }

    let total: f64 = weights.iter().sum();
    if !total.is_finite() {
        return Err(ConfigError::invalid_split(split, "weights sum out of range"));
    }
    if total <= 0.0 {
        return Err(ConfigError::invalid_split(split, "weights sum to zero"));
    }

    Ok(weights.map(|weight| weight / total))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    fn assert_weights(actual: SplitWeights, expected: SplitWeights) {
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_parse_percentages() {
        let weights = parse_split_weights("98,2,0").expect("Valid split");

        assert_weights(weights, [0.98, 0.02, 0.0]);
    }

    #[test]
    fn test_parse_fractions() {
        let weights = parse_split_weights("0.98,0.01,0.01").expect("Valid split");

        assert_weights(weights, [0.98, 0.01, 0.01]);
    }

    #[test]
    fn test_missing_weights_are_zero() {
        let weights = parse_split_weights("1").expect("Valid split");

        assert_weights(weights, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_other_separators() {
        let weights = parse_split_weights("90 / 5 / 5").expect("Valid split");

        assert_weights(weights, [0.9, 0.05, 0.05]);
    }

    #[test]
    fn test_too_many_weights() {
        let error = parse_split_weights("1,1,1,1").unwrap_err();

        assert!(matches!(error, ConfigError::InvalidSplit { .. }));
    }

    #[test]
    fn test_unparsable_weight() {
        assert!(parse_split_weights("1..2,3").is_err());
    }

    #[test]
    fn test_weight_too_large() {
        let error = parse_split_weights(&"9".repeat(400)).unwrap_err();

        assert!(matches!(error, ConfigError::InvalidSplit { .. }));
    }

    #[test]
    fn test_weight_sum_too_large() {
        let huge = format!("{}", f64::MAX);
        let split = format!("{huge},{huge},{huge}");

        let error = parse_split_weights(&split).unwrap_err();
        assert!(error.to_string().contains("out of range"));
    }

    #[test]
    fn test_zero_sum() {
        assert!(parse_split_weights("0,0,0").is_err());
        assert!(parse_split_weights("").is_err());
    }

    #[test]
    fn test_split_names() {
        let names: Vec<&str> = DatasetSplit::iter().map(|s| s.into()).collect();

        assert_eq!(names, ["train", "valid", "test"]);
        assert_eq!(DatasetSplit::from_str("valid").ok(), Some(DatasetSplit::Valid));
        assert_eq!(
            serde_json::to_string(&DatasetSplit::Test).expect("Serializable"),
            "\"test\""
        );
    }
}
