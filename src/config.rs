//! Construction parameters for a session's filter and estimator.
//!
//! [`SketchConfig::default`] carries small starting points (100 filter slots,
//! 3 index functions, 2^16 estimator buckets). They are not tuned for any data
//! volume. [`SketchConfig::for_expected_items`] sizes the filter from the expected
//! number of distinct items and a target false-positive rate instead, using the
//! standard Bloom filter analysis:
//!
//! - `m = -n · ln(p) / (ln 2)²` slots
//! - `k = (m / n) · ln 2` index functions
//! - false-positive rate after `n` insertions: `(1 - e^(-kn/m))^k`

use std::f64::consts::LN_2;

use crate::error::{Result, SketchError};
use crate::estimator::{validate_bucket_bits, DEFAULT_BUCKET_BITS};
use crate::filter::{
    validate_hash_count, validate_size, DEFAULT_HASH_COUNT, MAX_HASH_COUNT, MIN_HASH_COUNT,
};
use crate::strategy::IndexStrategy;

/// Filter slot count used by [`SketchConfig::default`]
pub const DEFAULT_FILTER_SIZE: usize = 100;

/// Sketch construction parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with_serde", serde(default))]
pub struct SketchConfig {
    /// Number of membership filter slots
    pub filter_size: usize,
    /// Number of slot indices derived per item
    pub hash_count: usize,
    /// Slot index derivation strategy
    pub strategy: IndexStrategy,
    /// Log2 of the number of estimator buckets
    pub bucket_bits: u8,
    /// Hash family member shared by filter and estimator
    pub seed: u64,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            filter_size: DEFAULT_FILTER_SIZE,
            hash_count: DEFAULT_HASH_COUNT,
            strategy: IndexStrategy::default(),
            bucket_bits: DEFAULT_BUCKET_BITS,
            seed: 0,
        }
    }
}

impl SketchConfig {
    /// Creates config with a filter sized for `expected_items` at `false_positive_rate`
    pub fn for_expected_items(expected_items: usize, false_positive_rate: f64) -> Result<Self> {
        let filter_size = optimal_size(expected_items, false_positive_rate)?;
        let hash_count = optimal_hash_count(filter_size, expected_items)?;
        Ok(Self {
            filter_size,
            hash_count,
            ..Self::default()
        })
    }

    /// Return copy of config with estimator bucket bits set
    pub fn with_bucket_bits(self, bucket_bits: u8) -> Self {
        Self {
            bucket_bits,
            ..self
        }
    }

    /// Return copy of config with hash family seed set
    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    /// Return copy of config with index derivation strategy set
    pub fn with_strategy(self, strategy: IndexStrategy) -> Self {
        Self { strategy, ..self }
    }

    /// Check every parameter against its valid range
    pub fn validate(&self) -> Result<()> {
        validate_size(self.filter_size)?;
        validate_hash_count(self.hash_count)?;
        validate_bucket_bits(self.bucket_bits)
    }
}

/// Return `(1 - e^(-kn/m))^k`, the expected false-positive rate of a filter with
/// `size` slots and `hash_count` index functions after `items` distinct insertions.
pub fn theoretical_false_positive_rate(size: usize, hash_count: usize, items: usize) -> f64 {
    if size == 0 {
        return 1.0;
    }
    let k = hash_count as f64;
    let fill = 1.0 - (-k * items as f64 / size as f64).exp();
    fill.powf(k)
}

/// Return slot count minimizing memory for `items` at `false_positive_rate`
pub fn optimal_size(items: usize, false_positive_rate: f64) -> Result<usize> {
    if items == 0 {
        return Err(SketchError::invalid(
            "expected_items",
            "must be greater than zero",
        ));
    }
    if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
        return Err(SketchError::invalid(
            "false_positive_rate",
            format!("must be in (0, 1), got {}", false_positive_rate),
        ));
    }
    let m = -(items as f64) * false_positive_rate.ln() / (LN_2 * LN_2);
    Ok((m.ceil() as usize).max(1))
}

/// Return index function count minimizing false positives for `size` slots and `items`
pub fn optimal_hash_count(size: usize, items: usize) -> Result<usize> {
    validate_size(size)?;
    if items == 0 {
        return Err(SketchError::invalid(
            "expected_items",
            "must be greater than zero",
        ));
    }
    let k = (size as f64 / items as f64 * LN_2).round() as usize;
    Ok(k.clamp(MIN_HASH_COUNT, MAX_HASH_COUNT))
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::filter::MembershipFilter;
    use test_case::test_case;

    #[test_case(1000, 3, 3 => "0.00000072"; "concrete scenario load")]
    #[test_case(100, 2, 10 => "0.03286"; "historical defaults")]
    #[test_case(100, 3, 0 => "0.00000000"; "empty filter")]
    fn test_theoretical_false_positive_rate(m: usize, k: usize, n: usize) -> String {
        let rate = theoretical_false_positive_rate(m, k, n);
        if rate < 0.001 {
            format!("{:.8}", rate)
        } else {
            format!("{:.5}", rate)
        }
    }

    #[test_case(1000, 0.01 => 9586; "one percent")]
    #[test_case(1000, 0.001 => 14378; "tenth of a percent")]
    #[test_case(1, 0.5 => 2; "single item")]
    fn test_optimal_size(n: usize, p: f64) -> usize {
        optimal_size(n, p).unwrap()
    }

    #[test_case(9586, 1000 => 7; "one percent")]
    #[test_case(100, 1000 => MIN_HASH_COUNT; "clamped low")]
    #[test_case(1443, 1000 => MIN_HASH_COUNT; "rounds below two")]
    #[test_case(1_000_000, 10 => MAX_HASH_COUNT; "clamped high")]
    fn test_optimal_hash_count(m: usize, n: usize) -> usize {
        optimal_hash_count(m, n).unwrap()
    }

    #[test_case(0, 0.01; "no items")]
    #[test_case(10, 0.0; "zero rate")]
    #[test_case(10, 1.0; "certain rate")]
    #[test_case(10, f64::NAN; "nan rate")]
    fn test_optimal_size_invalid(n: usize, p: f64) {
        assert!(optimal_size(n, p).is_err());
    }

    #[test]
    fn test_for_expected_items() {
        let config = SketchConfig::for_expected_items(1000, 0.01).unwrap();
        assert_eq!(config.filter_size, 9586);
        assert_eq!(config.hash_count, 7);
        assert!(config.validate().is_ok());
        assert!(theoretical_false_positive_rate(config.filter_size, config.hash_count, 1000) < 0.011);
    }

    #[test]
    fn test_for_expected_items_keeps_two_hash_functions() {
        // m / n · ln 2 is just above 1 at a 50% target rate
        let config = SketchConfig::for_expected_items(1000, 0.5).unwrap();
        assert_eq!(config.filter_size, 1443);
        assert_eq!(config.hash_count, MIN_HASH_COUNT);
        assert!(MembershipFilter::from_config(&config).is_ok());
    }

    #[test]
    fn test_default_is_valid() {
        let config = SketchConfig::default();
        assert_eq!(config.filter_size, 100);
        assert_eq!(config.hash_count, 3);
        assert_eq!(config.bucket_bits, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_each_parameter() {
        let base = SketchConfig::default();
        let cases = [
            SketchConfig {
                filter_size: 0,
                ..base
            },
            SketchConfig {
                hash_count: 0,
                ..base
            },
            SketchConfig {
                hash_count: 1,
                ..base
            },
            base.with_bucket_bits(0),
            base.with_bucket_bits(64),
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert!(matches!(err, SketchError::InvalidConfiguration { .. }));
        }
    }

    #[cfg(feature = "with_serde")]
    #[test]
    fn test_serde_partial_config() {
        let config: SketchConfig =
            serde_json::from_str(r#"{ "filter_size": 5000, "bucket_bits": 12 }"#).unwrap();
        assert_eq!(config.filter_size, 5000);
        assert_eq!(config.bucket_bits, 12);
        assert_eq!(config.hash_count, DEFAULT_HASH_COUNT);

        let json = serde_json::to_string(&config).unwrap();
        let back: SketchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
