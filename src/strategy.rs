//! Derivation of `k` filter slot indices from two independent base hashes.
//!
//! Both strategies follow Kirsch & Mitzenmacher, "Less Hashing, Same Performance:
//! Building a Better Bloom Filter": `k` indices built as `h1 + i·h2` from two
//! uncorrelated hashes match the false-positive rate of `k` independent hash
//! functions asymptotically.
//!
//! - [`DoubleHashing`]: `g_i = (h1 + i·h2) mod m`
//! - [`EnhancedDoubleHashing`]: `g_i = (h1 + i·h2 + (i² + i)/2) mod m`, which breaks
//!   the arithmetic progression and spreads indices better when `m` is small or
//!   shares factors with `h2`.

use enum_dispatch::enum_dispatch;

/// Index derivation trait implemented by every strategy.
#[enum_dispatch(IndexStrategy)]
pub trait IndexDerivation {
    /// Return the `i`-th slot index in `[0, size)` for base hashes `h1`, `h2`
    fn slot_index(&self, h1: u64, h2: u64, i: u64, size: u64) -> u64;
    /// Return strategy name
    fn name(&self) -> &'static str;
}

/// `g_i = (h1 + i·h2) mod m`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DoubleHashing;

/// `g_i = (h1 + i·h2 + (i² + i)/2) mod m`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnhancedDoubleHashing;

impl IndexDerivation for DoubleHashing {
    #[inline]
    fn slot_index(&self, h1: u64, h2: u64, i: u64, size: u64) -> u64 {
        let g = u128::from(h1) + u128::from(i) * u128::from(h2);
        (g % u128::from(size)) as u64
    }

    fn name(&self) -> &'static str {
        "double-hashing"
    }
}

impl IndexDerivation for EnhancedDoubleHashing {
    #[inline]
    fn slot_index(&self, h1: u64, h2: u64, i: u64, size: u64) -> u64 {
        let i = u128::from(i);
        let g = u128::from(h1) + i * u128::from(h2) + (i * i + i) / 2;
        (g % u128::from(size)) as u64
    }

    fn name(&self) -> &'static str {
        "enhanced-double-hashing"
    }
}

/// Strategies available to `MembershipFilter`
#[enum_dispatch]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexStrategy {
    DoubleHashing(DoubleHashing),
    EnhancedDoubleHashing(EnhancedDoubleHashing),
}

impl Default for IndexStrategy {
    fn default() -> Self {
        IndexStrategy::DoubleHashing(DoubleHashing)
    }
}
