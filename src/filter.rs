//! Membership filter answers "possibly inserted" or "definitely not inserted"
//! for items of a stream, using a fixed array of `size` boolean slots.
//!
//! # Index derivation
//!
//! Every item is hashed twice through [`HashOracle`]:
//! - `h1 = sha256(item) mod size`, the full 256-bit digest reduced exactly;
//! - `h2 = 1 + (wyhash(item) mod (size - 1))`, a non-zero step from an unrelated hash.
//!
//! The `k` slot indices are then produced by the configured [`IndexStrategy`]. Since
//! `h1` and `h2` come from structurally different hash functions, the `k` tests are
//! close to independent and the false-positive rate tracks the optimum
//! `(1 - e^(-kn/m))^k`.
//!
//! # Guarantees
//! - No false negatives: an inserted item is always reported as contained.
//! - `insert` is idempotent: slots are only ever set, never cleared, except by `reset`.
//!
//! # Storage
//! Slots are packed 64 per `u64` word, so a filter of `size` slots holds
//! `ceil(size / 64) * 8` bytes of slot data.

use std::fmt::{Debug, Formatter};
use std::mem::{size_of, size_of_val};

use tracing::{debug, warn};

use crate::config::{theoretical_false_positive_rate, SketchConfig};
use crate::digest::HashOracle;
use crate::error::{Result, SketchError};
use crate::item::CanonicalBytes;
use crate::strategy::{IndexDerivation, IndexStrategy};

/// Number of index functions used when none is specified
pub const DEFAULT_HASH_COUNT: usize = 3;
/// Lower bound on the number of index functions
pub const MIN_HASH_COUNT: usize = 2;
/// Upper bound on the number of index functions
pub const MAX_HASH_COUNT: usize = 32;
/// Number of slots stored per word
const SLOTS_PER_WORD: usize = 64;

/// Probabilistic set with one-sided error.
#[derive(Clone, PartialEq, Eq)]
pub struct MembershipFilter {
    /// Number of slots
    size: usize,
    /// Number of slot indices derived per item
    hash_count: usize,
    strategy: IndexStrategy,
    oracle: HashOracle,
    /// Packed slots, bit `i % 64` of word `i / 64` holds slot `i`
    words: Vec<u64>,
}

impl MembershipFilter {
    /// Creates new filter with `size` slots and [`DEFAULT_HASH_COUNT`] index functions
    pub fn new(size: usize) -> Result<Self> {
        Self::with_hash_count(size, DEFAULT_HASH_COUNT)
    }

    /// Creates new filter with `size` slots and `hash_count` index functions
    pub fn with_hash_count(size: usize, hash_count: usize) -> Result<Self> {
        Self::with_strategy(size, hash_count, IndexStrategy::default())
    }

    /// Creates new filter using the given index derivation strategy
    pub fn with_strategy(size: usize, hash_count: usize, strategy: IndexStrategy) -> Result<Self> {
        Self::with_oracle(size, hash_count, strategy, HashOracle::new())
    }

    /// Creates new filter hashing items with `oracle`
    pub fn with_oracle(
        size: usize,
        hash_count: usize,
        strategy: IndexStrategy,
        oracle: HashOracle,
    ) -> Result<Self> {
        validate_size(size)?;
        validate_hash_count(hash_count)?;
        debug!(
            size,
            hash_count,
            strategy = strategy.name(),
            seed = oracle.seed(),
            "created membership filter"
        );
        Ok(Self {
            size,
            hash_count,
            strategy,
            oracle,
            words: vec![0; size.div_ceil(SLOTS_PER_WORD)],
        })
    }

    /// Creates new filter from the filter section of `config`
    pub fn from_config(config: &SketchConfig) -> Result<Self> {
        Self::with_oracle(
            config.filter_size,
            config.hash_count,
            config.strategy,
            HashOracle::with_seed(config.seed),
        )
    }

    /// Insert an item into the filter
    #[inline]
    pub fn insert<T: CanonicalBytes + ?Sized>(&mut self, item: &T) -> Result<()> {
        self.insert_bytes(&item.canonical_bytes()?);
        Ok(())
    }

    /// Insert canonical item bytes into the filter
    #[inline]
    pub fn insert_bytes(&mut self, bytes: &[u8]) {
        let (h1, h2) = self.base_hashes(bytes);
        for i in 0..self.hash_count as u64 {
            let slot = self.strategy.slot_index(h1, h2, i, self.size as u64) as usize;
            self.words[slot / SLOTS_PER_WORD] |= 1 << (slot % SLOTS_PER_WORD);
        }
    }

    /// Insert every item of `items`, stopping at the first unencodable one
    pub fn insert_all<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: CanonicalBytes,
    {
        for item in items {
            self.insert(&item)?;
        }
        Ok(())
    }

    /// Return whether an item is possibly in the filter.
    ///
    /// `false` is always exact. `true` may be a false positive with probability
    /// close to [`MembershipFilter::estimated_false_positive_rate`].
    #[inline]
    pub fn contains<T: CanonicalBytes + ?Sized>(&self, item: &T) -> Result<bool> {
        Ok(self.contains_bytes(&item.canonical_bytes()?))
    }

    /// Return whether canonical item bytes are possibly in the filter
    #[inline]
    pub fn contains_bytes(&self, bytes: &[u8]) -> bool {
        let (h1, h2) = self.base_hashes(bytes);
        (0..self.hash_count as u64).all(|i| {
            let slot = self.strategy.slot_index(h1, h2, i, self.size as u64) as usize;
            self.words[slot / SLOTS_PER_WORD] & (1 << (slot % SLOTS_PER_WORD)) != 0
        })
    }

    /// Check every item of `items`, returning each item paired with its answer
    pub fn check_all<I>(&self, items: I) -> Result<Vec<(I::Item, bool)>>
    where
        I: IntoIterator,
        I::Item: CanonicalBytes,
    {
        items
            .into_iter()
            .map(|item| {
                let present = self.contains(&item)?;
                Ok((item, present))
            })
            .collect()
    }

    /// Clear all slots
    pub fn reset(&mut self) {
        self.words.fill(0);
        debug!(size = self.size, "reset membership filter");
    }

    /// Warn when `expected_items` would push the false-positive rate above `target`
    pub fn check_capacity(&self, expected_items: usize, target: f64) -> bool {
        let rate = theoretical_false_positive_rate(self.size, self.hash_count, expected_items);
        if rate > target {
            warn!(
                size = self.size,
                hash_count = self.hash_count,
                expected_items,
                rate,
                target,
                "membership filter undersized for expected load"
            );
            return false;
        }
        true
    }

    /// Return number of slots
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Return number of index functions
    #[inline]
    pub fn hash_count(&self) -> usize {
        self.hash_count
    }

    /// Return index derivation strategy
    #[inline]
    pub fn strategy(&self) -> IndexStrategy {
        self.strategy
    }

    /// Return number of set slots
    pub fn set_slots(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Return fraction of set slots
    pub fn fill_ratio(&self) -> f64 {
        self.set_slots() as f64 / self.size as f64
    }

    /// Return false-positive probability implied by the current fill ratio
    pub fn estimated_false_positive_rate(&self) -> f64 {
        self.fill_ratio().powi(self.hash_count as i32)
    }

    /// Return whether no slot is set
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Return memory size of `MembershipFilter`
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(self.words.as_slice())
    }

    /// Return `(h1, h2)` base hashes for canonical item bytes
    #[inline]
    fn base_hashes(&self, bytes: &[u8]) -> (u64, u64) {
        let size = self.size as u64;
        let h1 = self.oracle.digest_bytes(bytes).rem_u64(size);
        let h2 = if size > 1 {
            1 + self.oracle.secondary_bytes(bytes) % (size - 1)
        } else {
            0
        };
        (h1, h2)
    }
}

impl Debug for MembershipFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ size: {}, hash_count: {}, strategy: {}, set_slots: {} }}",
            self.size,
            self.hash_count,
            self.strategy.name(),
            self.set_slots()
        )
    }
}

/// Check filter slot count
pub(crate) fn validate_size(size: usize) -> Result<()> {
    if size == 0 {
        return Err(SketchError::invalid("size", "must be greater than zero"));
    }
    Ok(())
}

/// Check number of index functions
pub(crate) fn validate_hash_count(hash_count: usize) -> Result<()> {
    if !(MIN_HASH_COUNT..=MAX_HASH_COUNT).contains(&hash_count) {
        return Err(SketchError::invalid(
            "hash_count",
            format!(
                "must be in [{}..{}], got {}",
                MIN_HASH_COUNT, MAX_HASH_COUNT, hash_count
            ),
        ));
    }
    Ok(())
}
