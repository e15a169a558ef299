//! Hash oracle mapping canonical item bytes to 256-bit digests.
//!
//! The primary digest is SHA-256 of the item's canonical bytes, read as a big-endian
//! 256-bit integer (byte 0 is the most significant byte). SHA-256 gives every output
//! bit a uniform, independent distribution, which both the filter's slot indices and
//! the estimator's trailing-zero statistic rely on.
//!
//! The oracle also exposes a secondary 64-bit hash (wyhash) over the same bytes.
//! It shares no structure with SHA-256, so the filter can use it as the step of
//! its double hashing without the two index sources being correlated.
//!
//! A non-zero seed selects another member of the hash family: the 8 little-endian
//! seed bytes are fed to SHA-256 ahead of the item and used as the wyhash key.
//! Seed `0` is plain SHA-256 of the item bytes.

use std::fmt::{Debug, Display, Formatter};

use sha2::{Digest as _, Sha256};
use wyhash::wyhash;

use crate::error::Result;
use crate::item::CanonicalBytes;

/// Digest width in bytes
pub const DIGEST_BYTES: usize = 32;
/// Digest width in bits
pub const DIGEST_BITS: u32 = 256;
/// Number of 64-bit limbs in a digest
const LIMBS: usize = DIGEST_BYTES / 8;

/// 256-bit unsigned integer produced by [`HashOracle`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_BYTES]);

impl Digest {
    /// Digest with all bits cleared
    pub const ZERO: Digest = Digest([0; DIGEST_BYTES]);

    /// Create digest from big-endian bytes
    #[inline]
    pub const fn from_bytes(bytes: [u8; DIGEST_BYTES]) -> Self {
        Self(bytes)
    }

    /// Return big-endian bytes of the digest
    #[inline]
    pub fn as_bytes(&self) -> &[u8; DIGEST_BYTES] {
        &self.0
    }

    /// Return the number of consecutive zero bits counted from the least-significant end.
    ///
    /// A digest ending in `...1000` has a run of 3. The all-zero digest has a run of
    /// [`DIGEST_BITS`].
    #[inline]
    pub fn trailing_zeros(&self) -> u32 {
        let mut run = 0;
        for &byte in self.0.iter().rev() {
            if byte != 0 {
                return run + byte.trailing_zeros();
            }
            run += 8;
        }
        run
    }

    /// Return `self mod modulus` over the full 256-bit value.
    ///
    /// `modulus` must be non-zero.
    #[inline]
    pub fn rem_u64(&self, modulus: u64) -> u64 {
        debug_assert!(modulus > 0, "modulus must be non-zero");
        let m = u128::from(modulus);
        let rem = self
            .limbs()
            .iter()
            .fold(0u128, |rem, &limb| ((rem << 64) | u128::from(limb)) % m);
        rem as u64
    }

    /// Return the digest logically shifted right by `bits`
    #[inline]
    pub fn shr(&self, bits: u32) -> Digest {
        if bits >= DIGEST_BITS {
            return Digest::ZERO;
        }
        let src = self.limbs();
        let limb_shift = (bits / 64) as usize;
        let bit_shift = bits % 64;
        let mut dst = [0u64; LIMBS];
        for i in limb_shift..LIMBS {
            let j = i - limb_shift;
            dst[i] = src[j] >> bit_shift;
            if bit_shift > 0 && j > 0 {
                dst[i] |= src[j - 1] << (64 - bit_shift);
            }
        }
        Self::from_limbs(dst)
    }

    /// Return the least-significant 64 bits
    #[inline]
    pub fn low_u64(&self) -> u64 {
        self.limbs()[LIMBS - 1]
    }

    /// Split digest into big-endian `u64` limbs (limb 0 is most significant)
    #[inline]
    fn limbs(&self) -> [u64; LIMBS] {
        let mut limbs = [0u64; LIMBS];
        for (limb, chunk) in limbs.iter_mut().zip(self.0.chunks_exact(8)) {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            *limb = u64::from_be_bytes(word);
        }
        limbs
    }

    #[inline]
    fn from_limbs(limbs: [u64; LIMBS]) -> Self {
        let mut bytes = [0u8; DIGEST_BYTES];
        for (chunk, limb) in bytes.chunks_exact_mut(8).zip(limbs) {
            chunk.copy_from_slice(&limb.to_be_bytes());
        }
        Self(bytes)
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Debug for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({})", self)
    }
}

/// Deterministic hash function family over canonical item bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HashOracle {
    seed: u64,
}

impl HashOracle {
    /// Creates oracle computing plain SHA-256 of item bytes
    #[inline]
    pub const fn new() -> Self {
        Self { seed: 0 }
    }

    /// Creates oracle for family member `seed`
    #[inline]
    pub const fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// Return seed of this oracle
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Hash an item through its canonical bytes
    #[inline]
    pub fn digest<T: CanonicalBytes + ?Sized>(&self, item: &T) -> Result<Digest> {
        Ok(self.digest_bytes(&item.canonical_bytes()?))
    }

    /// Hash bytes that are already in canonical form
    pub fn digest_bytes(&self, bytes: &[u8]) -> Digest {
        let mut hasher = Sha256::new();
        if self.seed != 0 {
            hasher.update(self.seed.to_le_bytes());
        }
        hasher.update(bytes);
        let mut out = [0u8; DIGEST_BYTES];
        out.copy_from_slice(&hasher.finalize());
        Digest(out)
    }

    /// Secondary hash of canonical bytes, independent of [`HashOracle::digest_bytes`]
    #[inline]
    pub fn secondary_bytes(&self, bytes: &[u8]) -> u64 {
        wyhash(bytes, self.seed)
    }
}
