//! `sketch-engine` is a Rust crate providing two fixed-memory probabilistic sketches over streams of items.
//!
//! - [`MembershipFilter`] is a Bloom filter answering "possibly present" or "definitely absent".
//! - [`CardinalityEstimator`] is a Flajolet–Martin estimator of the number of distinct items,
//!   averaging trailing-zero runs over `2^B` buckets.
//!
//! Both sketches hash the canonical UTF-8 byte form of an item (see [`CanonicalBytes`]) with
//! SHA-256 through a [`HashOracle`]. [`AnalysisSession`] owns one filter and one estimator per
//! loaded dataset and exposes the column-level operations built on top of them.
//!
//! ```
//! use sketch_engine::{CardinalityEstimator, MembershipFilter};
//!
//! let mut filter = MembershipFilter::with_hash_count(1000, 3).unwrap();
//! filter.insert_all(["apple", "banana", "cherry"]).unwrap();
//! assert!(filter.contains("apple").unwrap());
//!
//! let mut estimator = CardinalityEstimator::new(12).unwrap();
//! estimator.observe_all(["apple", "banana", "apple"]).unwrap();
//! assert_eq!(estimator.estimate(), 2);
//! ```
pub mod config;
pub mod digest;
pub mod error;
pub mod estimator;
pub mod filter;
pub mod item;
pub mod session;
pub mod strategy;

pub use config::SketchConfig;
pub use digest::{Digest, HashOracle};
pub use error::{Result, SketchError};
pub use estimator::CardinalityEstimator;
pub use filter::MembershipFilter;
pub use item::CanonicalBytes;
pub use session::{AnalysisSession, ColumnSummary, PresenceReport, UnencodablePolicy};
pub use strategy::{DoubleHashing, EnhancedDoubleHashing, IndexDerivation, IndexStrategy};
