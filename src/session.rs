//! Session-scoped owner of the sketches built for one loaded dataset.
//!
//! An [`AnalysisSession`] holds no sketches until [`AnalysisSession::load`] is
//! called for a dataset. Loading again replaces both sketches with fresh ones and
//! [`AnalysisSession::clear`] drops them, so nothing outlives the dataset it was
//! built from.
//!
//! Column operations take the already-filtered (non-missing) values of one column.
//! Items without a canonical byte form are handled according to the session's
//! [`UnencodablePolicy`].

use std::borrow::Cow;
use std::fmt::{Display, Formatter};

use tracing::{debug, warn};

use crate::config::SketchConfig;
use crate::error::{Result, SketchError};
use crate::estimator::CardinalityEstimator;
use crate::filter::MembershipFilter;
use crate::item::CanonicalBytes;

/// What a column operation does with an item that cannot be encoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnencodablePolicy {
    /// Stop and return [`SketchError::UnencodableItem`]
    #[default]
    Abort,
    /// Log a warning, count the item as skipped and continue
    Skip,
}

/// Distinct-count result for one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSummary {
    /// Number of items fed to the sketches
    pub observed: usize,
    /// Number of items skipped as unencodable
    pub skipped: usize,
    /// Approximate number of distinct items
    pub distinct_estimate: usize,
    /// Longest trailing-zero run observed
    pub max_run: u8,
}

impl Display for ColumnSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Estimated distinct elements: {}", self.distinct_estimate)?;
        write!(f, "Max Trailing Number: {}", self.max_run)?;
        if self.skipped > 0 {
            write!(f, "\nSkipped unencodable items: {}", self.skipped)?;
        }
        Ok(())
    }
}

/// Membership answers for one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceReport<T> {
    /// Each checked item paired with its answer
    pub entries: Vec<(T, bool)>,
    /// Number of items skipped as unencodable
    pub skipped: usize,
}

impl<T> PresenceReport<T> {
    /// Return number of items reported present
    pub fn present_count(&self) -> usize {
        self.entries.iter().filter(|(_, present)| *present).count()
    }
}

impl<T: Display> Display for PresenceReport<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, (item, present)) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let answer = if *present { "Present" } else { "Not Present" };
            write!(f, "{}: {}", item, answer)?;
        }
        Ok(())
    }
}

/// Sketches owned by the currently loaded dataset
#[derive(Debug)]
pub struct AnalysisSession {
    config: SketchConfig,
    policy: UnencodablePolicy,
    filter: Option<MembershipFilter>,
    estimator: Option<CardinalityEstimator>,
}

impl AnalysisSession {
    /// Creates session with no dataset loaded
    pub fn new(config: SketchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            policy: UnencodablePolicy::default(),
            filter: None,
            estimator: None,
        })
    }

    /// Return session using `policy` for unencodable items
    pub fn with_policy(self, policy: UnencodablePolicy) -> Self {
        Self { policy, ..self }
    }

    /// Return session configuration
    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    /// Build fresh sketches for a newly loaded dataset, replacing any previous ones
    pub fn load(&mut self) -> Result<()> {
        let filter = MembershipFilter::from_config(&self.config)?;
        let estimator = CardinalityEstimator::from_config(&self.config)?;
        let replaced = self.is_loaded();
        self.filter = Some(filter);
        self.estimator = Some(estimator);
        debug!(replaced, "loaded dataset sketches");
        Ok(())
    }

    /// Drop the sketches of the current dataset
    pub fn clear(&mut self) {
        if self.is_loaded() {
            debug!("cleared dataset sketches");
        }
        self.filter = None;
        self.estimator = None;
    }

    /// Return whether a dataset is loaded
    pub fn is_loaded(&self) -> bool {
        self.filter.is_some() && self.estimator.is_some()
    }

    /// Return membership filter of the loaded dataset
    pub fn filter(&self) -> Option<&MembershipFilter> {
        self.filter.as_ref()
    }

    /// Return cardinality estimator of the loaded dataset
    pub fn estimator(&self) -> Option<&CardinalityEstimator> {
        self.estimator.as_ref()
    }

    /// Add a column's items to the membership filter and estimate their distinct count.
    ///
    /// The estimator is reset first, so the summary describes this column alone. The
    /// filter keeps accumulating for the whole dataset.
    ///
    /// The whole column is encoded before either sketch is touched, so an
    /// [`UnencodablePolicy::Abort`] error leaves the session unchanged.
    pub fn count_distinct<I>(&mut self, items: I) -> Result<ColumnSummary>
    where
        I: IntoIterator,
        I::Item: CanonicalBytes,
    {
        let policy = self.policy;
        let (Some(filter), Some(estimator)) = (self.filter.as_mut(), self.estimator.as_mut())
        else {
            return Err(SketchError::NoDatasetLoaded);
        };

        let mut skipped = 0;
        let mut column = Vec::new();
        for item in items {
            if let Some(bytes) = encode(&item, policy, &mut skipped)? {
                column.push(bytes.into_owned());
            }
        }

        estimator.reset();
        for bytes in &column {
            filter.insert_bytes(bytes);
            estimator.observe_bytes(bytes);
        }

        let observed = column.len();
        let summary = ColumnSummary {
            observed,
            skipped,
            distinct_estimate: estimator.estimate(),
            max_run: estimator.max_run(),
        };
        debug!(
            observed,
            skipped,
            distinct_estimate = summary.distinct_estimate,
            max_run = summary.max_run,
            "counted distinct column items"
        );
        Ok(summary)
    }

    /// Check each of a column's items against the membership filter
    pub fn check_presence<I>(&self, items: I) -> Result<PresenceReport<I::Item>>
    where
        I: IntoIterator,
        I::Item: CanonicalBytes,
    {
        let filter = self.filter.as_ref().ok_or(SketchError::NoDatasetLoaded)?;
        let mut entries = Vec::new();
        let mut skipped = 0;
        for item in items {
            let present = match encode(&item, self.policy, &mut skipped)? {
                Some(bytes) => filter.contains_bytes(&bytes),
                None => continue,
            };
            entries.push((item, present));
        }
        Ok(PresenceReport { entries, skipped })
    }
}

/// Return canonical bytes of `item`, or `None` when the policy skips it
fn encode<'a, T: CanonicalBytes>(
    item: &'a T,
    policy: UnencodablePolicy,
    skipped: &mut usize,
) -> Result<Option<Cow<'a, [u8]>>> {
    match item.canonical_bytes() {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if policy == UnencodablePolicy::Skip => {
            warn!(error = %e, "skipping unencodable item");
            *skipped += 1;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
