//! Outlier removal
//!
//! A frametime capture regularly contains a handful of pathological frames,
//! such as a shader compilation hitch, that dominate extremum metrics.
//! [`adjust`] drops such frames according to a [`Policy`] before any metric is
//! computed.
//!
//! Only [`Policy::None`] and [`Policy::DeciPercentile`] filter anything. The
//! remaining policies are recognized so configuration naming them stays valid,
//! but they pass the sequence through untouched.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::quantile::quantile;

/// Quantile above which [`Policy::DeciPercentile`] discards samples.
pub const DECI_PERCENTILE_TAU: f64 = 0.999;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
/// Configuration of outlier removal.
pub enum Policy {
    /// Keep every sample.
    #[default]
    None,
    /// Drop every sample at or above the 99.9th percentile.
    DeciPercentile,
    /// Interquartile range fencing. Not implemented, passes through.
    InterquartileRange,
    /// Three standard deviations from the mean. Not implemented, passes
    /// through.
    ThreeSigma,
    /// Two and a half standard deviations from the mean. Not implemented,
    /// passes through.
    TwoPointFiveSigma,
}

impl Policy {
    /// Whether this policy actually filters, or is a declared passthrough.
    #[must_use]
    pub const fn is_implemented(self) -> bool {
        match self {
            Policy::None | Policy::DeciPercentile => true,
            Policy::InterquartileRange | Policy::ThreeSigma | Policy::TwoPointFiveSigma => false,
        }
    }
}

/// Apply `policy` to `sequence`.
///
/// [`Policy::None`] and the passthrough policies borrow the input, no copy is
/// made. [`Policy::DeciPercentile`] keeps only elements strictly below the
/// 0.999 quantile, so a sequence whose values are all equal comes back empty.
/// Callers must be ready for that.
#[must_use]
pub fn adjust(sequence: &[f64], policy: Policy) -> Cow<'_, [f64]> {
    match policy {
        Policy::None => Cow::Borrowed(sequence),
        Policy::DeciPercentile => {
            let threshold = quantile(sequence, DECI_PERCENTILE_TAU);
            let kept: Vec<f64> = sequence
                .iter()
                .copied()
                .filter(|value| *value < threshold)
                .collect();
            debug!(
                threshold,
                removed = sequence.len() - kept.len(),
                "deci-percentile outliers removed"
            );
            Cow::Owned(kept)
        }
        Policy::InterquartileRange | Policy::ThreeSigma | Policy::TwoPointFiveSigma => {
            debug!(?policy, "outlier policy is a passthrough");
            Cow::Borrowed(sequence)
        }
    }
}
