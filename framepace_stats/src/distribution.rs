//! Frametime distribution
//!
//! [`discrete_distribution`] buckets a sequence into a histogram whose bin
//! width is chosen from the data. For every candidate bin count `N` in
//! `[4, 16)` the sequence is binned uniformly, the two edge bins are set aside
//! and the remaining counts scored with the cost
//!
//! ```text
//! C(N) = (2 * mean(k) - var(k)) / D(N)^2,   D(N) = (max - min) / N
//! ```
//!
//! where `var(k)` divides by `N`. The first `N` with the lowest cost wins.
//!
//! Bins are closed on both ends. A value lying exactly on an edge shared by two
//! bins is reported in both.

use serde::Serialize;
use tracing::debug;

use crate::Error;

const MIN_BINS: usize = 4;
const MAX_BINS: usize = 16;

/// One histogram bucket: the closed interval `[lower, upper]` and every value
/// of the sequence inside it, in sequence order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    /// Lower bound, inclusive.
    pub lower: f64,
    /// Upper bound, inclusive.
    pub upper: f64,
    /// Members of this bin.
    pub values: Vec<f64>,
}

impl Bin {
    /// Whether `value` falls within this bin's bounds.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether this bin has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn range(sequence: &[f64]) -> Option<(f64, f64)> {
    if sequence.is_empty() {
        return None;
    }
    let min = sequence.iter().copied().fold(f64::INFINITY, f64::min);
    let max = sequence.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((min, max))
}

/// `count` evenly spaced points from `start` to `end`, both included. The last
/// point is `end` exactly so the maximum always lands in the final bin.
fn linear_space(start: f64, end: f64, count: usize) -> Vec<f64> {
    let last = count.saturating_sub(1);
    let steps = last.max(1) as f64;
    (0..count)
        .map(|idx| {
            if idx == last {
                end
            } else {
                start + (idx as f64 * (end - start)) / steps
            }
        })
        .collect()
}

/// Member count of every closed bin between consecutive `edges`.
fn histogram(sequence: &[f64], edges: &[f64]) -> Vec<usize> {
    edges
        .windows(2)
        .map(|edge| {
            sequence
                .iter()
                .filter(|value| **value >= edge[0] && **value <= edge[1])
                .count()
        })
        .collect()
}

fn optimal_bin_width(sequence: &[f64], min: f64, max: f64) -> f64 {
    let mut best: Option<(f64, f64)> = None;

    for bins in MIN_BINS..MAX_BINS {
        let width = (max - min) / bins as f64;
        let counts = histogram(sequence, &linear_space(min, max, bins + 1));
        let inner = &counts[1..counts.len() - 1];

        let mean = inner.iter().sum::<usize>() as f64 / inner.len() as f64;
        let variance = inner
            .iter()
            .map(|count| (*count as f64 - mean).powi(2))
            .sum::<f64>()
            / bins as f64;
        let cost = (2.0 * mean - variance) / width.powi(2);

        if best.is_none_or(|(lowest, _)| cost < lowest) {
            best = Some((cost, width));
        }
    }

    best.map_or((max - min) / MIN_BINS as f64, |(_, width)| width)
}

/// Lower the bin count when the chosen count is exactly four and a uniform
/// four-bin split leaves bins empty, by the number of empty bins.
#[must_use]
pub fn prune_degenerate_quadrant(sequence: &[f64], min: f64, max: f64, count: usize) -> usize {
    if count != MIN_BINS {
        return count;
    }
    let empty = histogram(sequence, &linear_space(min, max, count + 1))
        .into_iter()
        .filter(|members| *members == 0)
        .count();
    count - empty
}

/// Bucket `sequence` into a histogram with a data-driven bin width.
///
/// A sequence whose values are all equal has no width to divide and comes
/// back as a single bin holding every value. Pruning may leave no bins at all,
/// in which case the result is empty.
///
/// # Errors
///
/// Returns [`Error::EmptySequence`] for an empty sequence, for which no bin
/// width exists.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn discrete_distribution(sequence: &[f64]) -> Result<Vec<Bin>, Error> {
    let (min, max) = range(sequence).ok_or(Error::EmptySequence)?;

    if max <= min {
        return Ok(vec![Bin {
            lower: min,
            upper: max,
            values: sequence.to_vec(),
        }]);
    }

    let width = optimal_bin_width(sequence, min, max);
    let chosen = ((max - min) / width).round() as usize;
    let count = prune_degenerate_quadrant(sequence, min, max, chosen);
    debug!(width, chosen, count, "frametime distribution bins");

    if count < 1 {
        return Ok(Vec::new());
    }

    let bins = linear_space(min, max, count + 1)
        .windows(2)
        .map(|edge| Bin {
            lower: edge[0],
            upper: edge[1],
            values: sequence
                .iter()
                .copied()
                .filter(|value| *value >= edge[0] && *value <= edge[1])
                .collect(),
        })
        .collect();
    Ok(bins)
}

#[cfg(test)]
mod tests {
    use proptest::{collection, prelude::*};

    use super::*;

    #[test]
    fn empty_sequence_is_an_error() {
        assert_eq!(discrete_distribution(&[]), Err(Error::EmptySequence));
    }

    #[test]
    fn constant_sequence_is_one_bin() {
        let bins = discrete_distribution(&[16.0; 5]).expect("non-empty");
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].len(), 5);
    }

    #[test]
    fn edges_span_the_range() {
        let sequence: Vec<f64> = (0..500).map(|i| 10.0 + f64::from(i % 50) * 0.1).collect();
        let bins = discrete_distribution(&sequence).expect("non-empty");
        assert!(!bins.is_empty());
        assert!((bins[0].lower - 10.0).abs() < 1e-9);
        assert!((bins[bins.len() - 1].upper - 14.9).abs() < 1e-9);
        for pair in bins.windows(2) {
            assert!((pair[0].upper - pair[1].lower).abs() < 1e-9);
        }
    }

    #[test]
    fn shared_edges_double_count() {
        let edges = [0.0, 1.0, 2.0];
        assert_eq!(histogram(&[0.0, 1.0, 2.0], &edges), vec![2, 2]);
    }

    #[test]
    fn pruning_applies_only_to_four() {
        // Uniform four-bin split of [0, 8]: [0,2] [2,4] [4,6] [6,8]. Two are
        // empty.
        let sequence = [0.0, 0.5, 1.0, 8.0];
        assert_eq!(prune_degenerate_quadrant(&sequence, 0.0, 8.0, 4), 2);
        assert_eq!(prune_degenerate_quadrant(&sequence, 0.0, 8.0, 5), 5);
    }

    #[test]
    fn isolated_hitch_prunes_four_bins_to_two() {
        // Four bins over [10, 40] leave [17.5, 25] and [25, 32.5] empty.
        let mut sequence = vec![10.0; 20];
        sequence.push(40.0);
        let bins = discrete_distribution(&sequence).expect("non-empty");
        assert_eq!(bins.len(), 2);
        assert!((bins[0].lower - 10.0).abs() < 1e-10);
        assert!((bins[0].upper - 25.0).abs() < 1e-10);
        assert!((bins[1].upper - 40.0).abs() < 1e-10);
        assert_eq!(bins[0].len(), 20);
        assert_eq!(bins[1].values, vec![40.0]);
    }

    #[test]
    fn linear_space_includes_endpoints() {
        let points = linear_space(1.0, 2.0, 5);
        assert_eq!(points, vec![1.0, 1.25, 1.5, 1.75, 2.0]);
    }

    proptest! {
        #[test]
        fn every_value_lands_in_a_bin(
            sequence in collection::vec((1u32..10_000).prop_map(|v| f64::from(v) / 100.0), 1..400),
        ) {
            let bins = discrete_distribution(&sequence).expect("non-empty");
            for value in &sequence {
                prop_assert!(
                    bins.iter().any(|bin| bin.values.contains(value)),
                    "{value} missing from {bins:?}"
                );
            }
        }
    }
}
