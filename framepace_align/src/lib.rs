//! Cross-clock sample alignment
//!
//! Power measurement devices sample on their own clock, typically much faster
//! or slower than frames are presented. This library resamples such a
//! *mapping* stream onto the timestamps of a *reference* stream, usually the
//! frame presentation counters, so the result lines up index for index with
//! the frames and can be fed to the same metric computations.
//!
//! Both streams must carry stamps from the same clock domain and be sorted by
//! stamp. For every reference interval `[prev, next)` the aligned value at
//! `next` is:
//!
//! * the mean of all mapping samples stamped inside the interval, or
//! * when the interval holds no mapping sample, the midpoint of the two mapping
//!   samples bracketing it, or
//! * once the mapping stream is exhausted, the last aligned value, held.
//!
//! The first aligned value is taken from the mapping sample at or just before
//! the first reference stamp.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Names one of the two streams passed to [`align`].
pub enum Stream {
    /// The stream whose stamps the output carries.
    Reference,
    /// The stream whose values are resampled.
    Mapping,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Reference => f.write_str("reference"),
            Stream::Mapping => f.write_str("mapping"),
        }
    }
}

/// Errors produced by [`align`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// There is nothing to resample from.
    #[error("Mapping stream is empty")]
    EmptyMapping,
    /// A stamp is smaller than the one before it, or cannot be ordered at
    /// all.
    #[error("The {stream} stream is not ordered at index {index}")]
    NotMonotonic {
        /// The offending stream
        stream: Stream,
        /// Index of the first stamp out of order
        index: usize,
    },
}

/// One measurement and the clock reading it was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sample<T = u64> {
    /// Clock reading, for instance a performance counter value.
    pub counter: T,
    /// Measured value, for instance watts.
    pub value: f64,
}

impl<T> Sample<T> {
    /// Create a new [`Sample`].
    #[must_use]
    pub const fn new(counter: T, value: f64) -> Self {
        Self { counter, value }
    }
}

fn check_monotonic<T, I>(stamps: I, stream: Stream) -> Result<(), Error>
where
    T: PartialOrd,
    I: IntoIterator<Item = T>,
{
    let mut previous: Option<T> = None;
    for (index, stamp) in stamps.into_iter().enumerate() {
        // Unordered stamps, such as NaN, compare as `None` even with
        // themselves.
        let reference = previous.as_ref().unwrap_or(&stamp);
        if !matches!(
            stamp.partial_cmp(reference),
            Some(Ordering::Greater | Ordering::Equal)
        ) {
            return Err(Error::NotMonotonic { stream, index });
        }
        previous = Some(stamp);
    }
    Ok(())
}

/// Resample `mapping` onto the stamps of `reference`.
///
/// The output has exactly the length of `reference` and carries its stamps.
/// The values of `reference` are not consulted. An empty `reference` yields an
/// empty output.
///
/// # Errors
///
/// Returns [`Error::EmptyMapping`] when `reference` is not empty but `mapping`
/// is, and [`Error::NotMonotonic`] when either stream's stamps decrease or
/// cannot be ordered.
pub fn align<T>(reference: &[Sample<T>], mapping: &[Sample<T>]) -> Result<Vec<Sample<T>>, Error>
where
    T: Copy + PartialOrd,
{
    let stamps: Vec<T> = reference.iter().map(|sample| sample.counter).collect();
    align_to_stamps(&stamps, mapping)
}

/// Resample `mapping` onto bare `stamps`. See [`align`].
///
/// # Errors
///
/// As [`align`], with `stamps` as the reference stream.
pub fn align_to_stamps<T>(stamps: &[T], mapping: &[Sample<T>]) -> Result<Vec<Sample<T>>, Error>
where
    T: Copy + PartialOrd,
{
    check_monotonic(stamps.iter(), Stream::Reference)?;
    check_monotonic(mapping.iter().map(|sample| &sample.counter), Stream::Mapping)?;

    let Some(first) = stamps.first().copied() else {
        return Ok(Vec::new());
    };
    if mapping.is_empty() {
        return Err(Error::EmptyMapping);
    }

    let start = mapping
        .windows(2)
        .position(|pair| pair[0].counter >= first || pair[1].counter > first)
        .unwrap_or(mapping.len() - 1);

    let mut aligned = Vec::with_capacity(stamps.len());
    aligned.push(Sample::new(first, mapping[start].value));

    let mut cursor = start;
    let mut held = 0usize;
    for pair in stamps.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let mut sum = 0.0;
        let mut count = 0usize;
        let mut value = None;

        for k in cursor..mapping.len() {
            let here = mapping[k].counter;
            if here < prev {
                if mapping.get(k + 1).is_some_and(|after| after.counter >= next) {
                    value = Some(midpoint(&mapping[k], &mapping[k + 1]));
                    cursor = k;
                    break;
                }
            } else if here < next {
                sum += mapping[k].value;
                count += 1;
            } else {
                value = Some(if count > 0 {
                    sum / count as f64
                } else if k > 0 {
                    midpoint(&mapping[k - 1], &mapping[k])
                } else {
                    mapping[k].value
                });
                cursor = k;
                break;
            }
        }

        let value = match value {
            Some(value) => value,
            None => {
                cursor = mapping.len();
                if count > 0 {
                    sum / count as f64
                } else {
                    held += 1;
                    aligned.last().map_or(f64::NAN, |sample: &Sample<T>| sample.value)
                }
            }
        };
        aligned.push(Sample::new(next, value));
    }

    debug!(
        reference = stamps.len(),
        mapping = mapping.len(),
        held,
        "aligned sample streams"
    );
    Ok(aligned)
}

fn midpoint<T>(left: &Sample<T>, right: &Sample<T>) -> f64 {
    (left.value + right.value) / 2.0
}

#[cfg(test)]
mod tests {
    use proptest::{collection, prelude::*};

    use super::*;

    fn stream(counters: impl IntoIterator<Item = u64>, value: f64) -> Vec<Sample> {
        counters
            .into_iter()
            .map(|counter| Sample::new(counter, value))
            .collect()
    }

    fn assert_constant(reference: &[Sample], aligned: &[Sample], value: f64) {
        assert_eq!(aligned.len(), reference.len());
        for (expected, actual) in reference.iter().zip(aligned) {
            assert_eq!(expected.counter, actual.counter);
            assert!(
                (actual.value - value).abs() < f64::EPSILON,
                "{actual:?} should carry {value}"
            );
        }
    }

    #[test]
    fn downsampling() {
        let reference = stream((0..10).map(|i| i * 10), 100.0);
        let mapping = stream(0..100, 50.0);
        let aligned = align(&reference, &mapping).expect("valid streams");
        assert_constant(&reference, &aligned, 50.0);
    }

    #[test]
    fn overlapping_ranges() {
        let reference = stream((1..=10).map(|i| i * 10), 100.0);
        let mapping = stream(0..110, 50.0);
        let aligned = align(&reference, &mapping).expect("valid streams");
        assert_constant(&reference, &aligned, 50.0);
    }

    #[test]
    fn oversampling() {
        let counters = [1, 2, 3, 4]
            .into_iter()
            .chain((1..=10).map(|i| i * 100));
        let reference = stream(counters, 100.0);
        let mapping = stream((0..110).map(|i| i * 10), 50.0);
        let aligned = align(&reference, &mapping).expect("valid streams");
        assert_constant(&reference, &aligned, 50.0);
    }

    #[test]
    fn intervals_are_averaged() {
        let reference = stream([0, 10, 20], 0.0);
        let mapping: Vec<Sample> = (0..20).map(|i| Sample::new(i, i as f64)).collect();
        let aligned = align(&reference, &mapping).expect("valid streams");
        let values: Vec<f64> = aligned.iter().map(|sample| sample.value).collect();
        assert_eq!(values, vec![0.0, 4.5, 14.5]);
    }

    #[test]
    fn empty_interval_takes_bracketing_midpoint() {
        let reference = stream([0, 5, 6], 0.0);
        let mapping = vec![Sample::new(0, 0.0), Sample::new(10, 10.0)];
        let aligned = align(&reference, &mapping).expect("valid streams");
        let values: Vec<f64> = aligned.iter().map(|sample| sample.value).collect();
        assert_eq!(values, vec![0.0, 0.0, 5.0]);
    }

    #[test]
    fn exhausted_mapping_holds_last_value() {
        let reference = stream([0, 10, 20, 30], 0.0);
        let mapping = vec![Sample::new(0, 2.0), Sample::new(5, 4.0)];
        let aligned = align(&reference, &mapping).expect("valid streams");
        let values: Vec<f64> = aligned.iter().map(|sample| sample.value).collect();
        assert_eq!(values, vec![2.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn degenerate_streams() {
        let mapping = stream(0..10, 1.0);
        assert_eq!(align(&[], &mapping), Ok(Vec::new()));
        assert_eq!(
            align(&stream([1, 2], 0.0), &[]),
            Err(Error::EmptyMapping)
        );
        assert_eq!(
            align(&stream([1, 3, 2], 0.0), &mapping),
            Err(Error::NotMonotonic {
                stream: Stream::Reference,
                index: 2
            })
        );
        assert_eq!(
            align(&stream([1, 2], 0.0), &stream([4, 1], 0.0)),
            Err(Error::NotMonotonic {
                stream: Stream::Mapping,
                index: 1
            })
        );
    }

    #[test]
    fn float_stamps() {
        let reference = vec![Sample::new(0.0_f64, 0.0), Sample::new(0.5, 0.0)];
        let mapping = vec![
            Sample::new(0.0_f64, 8.0),
            Sample::new(0.25, 4.0),
            Sample::new(1.0, 0.0),
        ];
        let aligned = align(&reference, &mapping).expect("valid streams");
        assert!((aligned[1].value - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unordered_float_stamps_are_rejected() {
        let mapping = vec![Sample::new(0.0_f64, 1.0), Sample::new(1.0, 1.0)];
        let reference = vec![
            Sample::new(0.0_f64, 0.0),
            Sample::new(f64::NAN, 0.0),
            Sample::new(0.5, 0.0),
        ];
        assert_eq!(
            align(&reference, &mapping),
            Err(Error::NotMonotonic {
                stream: Stream::Reference,
                index: 1
            })
        );

        let first_nan = vec![Sample::new(f64::NAN, 0.0)];
        assert_eq!(
            align(&first_nan, &mapping),
            Err(Error::NotMonotonic {
                stream: Stream::Reference,
                index: 0
            })
        );

        let nan_mapping = vec![Sample::new(0.0_f64, 1.0), Sample::new(f64::NAN, 1.0)];
        assert_eq!(
            align(&reference[..1], &nan_mapping),
            Err(Error::NotMonotonic {
                stream: Stream::Mapping,
                index: 1
            })
        );
    }

    proptest! {
        #[test]
        fn output_follows_reference(
            mut reference in collection::vec(0u64..10_000, 0..200),
            mut mapping in collection::vec(0u64..10_000, 1..400),
            level in 0u32..1_000,
        ) {
            reference.sort_unstable();
            mapping.sort_unstable();
            let level = f64::from(level);
            let reference = stream(reference, 0.0);
            let mapping = stream(mapping, level);

            let aligned = align(&reference, &mapping).expect("sorted streams");
            prop_assert_eq!(aligned.len(), reference.len());
            for (expected, actual) in reference.iter().zip(&aligned) {
                prop_assert_eq!(expected.counter, actual.counter);
                prop_assert!((actual.value - level).abs() < 1e-9);
            }
        }
    }
}
