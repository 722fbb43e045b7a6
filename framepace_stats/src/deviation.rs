//! Adaptive standard deviation
//!
//! A plain standard deviation of a frametime capture mostly measures scene
//! changes: a run that moves from a heavy area into a light one has a large
//! deviation even when every frame is perfectly paced. The adaptive variant
//! measures residuals against a trailing moving average instead, isolating
//! local jitter from the slow trend.

use std::num::NonZeroUsize;

use crate::{Error, moving_average::moving_average};

/// Standard deviation of `sequence` about its own trailing moving average over
/// `window` samples.
///
/// # Errors
///
/// Returns [`Error::LengthMismatch`] if the smoothed sequence does not line up
/// with the input. See [`residual_std`].
pub fn adaptive_std(sequence: &[f64], window: NonZeroUsize) -> Result<f64, Error> {
    let trend = moving_average(sequence, window);
    residual_std(sequence, &trend)
}

/// Sample standard deviation of `sequence` about `trend`, index by index:
/// `sqrt(sum((x[i] - trend[i])^2) / (n - 1))`.
///
/// An empty sequence yields `NaN`, as does a single sample.
///
/// # Errors
///
/// Returns [`Error::LengthMismatch`] when `trend` and `sequence` differ in
/// length. Truncating to the shorter of the two would pair samples with the
/// wrong smoothed values, so the computation stops instead.
pub fn residual_std(sequence: &[f64], trend: &[f64]) -> Result<f64, Error> {
    if trend.len() != sequence.len() {
        return Err(Error::LengthMismatch {
            expected: sequence.len(),
            actual: trend.len(),
        });
    }
    if sequence.is_empty() {
        return Ok(f64::NAN);
    }

    let sum_of_squares: f64 = sequence
        .iter()
        .zip(trend)
        .map(|(value, smoothed)| (value - smoothed).powi(2))
        .sum();
    Ok((sum_of_squares / (sequence.len() as f64 - 1.0)).sqrt())
}

#[cfg(test)]
mod tests {
    use proptest::{collection, prelude::*};

    use super::*;

    fn window(size: usize) -> NonZeroUsize {
        NonZeroUsize::new(size).expect("non-zero window")
    }

    #[test]
    fn constant_sequence_has_no_jitter() {
        let std = adaptive_std(&[60.0; 100], window(10)).expect("lengths match");
        assert!(std.abs() < 1e-10);
    }

    #[test]
    fn trend_is_not_jitter() {
        // A slow linear ramp has a large global deviation but small residuals
        // against a short moving average.
        let ramp: Vec<f64> = (0..1_000).map(|i| f64::from(i) * 0.1).collect();
        let mean = ramp.iter().sum::<f64>() / ramp.len() as f64;
        let global = (ramp.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (ramp.len() as f64 - 1.0))
            .sqrt();
        let adaptive = adaptive_std(&ramp, window(5)).expect("lengths match");
        assert!(adaptive < global / 10.0, "{adaptive} vs {global}");
    }

    #[test]
    fn mismatched_trend_is_a_fault() {
        let err = residual_std(&[1.0, 2.0, 3.0], &[1.0, 2.0]).expect_err("must fail");
        assert_eq!(
            err,
            Error::LengthMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn degenerate_inputs_are_nan_not_zero() {
        assert!(adaptive_std(&[], window(3)).expect("lengths match").is_nan());
        assert!(
            adaptive_std(&[16.0], window(3))
                .expect("lengths match")
                .is_nan()
        );
    }

    proptest! {
        #[test]
        fn never_negative(
            sequence in collection::vec(1.0f64..200.0, 2..400),
            size in 1usize..100,
        ) {
            let std = adaptive_std(&sequence, window(size)).expect("lengths match");
            prop_assert!(std >= 0.0);
        }
    }
}
