//! Trailing moving averages
//!
//! The average at index `i` covers the `window` samples ending at `i`. Near the
//! start of a sequence fewer samples are available and the average covers
//! whatever exists, so the output always has the same length as the input.
//! Several metrics pair each sample with its smoothed counterpart by index and
//! rely on that equality.

use std::num::NonZeroUsize;

/// Compute the trailing moving average of `sequence` over `window` samples.
#[must_use]
pub fn moving_average(sequence: &[f64], window: NonZeroUsize) -> Vec<f64> {
    let window = window.get();
    let mut averages = Vec::with_capacity(sequence.len());
    let mut sum = 0.0;

    for (idx, value) in sequence.iter().enumerate() {
        sum += value;
        if idx >= window {
            sum -= sequence[idx - window];
        }
        let span = (idx + 1).min(window);
        averages.push(sum / span as f64);
    }

    averages
}

/// The window used when no explicit size is configured: ten times the square
/// root of the sequence mean, never less than one sample.
///
/// For frametimes in milliseconds this widens the window for slow captures,
/// where each frame covers more wall-clock time.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn default_window(sequence: &[f64]) -> NonZeroUsize {
    let mean = if sequence.is_empty() {
        0.0
    } else {
        sequence.iter().sum::<f64>() / sequence.len() as f64
    };
    let size = (mean.sqrt() * 10.0).round();
    // `as` saturates: NaN maps to zero, which is lifted to one below.
    NonZeroUsize::new(size as usize).unwrap_or(NonZeroUsize::MIN)
}
