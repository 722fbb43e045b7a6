//! Stuttering and frame rate threshold figures
//!
//! A frame "stutters" when it takes more than a configurable factor times the
//! typical frametime. These functions express how much of a capture, by frame
//! count or by time, was spent stuttering or below a frame rate target.
//! Percentages are in `[0, 100]`; an empty sequence yields `NaN`.

use crate::moving_average::{default_window, moving_average};

/// Frame rate thresholds, highest first.
pub const FPS_THRESHOLDS: [f64; 10] = [
    240.0, 144.0, 120.0, 90.0, 75.0, 60.0, 45.0, 30.0, 15.0, 10.0,
];

fn mean(sequence: &[f64]) -> f64 {
    sequence.iter().sum::<f64>() / sequence.len() as f64
}

/// Percentage of frames slower than `factor` times the mean frametime.
#[must_use]
pub fn stuttering_count_percentage(frametimes: &[f64], factor: f64) -> f64 {
    let limit = factor * mean(frametimes);
    let stuttering = frametimes.iter().filter(|ft| **ft > limit).count();
    100.0 * stuttering as f64 / frametimes.len() as f64
}

/// Percentage of capture time spent in frames slower than `factor` times the
/// mean frametime.
///
/// The global mean reacts to every frame equally, which suits a live overlay
/// where no look-back window is available.
#[must_use]
pub fn online_stuttering_time_percentage(frametimes: &[f64], factor: f64) -> f64 {
    let limit = factor * mean(frametimes);
    let stuttering: f64 = frametimes.iter().filter(|ft| **ft > limit).sum();
    100.0 * stuttering / frametimes.iter().sum::<f64>()
}

/// Percentage of capture time spent in frames slower than `factor` times the
/// local moving average.
///
/// The window is [`default_window`] of the sequence.
#[must_use]
pub fn stuttering_time_percentage(frametimes: &[f64], factor: f64) -> f64 {
    let trend = moving_average(frametimes, default_window(frametimes));
    let stuttering: f64 = frametimes
        .iter()
        .zip(&trend)
        .filter(|(ft, smoothed)| **ft > factor * **smoothed)
        .map(|(ft, _)| ft)
        .sum();
    100.0 * stuttering / frametimes.iter().sum::<f64>()
}

/// Percentage of capture time spent in frames that do not stutter but still
/// render below `threshold` FPS.
#[must_use]
pub fn low_fps_time_percentage(frametimes: &[f64], factor: f64, threshold: f64) -> f64 {
    let trend = moving_average(frametimes, default_window(frametimes));
    let low: f64 = frametimes
        .iter()
        .zip(&trend)
        .filter(|(ft, smoothed)| **ft <= factor * **smoothed && 1_000.0 / **ft < threshold)
        .map(|(ft, _)| ft)
        .sum();
    100.0 * low / frametimes.iter().sum::<f64>()
}

fn thresholds(reversed: bool) -> impl Iterator<Item = f64> {
    let mut ordered = FPS_THRESHOLDS;
    if reversed {
        ordered.reverse();
    }
    ordered.into_iter()
}

/// For each of [`FPS_THRESHOLDS`], the number of frames below it.
///
/// When `reversed` the thresholds run lowest first and frames *above* each
/// threshold are counted.
#[must_use]
pub fn fps_threshold_counts(frametimes: &[f64], reversed: bool) -> Vec<usize> {
    thresholds(reversed)
        .map(|threshold| {
            frametimes
                .iter()
                .map(|ft| 1_000.0 / ft)
                .filter(|fps| if reversed { *fps > threshold } else { *fps < threshold })
                .count()
        })
        .collect()
}

/// For each of [`FPS_THRESHOLDS`], the milliseconds spent below it.
///
/// When `reversed` the thresholds run lowest first and time spent *above*
/// each threshold is summed.
#[must_use]
pub fn fps_threshold_times(frametimes: &[f64], reversed: bool) -> Vec<f64> {
    thresholds(reversed)
        .map(|threshold| {
            let limit = 1_000.0 / threshold;
            frametimes
                .iter()
                .filter(|ft| if reversed { **ft < limit } else { **ft > limit })
                .sum()
        })
        .collect()
}

/// Share of consecutive frame-to-frame changes falling under 2, 4, 8 and 12
/// ms, and at or above 12 ms, each rounded to four digits.
///
/// Changes are taken within each run, never across the boundary of two runs.
/// No runs at all yields an empty vector.
#[must_use]
pub fn frametime_variance_percentages<'a, I>(runs: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut buckets = [0usize; 5];
    let mut any_run = false;

    for run in runs {
        any_run = true;
        for pair in run.windows(2) {
            let delta = (pair[1] - pair[0]).abs();
            let bucket = if delta < 2.0 {
                0
            } else if delta < 4.0 {
                1
            } else if delta < 8.0 {
                2
            } else if delta < 12.0 {
                3
            } else {
                4
            };
            buckets[bucket] += 1;
        }
    }

    if !any_run {
        return Vec::new();
    }
    let total = buckets.iter().sum::<usize>() as f64;
    buckets
        .iter()
        .map(|count| crate::metric::round_to(*count as f64 / total, 4))
        .collect()
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn stuttering_count_against_mean() {
        // mean 20, limit 40
        let frametimes = [10.0, 10.0, 10.0, 50.0];
        assert!((stuttering_count_percentage(&frametimes, 2.0) - 25.0).abs() < 1e-10);
        assert!((online_stuttering_time_percentage(&frametimes, 2.0) - 62.5).abs() < 1e-10);
    }

    #[test]
    fn smooth_capture_does_not_stutter() {
        let frametimes = vec![16.6; 500];
        assert!(stuttering_time_percentage(&frametimes, 2.5).abs() < 1e-10);
        // 60.2 FPS is above a 30 FPS target.
        assert!(low_fps_time_percentage(&frametimes, 2.5, 30.0).abs() < 1e-10);
    }

    #[test]
    fn slow_but_steady_is_low_fps_time() {
        let frametimes = vec![50.0; 100];
        assert!((low_fps_time_percentage(&frametimes, 2.5, 30.0) - 100.0).abs() < 1e-10);
        assert!(stuttering_time_percentage(&frametimes, 2.5).abs() < 1e-10);
    }

    #[test]
    fn threshold_counts_both_directions() {
        // 100 FPS and 20 FPS
        let frametimes = [10.0, 50.0];
        let below = fps_threshold_counts(&frametimes, false);
        assert_eq!(below, vec![2, 2, 2, 1, 1, 1, 1, 1, 0, 0]);
        let above = fps_threshold_counts(&frametimes, true);
        assert_eq!(above, vec![2, 2, 1, 1, 1, 1, 1, 0, 0, 0]);

        let times = fps_threshold_times(&frametimes, false);
        assert!((times[0] - 60.0).abs() < 1e-10);
        assert!(times[9].abs() < 1e-10);
    }

    #[test]
    fn variance_buckets_stay_within_runs() {
        let first = [10.0, 11.0, 14.0];
        let second = [40.0, 60.0];
        let shares = frametime_variance_percentages([&first[..], &second[..]]);
        // deltas 1, 3 and 20; the 26 between runs is not counted
        assert_eq!(shares.len(), 5);
        assert!((shares[0] - 0.3333).abs() < 1e-10);
        assert!((shares[1] - 0.3333).abs() < 1e-10);
        assert!((shares[4] - 0.3333).abs() < 1e-10);
        assert!(frametime_variance_percentages(std::iter::empty::<&[f64]>()).is_empty());
    }
}
