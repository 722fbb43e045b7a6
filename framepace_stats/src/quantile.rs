//! Rank based quantiles
//!
//! Quantiles follow the R-7 definition. For a sorted copy `x` of `n` values and
//! probability `p` the rank is `h = p * (n - 1)` and the quantile blends
//! linearly between `x[floor(h)]` and `x[ceil(h)]`. Callers' slices are never
//! reordered; sorting always happens on a copy.
//!
//! An empty sequence has no quantile. Rather than erroring, every function here
//! returns `NaN` in that case, the same signal used for any other undefined
//! statistic in this crate.

/// Return a copy of `sequence` sorted in ascending order.
pub(crate) fn sorted(sequence: &[f64]) -> Vec<f64> {
    let mut copy = sequence.to_vec();
    copy.sort_unstable_by(f64::total_cmp);
    copy
}

/// R-7 quantile of an already sorted slice.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 || p.is_nan() {
        return f64::NAN;
    }
    let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = rank.floor();
    let fraction = rank - lower;
    let lo = lower as usize;
    let hi = rank.ceil() as usize;

    // Blending two equal infinities would produce NaN.
    if lo == hi || fraction == 0.0 {
        return sorted[lo];
    }
    sorted[lo] + fraction * (sorted[hi] - sorted[lo])
}

/// Compute the `p` quantile of `sequence`, `p` in `[0, 1]`.
///
/// Values of `p` outside the unit interval are clamped. Returns `NaN` for an
/// empty sequence.
#[must_use]
pub fn quantile(sequence: &[f64], p: f64) -> f64 {
    quantile_sorted(&sorted(sequence), p)
}

fn mean_where<F>(sequence: &[f64], predicate: F) -> f64
where
    F: Fn(f64) -> bool,
{
    let (sum, count) = sequence
        .iter()
        .copied()
        .filter(|value| predicate(*value))
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Arithmetic mean of every element less than or equal to the `p` quantile.
///
/// Returns `NaN` when no element qualifies.
#[must_use]
pub fn average_below(sequence: &[f64], p: f64) -> f64 {
    let threshold = quantile(sequence, p);
    mean_where(sequence, |value| value <= threshold)
}

/// Arithmetic mean of every element greater than or equal to the `p` quantile.
///
/// With frametimes and `p = 0.99` this is the mean duration of the slowest 1%
/// of frames. Returns `NaN` when no element qualifies.
#[must_use]
pub fn average_above(sequence: &[f64], p: f64) -> f64 {
    let threshold = quantile(sequence, p);
    mean_where(sequence, |value| value >= threshold)
}

/// Time-weighted counterpart of [`average_above`].
///
/// Sorts a copy in descending order and walks it, accumulating values until the
/// running sum reaches `(1 - p)` of the total. The element at which that
/// happens is returned. For frametimes this is the duration separating the
/// slowest `1 - p` share of *time* from the rest, matching the "x% low" figure
/// some overlay tools report. Returns `NaN` for an empty sequence.
#[must_use]
pub fn integral_high(sequence: &[f64], p: f64) -> f64 {
    let mut descending = sorted(sequence);
    descending.reverse();

    let total: f64 = descending.iter().sum();
    let budget = total * (1.0 - p);

    let mut running = 0.0;
    for value in &descending {
        running += value;
        if running >= budget {
            return *value;
        }
    }
    descending.last().copied().unwrap_or(f64::NAN)
}
