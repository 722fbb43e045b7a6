//! Named performance metrics
//!
//! A [`Metric`] names one figure computed from a sequence of frametimes in
//! milliseconds. [`Calculator::fps_metric`] reports the figure in frames per
//! second, [`Calculator::frametime_metric`] in milliseconds.
//!
//! The FPS domain is not a simple mirror of the frametime domain, and the
//! difference matters when figures are compared with other tools:
//!
//! * `Average` is `n * 1000 / sum(frametimes)`, the frame count over elapsed
//!   time. It is *not* the mean of per-frame FPS, which over-weights fast
//!   frames.
//! * Percentiles and extrema convert every frametime to instantaneous FPS
//!   first and then take the statistic of the FPS sequence. Because FPS falls
//!   as frametime rises, FPS `P1` describes the slow end of the capture.
//! * The "low" metrics average the slowest frames in the frametime domain and
//!   convert only that average, so "1% low" is the FPS of the mean duration of
//!   the slowest 1% of frames, not a percentile.

use std::{fmt, num::NonZeroUsize, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    deviation::adaptive_std,
    quantile::{average_above, integral_high, quantile},
};

/// Default number of decimal digits metric values are rounded to.
pub const DEFAULT_ROUNDING_DIGITS: u8 = 2;
/// Default moving average window, in samples, for [`Metric::AdaptiveStd`].
pub const DEFAULT_MOVING_AVERAGE_WINDOW: usize = 1_000;

fn default_rounding_digits() -> u8 {
    DEFAULT_ROUNDING_DIGITS
}

fn default_moving_average_window() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_MOVING_AVERAGE_WINDOW).unwrap_or(NonZeroUsize::MIN)
}

/// Options for a [`Calculator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Options {
    /// Decimal digits every metric value is rounded to, half away from zero.
    #[serde(default = "default_rounding_digits")]
    pub rounding_digits: u8,
    /// Window, in samples, of the moving average behind
    /// [`Metric::AdaptiveStd`].
    #[serde(default = "default_moving_average_window")]
    pub moving_average_window: NonZeroUsize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            rounding_digits: default_rounding_digits(),
            moving_average_window: default_moving_average_window(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
/// A named performance figure computed over a frametime sequence.
pub enum Metric {
    /// Highest instantaneous FPS.
    #[serde(rename = "max")]
    Max,
    /// 99th percentile of instantaneous FPS.
    #[serde(rename = "p99")]
    P99,
    /// 95th percentile of instantaneous FPS.
    #[serde(rename = "p95")]
    P95,
    /// Frame count over elapsed time.
    #[serde(rename = "average")]
    Average,
    /// Median of instantaneous FPS.
    #[serde(rename = "median")]
    Median,
    /// 5th percentile of instantaneous FPS.
    #[serde(rename = "p5")]
    P5,
    /// 1st percentile of instantaneous FPS.
    #[serde(rename = "p1")]
    P1,
    /// 0.2th percentile of instantaneous FPS.
    #[serde(rename = "p0.2")]
    P0Dot2,
    /// 0.1th percentile of instantaneous FPS.
    #[serde(rename = "p0.1")]
    P0Dot1,
    /// FPS of the mean frametime of the slowest 1% of frames.
    #[serde(rename = "one_percent_low")]
    OnePercentLow,
    /// FPS of the mean frametime of the slowest 0.2% of frames.
    #[serde(rename = "point_two_percent_low")]
    PointTwoPercentLow,
    /// FPS of the mean frametime of the slowest 0.1% of frames.
    #[serde(rename = "point_one_percent_low")]
    PointOnePercentLow,
    /// FPS of the frametime bounding the slowest 1% of capture time.
    #[serde(rename = "one_percent_low_integral")]
    OnePercentLowIntegral,
    /// FPS of the frametime bounding the slowest 0.2% of capture time.
    #[serde(rename = "point_two_percent_low_integral")]
    PointTwoPercentLowIntegral,
    /// FPS of the frametime bounding the slowest 0.1% of capture time.
    #[serde(rename = "point_one_percent_low_integral")]
    PointOnePercentLowIntegral,
    /// Lowest instantaneous FPS.
    #[serde(rename = "min")]
    Min,
    /// Standard deviation against a trailing moving average.
    #[serde(rename = "adaptive_std")]
    AdaptiveStd,
}

impl Metric {
    /// Every metric, in report order.
    pub const ALL: [Metric; 17] = [
        Metric::Max,
        Metric::P99,
        Metric::P95,
        Metric::Average,
        Metric::Median,
        Metric::P5,
        Metric::P1,
        Metric::P0Dot2,
        Metric::P0Dot1,
        Metric::OnePercentLow,
        Metric::PointTwoPercentLow,
        Metric::PointOnePercentLow,
        Metric::OnePercentLowIntegral,
        Metric::PointTwoPercentLowIntegral,
        Metric::PointOnePercentLowIntegral,
        Metric::Min,
        Metric::AdaptiveStd,
    ];

    /// Stable machine name, identical to the serialized form.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Metric::Max => "max",
            Metric::P99 => "p99",
            Metric::P95 => "p95",
            Metric::Average => "average",
            Metric::Median => "median",
            Metric::P5 => "p5",
            Metric::P1 => "p1",
            Metric::P0Dot2 => "p0.2",
            Metric::P0Dot1 => "p0.1",
            Metric::OnePercentLow => "one_percent_low",
            Metric::PointTwoPercentLow => "point_two_percent_low",
            Metric::PointOnePercentLow => "point_one_percent_low",
            Metric::OnePercentLowIntegral => "one_percent_low_integral",
            Metric::PointTwoPercentLowIntegral => "point_two_percent_low_integral",
            Metric::PointOnePercentLowIntegral => "point_one_percent_low_integral",
            Metric::Min => "min",
            Metric::AdaptiveStd => "adaptive_std",
        }
    }

    /// Human readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Metric::Max => "Maximum",
            Metric::P99 => "99% percentile",
            Metric::P95 => "95% percentile",
            Metric::Average => "Average",
            Metric::Median => "Median",
            Metric::P5 => "5% percentile",
            Metric::P1 => "1% percentile",
            Metric::P0Dot2 => "0.2% percentile",
            Metric::P0Dot1 => "0.1% percentile",
            Metric::OnePercentLow => "1% low average",
            Metric::PointTwoPercentLow => "0.2% low average",
            Metric::PointOnePercentLow => "0.1% low average",
            Metric::OnePercentLowIntegral => "1% low integral",
            Metric::PointTwoPercentLowIntegral => "0.2% low integral",
            Metric::PointOnePercentLowIntegral => "0.1% low integral",
            Metric::Min => "Minimum",
            Metric::AdaptiveStd => "Adaptive STDEV",
        }
    }

    /// Abbreviation used in one-line summaries.
    #[must_use]
    pub const fn short_description(self) -> &'static str {
        match self {
            Metric::Max => "Max",
            Metric::P99 => "P99",
            Metric::P95 => "P95",
            Metric::Average => "Avg",
            Metric::Median => "Med",
            Metric::P5 => "P5",
            Metric::P1 => "P1",
            Metric::P0Dot2 => "P0.2",
            Metric::P0Dot1 => "P0.1",
            Metric::OnePercentLow => "1% Low Avg",
            Metric::PointTwoPercentLow => "0.2% Low Avg",
            Metric::PointOnePercentLow => "0.1% Low Avg",
            Metric::OnePercentLowIntegral => "1% Low Int",
            Metric::PointTwoPercentLowIntegral => "0.2% Low Int",
            Metric::PointOnePercentLowIntegral => "0.1% Low Int",
            Metric::Min => "Min",
            Metric::AdaptiveStd => "Adp STDEV",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = Error;

    /// Parse a metric from its machine name, case-insensitively.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        Metric::ALL
            .into_iter()
            .find(|metric| metric.name().eq_ignore_ascii_case(input))
            .ok_or_else(|| Error::UnknownMetric(input.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "snake_case")]
/// Efficiency figures relating frame rate to measured power draw.
pub enum PhysicalMetric {
    /// Average FPS per ten watts of CPU package power.
    CpuFpsPerWatt,
    /// Average FPS per ten watts of GPU board power.
    GpuFpsPerWatt,
}

impl PhysicalMetric {
    /// Human readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            PhysicalMetric::CpuFpsPerWatt => "CPU FPS per 10 Watts",
            PhysicalMetric::GpuFpsPerWatt => "GPU FPS per 10 Watts",
        }
    }

    /// Abbreviation used in one-line summaries.
    #[must_use]
    pub const fn short_description(self) -> &'static str {
        match self {
            PhysicalMetric::CpuFpsPerWatt => "CPU FPS/10W",
            PhysicalMetric::GpuFpsPerWatt => "GPU FPS/10W",
        }
    }
}

/// Round `value` to `digits` decimal places, half away from zero. Non-finite
/// values pass through so `NaN` is never disguised as a number.
#[must_use]
pub fn round_to(value: f64, digits: u8) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(i32::from(digits));
    (value * scale).round() / scale
}

/// Format `value` with exactly `digits` decimals, or `n/a` when it is not
/// finite.
#[must_use]
pub fn render(value: f64, digits: u8) -> String {
    if value.is_finite() {
        format!("{value:.prec$}", prec = usize::from(digits))
    } else {
        "n/a".to_string()
    }
}

fn to_fps(frametimes: &[f64]) -> Vec<f64> {
    frametimes.iter().map(|frametime| 1_000.0 / frametime).collect()
}

fn max(sequence: &[f64]) -> f64 {
    if sequence.is_empty() {
        return f64::NAN;
    }
    sequence.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn min(sequence: &[f64]) -> f64 {
    if sequence.is_empty() {
        return f64::NAN;
    }
    sequence.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Frame count over elapsed time, in FPS.
fn average_fps(frametimes: &[f64]) -> f64 {
    frametimes.len() as f64 * 1_000.0 / frametimes.iter().sum::<f64>()
}

/// Computes [`Metric`] values under a fixed set of [`Options`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calculator {
    options: Options,
}

impl Calculator {
    /// Create a new [`Calculator`].
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// The options this calculator was built with.
    #[must_use]
    pub fn options(&self) -> Options {
        self.options
    }

    /// Compute `metric` in frames per second from `frametimes` in ms.
    ///
    /// An empty sequence yields `NaN`. Zero frametimes yield infinities. The
    /// result is rounded to [`Options::rounding_digits`].
    ///
    /// # Errors
    ///
    /// Only [`Metric::AdaptiveStd`] can fail, with
    /// [`Error::LengthMismatch`].
    pub fn fps_metric(&self, frametimes: &[f64], metric: Metric) -> Result<f64, Error> {
        if frametimes.is_empty() {
            return Ok(f64::NAN);
        }

        let fps = || to_fps(frametimes);
        let value = match metric {
            Metric::Average => average_fps(frametimes),
            Metric::Max => max(&fps()),
            Metric::Min => min(&fps()),
            Metric::P99 => quantile(&fps(), 0.99),
            Metric::P95 => quantile(&fps(), 0.95),
            Metric::Median => quantile(&fps(), 0.5),
            Metric::P5 => quantile(&fps(), 0.05),
            Metric::P1 => quantile(&fps(), 0.01),
            Metric::P0Dot2 => quantile(&fps(), 0.002),
            Metric::P0Dot1 => quantile(&fps(), 0.001),
            Metric::OnePercentLow => 1_000.0 / average_above(frametimes, 0.99),
            Metric::PointTwoPercentLow => 1_000.0 / average_above(frametimes, 0.998),
            Metric::PointOnePercentLow => 1_000.0 / average_above(frametimes, 0.999),
            Metric::OnePercentLowIntegral => 1_000.0 / integral_high(frametimes, 0.99),
            Metric::PointTwoPercentLowIntegral => 1_000.0 / integral_high(frametimes, 0.998),
            Metric::PointOnePercentLowIntegral => 1_000.0 / integral_high(frametimes, 0.999),
            Metric::AdaptiveStd => adaptive_std(&fps(), self.options.moving_average_window)?,
        };

        Ok(round_to(value, self.options.rounding_digits))
    }

    /// Compute `metric` in milliseconds from `frametimes` in ms.
    ///
    /// Percentile metrics keep their FPS meaning: `P99` here is the frametime
    /// at the 1st percentile, the duration a P99 FPS figure corresponds to.
    /// `Average` is the arithmetic mean frametime and the "low" metrics are
    /// frametimes, not inverted.
    ///
    /// # Errors
    ///
    /// Only [`Metric::AdaptiveStd`] can fail, with
    /// [`Error::LengthMismatch`].
    pub fn frametime_metric(&self, frametimes: &[f64], metric: Metric) -> Result<f64, Error> {
        if frametimes.is_empty() {
            return Ok(f64::NAN);
        }

        let value = match metric {
            Metric::Average => frametimes.iter().sum::<f64>() / frametimes.len() as f64,
            Metric::Max => max(frametimes),
            Metric::Min => min(frametimes),
            Metric::P99 => quantile(frametimes, 0.01),
            Metric::P95 => quantile(frametimes, 0.05),
            Metric::Median => quantile(frametimes, 0.5),
            Metric::P5 => quantile(frametimes, 0.95),
            Metric::P1 => quantile(frametimes, 0.99),
            Metric::P0Dot2 => quantile(frametimes, 0.998),
            Metric::P0Dot1 => quantile(frametimes, 0.999),
            Metric::OnePercentLow => average_above(frametimes, 0.99),
            Metric::PointTwoPercentLow => average_above(frametimes, 0.998),
            Metric::PointOnePercentLow => average_above(frametimes, 0.999),
            Metric::OnePercentLowIntegral => integral_high(frametimes, 0.99),
            Metric::PointTwoPercentLowIntegral => integral_high(frametimes, 0.998),
            Metric::PointOnePercentLowIntegral => integral_high(frametimes, 0.999),
            Metric::AdaptiveStd => adaptive_std(frametimes, self.options.moving_average_window)?,
        };

        Ok(round_to(value, self.options.rounding_digits))
    }

    /// Compute an efficiency figure: average FPS per ten watts of `watts`.
    ///
    /// Yields `0` when `watts` is not positive, since no meaningful power
    /// reading exists. Always rounded to two digits.
    #[must_use]
    pub fn physical_metric(&self, frametimes: &[f64], metric: PhysicalMetric, watts: f64) -> f64 {
        let value = match metric {
            PhysicalMetric::CpuFpsPerWatt | PhysicalMetric::GpuFpsPerWatt => {
                if watts > 0.0 {
                    average_fps(frametimes) / watts * 10.0
                } else {
                    0.0
                }
            }
        };
        round_to(value, 2)
    }
}
