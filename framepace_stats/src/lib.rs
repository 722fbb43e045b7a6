//! Frametime statistics for framepace
//!
//! This library computes comparable performance figures from a sequence of
//! per-frame durations in milliseconds: rank quantiles, FPS metrics such as
//! "1% low", adaptive jitter against a local moving average and a data-driven
//! frametime distribution. Every entry point is a pure function over a
//! caller-owned slice. Configuration travels as an explicit [`Options`] value
//! held by a [`Calculator`].
//!
//! Numerically undefined results, for instance the average of an empty subset
//! or the FPS of a zero-length frame, are reported as `NaN` or infinity and are
//! never errors. The only faults surfaced through [`Error`] are data-integrity
//! problems and explicit precondition violations.

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

pub mod analysis;
pub mod deviation;
pub mod distribution;
pub mod metric;
pub mod moving_average;
pub mod outlier;
pub mod quantile;
pub mod stutter;

pub use analysis::{MetricAnalysis, RelatedMetric};
pub use distribution::Bin;
pub use metric::{Calculator, Metric, Options, PhysicalMetric, render};
pub use outlier::Policy;

/// Errors produced by this crate.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A sequence derived from a source sequence does not have the source's
    /// length. This is a programming error upstream and computation must stop.
    #[error("Derived sequence has {actual} samples, source has {expected}")]
    LengthMismatch {
        /// Length of the source sequence
        expected: usize,
        /// Length of the derived sequence
        actual: usize,
    },
    /// The operation is undefined for an empty sequence.
    #[error("Sequence is empty")]
    EmptySequence,
    /// No [`Metric`] carries the given name.
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
}
