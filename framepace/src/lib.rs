//! The framepace capture analysis library
//!
//! This library loads captured benchmark sessions, resamples power
//! measurements onto the presented frames and reports per-run and aggregate
//! frametime metrics for the `frametool` binary.

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

pub mod capture;
pub mod config;
pub mod report;
pub mod session;

/// Errors produced by this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Metric computation failed.
    #[error(transparent)]
    Stats(#[from] framepace_stats::Error),
    /// Sample alignment failed.
    #[error(transparent)]
    Align(#[from] framepace_align::Error),
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] config::Error),
    /// Capture could not be loaded.
    #[error(transparent)]
    Capture(#[from] capture::Error),
    /// A background analysis task failed to complete.
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    /// The session has no run with this index.
    #[error("No run {0} in session")]
    NoSuchRun(usize),
    /// A run lacks the requested power channel.
    #[error("Run {run} has no power channel {channel:?}")]
    MissingChannel {
        /// Index of the run
        run: usize,
        /// Requested channel
        channel: String,
    },
    /// A run has frames without a performance counter, so power samples
    /// cannot be placed on them.
    #[error("Run {run} has frames without a counter")]
    MissingCounters {
        /// Index of the run
        run: usize,
    },
}
