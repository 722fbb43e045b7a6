//! Per-run reports and their aggregation
//!
//! Every run of a [`Session`] is analyzed on its own: the configured metrics,
//! stuttering figures and, when power channels are configured, efficiency.
//! Runs are then compared with each other to flag outliers and folded into a
//! single mean with standard error per summary value.

use std::sync::Arc;

use average::{Estimate, Max, Min, Variance, concatenate};
use framepace_stats::{
    Calculator, Metric, MetricAnalysis, PhysicalMetric, analysis::outlier_flags, outlier,
    stutter,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{Error, config::Config, session::Session};

/// Analysis of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Index of the run within its session.
    pub run: usize,
    /// Frames analyzed, after outlier removal.
    pub frame_count: usize,
    /// Average plus the two configured secondary metrics.
    pub analysis: MetricAnalysis,
    /// Every [`Metric`] in FPS, in [`Metric::ALL`] order.
    pub metrics: Vec<(Metric, f64)>,
    /// Percent of run time spent stuttering.
    pub stuttering_time: f64,
    /// Percent of run time spent below the low FPS threshold without
    /// stuttering.
    pub low_fps_time: f64,
    /// Average FPS per ten watts of CPU power, when a channel is configured.
    pub cpu_fps_per_watt: Option<f64>,
    /// Average FPS per ten watts of GPU power, when a channel is configured.
    pub gpu_fps_per_watt: Option<f64>,
    /// Whether this run strays too far from the run history median.
    pub outlier: bool,
}

fn mean(sequence: &[f64]) -> f64 {
    sequence.iter().sum::<f64>() / sequence.len() as f64
}

/// Analyze run `run` of `session`.
///
/// # Errors
///
/// Fails on a fault from the metric computation or when a configured power
/// channel cannot be resampled onto the frames.
pub fn analyze_run(session: &Session, run: usize, config: &Config) -> Result<RunReport, Error> {
    let Some(source) = session.runs.get(run) else {
        return Err(Error::NoSuchRun(run));
    };
    let calculator = Calculator::new(config.options());
    let raw = source.frametimes();
    let frametimes = outlier::adjust(&raw, config.outlier_policy);

    let display_times = config
        .use_display_change_metrics
        .then(|| source.display_times());
    let analysis = calculator.metric_analysis(
        &frametimes,
        display_times.as_deref(),
        config.second_metric,
        config.third_metric,
    )?;
    let metrics = Metric::ALL
        .into_iter()
        .map(|metric| Ok((metric, calculator.fps_metric(&frametimes, metric)?)))
        .collect::<Result<Vec<_>, framepace_stats::Error>>()?;

    let efficiency = |channel: Option<&String>, metric| -> Result<Option<f64>, Error> {
        let Some(channel) = channel else {
            return Ok(None);
        };
        let watts = mean(&source.power_per_frame(run, channel)?);
        Ok(Some(calculator.physical_metric(&frametimes, metric, watts)))
    };
    let cpu_fps_per_watt = efficiency(
        config.cpu_power_channel.as_ref(),
        PhysicalMetric::CpuFpsPerWatt,
    )?;
    let gpu_fps_per_watt = efficiency(
        config.gpu_power_channel.as_ref(),
        PhysicalMetric::GpuFpsPerWatt,
    )?;

    let report = RunReport {
        run,
        frame_count: frametimes.len(),
        analysis,
        metrics,
        stuttering_time: stutter::stuttering_time_percentage(
            &frametimes,
            config.stuttering_factor,
        ),
        low_fps_time: stutter::low_fps_time_percentage(
            &frametimes,
            config.stuttering_factor,
            config.low_fps_threshold,
        ),
        cpu_fps_per_watt,
        gpu_fps_per_watt,
        outlier: false,
    };
    debug!(run, summary = %report.analysis.summary, "analyzed run");
    Ok(report)
}

/// Analyze every run of `session` on the blocking pool and flag outliers
/// among them.
///
/// Reports come back in run order whatever order the analyses finish in.
///
/// # Errors
///
/// Fails if any single run fails, see [`analyze_run`], or an analysis task
/// panics.
pub async fn analyze_runs(
    session: Arc<Session>,
    config: Arc<Config>,
) -> Result<Vec<RunReport>, Error> {
    let handles: Vec<_> = (0..session.runs.len())
        .map(|run| {
            let session = Arc::clone(&session);
            let config = Arc::clone(&config);
            tokio::task::spawn_blocking(move || analyze_run(&session, run, &config))
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        reports.push(handle.await??);
    }

    let analyses: Vec<MetricAnalysis> = reports
        .iter()
        .map(|report| report.analysis.clone())
        .collect();
    let flags = outlier_flags(&analyses, config.related_metric, config.outlier_percentage);
    for (report, flag) in reports.iter_mut().zip(flags) {
        report.outlier = flag;
    }
    info!(
        runs = reports.len(),
        outliers = reports.iter().filter(|report| report.outlier).count(),
        "analyzed session"
    );
    Ok(reports)
}

concatenate!(
    Estimator,
    [Variance, variance, mean, error],
    [Min, min, min],
    [Max, max, max]
);

/// Mean of one value across runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spread {
    /// Mean across runs.
    pub mean: f64,
    /// Standard error of the mean.
    pub error: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
}

impl Spread {
    fn of<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let finite: Vec<f64> = values.into_iter().filter(|value| value.is_finite()).collect();
        if finite.is_empty() {
            return Self {
                mean: f64::NAN,
                error: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }
        let estimator: Estimator = finite.into_iter().collect();
        Self {
            mean: estimator.mean(),
            error: estimator.error(),
            min: estimator.min(),
            max: estimator.max(),
        }
    }
}

/// Summary values folded across runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregate {
    /// Runs folded in.
    pub runs: usize,
    /// Average FPS.
    pub average: Spread,
    /// Second metric.
    pub second: Spread,
    /// Third metric.
    pub third: Spread,
}

/// Fold `reports` into one [`Aggregate`]. With `exclude_outliers` runs
/// flagged as outliers are left out. Non-finite values never contribute.
#[must_use]
pub fn aggregate(reports: &[RunReport], exclude_outliers: bool) -> Aggregate {
    let included: Vec<&MetricAnalysis> = reports
        .iter()
        .filter(|report| !(exclude_outliers && report.outlier))
        .map(|report| &report.analysis)
        .collect();
    Aggregate {
        runs: included.len(),
        average: Spread::of(included.iter().map(|analysis| analysis.average)),
        second: Spread::of(included.iter().map(|analysis| analysis.second)),
        third: Spread::of(included.iter().map(|analysis| analysis.third)),
    }
}
