//! Frametime analysis tool for framepace capture files.

#![allow(clippy::print_stdout)]

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand};
use framepace::{
    capture,
    config::Config,
    report::{self, Spread},
    session::Session,
};
use framepace_stats::{Calculator, Metric, distribution, outlier, render, stutter};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,

    /// Path to a YAML configuration file. Defaults apply when absent.
    #[clap(long)]
    config_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every metric over a time window of the whole session
    Metrics {
        /// Path to capture file
        capture_path: PathBuf,
        /// Window start, seconds
        #[clap(long, default_value_t = 0.0)]
        start: f64,
        /// Window end, seconds. Defaults to the end of the session.
        #[clap(long)]
        end: Option<f64>,
        /// Select frames by index instead: skip this many from the start
        #[clap(long, conflicts_with_all = ["start", "end"])]
        skip: Option<usize>,
        /// Select frames by index instead: leave out this many at the end
        #[clap(long, conflicts_with_all = ["start", "end"])]
        trim: Option<usize>,
        /// Report frametimes in ms instead of FPS
        #[clap(long)]
        frametime: bool,
    },
    /// Analyze each run, flag outliers and aggregate
    Analyze {
        /// Path to capture file
        capture_path: PathBuf,
        /// Leave outlier runs out of the aggregate
        #[clap(long)]
        exclude_outliers: bool,
    },
    /// Print the frametime distribution
    Distribution {
        /// Path to capture file
        capture_path: PathBuf,
    },
    /// Print stuttering and frame rate threshold figures
    Stutter {
        /// Path to capture file
        capture_path: PathBuf,
    },
    /// Print input lag estimates and the share of time in a sync range
    Latency {
        /// Path to capture file
        capture_path: PathBuf,
        /// Lower bound of the variable refresh range, Hz
        #[clap(long, default_value_t = 48)]
        sync_lower: i64,
        /// Upper bound of the variable refresh range, Hz
        #[clap(long, default_value_t = 144)]
        sync_upper: i64,
    },
    /// Print a power channel resampled onto the frames
    Power {
        /// Path to capture file
        capture_path: PathBuf,
        /// Power channel name
        #[clap(long)]
        channel: String,
    },
    /// Validate that a capture file is well-formed
    Validate {
        /// Path to capture file
        capture_path: PathBuf,
    },
}

/// Errors that can occur while running frametool.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The capture failed validation.
    #[error("Capture is invalid")]
    InvalidCapture,
    /// Analysis failed.
    #[error(transparent)]
    Framepace(#[from] framepace::Error),
}

fn render_spread(name: &str, spread: &Spread, digits: u8) -> String {
    format!(
        "{name}: {} (+- {}), min {}, max {}",
        render(spread.mean, digits),
        render(spread.error, digits),
        render(spread.min, digits),
        render(spread.max, digits)
    )
}

async fn load(path: &Path) -> Result<Session, Error> {
    capture::load(path)
        .await
        .map_err(|err| Error::Framepace(err.into()))
}

/// Frames the metrics subcommand reports on.
#[derive(Debug, Clone, Copy)]
enum Window {
    Time { start: f64, end: f64 },
    Samples { skip: usize, trim: usize },
}

fn print_metrics(
    session: &Session,
    config: &Config,
    window: Window,
    frametime: bool,
) -> Result<(), Error> {
    let frametimes = match window {
        Window::Time { start, end } => session.frametime_window(start, end, config.outlier_policy),
        Window::Samples { skip, trim } => {
            session.frametime_sample_window(skip, trim, config.outlier_policy)
        }
    };
    info!(frames = frametimes.len(), ?window, "metrics window");
    let calculator = Calculator::new(config.options());
    let unit = if frametime { "ms" } else { "FPS" };
    for metric in Metric::ALL {
        let value = if frametime {
            calculator.frametime_metric(&frametimes, metric)
        } else {
            calculator.fps_metric(&frametimes, metric)
        }
        .map_err(framepace::Error::from)?;
        println!(
            "{:<24} {} {unit}",
            metric.description(),
            render(value, config.rounding_digits)
        );
    }
    Ok(())
}

async fn analyze(session: Session, config: Config, exclude_outliers: bool) -> Result<(), Error> {
    let digits = config.rounding_digits;
    let reports = report::analyze_runs(Arc::new(session), Arc::new(config)).await?;
    for report in &reports {
        let marker = if report.outlier { " [outlier]" } else { "" };
        println!(
            "run {}: {} frames, {}, stuttering {}%, low FPS {}%{marker}",
            report.run,
            report.frame_count,
            report.analysis.summary,
            render(report.stuttering_time, digits),
            render(report.low_fps_time, digits),
        );
        if let Some(value) = report.cpu_fps_per_watt {
            println!("  CPU FPS/10W {}", render(value, digits));
        }
        if let Some(value) = report.gpu_fps_per_watt {
            println!("  GPU FPS/10W {}", render(value, digits));
        }
    }

    let aggregate = report::aggregate(&reports, exclude_outliers);
    println!("aggregate of {} runs", aggregate.runs);
    println!("{}", render_spread("average", &aggregate.average, digits));
    println!("{}", render_spread("second", &aggregate.second, digits));
    println!("{}", render_spread("third", &aggregate.third, digits));
    Ok(())
}

fn print_distribution(session: &Session, config: &Config) -> Result<(), Error> {
    let raw = session.frametimes();
    let frametimes = outlier::adjust(&raw, config.outlier_policy);
    let bins =
        distribution::discrete_distribution(&frametimes).map_err(framepace::Error::from)?;
    for bin in bins {
        println!(
            "[{}, {}] ms: {}",
            render(bin.lower, config.rounding_digits),
            render(bin.upper, config.rounding_digits),
            bin.len()
        );
    }
    Ok(())
}

fn print_stutter(session: &Session, config: &Config) {
    let digits = config.rounding_digits;
    let frametimes = session.frametimes();
    let factor = config.stuttering_factor;
    println!(
        "stuttering frames {}%",
        render(stutter::stuttering_count_percentage(&frametimes, factor), digits)
    );
    println!(
        "stuttering time {}%",
        render(stutter::stuttering_time_percentage(&frametimes, factor), digits)
    );
    println!(
        "stuttering time against the session mean {}%",
        render(
            stutter::online_stuttering_time_percentage(&frametimes, factor),
            digits
        )
    );
    println!(
        "low FPS time (< {} FPS) {}%",
        config.low_fps_threshold,
        render(
            stutter::low_fps_time_percentage(&frametimes, factor, config.low_fps_threshold),
            digits
        )
    );
    let counts = stutter::fps_threshold_counts(&frametimes, false);
    let times = stutter::fps_threshold_times(&frametimes, false);
    for ((threshold, count), time) in stutter::FPS_THRESHOLDS.iter().zip(counts).zip(times) {
        println!("< {threshold} FPS: {count} frames, {} ms", render(time, digits));
    }
    let runs: Vec<Vec<f64>> = session.runs.iter().map(|run| run.frametimes()).collect();
    let shares = stutter::frametime_variance_percentages(runs.iter().map(Vec::as_slice));
    for (label, share) in ["< 2 ms", "< 4 ms", "< 8 ms", "< 12 ms", ">= 12 ms"]
        .into_iter()
        .zip(shares)
    {
        println!("frametime change {label}: {}", render(share, 4));
    }
}

fn print_latency(
    session: &Session,
    config: &Config,
    sync_lower: i64,
    sync_upper: i64,
) -> Result<(), Error> {
    let digits = config.rounding_digits;
    let calculator = Calculator::new(config.options());
    for (name, lags) in [
        ("approximate", session.approx_input_lag()),
        ("upper bound", session.upper_bound_input_lag()),
        ("lower bound", session.lower_bound_input_lag()),
    ] {
        // Frametime domain metrics: P1 is the slow 99th percentile.
        let average = calculator
            .frametime_metric(&lags, Metric::Average)
            .map_err(framepace::Error::from)?;
        let slow = calculator
            .frametime_metric(&lags, Metric::P1)
            .map_err(framepace::Error::from)?;
        println!(
            "input lag {name}: avg {} ms, 99th percentile {} ms",
            render(average, digits),
            render(slow, digits)
        );
    }
    println!(
        "display changes within {sync_lower}-{sync_upper} Hz: {}%",
        render(
            session.sync_range_share(sync_lower, sync_upper) * 100.0,
            digits
        )
    );
    Ok(())
}

fn print_power(session: &Session, config: &Config, channel: &str) -> Result<(), Error> {
    let power = session.power_per_frame(channel)?;
    let frametimes = session.frametimes();
    for (frametime, watts) in frametimes.iter().zip(&power) {
        println!(
            "{} ms {} W",
            render(*frametime, config.rounding_digits),
            render(*watts, config.rounding_digits)
        );
    }
    Ok(())
}

fn validate(session: &Session) -> Result<(), Error> {
    let result = session.validate();
    println!(
        "{} runs, {} frames: {} frametime, {} start time, {} counter errors",
        result.run_count,
        result.frame_count,
        result.frametime_errors,
        result.start_time_errors,
        result.counter_errors
    );
    if let Some((run, frame, message)) = &result.first_error {
        error!("First error in run {run}, frame {frame}: {message}");
    }
    if result.is_valid() {
        info!("Capture is valid");
        Ok(())
    } else {
        Err(Error::InvalidCapture)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::FULL)
        .with_ansi(false)
        .finish()
        .init();

    info!("Welcome to frametool");
    let args = Args::parse();

    let config = match &args.config_path {
        Some(path) => Config::try_from_path(path).map_err(framepace::Error::from)?,
        None => Config::default(),
    };

    match args.command {
        Command::Metrics {
            capture_path,
            start,
            end,
            skip,
            trim,
            frametime,
        } => {
            let session = load(&capture_path).await?;
            let window = if skip.is_some() || trim.is_some() {
                Window::Samples {
                    skip: skip.unwrap_or(0),
                    trim: trim.unwrap_or(0),
                }
            } else {
                Window::Time {
                    start,
                    end: end.unwrap_or(f64::INFINITY),
                }
            };
            print_metrics(&session, &config, window, frametime)?;
        }
        Command::Analyze {
            capture_path,
            exclude_outliers,
        } => {
            let session = load(&capture_path).await?;
            analyze(session, config, exclude_outliers).await?;
        }
        Command::Distribution { capture_path } => {
            let session = load(&capture_path).await?;
            print_distribution(&session, &config)?;
        }
        Command::Stutter { capture_path } => {
            let session = load(&capture_path).await?;
            print_stutter(&session, &config);
        }
        Command::Latency {
            capture_path,
            sync_lower,
            sync_upper,
        } => {
            let session = load(&capture_path).await?;
            print_latency(&session, &config, sync_lower, sync_upper)?;
        }
        Command::Power {
            capture_path,
            channel,
        } => {
            let session = load(&capture_path).await?;
            print_power(&session, &config, &channel)?;
        }
        Command::Validate { capture_path } => {
            let session = load(&capture_path).await?;
            validate(&session)?;
        }
    }

    info!("Bye. :)");
    Ok(())
}
