//! This module controls configuration parsing from the end user. Every field
//! is optional in the YAML file and falls back to the defaults documented on
//! [`Config`].
use std::{
    fs,
    io,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use framepace_stats::{
    Metric, Options, Policy, RelatedMetric,
    metric::{DEFAULT_MOVING_AVERAGE_WINDOW, DEFAULT_ROUNDING_DIGITS},
};
use serde::Deserialize;
use tracing::{debug, error, warn};

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// A numeric setting is outside of its meaningful range
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive {
        /// Name of the offending setting
        field: &'static str,
        /// Value as configured
        value: f64,
    },
}

fn default_rounding_digits() -> u8 {
    DEFAULT_ROUNDING_DIGITS
}

fn default_moving_average_window() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_MOVING_AVERAGE_WINDOW).unwrap_or(NonZeroUsize::MIN)
}

fn default_stuttering_factor() -> f64 {
    2.5
}

fn default_low_fps_threshold() -> f64 {
    25.0
}

#[allow(clippy::unnecessary_wraps)]
fn default_second_metric() -> Option<Metric> {
    Some(Metric::P1)
}

#[allow(clippy::unnecessary_wraps)]
fn default_third_metric() -> Option<Metric> {
    Some(Metric::P0Dot2)
}

fn default_outlier_percentage() -> f64 {
    3.0
}

/// Main configuration struct for this program
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Decimal digits metric values are rounded to. Default 2.
    #[serde(default = "default_rounding_digits")]
    pub rounding_digits: u8,
    /// Moving average window of the adaptive standard deviation, in frames.
    /// Default 1000.
    #[serde(default = "default_moving_average_window")]
    pub moving_average_window: NonZeroUsize,
    /// A frame stutters when it is slower than this multiple of the typical
    /// frametime. Default 2.5.
    #[serde(default = "default_stuttering_factor")]
    pub stuttering_factor: f64,
    /// Frame rate below which non-stuttering time counts as low FPS time.
    /// Default 25.
    #[serde(default = "default_low_fps_threshold")]
    pub low_fps_threshold: f64,
    /// Second metric of every run summary. Default `p1`, `null` for none.
    #[serde(default = "default_second_metric")]
    pub second_metric: Option<Metric>,
    /// Third metric of every run summary. Default `p0.2`, `null` for none.
    #[serde(default = "default_third_metric")]
    pub third_metric: Option<Metric>,
    /// Compute the second and third metric over display change intervals
    /// rather than frametimes. Default `false`.
    #[serde(default)]
    pub use_display_change_metrics: bool,
    /// Summary value run history outliers are judged on. Default `average`.
    #[serde(default)]
    pub related_metric: RelatedMetric,
    /// Percent deviation from the run history median beyond which a run is an
    /// outlier. Default 3.
    #[serde(default = "default_outlier_percentage")]
    pub outlier_percentage: f64,
    /// Removal of pathological frames before any metric is computed. Default
    /// `none`.
    #[serde(default)]
    pub outlier_policy: Policy,
    /// Power channel holding CPU package power, if any.
    #[serde(default)]
    pub cpu_power_channel: Option<String>,
    /// Power channel holding GPU board power, if any.
    #[serde(default)]
    pub gpu_power_channel: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rounding_digits: default_rounding_digits(),
            moving_average_window: default_moving_average_window(),
            stuttering_factor: default_stuttering_factor(),
            low_fps_threshold: default_low_fps_threshold(),
            second_metric: default_second_metric(),
            third_metric: default_third_metric(),
            use_display_change_metrics: false,
            related_metric: RelatedMetric::default(),
            outlier_percentage: default_outlier_percentage(),
            outlier_policy: Policy::default(),
            cpu_power_channel: None,
            gpu_power_channel: None,
        }
    }
}

impl Config {
    /// Parse a [`Config`] from YAML text.
    ///
    /// # Errors
    ///
    /// Function will error if the text is not a valid configuration or a
    /// numeric setting is out of range.
    pub fn from_yaml(contents: &str) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_str(contents).map_err(|err| {
            error!("Configuration validation failed: {err}");
            Error::SerdeYaml(err)
        })?;
        config.check()?;
        if !config.outlier_policy.is_implemented() {
            warn!(
                policy = ?config.outlier_policy,
                "Outlier policy is not implemented, frames pass through unfiltered"
            );
        }
        Ok(config)
    }

    /// Read and parse the YAML configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Function will error if the file cannot be read or does not hold a
    /// valid configuration.
    pub fn try_from_path(path: &Path) -> Result<Self, Error> {
        debug!("Attempting to open configuration file at: {}", path.display());
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        Self::from_yaml(&contents)
    }

    fn check(&self) -> Result<(), Error> {
        for (field, value) in [
            ("stuttering_factor", self.stuttering_factor),
            ("low_fps_threshold", self.low_fps_threshold),
            ("outlier_percentage", self.outlier_percentage),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::NotPositive { field, value });
            }
        }
        Ok(())
    }

    /// The metric computation options carried by this configuration.
    #[must_use]
    pub fn options(&self) -> Options {
        Options {
            rounding_digits: self.rounding_digits,
            moving_average_window: self.moving_average_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let config = Config::from_yaml("{}").expect("valid config");
        assert_eq!(config, Config::default());
        assert_eq!(config.options(), Options::default());
        assert_eq!(config.second_metric, Some(Metric::P1));
        assert_eq!(config.third_metric, Some(Metric::P0Dot2));
        assert!(!config.use_display_change_metrics);
    }

    #[test]
    fn config_deserializes() {
        let contents = r#"
rounding_digits: 1
moving_average_window: 50
stuttering_factor: 3.0
second_metric: one_percent_low
third_metric: null
use_display_change_metrics: true
related_metric: second
outlier_policy: deci_percentile
gpu_power_channel: "GPU Power"
"#;
        let config = Config::from_yaml(contents).expect("valid config");
        assert_eq!(config.rounding_digits, 1);
        assert_eq!(config.moving_average_window.get(), 50);
        assert_eq!(config.second_metric, Some(Metric::OnePercentLow));
        assert_eq!(config.third_metric, None);
        assert!(config.use_display_change_metrics);
        assert_eq!(config.related_metric, RelatedMetric::Second);
        assert_eq!(config.outlier_policy, Policy::DeciPercentile);
        assert_eq!(config.gpu_power_channel.as_deref(), Some("GPU Power"));
        assert!(config.cpu_power_channel.is_none());
    }

    #[test]
    fn rejects_bad_settings() {
        assert!(matches!(
            Config::from_yaml("moving_average_window: 0"),
            Err(Error::SerdeYaml(_))
        ));
        assert!(matches!(
            Config::from_yaml("frobnicate: true"),
            Err(Error::SerdeYaml(_))
        ));
        assert!(matches!(
            Config::from_yaml("stuttering_factor: -1.0"),
            Err(Error::NotPositive {
                field: "stuttering_factor",
                ..
            })
        ));
    }

    #[test]
    fn passthrough_policy_is_accepted() {
        let config = Config::from_yaml("outlier_policy: three_sigma").expect("valid config");
        assert_eq!(config.outlier_policy, Policy::ThreeSigma);
        assert!(!config.outlier_policy.is_implemented());
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "low_fps_threshold: 30").expect("write config");
        let config = Config::try_from_path(file.path()).expect("valid config");
        assert!((config.low_fps_threshold - 30.0).abs() < f64::EPSILON);

        let missing = Config::try_from_path(Path::new("/nonexistent/framepace.yaml"));
        assert!(matches!(missing, Err(Error::ReadFile { .. })));
    }
}
