//! Per-run metric summaries and run history outliers
//!
//! A [`MetricAnalysis`] condenses one capture run into Average FPS plus two
//! selectable secondary metrics. A series of analyses, one per run of the same
//! scene, is checked for runs that stray too far from the median with
//! [`outlier_flags`].

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    metric::{Calculator, Metric, render},
    quantile::quantile,
};

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricAnalysis {
    /// Average FPS.
    pub average: f64,
    /// Value of the second metric, `NaN` when none was selected.
    pub second: f64,
    /// Value of the third metric, `NaN` when none was selected.
    pub third: f64,
    /// One line rendering, e.g. `Avg=143.20 FPS | P1=98.10 FPS`.
    pub summary: String,
}

impl MetricAnalysis {
    /// The value `related` refers to.
    #[must_use]
    pub fn related(&self, related: RelatedMetric) -> f64 {
        match related {
            RelatedMetric::Average => self.average,
            RelatedMetric::Second => self.second,
            RelatedMetric::Third => self.third,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
/// Which value of a [`MetricAnalysis`] run history outliers are judged on.
pub enum RelatedMetric {
    /// Average FPS.
    #[default]
    Average,
    /// The second metric.
    Second,
    /// The third metric.
    Third,
}

impl Calculator {
    /// Summarize `frametimes` as Average FPS plus the `second` and `third`
    /// metrics.
    ///
    /// When `display_times` is given the secondary metrics are computed over
    /// those display change intervals instead, while Average always comes from
    /// `frametimes`. A metric left as `None` is reported as `NaN` and does not
    /// appear in the summary line. Values in the summary carry exactly
    /// [`crate::Options::rounding_digits`] decimals; values that are not
    /// finite read `n/a`.
    ///
    /// # Errors
    ///
    /// Propagates any fault from [`Calculator::fps_metric`].
    pub fn metric_analysis(
        &self,
        frametimes: &[f64],
        display_times: Option<&[f64]>,
        second: Option<Metric>,
        third: Option<Metric>,
    ) -> Result<MetricAnalysis, Error> {
        let digits = self.options().rounding_digits;
        let secondary_source = display_times.unwrap_or(frametimes);
        let average = self.fps_metric(frametimes, Metric::Average)?;
        let mut summary = format!(
            "{}={} FPS",
            Metric::Average.short_description(),
            render(average, digits)
        );

        let mut secondary = [f64::NAN; 2];
        for (slot, metric) in secondary.iter_mut().zip([second, third]) {
            let Some(metric) = metric else { continue };
            *slot = self.fps_metric(secondary_source, metric)?;
            let _ = write!(
                summary,
                " | {}={} FPS",
                metric.short_description(),
                render(*slot, digits)
            );
        }

        Ok(MetricAnalysis {
            average,
            second: secondary[0],
            third: secondary[1],
            summary,
        })
    }
}

/// Flag every analysis whose `related` value deviates from the median of all
/// of them by more than `percentage` percent.
///
/// The output lines up index for index with `analyses`. A `NaN` value is never
/// flagged.
#[must_use]
pub fn outlier_flags(
    analyses: &[MetricAnalysis],
    related: RelatedMetric,
    percentage: f64,
) -> Vec<bool> {
    let values: Vec<f64> = analyses
        .iter()
        .map(|analysis| analysis.related(related))
        .collect();
    let median = quantile(&values, 0.5);
    values
        .iter()
        .map(|value| (value - median).abs() / median * 100.0 > percentage)
        .collect()
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::Options;

    fn analysis(average: f64, second: f64) -> MetricAnalysis {
        MetricAnalysis {
            average,
            second,
            third: f64::NAN,
            summary: String::new(),
        }
    }

    #[test]
    fn summary_lists_selected_metrics() {
        let mut frametimes = vec![10.0; 99];
        frametimes.push(50.0);
        let calculator = Calculator::new(Options::default());
        let result = calculator
            .metric_analysis(
                &frametimes,
                None,
                Some(Metric::OnePercentLow),
                Some(Metric::Max),
            )
            .expect("no fault");
        assert!((result.second - 20.0).abs() < 1e-10);
        assert!((result.third - 100.0).abs() < 1e-10);
        assert_eq!(
            result.summary,
            format!(
                "Avg={:.2} FPS | 1% Low Avg=20.00 FPS | Max=100.00 FPS",
                result.average
            )
        );
    }

    #[test]
    fn absent_metric_is_nan_and_omitted() {
        let calculator = Calculator::new(Options {
            rounding_digits: 1,
            ..Options::default()
        });
        let result = calculator
            .metric_analysis(&[10.0; 4], None, None, Some(Metric::Min))
            .expect("no fault");
        assert!(result.second.is_nan());
        assert_eq!(result.summary, "Avg=100.0 FPS | Min=100.0 FPS");
    }

    #[test]
    fn empty_run_reads_not_available() {
        let calculator = Calculator::new(Options::default());
        let result = calculator
            .metric_analysis(&[], None, Some(Metric::P1), Some(Metric::OnePercentLow))
            .expect("no fault");
        assert!(result.average.is_nan());
        assert!(!result.summary.contains("NaN"), "{}", result.summary);
        assert_eq!(
            result.summary,
            "Avg=n/a FPS | P1=n/a FPS | 1% Low Avg=n/a FPS"
        );
    }

    #[test]
    fn secondary_metrics_from_display_times() {
        let calculator = Calculator::new(Options::default());
        let frametimes = [10.0; 4];
        let display_times = [20.0; 4];
        let result = calculator
            .metric_analysis(&frametimes, Some(&display_times[..]), Some(Metric::Max), None)
            .expect("no fault");
        assert!((result.average - 100.0).abs() < 1e-10);
        assert!((result.second - 50.0).abs() < 1e-10);
        assert_eq!(result.summary, "Avg=100.00 FPS | Max=50.00 FPS");
    }

    #[test]
    fn outliers_against_median() {
        let history = [
            analysis(100.0, 60.0),
            analysis(101.0, 61.0),
            analysis(99.0, 40.0),
            analysis(110.0, 60.0),
        ];
        assert_eq!(
            outlier_flags(&history, RelatedMetric::Average, 3.0),
            vec![false, false, false, true]
        );
        assert_eq!(
            outlier_flags(&history, RelatedMetric::Second, 3.0),
            vec![false, false, true, false]
        );
        // Third is NaN everywhere.
        assert_eq!(
            outlier_flags(&history, RelatedMetric::Third, 3.0),
            vec![false; 4]
        );
        assert!(outlier_flags(&[], RelatedMetric::Average, 3.0).is_empty());
    }
}
