//! Captured benchmark sessions
//!
//! A [`Session`] is one or more [`Run`]s of the same scene. Each run holds the
//! presented frames in order and, optionally, power channels sampled by a
//! measurement device on its own clock. Sequences handed to the metric code
//! are concatenated across runs in run order.

use framepace_align::{Sample, align_to_stamps};
use framepace_stats::{Policy, outlier};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Error;

/// One presented frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Frame {
    /// Milliseconds since the previous present.
    pub ms_between_presents: f64,
    /// Seconds since the start of the run at which the frame started.
    pub time_in_seconds: f64,
    /// Whether the frame was never displayed.
    #[serde(default)]
    pub dropped: bool,
    /// Milliseconds from present until the frame was displayed.
    #[serde(default)]
    pub ms_until_displayed: f64,
    /// Milliseconds spent inside the present call.
    #[serde(default)]
    pub ms_in_present_api: f64,
    /// Milliseconds between this and the previous display change, when known.
    #[serde(default)]
    pub ms_between_display_change: Option<f64>,
    /// Performance counter at present, in the clock of the power samples.
    #[serde(default)]
    pub counter: Option<u64>,
}

/// One benchmark run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Run {
    /// Frames in presentation order.
    pub frames: Vec<Frame>,
    /// Power channels by name, each in counter order.
    #[serde(default)]
    pub power: FxHashMap<String, Vec<Sample>>,
}

impl Run {
    /// Frametimes of this run in ms.
    #[must_use]
    pub fn frametimes(&self) -> Vec<f64> {
        self.frames.iter().map(|frame| frame.ms_between_presents).collect()
    }

    /// Display change intervals in ms of every frame of this run that has
    /// one.
    #[must_use]
    pub fn display_times(&self) -> Vec<f64> {
        self.frames
            .iter()
            .filter_map(|frame| frame.ms_between_display_change)
            .collect()
    }

    /// Resample power channel `channel` onto the frames of this run, one
    /// value per frame.
    ///
    /// # Errors
    ///
    /// Fails when the channel does not exist, a frame carries no counter or
    /// the counters cannot be aligned.
    pub fn power_per_frame(&self, run: usize, channel: &str) -> Result<Vec<f64>, Error> {
        let samples = self.power.get(channel).ok_or_else(|| Error::MissingChannel {
            run,
            channel: channel.to_string(),
        })?;
        let stamps = self
            .frames
            .iter()
            .map(|frame| frame.counter)
            .collect::<Option<Vec<u64>>>()
            .ok_or(Error::MissingCounters { run })?;

        let aligned = align_to_stamps(&stamps, samples)?;
        Ok(aligned.into_iter().map(|sample| sample.value).collect())
    }
}

/// A captured benchmark session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Session {
    /// Runs in capture order.
    pub runs: Vec<Run>,
}

impl Session {
    fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.runs.iter().flat_map(|run| run.frames.iter())
    }

    /// Total number of frames across all runs.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.runs.iter().map(|run| run.frames.len()).sum()
    }

    /// Frametimes in ms, concatenated across runs.
    #[must_use]
    pub fn frametimes(&self) -> Vec<f64> {
        self.frames().map(|frame| frame.ms_between_presents).collect()
    }

    /// Frame start times in seconds, concatenated across runs.
    #[must_use]
    pub fn frame_start_times(&self) -> Vec<f64> {
        self.frames().map(|frame| frame.time_in_seconds).collect()
    }

    /// Display change intervals in ms of every frame that has one.
    #[must_use]
    pub fn display_times(&self) -> Vec<f64> {
        self.frames()
            .filter_map(|frame| frame.ms_between_display_change)
            .collect()
    }

    /// Frametimes, after applying `policy`, of the frames starting within
    /// `[start, end]` seconds.
    ///
    /// Frametimes are paired with start times by index. When `policy` removed
    /// frames the pairing runs out at the shorter of the two sequences.
    #[must_use]
    pub fn frametime_window(&self, start: f64, end: f64, policy: Policy) -> Vec<f64> {
        self.frametime_points(start, end, policy)
            .into_iter()
            .map(|(_, frametime)| frametime)
            .collect()
    }

    /// As [`Session::frametime_window`], paired with the frame start time.
    #[must_use]
    pub fn frametime_points(&self, start: f64, end: f64, policy: Policy) -> Vec<(f64, f64)> {
        let frametimes = self.frametimes();
        let adjusted = outlier::adjust(&frametimes, policy);
        self.frames()
            .map(|frame| frame.time_in_seconds)
            .zip(adjusted.iter().copied())
            .filter(|(time, _)| *time >= start && *time <= end)
            .collect()
    }

    /// Frametimes, after applying `policy`, from index `skip` up to but
    /// excluding the last `trim` frames.
    ///
    /// Indices refer to the adjusted sequence. A window that is empty or
    /// inverted yields no frames.
    #[must_use]
    pub fn frametime_sample_window(&self, skip: usize, trim: usize, policy: Policy) -> Vec<f64> {
        let frametimes = self.frametimes();
        let adjusted = outlier::adjust(&frametimes, policy);
        let end = adjusted.len().saturating_sub(trim);
        adjusted.get(skip..end).map(<[f64]>::to_vec).unwrap_or_default()
    }

    /// As [`Session::frametime_sample_window`], paired with the frame start
    /// time at the same index.
    #[must_use]
    pub fn frametime_points_sample_window(
        &self,
        skip: usize,
        trim: usize,
        policy: Policy,
    ) -> Vec<(f64, f64)> {
        let frametimes = self.frametimes();
        let adjusted = outlier::adjust(&frametimes, policy);
        let end = adjusted.len().saturating_sub(trim);
        self.frames()
            .map(|frame| frame.time_in_seconds)
            .zip(adjusted.iter().copied())
            .take(end)
            .skip(skip)
            .collect()
    }

    /// Power channel `channel` resampled onto every frame, concatenated across
    /// runs.
    ///
    /// # Errors
    ///
    /// See [`Run::power_per_frame`].
    pub fn power_per_frame(&self, channel: &str) -> Result<Vec<f64>, Error> {
        let mut power = Vec::with_capacity(self.frame_count());
        for (idx, run) in self.runs.iter().enumerate() {
            power.extend(run.power_per_frame(idx, channel)?);
        }
        debug!(channel, frames = power.len(), "power per frame");
        Ok(power)
    }

    /// Approximate input lag per displayed frame, in ms.
    ///
    /// Estimated as this frame's time plus its time until displayed plus half
    /// of the previous frame time, less half of the present call time of each
    /// of the two previous frames.
    #[must_use]
    pub fn approx_input_lag(&self) -> Vec<f64> {
        self.input_lag(|prev2, prev, this| {
            this.ms_between_presents + this.ms_until_displayed + 0.5 * prev.ms_between_presents
                - 0.5 * prev.ms_in_present_api
                - 0.5 * prev2.ms_in_present_api
        })
    }

    /// Upper bound of the input lag per displayed frame, in ms.
    #[must_use]
    pub fn upper_bound_input_lag(&self) -> Vec<f64> {
        self.input_lag(|prev2, prev, this| {
            this.ms_between_presents + this.ms_until_displayed + prev.ms_between_presents
                - prev2.ms_in_present_api
        })
    }

    /// Lower bound of the input lag per displayed frame, in ms.
    #[must_use]
    pub fn lower_bound_input_lag(&self) -> Vec<f64> {
        self.input_lag(|_, prev, this| {
            this.ms_between_presents + this.ms_until_displayed - prev.ms_in_present_api
        })
    }

    fn input_lag<F>(&self, estimate: F) -> Vec<f64>
    where
        F: Fn(&Frame, &Frame, &Frame) -> f64,
    {
        let frames: Vec<&Frame> = self.frames().collect();
        frames
            .windows(3)
            .filter(|window| !window[2].dropped)
            .map(|window| estimate(window[0], window[1], window[2]))
            .collect()
    }

    /// Share in `[0, 1]` of display changes whose refresh rate, rounded to
    /// whole Hz, lies within `[lower, upper]` Hz. Zero without display data.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sync_range_share(&self, lower: i64, upper: i64) -> f64 {
        let display_times = self.display_times();
        if display_times.is_empty() {
            return 0.0;
        }
        let in_range = display_times
            .iter()
            .map(|time| (1_000.0 / time).round() as i64)
            .filter(|hz| (lower..=upper).contains(hz))
            .count();
        in_range as f64 / display_times.len() as f64
    }

    /// Check frame ordering and durations.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        for (run_idx, run) in self.runs.iter().enumerate() {
            result.run_count += 1;
            let mut previous: Option<&Frame> = None;
            for (frame_idx, frame) in run.frames.iter().enumerate() {
                result.frame_count += 1;
                let mut fault = None;

                if !(frame.ms_between_presents.is_finite() && frame.ms_between_presents > 0.0) {
                    result.frametime_errors += 1;
                    fault = Some(format!(
                        "frametime {} is not positive",
                        frame.ms_between_presents
                    ));
                }
                if let Some(prev) = previous {
                    if frame.time_in_seconds < prev.time_in_seconds {
                        result.start_time_errors += 1;
                        fault = Some(format!(
                            "start time {} precedes {}",
                            frame.time_in_seconds, prev.time_in_seconds
                        ));
                    }
                    let counters = frame.counter.zip(prev.counter);
                    if let Some((counter, prev_counter)) = counters.filter(|(c, p)| c < p) {
                        result.counter_errors += 1;
                        fault = Some(format!("counter {counter} precedes {prev_counter}"));
                    }
                }

                if result.first_error.is_none() {
                    result.first_error = fault.map(|message| (run_idx, frame_idx, message));
                }
                previous = Some(frame);
            }
        }

        result
    }
}

/// Result of [`Session::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Number of runs checked
    pub run_count: usize,
    /// Number of frames checked
    pub frame_count: usize,
    /// Frames whose frametime is not positive
    pub frametime_errors: usize,
    /// Frames starting before their predecessor
    pub start_time_errors: usize,
    /// Frames whose counter is below their predecessor's
    pub counter_errors: usize,
    /// First error encountered (run index, frame index, message)
    pub first_error: Option<(usize, usize, String)>,
}

impl ValidationResult {
    /// Returns true if validation passed with no errors
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.frametime_errors == 0 && self.start_time_errors == 0 && self.counter_errors == 0
    }
}
