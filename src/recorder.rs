//! Recording Session
//!
//! Keeps the state of a data-logging run: whether recording is active, the experiment
//! the samples belong to, how often to sample and the samples taken so far.
//!
//! # Sampling
//! - A sample is due when recording is active and at least one interval has passed since
//!   the previous sample
//! - Timestamps are seconds since [`Recorder::start`]
//! - Distances are kept in whole centimeters, the resolution that gets published
//!
//! # Storage
//! The log is a fixed-capacity ring; once full the oldest sample is dropped for each new
//! one and counted in [`Recorder::dropped`].
//!
//! # Export
//! ```text
//! Timestamp(s),Distance(cm),Unit,Experiment
//! 0.050,31,cm,Percobaan 1
//! ```

use core::fmt::{self, Write};

use heapless::{Deque, String};

use crate::ranging::Distance;

/// Experiment name used until one is set
pub const DEFAULT_EXPERIMENT: &str = "Percobaan 1";

/// Sample interval used until one is set
pub const DEFAULT_INTERVAL_MS: u32 = 50;

/// Shortest accepted sample interval
pub const MIN_INTERVAL_MS: u32 = 10;

/// Longest accepted sample interval
pub const MAX_INTERVAL_MS: u32 = 5_000;

/// Maximum experiment name length in bytes
pub const EXPERIMENT_NAME_CAPACITY: usize = 32;

/// First line of the CSV export
pub const CSV_HEADER: &str = "Timestamp(s),Distance(cm),Unit,Experiment";

pub type ExperimentName = String<EXPERIMENT_NAME_CAPACITY>;

/// Export file name, experiment name plus `.csv`
pub type CsvFileName = String<{ EXPERIMENT_NAME_CAPACITY + 4 }>;

/// One recorded reading
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Seconds since recording started
    pub timestamp_s: f32,
    pub distance_cm: u32,
    /// Experiment active when the sample was taken
    pub experiment: ExperimentName,
}

impl Sample {
    /// Writes `timestamp,distance,cm,experiment` without a line break
    pub fn write_csv_row<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(
            out,
            "{:.3},{},cm,{}",
            self.timestamp_s, self.distance_cm, self.experiment
        )
    }
}

/// Snapshot of the recorder for status reports
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    pub recording: bool,
    pub samples: usize,
    pub experiment: ExperimentName,
    pub interval_ms: u32,
}

/// Rejected recorder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecorderError {
    /// Experiment name was empty or only whitespace
    EmptyExperimentName,
    /// Experiment name longer than [`EXPERIMENT_NAME_CAPACITY`] bytes
    ExperimentNameTooLong,
    /// Interval outside [`MIN_INTERVAL_MS`]..=[`MAX_INTERVAL_MS`]
    IntervalOutOfRange(u32),
}

impl fmt::Display for RecorderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderError::EmptyExperimentName => write!(f, "experiment name is empty"),
            RecorderError::ExperimentNameTooLong => write!(
                f,
                "experiment name exceeds {} bytes",
                EXPERIMENT_NAME_CAPACITY
            ),
            RecorderError::IntervalOutOfRange(ms) => write!(
                f,
                "interval {}ms outside {}..={}ms",
                ms, MIN_INTERVAL_MS, MAX_INTERVAL_MS
            ),
        }
    }
}

/// Data-logging session holding up to `N` samples
pub struct Recorder<const N: usize> {
    recording: bool,
    started_at_ms: u64,
    last_sample_ms: Option<u64>,
    interval_ms: u32,
    experiment: ExperimentName,
    samples: Deque<Sample, N>,
    dropped: u32,
}

impl<const N: usize> Default for Recorder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Recorder<N> {
    pub fn new() -> Self {
        let mut experiment = ExperimentName::new();
        // the default name is a short literal well inside the capacity
        let _ = experiment.push_str(DEFAULT_EXPERIMENT);
        Self {
            recording: false,
            started_at_ms: 0,
            last_sample_ms: None,
            interval_ms: DEFAULT_INTERVAL_MS,
            experiment,
            samples: Deque::new(),
            dropped: 0,
        }
    }

    /// Starts a new recording, discarding previous samples
    pub fn start(&mut self, now_ms: u64) {
        self.clear();
        self.recording = true;
        self.started_at_ms = now_ms;
    }

    pub fn stop(&mut self) {
        self.recording = false;
    }

    /// Drops all samples, the recording state is kept
    pub fn clear(&mut self) {
        self.samples.clear();
        self.last_sample_ms = None;
        self.dropped = 0;
    }

    pub fn set_experiment(&mut self, name: &str) -> Result<(), RecorderError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RecorderError::EmptyExperimentName);
        }
        let mut experiment = ExperimentName::new();
        experiment
            .push_str(name)
            .map_err(|_| RecorderError::ExperimentNameTooLong)?;
        self.experiment = experiment;
        Ok(())
    }

    pub fn set_interval(&mut self, interval_ms: u32) -> Result<(), RecorderError> {
        if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&interval_ms) {
            return Err(RecorderError::IntervalOutOfRange(interval_ms));
        }
        self.interval_ms = interval_ms;
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Number of samples lost to the ring overflowing since the last clear
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Seconds since the recording started
    pub fn elapsed_s(&self, now_ms: u64) -> f32 {
        now_ms.saturating_sub(self.started_at_ms) as f32 / 1000.0
    }

    /// Whether a reading taken now should be recorded
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.recording
            && self
                .last_sample_ms
                .map_or(true, |last| now_ms.saturating_sub(last) >= u64::from(self.interval_ms))
    }

    /// Appends a reading to the log; callers check [`Recorder::is_due`] first
    pub fn record(&mut self, now_ms: u64, distance: Distance) -> Sample {
        let sample = Sample {
            timestamp_s: self.elapsed_s(now_ms),
            distance_cm: distance.whole_centimeters(),
            experiment: self.experiment.clone(),
        };
        if self.samples.is_full() {
            self.samples.pop_front();
            self.dropped = self.dropped.saturating_add(1);
        }
        // a slot was freed above if the ring was full
        let _ = self.samples.push_back(sample.clone());
        self.last_sample_ms = Some(now_ms);
        sample
    }

    /// Oldest first
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn status(&self) -> Status {
        Status {
            recording: self.recording,
            samples: self.samples.len(),
            experiment: self.experiment.clone(),
            interval_ms: self.interval_ms,
        }
    }

    /// Writes the header and every sample as CSV
    pub fn write_csv<W: Write>(&self, out: &mut W) -> fmt::Result {
        writeln!(out, "{}", CSV_HEADER)?;
        for sample in self.samples() {
            sample.write_csv_row(out)?;
            out.write_char('\n')?;
        }
        Ok(())
    }

    /// Experiment name made safe for a file name
    pub fn csv_filename(&self) -> CsvFileName {
        let mut name = CsvFileName::new();
        for c in self.experiment.chars() {
            let c = match c {
                ' ' | '/' | '\\' => '_',
                other => other,
            };
            // capacity covers the longest experiment name plus the extension
            let _ = name.push(c);
        }
        let _ = name.push_str(".csv");
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cm(value: f32) -> Distance {
        Distance::from_centimeters(value)
    }

    #[test]
    fn defaults() {
        let recorder = Recorder::<8>::new();
        let status = recorder.status();
        assert!(!status.recording);
        assert_eq!(status.samples, 0);
        assert_eq!(status.experiment.as_str(), DEFAULT_EXPERIMENT);
        assert_eq!(status.interval_ms, DEFAULT_INTERVAL_MS);
    }

    #[test]
    fn not_due_unless_recording() {
        let recorder = Recorder::<8>::new();
        assert!(!recorder.is_due(1_000));
    }

    #[test]
    fn due_after_interval() {
        let mut recorder = Recorder::<8>::new();
        recorder.start(1_000);
        assert!(recorder.is_due(1_000));
        recorder.record(1_000, cm(20.0));
        assert!(!recorder.is_due(1_049));
        assert!(recorder.is_due(1_050));
    }

    #[test]
    fn timestamps_relative_to_start() {
        let mut recorder = Recorder::<8>::new();
        recorder.start(10_000);
        let sample = recorder.record(11_500, cm(30.6));
        assert_eq!(sample.timestamp_s, 1.5);
        assert_eq!(sample.distance_cm, 30);
        assert_eq!(sample.experiment.as_str(), DEFAULT_EXPERIMENT);
    }

    #[test]
    fn start_discards_previous_run() {
        let mut recorder = Recorder::<8>::new();
        recorder.start(0);
        recorder.record(0, cm(10.0));
        recorder.record(100, cm(11.0));
        recorder.stop();
        assert_eq!(recorder.len(), 2);

        recorder.start(5_000);
        assert!(recorder.is_empty());
        assert!(recorder.is_recording());
    }

    #[test]
    fn clear_keeps_recording() {
        let mut recorder = Recorder::<8>::new();
        recorder.start(0);
        recorder.record(0, cm(10.0));
        recorder.clear();
        assert!(recorder.is_empty());
        assert!(recorder.is_recording());
        assert!(recorder.is_due(1));
    }

    #[test]
    fn full_ring_drops_oldest() {
        let mut recorder = Recorder::<2>::new();
        recorder.start(0);
        recorder.record(0, cm(10.0));
        recorder.record(100, cm(11.0));
        recorder.record(200, cm(12.0));

        let kept: heapless::Vec<u32, 2> = recorder.samples().map(|s| s.distance_cm).collect();
        assert_eq!(kept.as_slice(), &[11, 12]);
        assert_eq!(recorder.dropped(), 1);
    }

    #[test]
    fn interval_bounds() {
        let mut recorder = Recorder::<8>::new();
        assert_eq!(
            recorder.set_interval(5),
            Err(RecorderError::IntervalOutOfRange(5))
        );
        assert_eq!(
            recorder.set_interval(5_001),
            Err(RecorderError::IntervalOutOfRange(5_001))
        );
        assert_eq!(recorder.set_interval(MIN_INTERVAL_MS), Ok(()));
        assert_eq!(recorder.set_interval(250), Ok(()));
        assert_eq!(recorder.interval_ms(), 250);
    }

    #[test]
    fn experiment_name_validation() {
        let mut recorder = Recorder::<8>::new();
        assert_eq!(
            recorder.set_experiment("   "),
            Err(RecorderError::EmptyExperimentName)
        );
        assert_eq!(
            recorder.set_experiment("a name that is far too long for the buffer"),
            Err(RecorderError::ExperimentNameTooLong)
        );
        assert_eq!(recorder.experiment(), DEFAULT_EXPERIMENT);

        recorder.set_experiment(" Drop test 2 ").unwrap();
        assert_eq!(recorder.experiment(), "Drop test 2");
    }

    #[test]
    fn experiment_change_applies_to_later_samples() {
        let mut recorder = Recorder::<8>::new();
        recorder.start(0);
        recorder.record(0, cm(10.0));
        recorder.set_experiment("Bounce").unwrap();
        recorder.record(100, cm(11.0));

        let names: heapless::Vec<&str, 2> =
            recorder.samples().map(|s| s.experiment.as_str()).collect();
        assert_eq!(names.as_slice(), &[DEFAULT_EXPERIMENT, "Bounce"]);
    }

    #[test]
    fn csv_export() {
        let mut recorder = Recorder::<8>::new();
        recorder.start(1_000);
        recorder.record(1_250, cm(30.6));
        recorder.record(2_500, cm(12.2));

        let mut csv: String<256> = String::new();
        recorder.write_csv(&mut csv).unwrap();
        assert_eq!(
            csv.as_str(),
            "Timestamp(s),Distance(cm),Unit,Experiment\n\
             0.250,30,cm,Percobaan 1\n\
             1.500,12,cm,Percobaan 1\n"
        );
    }

    #[test]
    fn csv_filename_is_sanitized() {
        let mut recorder = Recorder::<8>::new();
        assert_eq!(recorder.csv_filename().as_str(), "Percobaan_1.csv");
        recorder.set_experiment("run a/b\\c").unwrap();
        assert_eq!(recorder.csv_filename().as_str(), "run_a_b_c.csv");
    }

    #[test]
    fn single_row_has_no_line_break() {
        let mut recorder = Recorder::<2>::new();
        recorder.start(0);
        let sample = recorder.record(75, cm(201.9));

        let mut row: String<64> = String::new();
        sample.write_csv_row(&mut row).unwrap();
        assert_eq!(row.as_str(), "0.075,201,cm,Percobaan 1");
    }
}
