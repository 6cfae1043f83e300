use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::io::{Seek, SeekFrom};
use std::path::Path;

use csv::Writer;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::ContagionError;
use crate::state::SimulationState;
use crate::status::Day;

/// The daily counters produced by one step.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    pub day: Day,
    /// Vertices infected today.
    pub new_cases: usize,
    /// Vertices killed by exposure today.
    pub new_deaths: usize,
    /// Vertices currently infected or quarantined.
    pub total_cases: usize,
    /// Infections since day 0, the seed included.
    pub cumulative_cases: usize,
    pub total_deaths: usize,
    pub total_immune: usize,
}

impl StepReport {
    /// The counters of `state` as they stand, with today's new cases and deaths.
    #[must_use]
    pub fn from_state(state: &SimulationState, new_cases: usize, new_deaths: usize) -> Self {
        let counts = state.counts();
        StepReport {
            day: state.day(),
            new_cases,
            new_deaths,
            total_cases: counts.active_cases(),
            cumulative_cases: counts.cumulative_cases,
            total_deaths: counts.dead,
            total_immune: counts.immune,
        }
    }
}

/// A consumer of step output, such as a chart or a report file. Sinks only read.
pub trait StepSink {
    /// Called once after every successful step.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot record the report; the run stops.
    fn record(
        &mut self,
        report: &StepReport,
        state: &SimulationState,
    ) -> Result<(), ContagionError>;

    /// Called when the run goes back to `day`. Reports of later days are to be forgotten.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot drop what it recorded.
    fn rewind(&mut self, _day: Day) -> Result<(), ContagionError> {
        Ok(())
    }
}

impl<S: StepSink + ?Sized> StepSink for &mut S {
    fn record(
        &mut self,
        report: &StepReport,
        state: &SimulationState,
    ) -> Result<(), ContagionError> {
        (**self).record(report, state)
    }

    fn rewind(&mut self, day: Day) -> Result<(), ContagionError> {
        (**self).rewind(day)
    }
}

impl<S: StepSink + ?Sized> StepSink for Box<S> {
    fn record(
        &mut self,
        report: &StepReport,
        state: &SimulationState,
    ) -> Result<(), ContagionError> {
        (**self).record(report, state)
    }

    fn rewind(&mut self, day: Day) -> Result<(), ContagionError> {
        (**self).rewind(day)
    }
}

impl<S: StepSink> StepSink for Vec<S> {
    fn record(
        &mut self,
        report: &StepReport,
        state: &SimulationState,
    ) -> Result<(), ContagionError> {
        for sink in self.iter_mut() {
            sink.record(report, state)?;
        }
        Ok(())
    }

    fn rewind(&mut self, day: Day) -> Result<(), ContagionError> {
        for sink in self.iter_mut() {
            sink.rewind(day)?;
        }
        Ok(())
    }
}

/// Keeps every report in memory.
#[derive(Clone, Debug, Default)]
pub struct ReportLog {
    reports: Vec<StepReport>,
}

impl ReportLog {
    #[must_use]
    pub fn new() -> Self {
        ReportLog::default()
    }

    #[must_use]
    pub fn reports(&self) -> &[StepReport] {
        &self.reports
    }

    #[must_use]
    pub fn into_reports(self) -> Vec<StepReport> {
        self.reports
    }
}

impl StepSink for ReportLog {
    fn record(&mut self, report: &StepReport, _: &SimulationState) -> Result<(), ContagionError> {
        self.reports.push(*report);
        Ok(())
    }

    fn rewind(&mut self, day: Day) -> Result<(), ContagionError> {
        self.reports.retain(|report| report.day <= day);
        Ok(())
    }
}

// Checks that the path is valid. Creates the file and all parent directories if
// they do not exist. Returns the file if successful. Called by `CsvReport::create`
fn generate_validate_filepath(path: &Path) -> Result<File, ContagionError> {
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            Ok(file)
        }
        _ => Err(ContagionError::ContagionError(
            "Report output files must be CSVs at this time".to_string(),
        )),
    }
}

/// Writes one CSV row per [`StepReport`], flushed after every row so the file can be tailed
/// while a run is in progress. Rewinding truncates the rows of the undone days.
pub struct CsvReport {
    writer: Writer<File>,
    // Day of each written row and the file length once it was flushed.
    row_ends: Vec<(Day, u64)>,
}

impl CsvReport {
    /// Creates (or truncates) the report file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not end in `.csv` or cannot be created.
    pub fn create(path: &Path) -> Result<Self, ContagionError> {
        trace!("creating report at {}", path.display());
        let file = generate_validate_filepath(path)?;
        Ok(CsvReport {
            writer: Writer::from_writer(file),
            row_ends: Vec::new(),
        })
    }
}

impl StepSink for CsvReport {
    fn record(&mut self, report: &StepReport, _: &SimulationState) -> Result<(), ContagionError> {
        self.writer.serialize(report)?;
        self.writer.flush()?;
        let end = self.writer.get_ref().metadata()?.len();
        self.row_ends.push((report.day, end));
        Ok(())
    }

    fn rewind(&mut self, day: Day) -> Result<(), ContagionError> {
        let kept = self
            .row_ends
            .iter()
            .take_while(|(row_day, _)| *row_day <= day)
            .count();
        if kept == self.row_ends.len() {
            return Ok(());
        }
        self.row_ends.truncate(kept);
        let end = self.row_ends.last().map_or(0, |(_, end)| *end);
        trace!("truncating report to {end} bytes for day {day}");

        // The clone shares the cursor of the writer's file.
        let mut file = self.writer.get_ref().try_clone()?;
        file.set_len(end)?;
        file.seek(SeekFrom::Start(end))?;
        if self.row_ends.is_empty() {
            // Nothing left, not even the header.
            self.writer = Writer::from_writer(file);
        }
        Ok(())
    }
}
