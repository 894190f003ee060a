//! End-of-workout summary and CSV export.
//!
//! The CSV is append-only: each finished workout adds its set rows to the
//! same file, which gets a header only when it is created.

use crate::runner::WorkoutRunner;
use crate::sync::LogSync;
use crate::{Result, SetValues, WorkoutTarget};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::Path;
use uuid::Uuid;

/// One set as it stood when the workout ended
#[derive(Clone, Debug, PartialEq)]
pub struct SetSummary {
    pub exercise_id: Uuid,
    pub exercise: String,
    pub set_number: u32,
    pub values: SetValues,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorkoutSummary {
    pub target: WorkoutTarget,
    pub name: String,
    pub elapsed_seconds: u32,
    pub sets: Vec<SetSummary>,
}

impl WorkoutSummary {
    /// Collect every set record in step order; repeated exercises appear once
    pub fn from_runner<S: LogSync>(runner: &WorkoutRunner<S>) -> Self {
        let mut seen = HashSet::new();
        let mut sets = Vec::new();

        for step in runner.steps() {
            if !seen.insert(step.exercise_id) {
                continue;
            }
            let Some(records) = runner.progress().sets(step.exercise_id) else {
                continue;
            };
            sets.extend(records.iter().enumerate().map(|(index, record)| SetSummary {
                exercise_id: step.exercise_id,
                exercise: step.name.clone(),
                set_number: index as u32 + 1,
                values: record.values.clone(),
                completed: record.completed,
            }));
        }

        Self {
            target: runner.target(),
            name: runner.meta().name.clone(),
            elapsed_seconds: runner.elapsed_seconds(),
            sets,
        }
    }

    pub fn completed_sets(&self) -> usize {
        self.sets.iter().filter(|s| s.completed).count()
    }

    /// Weight times reps over completed sets
    pub fn total_volume(&self) -> f64 {
        self.sets
            .iter()
            .filter(|s| s.completed)
            .map(|s| s.values.volume())
            .sum()
    }

    /// Append completed sets to a CSV file, writing headers for a new file
    pub fn append_csv(&self, csv_path: &Path) -> Result<usize> {
        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(csv_path)?;
        let needs_headers = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_headers)
            .from_writer(file);

        let mut written = 0;
        for set in self.sets.iter().filter(|s| s.completed) {
            writer.serialize(CsvRow::new(self, set))?;
            written += 1;
        }

        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        file.sync_all()?;

        tracing::info!("Exported {} sets to {:?}", written, csv_path);
        Ok(written)
    }
}

#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    target: &'static str,
    target_id: String,
    workout: &'a str,
    exercise: &'a str,
    set_number: u32,
    reps: Option<u32>,
    weight: Option<f64>,
    duration_seconds: Option<u32>,
    distance_meters: Option<f64>,
    elapsed_seconds: u32,
}

impl<'a> CsvRow<'a> {
    fn new(summary: &'a WorkoutSummary, set: &'a SetSummary) -> Self {
        let (reps, weight, duration_seconds, distance_meters) = match set.values {
            SetValues::Standard { reps, weight } => (Some(reps), Some(weight), None, None),
            SetValues::Timed { duration_seconds } => (None, None, Some(duration_seconds), None),
            SetValues::Distance { meters } => (None, None, None, Some(meters)),
        };
        let target = match summary.target {
            WorkoutTarget::Scheduled(_) => "scheduled",
            WorkoutTarget::Appointment(_) => "appointment",
        };

        CsvRow {
            target,
            target_id: summary.target.id().to_string(),
            workout: &summary.name,
            exercise: &set.exercise,
            set_number: set.set_number,
            reps,
            weight,
            duration_seconds,
            distance_meters,
            elapsed_seconds: summary.elapsed_seconds,
        }
    }
}
