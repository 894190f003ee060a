//! Core domain types for the live workout runner.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise prescriptions and group membership
//! - Flattened workout steps
//! - Per-set records and their values
//! - Workout targets and persisted log rows

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Prescription Types
// ============================================================================

/// How an exercise is tracked
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    #[default]
    RepsWeight,
    Duration,
    Distance,
}

/// Semantics of an exercise group
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// Fixed number of rounds through the group
    Circuit,
    /// Fixed number of timed rounds through the group
    Interval,
    /// As many rounds as possible until stopped externally
    Amrap,
}

/// A cluster of contiguous steps performed round by round
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StepGroup {
    pub id: Uuid,
    pub kind: GroupKind,
    pub name: String,
    pub round_duration_seconds: Option<u32>,
    pub repetitions: Option<u32>,
}

/// What the coach prescribed for each set of a step
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Prescription {
    Standard { reps: u32, weight: Option<f64> },
    Timed { duration_seconds: u32 },
    Distance { meters: f64 },
}

impl Prescription {
    pub fn tracking_mode(&self) -> TrackingMode {
        match self {
            Prescription::Standard { .. } => TrackingMode::RepsWeight,
            Prescription::Timed { .. } => TrackingMode::Duration,
            Prescription::Distance { .. } => TrackingMode::Distance,
        }
    }

    /// Template values used when no history exists
    pub fn default_values(&self) -> SetValues {
        match self {
            Prescription::Standard { reps, weight } => SetValues::Standard {
                reps: *reps,
                weight: weight.unwrap_or(0.0),
            },
            Prescription::Timed { duration_seconds } => SetValues::Timed {
                duration_seconds: *duration_seconds,
            },
            Prescription::Distance { meters } => SetValues::Distance { meters: *meters },
        }
    }
}

// ============================================================================
// Workout Steps
// ============================================================================

/// One exercise of the flattened workout, in performance order
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutStep {
    pub exercise_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub prescription: Prescription,
    pub sets: u32,
    pub rest_seconds: u32,
    pub group: Option<StepGroup>,
    pub sequence: usize,
}

impl WorkoutStep {
    pub fn group_kind(&self) -> Option<GroupKind> {
        self.group.as_ref().map(|g| g.kind)
    }

    pub fn group_id(&self) -> Option<Uuid> {
        self.group.as_ref().map(|g| g.id)
    }

    /// Rounds a circuit or interval group runs when this step closes it
    pub fn target_rounds(&self) -> u32 {
        let repetitions = self
            .group
            .as_ref()
            .and_then(|g| g.repetitions)
            .unwrap_or(0);
        repetitions.max(self.sets).max(1)
    }

    /// Number of set records materialized when the step is first seeded
    pub fn record_count(&self) -> usize {
        match self.group_kind() {
            Some(GroupKind::Circuit) | Some(GroupKind::Interval) => self.target_rounds() as usize,
            Some(GroupKind::Amrap) | None => self.sets.max(1) as usize,
        }
    }
}

// ============================================================================
// Set Records
// ============================================================================

/// Values of a single set, shaped by the step's tracking mode
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SetValues {
    Standard { reps: u32, weight: f64 },
    Timed { duration_seconds: u32 },
    Distance { meters: f64 },
}

/// Editable field of a set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetField {
    Reps,
    Weight,
    DurationSeconds,
    DistanceMeters,
}

impl SetValues {
    pub fn tracking_mode(&self) -> TrackingMode {
        match self {
            SetValues::Standard { .. } => TrackingMode::RepsWeight,
            SetValues::Timed { .. } => TrackingMode::Duration,
            SetValues::Distance { .. } => TrackingMode::Distance,
        }
    }

    /// Overwrite one field; the field must belong to this mode
    pub fn set_field(&mut self, field: SetField, value: f64) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::InvalidAction(format!(
                "{:?} must be a non-negative number, got {}",
                field, value
            )));
        }

        match (self, field) {
            (SetValues::Standard { reps, .. }, SetField::Reps) => *reps = value.round() as u32,
            (SetValues::Standard { weight, .. }, SetField::Weight) => *weight = value,
            (SetValues::Timed { duration_seconds }, SetField::DurationSeconds) => {
                *duration_seconds = value.round() as u32
            }
            (SetValues::Distance { meters }, SetField::DistanceMeters) => *meters = value,
            (values, field) => {
                return Err(Error::InvalidAction(format!(
                    "{:?} does not apply to a {:?} set",
                    field,
                    values.tracking_mode()
                )))
            }
        }
        Ok(())
    }

    /// Read the values a log recorded for the given mode
    ///
    /// Returns None when the log carries nothing usable for that mode.
    pub fn from_log(mode: TrackingMode, log: &WorkoutLog) -> Option<Self> {
        match mode {
            TrackingMode::RepsWeight => {
                if log.reps.is_none() && log.weight.is_none() {
                    return None;
                }
                Some(SetValues::Standard {
                    reps: log.reps.unwrap_or(0),
                    weight: log.weight.unwrap_or(0.0),
                })
            }
            TrackingMode::Duration => log
                .duration_seconds
                .map(|duration_seconds| SetValues::Timed { duration_seconds }),
            TrackingMode::Distance => log
                .distance_meters
                .map(|meters| SetValues::Distance { meters }),
        }
    }

    /// Training volume (reps x weight); zero for timed and distance sets
    pub fn volume(&self) -> f64 {
        match self {
            SetValues::Standard { reps, weight } => *reps as f64 * weight,
            _ => 0.0,
        }
    }
}

/// A set as shown on the workout screen
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetRecord {
    pub values: SetValues,
    pub completed: bool,
    /// Values come from a previous workout, not from this one
    pub is_ghost: bool,
}

impl SetRecord {
    pub fn template(values: SetValues) -> Self {
        Self {
            values,
            completed: false,
            is_ghost: false,
        }
    }

    pub fn ghost(values: SetValues) -> Self {
        Self {
            values,
            completed: false,
            is_ghost: true,
        }
    }

    /// A set already logged for the current workout
    pub fn logged(values: SetValues) -> Self {
        Self {
            values,
            completed: true,
            is_ghost: false,
        }
    }
}

// ============================================================================
// Targets and Logs
// ============================================================================

/// What the client is working out against
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum WorkoutTarget {
    /// A coach-assigned scheduled session
    Scheduled(Uuid),
    /// A booked appointment slot
    Appointment(Uuid),
}

impl WorkoutTarget {
    pub fn id(&self) -> Uuid {
        match self {
            WorkoutTarget::Scheduled(id) | WorkoutTarget::Appointment(id) => *id,
        }
    }

    /// Column of `workout_logs` holding this target's id
    pub fn log_column(&self) -> &'static str {
        match self {
            WorkoutTarget::Scheduled(_) => "scheduled_session_id",
            WorkoutTarget::Appointment(_) => "appointment_id",
        }
    }
}

impl fmt::Display for WorkoutTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkoutTarget::Scheduled(id) => write!(f, "scheduled session {}", id),
            WorkoutTarget::Appointment(id) => write!(f, "appointment {}", id),
        }
    }
}

/// A persisted set completion (`workout_logs` row)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutLog {
    pub client_id: Uuid,
    #[serde(default)]
    pub scheduled_session_id: Option<Uuid>,
    #[serde(default)]
    pub appointment_id: Option<Uuid>,
    pub exercise_id: Uuid,
    /// 1-based
    pub set_number: u32,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub distance_meters: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

impl WorkoutLog {
    /// Build the row persisted when a set is completed
    pub fn for_set(
        client_id: Uuid,
        target: WorkoutTarget,
        exercise_id: Uuid,
        set_number: u32,
        values: &SetValues,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let (scheduled_session_id, appointment_id) = match target {
            WorkoutTarget::Scheduled(id) => (Some(id), None),
            WorkoutTarget::Appointment(id) => (None, Some(id)),
        };

        let mut log = WorkoutLog {
            client_id,
            scheduled_session_id,
            appointment_id,
            exercise_id,
            set_number,
            reps: None,
            weight: None,
            duration_seconds: None,
            distance_meters: None,
            completed_at,
        };

        match values {
            SetValues::Standard { reps, weight } => {
                log.reps = Some(*reps);
                log.weight = Some(*weight);
            }
            SetValues::Timed { duration_seconds } => log.duration_seconds = Some(*duration_seconds),
            SetValues::Distance { meters } => log.distance_meters = Some(*meters),
        }

        log
    }

    /// Session or appointment this log was recorded in, if any
    pub fn target(&self) -> Option<WorkoutTarget> {
        self.scheduled_session_id
            .map(WorkoutTarget::Scheduled)
            .or_else(|| self.appointment_id.map(WorkoutTarget::Appointment))
    }

    pub fn belongs_to(&self, target: WorkoutTarget) -> bool {
        self.target() == Some(target)
    }

    pub fn key(&self) -> Option<LogKey> {
        self.target().map(|target| LogKey {
            target,
            exercise_id: self.exercise_id,
            set_number: self.set_number,
        })
    }
}

/// Conflict target of a `workout_logs` upsert
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LogKey {
    pub target: WorkoutTarget,
    pub exercise_id: Uuid,
    pub set_number: u32,
}

// ============================================================================
// Loaded Sessions
// ============================================================================

/// Descriptive data shown above the workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct SessionMeta {
    pub name: String,
    pub notes: Option<String>,
}

/// A workout resolved into ordered steps
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedSession {
    pub target: WorkoutTarget,
    pub meta: SessionMeta,
    pub steps: Vec<WorkoutStep>,
}

/// Result of resolving a workout target
#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    Ready(LoadedSession),
    /// The appointment has not opened yet
    TooEarly {
        starts_at: DateTime<Utc>,
        title: String,
    },
}

/// The signed-in client, passed explicitly into loading and running
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientContext {
    pub client_id: Uuid,
}
