//! Contracts of the hosted data platform.
//!
//! The runner never owns durable state. Everything it reads or writes goes
//! through [`DataPlatform`], whose row types mirror the platform tables.

use crate::{GroupKind, LogKey, Result, TrackingMode, WorkoutLog, WorkoutTarget};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Rows
// ============================================================================

/// `exercises` row
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseRow {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub tracking_type: TrackingMode,
}

/// `exercise_groups` row
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseGroupRow {
    pub id: Uuid,
    pub group_type: GroupKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub repetitions: Option<u32>,
    pub order_index: i32,
}

/// `session_exercises` row with its exercise and group embedded
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionExerciseRow {
    pub id: Uuid,
    pub order_index: i32,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub distance_meters: Option<f64>,
    pub exercise: ExerciseRow,
    #[serde(default)]
    pub group: Option<ExerciseGroupRow>,
}

/// `sessions` row: a coach's workout template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionTemplateRow {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub session_exercises: Vec<SessionExerciseRow>,
}

/// Lifecycle of a scheduled session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledStatus {
    Scheduled,
    Completed,
    Missed,
    Cancelled,
    #[serde(other)]
    Other,
}

/// `scheduled_sessions` row, optionally with its template embedded
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScheduledSessionRow {
    pub id: Uuid,
    pub client_id: Uuid,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
    pub status: ScheduledStatus,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionTemplateRow>,
}

/// `appointments` row
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AppointmentRow {
    pub id: Uuid,
    pub title: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Linked workout template, if the slot carries workout content
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

/// `appointment_registrations` row
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RegistrationRow {
    pub appointment_id: Uuid,
    pub client_id: Uuid,
}

// ============================================================================
// Platform Contract
// ============================================================================

/// Request/response contract of the hosted backend
pub trait DataPlatform {
    /// Scheduled session by id, template and exercise list embedded
    fn scheduled_session(&self, id: Uuid) -> Result<Option<ScheduledSessionRow>>;

    /// Workout template by id, exercise list embedded
    fn session_template(&self, id: Uuid) -> Result<Option<SessionTemplateRow>>;

    fn appointment(&self, id: Uuid) -> Result<Option<AppointmentRow>>;

    fn is_registered(&self, client_id: Uuid, appointment_id: Uuid) -> Result<bool>;

    /// Client's logs for the given exercises, newest first, at most `limit`
    fn exercise_history(
        &self,
        client_id: Uuid,
        exercise_ids: &[Uuid],
        limit: usize,
    ) -> Result<Vec<WorkoutLog>>;

    /// Logs already recorded for the target being worked out
    fn target_logs(&self, client_id: Uuid, target: WorkoutTarget) -> Result<Vec<WorkoutLog>>;

    /// Insert or replace the row keyed by (target, exercise, set number)
    fn upsert_log(&self, log: &WorkoutLog) -> Result<()>;

    fn delete_log(&self, key: &LogKey) -> Result<()>;

    /// Mark a scheduled session completed with its recorded duration
    fn complete_scheduled_session(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
        duration_seconds: u32,
    ) -> Result<()>;
}

impl<P: DataPlatform + ?Sized> DataPlatform for &P {
    fn scheduled_session(&self, id: Uuid) -> Result<Option<ScheduledSessionRow>> {
        (**self).scheduled_session(id)
    }

    fn session_template(&self, id: Uuid) -> Result<Option<SessionTemplateRow>> {
        (**self).session_template(id)
    }

    fn appointment(&self, id: Uuid) -> Result<Option<AppointmentRow>> {
        (**self).appointment(id)
    }

    fn is_registered(&self, client_id: Uuid, appointment_id: Uuid) -> Result<bool> {
        (**self).is_registered(client_id, appointment_id)
    }

    fn exercise_history(
        &self,
        client_id: Uuid,
        exercise_ids: &[Uuid],
        limit: usize,
    ) -> Result<Vec<WorkoutLog>> {
        (**self).exercise_history(client_id, exercise_ids, limit)
    }

    fn target_logs(&self, client_id: Uuid, target: WorkoutTarget) -> Result<Vec<WorkoutLog>> {
        (**self).target_logs(client_id, target)
    }

    fn upsert_log(&self, log: &WorkoutLog) -> Result<()> {
        (**self).upsert_log(log)
    }

    fn delete_log(&self, key: &LogKey) -> Result<()> {
        (**self).delete_log(key)
    }

    fn complete_scheduled_session(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
        duration_seconds: u32,
    ) -> Result<()> {
        (**self).complete_scheduled_session(id, completed_at, duration_seconds)
    }
}
