//! Session loading: resolve a workout target into ordered steps.
//!
//! Scheduled sessions must belong to the requesting client. Appointments
//! require a registration and open `early_access_minutes` before they start;
//! before that the loader reports [`LoadOutcome::TooEarly`] instead of steps.

use crate::config::RunnerConfig;
use crate::platform::{DataPlatform, SessionExerciseRow, SessionTemplateRow};
use crate::{
    ClientContext, Error, LoadOutcome, LoadedSession, Prescription, Result, SessionMeta,
    StepGroup, TrackingMode, WorkoutStep, WorkoutTarget,
};
use chrono::{DateTime, Duration, Utc};

const DEFAULT_REPS: u32 = 10;
const DEFAULT_DURATION_SECONDS: u32 = 30;

/// Resolve a workout target for the client
pub fn load_session<P: DataPlatform + ?Sized>(
    platform: &P,
    ctx: &ClientContext,
    target: WorkoutTarget,
    now: DateTime<Utc>,
    config: &RunnerConfig,
) -> Result<LoadOutcome> {
    let session = match target {
        WorkoutTarget::Scheduled(id) => {
            let scheduled = platform
                .scheduled_session(id)?
                .filter(|s| s.client_id == ctx.client_id)
                .ok_or_else(|| Error::NotFound(format!("scheduled session {}", id)))?;

            let template = match scheduled.session {
                Some(template) => template,
                None => {
                    let template_id = scheduled.session_id.ok_or_else(|| {
                        Error::NotFound(format!("template of scheduled session {}", id))
                    })?;
                    platform
                        .session_template(template_id)?
                        .ok_or_else(|| Error::NotFound(format!("session template {}", template_id)))?
                }
            };

            from_template(target, &template)
        }

        WorkoutTarget::Appointment(id) => {
            if !platform.is_registered(ctx.client_id, id)? {
                return Err(Error::NotRegistered(id));
            }

            let appointment = platform
                .appointment(id)?
                .ok_or_else(|| Error::NotFound(format!("appointment {}", id)))?;

            let opens_at = appointment.start_time - Duration::minutes(config.early_access_minutes);
            if now < opens_at {
                tracing::info!(
                    "Appointment {} starts at {}, too early to open",
                    id,
                    appointment.start_time
                );
                return Ok(LoadOutcome::TooEarly {
                    starts_at: appointment.start_time,
                    title: appointment.title,
                });
            }

            match appointment.session_id {
                Some(template_id) => {
                    let template = platform
                        .session_template(template_id)?
                        .ok_or_else(|| Error::NotFound(format!("session template {}", template_id)))?;
                    from_template(target, &template)
                }
                None => LoadedSession {
                    target,
                    meta: SessionMeta {
                        name: appointment.title,
                        notes: None,
                    },
                    steps: Vec::new(),
                },
            }
        }
    };

    tracing::info!(
        "Loaded {} with {} steps",
        target,
        session.steps.len()
    );
    Ok(LoadOutcome::Ready(session))
}

fn from_template(target: WorkoutTarget, template: &SessionTemplateRow) -> LoadedSession {
    LoadedSession {
        target,
        meta: SessionMeta {
            name: template.name.clone(),
            notes: template.notes.clone(),
        },
        steps: flatten_steps(&template.session_exercises),
    }
}

/// Flatten exercise rows into performance order
///
/// A standalone row sorts by its own order index, a grouped row by its
/// group's, so every group stays contiguous; rows inside a group keep their
/// own order.
pub fn flatten_steps(rows: &[SessionExerciseRow]) -> Vec<WorkoutStep> {
    let mut ordered: Vec<&SessionExerciseRow> = rows.iter().collect();
    ordered.sort_by_key(|row| {
        let item_position = row.group.as_ref().map_or(row.order_index, |g| g.order_index);
        (
            item_position,
            row.group.as_ref().map(|g| g.id),
            row.order_index,
        )
    });

    ordered
        .into_iter()
        .enumerate()
        .map(|(sequence, row)| to_step(row, sequence))
        .collect()
}

fn to_step(row: &SessionExerciseRow, sequence: usize) -> WorkoutStep {
    let prescription = match row.exercise.tracking_type {
        TrackingMode::RepsWeight => Prescription::Standard {
            reps: row.reps.unwrap_or(DEFAULT_REPS),
            weight: row.weight,
        },
        TrackingMode::Duration => Prescription::Timed {
            duration_seconds: row.duration_seconds.unwrap_or(DEFAULT_DURATION_SECONDS),
        },
        TrackingMode::Distance => Prescription::Distance {
            meters: row.distance_meters.unwrap_or(0.0),
        },
    };

    let group = row.group.as_ref().map(|g| StepGroup {
        id: g.id,
        kind: g.group_type,
        name: g.name.clone().unwrap_or_default(),
        round_duration_seconds: g.duration_seconds,
        repetitions: g.repetitions,
    });

    WorkoutStep {
        exercise_id: row.exercise.id,
        name: row.exercise.name.clone(),
        description: row.exercise.description.clone(),
        video_url: row.exercise.video_url.clone(),
        prescription,
        sets: row.sets.unwrap_or(1).max(1),
        rest_seconds: row.rest_seconds.unwrap_or(0),
        group,
        sequence,
    }
}
