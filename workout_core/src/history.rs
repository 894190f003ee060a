//! "Ghost" prefill from the client's previous performances.
//!
//! For each exercise the newest log recorded outside the current workout is
//! the anchor. When the anchor belongs to a session or appointment, the other
//! logs of that same workout supply the remaining sets by set number, and any
//! set without a match reuses the anchor. An ad-hoc anchor (no session or
//! appointment) supplies every set on its own.

use crate::platform::DataPlatform;
use crate::{Result, SetValues, TrackingMode, WorkoutLog, WorkoutStep, WorkoutTarget};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// What the client did the last time they performed an exercise
#[derive(Clone, Debug, PartialEq)]
pub struct LastPerformance {
    /// Newest log of the exercise outside the current workout
    pub anchor: WorkoutLog,
    /// Logs from the anchor's workout keyed by set number
    pub by_set: HashMap<u32, WorkoutLog>,
}

impl LastPerformance {
    /// Ghost values for a 1-based set number in the given mode
    pub fn values_for(&self, set_number: u32, mode: TrackingMode) -> Option<SetValues> {
        let log = self.by_set.get(&set_number).unwrap_or(&self.anchor);
        SetValues::from_log(mode, log)
    }
}

/// Fetch the bounded, newest-first history for every exercise in the steps
pub fn fetch_history<P: DataPlatform + ?Sized>(
    platform: &P,
    client_id: Uuid,
    steps: &[WorkoutStep],
    limit: usize,
) -> Result<Vec<WorkoutLog>> {
    let mut seen = HashSet::new();
    let exercise_ids: Vec<Uuid> = steps
        .iter()
        .map(|s| s.exercise_id)
        .filter(|id| seen.insert(*id))
        .collect();

    if exercise_ids.is_empty() {
        return Ok(Vec::new());
    }

    let history = platform.exercise_history(client_id, &exercise_ids, limit)?;
    tracing::debug!(
        "Fetched {} history logs for {} exercises",
        history.len(),
        exercise_ids.len()
    );
    Ok(history)
}

/// Resolve the last performance of each exercise, excluding the current workout
pub fn resolve_ghosts(
    steps: &[WorkoutStep],
    history: &[WorkoutLog],
    current: WorkoutTarget,
) -> HashMap<Uuid, LastPerformance> {
    let mut ordered: Vec<&WorkoutLog> = history.iter().collect();
    ordered.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    let mut ghosts = HashMap::new();

    for step in steps {
        if ghosts.contains_key(&step.exercise_id) {
            continue;
        }

        let Some(anchor) = ordered
            .iter()
            .find(|l| l.exercise_id == step.exercise_id && !l.belongs_to(current))
        else {
            continue;
        };

        let mut by_set = HashMap::new();
        if let Some(anchor_target) = anchor.target() {
            // Newest first, so the first log seen per set number wins
            for log in ordered
                .iter()
                .filter(|l| l.exercise_id == step.exercise_id && l.belongs_to(anchor_target))
            {
                by_set.entry(log.set_number).or_insert_with(|| (*log).clone());
            }
        }

        ghosts.insert(
            step.exercise_id,
            LastPerformance {
                anchor: (*anchor).clone(),
                by_set,
            },
        );
    }

    tracing::debug!("Resolved ghost values for {} exercises", ghosts.len());
    ghosts
}
