//! In-memory set records of the running workout.
//!
//! Seeding priority per set: a log already recorded for this workout (reload
//! protection), then the ghost from the last performance, then the step's
//! template values. Nothing here talks to the platform; the runner turns
//! completion toggles into sync operations.

use crate::history::LastPerformance;
use crate::{Error, Result, SetField, SetRecord, SetValues, WorkoutLog, WorkoutStep};
use std::collections::HashMap;
use uuid::Uuid;

/// Outcome of flipping a set's completion flag
#[derive(Clone, Debug, PartialEq)]
pub enum Toggle {
    /// The set is now complete with these values
    Completed(SetValues),
    Uncompleted,
}

/// Set records keyed by exercise
///
/// Keeps the ghosts and logs it was seeded from, so records created later
/// (AMRAP rounds past the prescribed sets) follow the same priority.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgressStore {
    sets: HashMap<Uuid, Vec<SetRecord>>,
    ghosts: HashMap<Uuid, LastPerformance>,
    current_logs: Vec<WorkoutLog>,
}

impl ProgressStore {
    /// Build the initial records; a pure function of its inputs
    pub fn seed(
        steps: &[WorkoutStep],
        ghosts: &HashMap<Uuid, LastPerformance>,
        current_logs: &[WorkoutLog],
    ) -> Self {
        let mut store = Self {
            sets: HashMap::new(),
            ghosts: ghosts.clone(),
            current_logs: current_logs.to_vec(),
        };

        for step in steps {
            if store.sets.contains_key(&step.exercise_id) {
                continue;
            }
            let records = (0..step.record_count())
                .map(|index| store.initial_record(step, index))
                .collect();
            store.sets.insert(step.exercise_id, records);
        }

        store
    }

    fn initial_record(&self, step: &WorkoutStep, index: usize) -> SetRecord {
        let mode = step.prescription.tracking_mode();
        let set_number = index as u32 + 1;

        let logged = self
            .current_logs
            .iter()
            .find(|l| l.exercise_id == step.exercise_id && l.set_number == set_number)
            .and_then(|l| SetValues::from_log(mode, l));
        if let Some(values) = logged {
            return SetRecord::logged(values);
        }

        let ghost = self
            .ghosts
            .get(&step.exercise_id)
            .and_then(|last| last.values_for(set_number, mode));
        match ghost {
            Some(values) => SetRecord::ghost(values),
            None => SetRecord::template(step.prescription.default_values()),
        }
    }

    pub fn sets(&self, exercise_id: Uuid) -> Option<&[SetRecord]> {
        self.sets.get(&exercise_id).map(Vec::as_slice)
    }

    pub fn get(&self, exercise_id: Uuid, set_index: usize) -> Option<&SetRecord> {
        self.sets.get(&exercise_id)?.get(set_index)
    }

    fn get_mut(&mut self, exercise_id: Uuid, set_index: usize) -> Result<&mut SetRecord> {
        self.sets
            .get_mut(&exercise_id)
            .and_then(|records| records.get_mut(set_index))
            .ok_or_else(|| {
                Error::InvalidAction(format!(
                    "no set {} for exercise {}",
                    set_index + 1,
                    exercise_id
                ))
            })
    }

    /// Flip completion; completing confirms the values, so the ghost flag clears
    pub fn toggle(&mut self, exercise_id: Uuid, set_index: usize) -> Result<Toggle> {
        let record = self.get_mut(exercise_id, set_index)?;
        record.completed = !record.completed;

        if record.completed {
            record.is_ghost = false;
            Ok(Toggle::Completed(record.values.clone()))
        } else {
            Ok(Toggle::Uncompleted)
        }
    }

    /// Local edit of one field; user input replaces any ghost value
    pub fn update_field(
        &mut self,
        exercise_id: Uuid,
        set_index: usize,
        field: SetField,
        value: f64,
    ) -> Result<()> {
        let record = self.get_mut(exercise_id, set_index)?;
        record.values.set_field(field, value)?;
        record.is_ghost = false;
        Ok(())
    }

    /// Grow the step's records so `set_index` exists
    ///
    /// Groups that loop past the prescribed sets (AMRAP rounds) get records
    /// seeded like the initial ones.
    pub fn ensure_set(&mut self, step: &WorkoutStep, set_index: usize) {
        let len = self.sets.get(&step.exercise_id).map_or(0, Vec::len);
        if len > set_index {
            return;
        }

        let fresh: Vec<SetRecord> = (len..=set_index)
            .map(|index| self.initial_record(step, index))
            .collect();
        self.sets.entry(step.exercise_id).or_default().extend(fresh);
    }

    pub fn completed_count(&self) -> usize {
        self.sets
            .values()
            .flat_map(|records| records.iter())
            .filter(|r| r.completed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::resolve_ghosts;
    use crate::{GroupKind, Prescription, StepGroup, WorkoutTarget};
    use chrono::Utc;

    fn step(sets: u32) -> WorkoutStep {
        WorkoutStep {
            exercise_id: Uuid::new_v4(),
            name: "Press".into(),
            description: None,
            video_url: None,
            prescription: Prescription::Standard {
                reps: 10,
                weight: Some(20.0),
            },
            sets,
            rest_seconds: 30,
            group: None,
            sequence: 0,
        }
    }

    fn log_for(target: WorkoutTarget, step: &WorkoutStep, set_number: u32, reps: u32) -> WorkoutLog {
        WorkoutLog::for_set(
            Uuid::nil(),
            target,
            step.exercise_id,
            set_number,
            &SetValues::Standard { reps, weight: 25.0 },
            Utc::now(),
        )
    }

    #[test]
    fn test_seed_without_history_uses_template() {
        let s = step(3);
        let store = ProgressStore::seed(&[s.clone()], &HashMap::new(), &[]);

        let records = store.sets(s.exercise_id).unwrap();
        assert_eq!(records.len(), 3);
        for record in records {
            assert_eq!(
                record,
                &SetRecord::template(SetValues::Standard {
                    reps: 10,
                    weight: 20.0
                })
            );
        }
    }

    #[test]
    fn test_seed_priority_logged_then_ghost_then_template() {
        let s = step(3);
        let current = WorkoutTarget::Scheduled(Uuid::new_v4());
        let previous = WorkoutTarget::Scheduled(Uuid::new_v4());

        let history = vec![log_for(previous, &s, 1, 7), log_for(previous, &s, 2, 6)];
        let ghosts = resolve_ghosts(&[s.clone()], &history, current);
        let current_logs = vec![log_for(current, &s, 1, 12)];

        let store = ProgressStore::seed(&[s.clone()], &ghosts, &current_logs);
        let records = store.sets(s.exercise_id).unwrap();

        assert!(records[0].completed && !records[0].is_ghost);
        assert_eq!(records[0].values, SetValues::Standard { reps: 12, weight: 25.0 });

        assert!(records[1].is_ghost && !records[1].completed);
        assert_eq!(records[1].values, SetValues::Standard { reps: 6, weight: 25.0 });

        // Set 3 has no matching log, so the newest one anchors it
        assert!(records[2].is_ghost);
    }

    #[test]
    fn test_seed_is_idempotent() {
        let s = step(2);
        let a = ProgressStore::seed(&[s.clone()], &HashMap::new(), &[]);
        let b = ProgressStore::seed(&[s], &HashMap::new(), &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_sizes_circuit_to_rounds() {
        let mut s = step(1);
        s.group = Some(StepGroup {
            id: Uuid::new_v4(),
            kind: GroupKind::Circuit,
            name: "C".into(),
            round_duration_seconds: None,
            repetitions: Some(4),
        });
        let store = ProgressStore::seed(&[s.clone()], &HashMap::new(), &[]);
        assert_eq!(store.sets(s.exercise_id).unwrap().len(), 4);
    }

    #[test]
    fn test_ghost_is_never_completed_until_toggled() {
        let s = step(1);
        let previous = WorkoutTarget::Appointment(Uuid::new_v4());
        let ghosts = resolve_ghosts(
            &[s.clone()],
            &[log_for(previous, &s, 1, 9)],
            WorkoutTarget::Scheduled(Uuid::new_v4()),
        );
        let mut store = ProgressStore::seed(&[s.clone()], &ghosts, &[]);

        let record = store.get(s.exercise_id, 0).unwrap();
        assert!(record.is_ghost && !record.completed);

        store.toggle(s.exercise_id, 0).unwrap();
        let record = store.get(s.exercise_id, 0).unwrap();
        assert!(record.completed && !record.is_ghost);
    }

    #[test]
    fn test_toggle_round_trip() {
        let s = step(2);
        let mut store = ProgressStore::seed(&[s.clone()], &HashMap::new(), &[]);

        assert_eq!(
            store.toggle(s.exercise_id, 1).unwrap(),
            Toggle::Completed(SetValues::Standard {
                reps: 10,
                weight: 20.0
            })
        );
        assert_eq!(store.completed_count(), 1);
        assert_eq!(store.toggle(s.exercise_id, 1).unwrap(), Toggle::Uncompleted);
        assert_eq!(store.completed_count(), 0);
    }

    #[test]
    fn test_toggle_unknown_set_is_rejected() {
        let s = step(2);
        let mut store = ProgressStore::seed(&[s.clone()], &HashMap::new(), &[]);
        assert!(store.toggle(s.exercise_id, 5).is_err());
        assert!(store.toggle(Uuid::new_v4(), 0).is_err());
    }

    #[test]
    fn test_update_field_clears_ghost() {
        let s = step(1);
        let ghosts = resolve_ghosts(
            &[s.clone()],
            &[log_for(WorkoutTarget::Scheduled(Uuid::new_v4()), &s, 1, 9)],
            WorkoutTarget::Scheduled(Uuid::new_v4()),
        );
        let mut store = ProgressStore::seed(&[s.clone()], &ghosts, &[]);

        store.update_field(s.exercise_id, 0, SetField::Weight, 27.5).unwrap();
        let record = store.get(s.exercise_id, 0).unwrap();
        assert!(!record.is_ghost);
        assert!(!record.completed);
        assert_eq!(record.values, SetValues::Standard { reps: 9, weight: 27.5 });

        assert!(store
            .update_field(s.exercise_id, 0, SetField::DistanceMeters, 100.0)
            .is_err());
    }

    #[test]
    fn test_ensure_set_grows_with_template_values() {
        let s = step(1);
        let mut store = ProgressStore::seed(&[s.clone()], &HashMap::new(), &[]);
        store.ensure_set(&s, 3);
        assert_eq!(store.sets(s.exercise_id).unwrap().len(), 4);
        assert!(!store.get(s.exercise_id, 3).unwrap().completed);
    }

    #[test]
    fn test_ensure_set_restores_logged_amrap_round() {
        let mut s = step(2);
        s.group = Some(StepGroup {
            id: Uuid::new_v4(),
            kind: GroupKind::Amrap,
            name: "A".into(),
            round_duration_seconds: Some(600),
            repetitions: None,
        });
        let current = WorkoutTarget::Scheduled(Uuid::new_v4());
        let current_logs = vec![log_for(current, &s, 3, 14)];

        let mut store = ProgressStore::seed(&[s.clone()], &HashMap::new(), &current_logs);
        assert_eq!(store.sets(s.exercise_id).unwrap().len(), 2);

        store.ensure_set(&s, 2);
        let record = store.get(s.exercise_id, 2).unwrap();
        assert!(record.completed && !record.is_ghost);
        assert_eq!(record.values, SetValues::Standard { reps: 14, weight: 25.0 });
    }

    #[test]
    fn test_ensure_set_uses_ghost_past_prescribed_sets() {
        let s = step(1);
        let previous = WorkoutTarget::Scheduled(Uuid::new_v4());
        let ghosts = resolve_ghosts(
            &[s.clone()],
            &[log_for(previous, &s, 1, 8), log_for(previous, &s, 2, 7)],
            WorkoutTarget::Scheduled(Uuid::new_v4()),
        );
        let mut store = ProgressStore::seed(&[s.clone()], &ghosts, &[]);

        store.ensure_set(&s, 1);
        let record = store.get(s.exercise_id, 1).unwrap();
        assert!(record.is_ghost && !record.completed);
        assert_eq!(record.values, SetValues::Standard { reps: 7, weight: 25.0 });
    }
}
