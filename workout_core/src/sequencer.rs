//! Step sequencing for a live workout.
//!
//! ## Transition rules
//!
//! 1. **Set completed** (the active set only):
//!    - grouped step with rest: always rest
//!    - standalone step with rest: rest unless it was the last set
//!    - otherwise advance immediately
//!
//! 2. **Advance** (rest expired or skipped, same path):
//!    - standalone: next set, else next step, else completed
//!    - circuit/interval: next step of the group in the same round; after the
//!      group's last step loop to its first step until the round target is
//!      met, then leave the group
//!    - AMRAP: loop to the first step forever; only [`StepSequencer::exit_group`]
//!      or navigation leaves it

use crate::timers::RestTimer;
use crate::{Error, GroupKind, Result, WorkoutStep};

/// Externally visible sequencer state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerState {
    AtSet { step: usize, set: usize },
    Resting { seconds_remaining: u32 },
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Active,
    Resting(RestTimer),
    Completed,
}

/// Walks the flattened steps set by set
#[derive(Clone, Debug)]
pub struct StepSequencer {
    steps: Vec<WorkoutStep>,
    step_index: usize,
    set_index: usize,
    phase: Phase,
}

impl StepSequencer {
    pub fn new(steps: Vec<WorkoutStep>) -> Self {
        let phase = if steps.is_empty() {
            Phase::Completed
        } else {
            Phase::Active
        };
        Self {
            steps,
            step_index: 0,
            set_index: 0,
            phase,
        }
    }

    pub fn steps(&self) -> &[WorkoutStep] {
        &self.steps
    }

    pub fn state(&self) -> SequencerState {
        match self.phase {
            Phase::Active => SequencerState::AtSet {
                step: self.step_index,
                set: self.set_index,
            },
            Phase::Resting(rest) => SequencerState::Resting {
                seconds_remaining: rest.remaining,
            },
            Phase::Completed => SequencerState::Completed,
        }
    }

    /// Current (step, set) position, also while resting
    pub fn position(&self) -> Option<(usize, usize)> {
        match self.phase {
            Phase::Completed => None,
            _ => Some((self.step_index, self.set_index)),
        }
    }

    pub fn current_step(&self) -> Option<&WorkoutStep> {
        self.position().map(|(step, _)| &self.steps[step])
    }

    pub fn rest(&self) -> Option<RestTimer> {
        match self.phase {
            Phase::Resting(rest) => Some(rest),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Completed
    }

    /// Rule 1: the active set was marked complete
    pub fn complete_current(&mut self) -> SequencerState {
        if self.phase != Phase::Active {
            return self.state();
        }

        let step = &self.steps[self.step_index];
        let is_last_set = self.set_index + 1 >= step.sets as usize;

        if step.rest_seconds > 0 && (step.group.is_some() || !is_last_set) {
            tracing::debug!(
                "Set {} of {} done, resting {}s",
                self.set_index + 1,
                step.name,
                step.rest_seconds
            );
            self.phase = Phase::Resting(RestTimer::new(step.rest_seconds));
            return self.state();
        }

        self.advance()
    }

    /// Skip the remaining rest; identical to letting it expire
    pub fn skip_rest(&mut self) -> SequencerState {
        if matches!(self.phase, Phase::Resting(_)) {
            return self.advance();
        }
        self.state()
    }

    /// One second of rest; returns true when the rest expired and advanced
    pub fn tick(&mut self) -> bool {
        let Phase::Resting(mut rest) = self.phase else {
            return false;
        };

        if rest.tick() {
            self.advance();
            true
        } else {
            self.phase = Phase::Resting(rest);
            false
        }
    }

    /// Rule 2: move to the next position
    pub fn advance(&mut self) -> SequencerState {
        if self.phase == Phase::Completed {
            return self.state();
        }

        match self.next_position() {
            Some((step, set)) => {
                self.step_index = step;
                self.set_index = set;
                self.phase = Phase::Active;
                tracing::debug!("Advanced to step {} set {}", step + 1, set + 1);
            }
            None => {
                self.phase = Phase::Completed;
                tracing::info!("All steps done");
            }
        }
        self.state()
    }

    /// Jump to a step's first set, dropping any rest
    pub fn navigate_to(&mut self, step_index: usize) -> Result<SequencerState> {
        if step_index >= self.steps.len() {
            return Err(Error::InvalidAction(format!(
                "step {} does not exist (workout has {})",
                step_index + 1,
                self.steps.len()
            )));
        }

        self.step_index = step_index;
        self.set_index = 0;
        self.phase = Phase::Active;
        Ok(self.state())
    }

    /// Leave the current group, e.g. when an AMRAP block is stopped
    pub fn exit_group(&mut self) -> Result<SequencerState> {
        if self.phase == Phase::Completed {
            return Ok(self.state());
        }
        if self.steps[self.step_index].group.is_none() {
            return Err(Error::InvalidAction("current step is not in a group".into()));
        }

        let (_, last) = self.group_bounds(self.step_index);
        match self.after(last) {
            Some((step, set)) => {
                self.step_index = step;
                self.set_index = set;
                self.phase = Phase::Active;
            }
            None => self.phase = Phase::Completed,
        }
        Ok(self.state())
    }

    fn next_position(&self) -> Option<(usize, usize)> {
        let step = &self.steps[self.step_index];

        let Some(kind) = step.group_kind() else {
            if self.set_index + 1 < step.sets as usize {
                return Some((self.step_index, self.set_index + 1));
            }
            return self.after(self.step_index);
        };

        let (first, last) = self.group_bounds(self.step_index);
        if self.step_index < last {
            return Some((self.step_index + 1, self.set_index));
        }

        match kind {
            GroupKind::Amrap => Some((first, self.set_index + 1)),
            GroupKind::Circuit | GroupKind::Interval => {
                let rounds = step.target_rounds() as usize;
                if self.set_index + 1 < rounds {
                    Some((first, self.set_index + 1))
                } else {
                    self.after(last)
                }
            }
        }
    }

    fn after(&self, step_index: usize) -> Option<(usize, usize)> {
        (step_index + 1 < self.steps.len()).then_some((step_index + 1, 0))
    }

    /// First and last index of the contiguous group containing `index`
    fn group_bounds(&self, index: usize) -> (usize, usize) {
        let group_id = self.steps[index].group_id();
        let same = |i: usize| group_id.is_some() && self.steps[i].group_id() == group_id;

        let mut first = index;
        while first > 0 && same(first - 1) {
            first -= 1;
        }
        let mut last = index;
        while last + 1 < self.steps.len() && same(last + 1) {
            last += 1;
        }
        (first, last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Prescription, StepGroup};
    use uuid::Uuid;

    fn step(name: &str, sets: u32, rest_seconds: u32, group: Option<StepGroup>) -> WorkoutStep {
        WorkoutStep {
            exercise_id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            video_url: None,
            prescription: Prescription::Standard {
                reps: 10,
                weight: None,
            },
            sets,
            rest_seconds,
            group,
            sequence: 0,
        }
    }

    fn group(kind: GroupKind, repetitions: Option<u32>) -> StepGroup {
        StepGroup {
            id: Uuid::new_v4(),
            kind,
            name: "Block".into(),
            round_duration_seconds: Some(600),
            repetitions,
        }
    }

    #[test]
    fn test_standalone_scenario() {
        let mut seq = StepSequencer::new(vec![step("Squat", 3, 30, None), step("Row", 1, 0, None)]);

        assert_eq!(seq.complete_current(), SequencerState::Resting { seconds_remaining: 30 });
        assert_eq!(seq.skip_rest(), SequencerState::AtSet { step: 0, set: 1 });

        seq.complete_current();
        seq.skip_rest();
        assert_eq!(seq.state(), SequencerState::AtSet { step: 0, set: 2 });

        // Last set: no rest screen
        assert_eq!(seq.complete_current(), SequencerState::AtSet { step: 1, set: 0 });
        assert_eq!(seq.complete_current(), SequencerState::Completed);
    }

    #[test]
    fn test_zero_rest_advances_directly() {
        let mut seq = StepSequencer::new(vec![step("Pushup", 2, 0, None)]);
        assert_eq!(seq.complete_current(), SequencerState::AtSet { step: 0, set: 1 });
    }

    #[test]
    fn test_rest_expiry_matches_skip() {
        let steps = vec![step("Squat", 2, 3, None)];
        let mut skipped = StepSequencer::new(steps.clone());
        let mut waited = StepSequencer::new(steps);

        skipped.complete_current();
        skipped.skip_rest();

        waited.complete_current();
        assert!(!waited.tick());
        assert!(!waited.tick());
        assert_eq!(waited.state(), SequencerState::Resting { seconds_remaining: 1 });
        assert!(waited.tick());

        assert_eq!(waited.state(), skipped.state());
    }

    #[test]
    fn test_circuit_scenario_three_rounds() {
        let circuit = group(GroupKind::Circuit, Some(3));
        let mut seq = StepSequencer::new(vec![
            step("Burpee", 1, 15, Some(circuit.clone())),
            step("Swing", 1, 15, Some(circuit)),
            step("Stretch", 1, 0, None),
        ]);

        for round in 0..3 {
            assert_eq!(seq.state(), SequencerState::AtSet { step: 0, set: round });
            assert!(matches!(seq.complete_current(), SequencerState::Resting { .. }));
            assert_eq!(seq.skip_rest(), SequencerState::AtSet { step: 1, set: round });

            // Grouped steps rest even after the final round
            assert!(matches!(seq.complete_current(), SequencerState::Resting { .. }));
            seq.skip_rest();
        }

        assert_eq!(seq.state(), SequencerState::AtSet { step: 2, set: 0 });
    }

    #[test]
    fn test_interval_rounds_fall_back_to_sets() {
        let interval = group(GroupKind::Interval, None);
        let mut seq = StepSequencer::new(vec![step("Sprint", 2, 0, Some(interval))]);

        assert_eq!(seq.complete_current(), SequencerState::AtSet { step: 0, set: 1 });
        assert_eq!(seq.complete_current(), SequencerState::Completed);
    }

    #[test]
    fn test_circuit_rounds_use_larger_of_repetitions_and_sets() {
        let circuit = group(GroupKind::Circuit, Some(2));
        let mut seq = StepSequencer::new(vec![step("Jump", 4, 0, Some(circuit))]);

        let mut rounds = 0;
        while !seq.is_completed() {
            seq.complete_current();
            rounds += 1;
        }
        assert_eq!(rounds, 4);
    }

    #[test]
    fn test_amrap_never_completes_on_its_own() {
        let amrap = group(GroupKind::Amrap, Some(1));
        let mut seq = StepSequencer::new(vec![
            step("Thruster", 1, 10, Some(amrap.clone())),
            step("Pullup", 1, 0, Some(amrap)),
        ]);

        for _ in 0..50 {
            seq.complete_current();
            seq.skip_rest();
            assert!(!seq.is_completed());
        }
        // Two intents per round: 25 rounds done
        assert_eq!(seq.state(), SequencerState::AtSet { step: 0, set: 25 });

        assert_eq!(seq.exit_group().unwrap(), SequencerState::Completed);
    }

    #[test]
    fn test_exit_group_lands_after_group() {
        let amrap = group(GroupKind::Amrap, None);
        let mut seq = StepSequencer::new(vec![
            step("Thruster", 1, 0, Some(amrap)),
            step("Cooldown", 1, 0, None),
        ]);

        seq.complete_current();
        assert_eq!(seq.exit_group().unwrap(), SequencerState::AtSet { step: 1, set: 0 });
        assert!(seq.exit_group().is_err());
    }

    #[test]
    fn test_navigate_resets_set_and_rest() {
        let mut seq = StepSequencer::new(vec![step("A", 3, 60, None), step("B", 3, 60, None)]);
        seq.complete_current();
        seq.skip_rest();
        seq.complete_current();
        assert!(seq.rest().is_some());

        assert_eq!(seq.navigate_to(1).unwrap(), SequencerState::AtSet { step: 1, set: 0 });
        assert!(seq.rest().is_none());
        assert_eq!(seq.navigate_to(0).unwrap(), SequencerState::AtSet { step: 0, set: 0 });
        assert!(seq.navigate_to(2).is_err());
    }

    #[test]
    fn test_navigate_reopens_completed_workout() {
        let mut seq = StepSequencer::new(vec![step("A", 1, 0, None)]);
        seq.complete_current();
        assert!(seq.is_completed());
        assert_eq!(seq.navigate_to(0).unwrap(), SequencerState::AtSet { step: 0, set: 0 });
    }

    #[test]
    fn test_empty_workout_starts_completed() {
        let mut seq = StepSequencer::new(vec![]);
        assert_eq!(seq.state(), SequencerState::Completed);
        assert_eq!(seq.complete_current(), SequencerState::Completed);
        assert!(!seq.tick());
    }

    #[test]
    fn test_complete_while_resting_is_ignored() {
        let mut seq = StepSequencer::new(vec![step("A", 3, 30, None)]);
        seq.complete_current();
        assert_eq!(seq.complete_current(), SequencerState::Resting { seconds_remaining: 30 });
    }

    #[test]
    fn test_adjacent_groups_have_separate_bounds() {
        let first = group(GroupKind::Circuit, Some(1));
        let second = group(GroupKind::Circuit, Some(2));
        let mut seq = StepSequencer::new(vec![
            step("A", 1, 0, Some(first)),
            step("B", 1, 0, Some(second.clone())),
            step("C", 1, 0, Some(second)),
        ]);

        assert_eq!(seq.complete_current(), SequencerState::AtSet { step: 1, set: 0 });
        assert_eq!(seq.complete_current(), SequencerState::AtSet { step: 2, set: 0 });
        assert_eq!(seq.complete_current(), SequencerState::AtSet { step: 1, set: 1 });
    }
}
