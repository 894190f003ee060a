//! Countdown timers and the elapsed-session clock.
//!
//! Every timer advances by whole seconds through `tick()`. The runner ticks
//! all of them from one place, so tests drive virtual time instead of
//! sleeping.

use serde::Serialize;

/// Something a timer reached during a tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerEvent {
    /// Rest ran out and the sequencer advanced
    RestExpired,
    /// Pre-start countdown of the work timer finished
    CountdownElapsed { set_index: usize },
    /// Work timer reached zero
    WorkElapsed { set_index: usize },
}

impl TimerEvent {
    /// Whether the device should vibrate for this event
    pub fn vibrates(&self) -> bool {
        matches!(
            self,
            TimerEvent::CountdownElapsed { .. } | TimerEvent::WorkElapsed { .. }
        )
    }
}

/// Rest between sets; clears itself at zero
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestTimer {
    pub remaining: u32,
    pub total: u32,
}

impl RestTimer {
    pub fn new(seconds: u32) -> Self {
        Self {
            remaining: seconds,
            total: seconds,
        }
    }

    /// Count down one second; true once the rest has run out
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

/// Per-set work timer for duration-tracked exercises
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkTimer {
    pub set_index: usize,
    pub remaining: u32,
    pub total: u32,
    pub running: bool,
    /// Seconds left in the pre-start countdown, if still counting down
    pub countdown: Option<u32>,
}

impl WorkTimer {
    /// A running timer that opens with the pre-start countdown
    pub fn start(set_index: usize, total: u32, countdown_seconds: u32) -> Self {
        Self {
            set_index,
            remaining: total,
            total,
            running: true,
            countdown: (countdown_seconds > 0).then_some(countdown_seconds),
        }
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        if self.remaining > 0 {
            self.running = true;
        }
    }

    /// Back to the full duration, paused, without a countdown
    pub fn reset(&mut self) {
        self.remaining = self.total;
        self.running = false;
        self.countdown = None;
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0 && self.countdown.is_none()
    }

    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.running {
            return None;
        }

        if let Some(left) = self.countdown {
            let left = left.saturating_sub(1);
            if left == 0 {
                self.countdown = None;
                return Some(TimerEvent::CountdownElapsed {
                    set_index: self.set_index,
                });
            }
            self.countdown = Some(left);
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            return Some(TimerEvent::WorkElapsed {
                set_index: self.set_index,
            });
        }
        None
    }
}

/// Global elapsed-session counter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ElapsedClock {
    pub seconds: u32,
    pub paused: bool,
}

impl ElapsedClock {
    pub fn tick(&mut self) {
        if !self.paused {
            self.seconds += 1;
        }
    }

    /// Flip the pause flag and return the new value
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }
}
