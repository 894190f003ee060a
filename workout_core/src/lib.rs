#![forbid(unsafe_code)]

//! Core domain model and business logic of the live workout runner.
//!
//! This crate provides:
//! - Domain types (steps, groups, set records, workout logs)
//! - Data platform contract with in-memory and REST backends
//! - Session loading and last-performance ("ghost") resolution
//! - Step sequencing, rest and work timers
//! - Best-effort persistence with a replayable outbox

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod platform;
pub mod memory;
pub mod rest;
pub mod loader;
pub mod history;
pub mod progress;
pub mod timers;
pub mod sequencer;
pub mod sync;
pub mod outbox;
pub mod runner;
pub mod summary;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use platform::DataPlatform;
pub use memory::{MemoryPlatform, Snapshot};
pub use rest::RestPlatform;
pub use loader::load_session;
pub use sequencer::{SequencerState, StepSequencer};
pub use sync::{DirectSync, LogSync, SyncOp};
pub use outbox::Outbox;
pub use runner::{prepare, Prepared, WorkoutRunner};
pub use summary::WorkoutSummary;
