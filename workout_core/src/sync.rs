//! Best-effort persistence of workout progress.
//!
//! The runner updates its local state first and hands every write to a
//! [`LogSync`]. A failed write is logged and the workout carries on; local
//! state stays authoritative for the rest of the session.

use crate::outbox::Outbox;
use crate::platform::DataPlatform;
use crate::{LogKey, Result, WorkoutLog};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A write destined for the platform
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SyncOp {
    Upsert {
        log: WorkoutLog,
    },
    Delete {
        key: LogKey,
    },
    CompleteSession {
        scheduled_session_id: Uuid,
        completed_at: DateTime<Utc>,
        duration_seconds: u32,
    },
}

impl SyncOp {
    /// Row the write targets; completion updates carry no log key
    pub fn key(&self) -> Option<LogKey> {
        match self {
            SyncOp::Upsert { log } => log.key(),
            SyncOp::Delete { key } => Some(*key),
            SyncOp::CompleteSession { .. } => None,
        }
    }

    /// Send the write to the platform
    pub fn apply<P: DataPlatform + ?Sized>(&self, platform: &P) -> Result<()> {
        match self {
            SyncOp::Upsert { log } => platform.upsert_log(log),
            SyncOp::Delete { key } => platform.delete_log(key),
            SyncOp::CompleteSession {
                scheduled_session_id,
                completed_at,
                duration_seconds,
            } => platform.complete_scheduled_session(
                *scheduled_session_id,
                *completed_at,
                *duration_seconds,
            ),
        }
    }
}

/// Sink for runner writes; never reports failure back
pub trait LogSync {
    fn submit(&mut self, op: SyncOp);
}

/// Applies writes straight to a platform
///
/// With an outbox attached, writes that fail are kept for a later replay
/// instead of being dropped. A newer write for the same row drops whatever
/// the outbox still holds for it, so a replay never undoes it.
pub struct DirectSync<P> {
    platform: P,
    outbox: Option<Outbox>,
    failures: usize,
}

impl<P: DataPlatform> DirectSync<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            outbox: None,
            failures: 0,
        }
    }

    pub fn with_outbox(mut self, outbox: Outbox) -> Self {
        self.outbox = Some(outbox);
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Writes that failed during this session
    pub fn failures(&self) -> usize {
        self.failures
    }
}

impl<P: DataPlatform> LogSync for DirectSync<P> {
    fn submit(&mut self, op: SyncOp) {
        if let (Some(outbox), Some(key)) = (self.outbox.as_mut(), op.key()) {
            match outbox.discard(&key) {
                Ok(0) => {}
                Ok(n) => tracing::debug!("Superseded {} queued writes for {:?}", n, key),
                Err(e) => tracing::warn!("Failed to prune outbox: {}", e),
            }
        }

        match op.apply(&self.platform) {
            Ok(()) => tracing::debug!("Synced {:?}", op),
            Err(e) => {
                self.failures += 1;
                tracing::warn!("Sync failed, keeping local state: {}", e);

                if let Some(outbox) = self.outbox.as_mut() {
                    if let Err(e) = outbox.append(&op) {
                        tracing::warn!("Failed to record write in outbox: {}", e);
                    }
                }
            }
        }
    }
}

/// Keeps every write in memory without sending it anywhere
impl LogSync for Vec<SyncOp> {
    fn submit(&mut self, op: SyncOp) {
        self.push(op);
    }
}
