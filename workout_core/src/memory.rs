//! In-memory platform backed by an optional JSON snapshot.
//!
//! Used by tests and by the shell's offline mode. Snapshots are read under a
//! shared lock and written atomically (temp file, fsync, rename).

use crate::platform::{
    AppointmentRow, DataPlatform, RegistrationRow, ScheduledSessionRow, ScheduledStatus,
    SessionTemplateRow,
};
use crate::{Error, LogKey, Result, WorkoutLog, WorkoutTarget};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// All platform tables the runner touches
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Snapshot {
    #[serde(default)]
    pub sessions: Vec<SessionTemplateRow>,
    #[serde(default)]
    pub scheduled_sessions: Vec<ScheduledSessionRow>,
    #[serde(default)]
    pub appointments: Vec<AppointmentRow>,
    #[serde(default)]
    pub appointment_registrations: Vec<RegistrationRow>,
    #[serde(default)]
    pub workout_logs: Vec<WorkoutLog>,
}

impl Snapshot {
    /// Load a snapshot with shared locking
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        let snapshot = serde_json::from_str(&contents)?;
        tracing::debug!("Loaded platform snapshot from {:?}", path);
        Ok(snapshot)
    }

    /// Save a snapshot atomically with exclusive locking
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved platform snapshot to {:?}", path);
        Ok(())
    }
}

/// Platform whose tables live in memory
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    tables: RefCell<Snapshot>,
    fail_writes: Cell<bool>,
}

impl MemoryPlatform {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            tables: RefCell::new(snapshot),
            fail_writes: Cell::new(false),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Snapshot::load(path)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.tables.borrow().save(path)
    }

    /// Make every write fail, as during a network outage
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Copy of the current tables
    pub fn snapshot(&self) -> Snapshot {
        self.tables.borrow().clone()
    }

    pub fn logs(&self) -> Vec<WorkoutLog> {
        self.tables.borrow().workout_logs.clone()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.get() {
            return Err(Error::Persistence("platform unreachable".into()));
        }
        Ok(())
    }
}

impl DataPlatform for MemoryPlatform {
    fn scheduled_session(&self, id: Uuid) -> Result<Option<ScheduledSessionRow>> {
        let tables = self.tables.borrow();
        let Some(row) = tables.scheduled_sessions.iter().find(|s| s.id == id) else {
            return Ok(None);
        };

        let mut row = row.clone();
        if row.session.is_none() {
            row.session = row
                .session_id
                .and_then(|sid| tables.sessions.iter().find(|t| t.id == sid).cloned());
        }
        Ok(Some(row))
    }

    fn session_template(&self, id: Uuid) -> Result<Option<SessionTemplateRow>> {
        Ok(self
            .tables
            .borrow()
            .sessions
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    fn appointment(&self, id: Uuid) -> Result<Option<AppointmentRow>> {
        Ok(self
            .tables
            .borrow()
            .appointments
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    fn is_registered(&self, client_id: Uuid, appointment_id: Uuid) -> Result<bool> {
        Ok(self
            .tables
            .borrow()
            .appointment_registrations
            .iter()
            .any(|r| r.client_id == client_id && r.appointment_id == appointment_id))
    }

    fn exercise_history(
        &self,
        client_id: Uuid,
        exercise_ids: &[Uuid],
        limit: usize,
    ) -> Result<Vec<WorkoutLog>> {
        let mut logs: Vec<WorkoutLog> = self
            .tables
            .borrow()
            .workout_logs
            .iter()
            .filter(|l| l.client_id == client_id && exercise_ids.contains(&l.exercise_id))
            .cloned()
            .collect();

        logs.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        logs.truncate(limit);
        Ok(logs)
    }

    fn target_logs(&self, client_id: Uuid, target: WorkoutTarget) -> Result<Vec<WorkoutLog>> {
        Ok(self
            .tables
            .borrow()
            .workout_logs
            .iter()
            .filter(|l| l.client_id == client_id && l.belongs_to(target))
            .cloned()
            .collect())
    }

    fn upsert_log(&self, log: &WorkoutLog) -> Result<()> {
        self.check_writable()?;
        let key = log
            .key()
            .ok_or_else(|| Error::Persistence("log has no session or appointment".into()))?;

        let mut tables = self.tables.borrow_mut();
        let logs = &mut tables.workout_logs;
        match logs.iter().position(|l| l.key() == Some(key)) {
            Some(i) => logs[i] = log.clone(),
            None => logs.push(log.clone()),
        }
        Ok(())
    }

    fn delete_log(&self, key: &LogKey) -> Result<()> {
        self.check_writable()?;
        self.tables
            .borrow_mut()
            .workout_logs
            .retain(|l| l.key().as_ref() != Some(key));
        Ok(())
    }

    fn complete_scheduled_session(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
        duration_seconds: u32,
    ) -> Result<()> {
        self.check_writable()?;
        let mut tables = self.tables.borrow_mut();
        let row = tables
            .scheduled_sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("scheduled session {}", id)))?;

        row.status = ScheduledStatus::Completed;
        row.completed_at = Some(completed_at);
        row.duration_seconds = Some(duration_seconds);
        Ok(())
    }
}
