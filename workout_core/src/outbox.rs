//! Durable outbox for writes the platform rejected.
//!
//! Operations are appended to a JSONL (JSON Lines) file with file locking
//! so a later `flush` can replay them.

use crate::platform::DataPlatform;
use crate::sync::SyncOp;
use crate::{Error, LogKey, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// JSONL outbox with file locking
#[derive(Clone, Debug)]
pub struct Outbox {
    path: PathBuf,
}

impl Outbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn append(&mut self, op: &SyncOp) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(op)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Queued write in outbox {:?}", self.path);
        Ok(())
    }

    /// Drop queued writes for `key`; returns how many were removed
    pub fn discard(&mut self, key: &LogKey) -> Result<usize> {
        let mut ops = read_ops(&self.path)?;
        let before = ops.len();
        ops.retain(|op| op.key().as_ref() != Some(key));

        let removed = before - ops.len();
        if removed > 0 {
            rewrite(&self.path, &ops)?;
        }
        Ok(removed)
    }
}

/// Read all queued operations
pub fn read_ops(path: &Path) -> Result<Vec<SyncOp>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut ops = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SyncOp>(&line) {
            Ok(op) => ops.push(op),
            Err(e) => {
                tracing::warn!("Skipping unreadable outbox line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    Ok(ops)
}

/// Result of replaying the outbox
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub applied: usize,
    pub remaining: usize,
}

/// Replay queued operations in order, keeping only those that fail again
pub fn replay<P: DataPlatform + ?Sized>(path: &Path, platform: &P) -> Result<ReplayReport> {
    let ops = read_ops(path)?;
    if ops.is_empty() {
        return Ok(ReplayReport::default());
    }

    let total = ops.len();
    let mut remaining = Vec::new();
    for op in ops {
        if let Err(e) = op.apply(platform) {
            tracing::warn!("Outbox replay failed, keeping entry: {}", e);
            remaining.push(op);
        }
    }

    rewrite(path, &remaining)?;
    let report = ReplayReport {
        applied: total - remaining.len(),
        remaining: remaining.len(),
    };

    tracing::info!(
        "Outbox replay: {} applied, {} remaining",
        report.applied,
        report.remaining
    );
    Ok(report)
}

/// Atomically replace the outbox contents with `ops`
fn rewrite(path: &Path, ops: &[SyncOp]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        for op in ops {
            writer.write_all(serde_json::to_string(op)?.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
