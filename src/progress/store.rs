//! File-backed progress store — the single source of truth for restarts.
//!
//! The whole map is persisted after every state transition so a crash at
//! any point loses at most the transition in flight. Writes go to a
//! sibling temp file which is then renamed over the canonical path, so a
//! reader never observes a partially written file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

use super::record::{JobRecord, JobState, StateCounts};
use crate::error::AppError;
use crate::input::Item;

/// Durable mapping from item path to [`JobRecord`].
///
/// All mutation goes through [`ProgressStore::update`], which mutates and
/// persists under one lock. Concurrent per-item tasks therefore serialize
/// at the point of mutation and never interleave partial writes.
pub struct ProgressStore {
    path: PathBuf,
    records: Mutex<HashMap<String, JobRecord>>,
}

impl ProgressStore {
    /// Load the progress file (if any), create a `pending` record for every
    /// item not yet tracked, and reset every `failed` record to `pending`
    /// so failures from a previous run are retried. Persists the
    /// reconciled map once before returning. Records are never dropped,
    /// even for items no longer in the input list.
    pub fn open(path: &Path, items: &[Item]) -> Result<Self> {
        let mut records: HashMap<String, JobRecord> = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read progress file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("invalid progress file {}", path.display()))?
        } else {
            HashMap::new()
        };

        for item in items {
            records
                .entry(item.path.clone())
                .or_insert_with(|| JobRecord::new(&item.path));
        }

        for record in records.values_mut() {
            if record.state == JobState::Failed {
                record.reset_for_retry();
            }
        }

        let store = Self {
            path: path.to_path_buf(),
            records: Mutex::new(records),
        };
        {
            let records = store.lock();
            store.save_locked(&records)?;
        }
        Ok(store)
    }

    /// Mutate one record and persist the whole map before returning.
    /// Creates the record if it does not exist yet.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut JobRecord)) -> Result<()> {
        let mut records = self.lock();
        let record = records
            .entry(id.to_string())
            .or_insert_with(|| JobRecord::new(id));
        f(record);
        self.save_locked(&records)
    }

    pub fn get(&self, id: &str) -> Option<JobRecord> {
        self.lock().get(id).cloned()
    }

    /// Sorted ids of all records currently in the given state.
    pub fn ids_in_state(&self, state: JobState) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lock()
            .values()
            .filter(|r| r.state == state)
            .map(|r| r.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for record in self.lock().values() {
            counts.add(record.state);
        }
        counts
    }

    pub fn snapshot(&self) -> HashMap<String, JobRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, JobRecord>> {
        self.records.lock().expect("progress store lock poisoned")
    }

    // Atomic write: serialize to `<path>.tmp`, then rename over the
    // canonical file.
    fn save_locked(&self, records: &HashMap<String, JobRecord>) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&tmp, json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

/// Read-only counts from a progress file, for `reelbatch status`.
/// Does not apply the failed→pending reset.
pub fn read_counts(path: &Path) -> Result<StateCounts, AppError> {
    if !path.exists() {
        return Ok(StateCounts::default());
    }
    let contents = fs::read_to_string(path)?;
    let records: HashMap<String, JobRecord> = serde_json::from_str(&contents)?;
    let mut counts = StateCounts::default();
    for record in records.values() {
        counts.add(record.state);
    }
    Ok(counts)
}
