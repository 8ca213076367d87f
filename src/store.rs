//! Record persistence
//!
//! [`RecordStore`] is the seam between the CLI and wherever records live.
//! [`JsonFileStore`] keeps the whole set in a single JSON array on disk;
//! [`MemoryStore`] backs tests and dry runs.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StorageError;
use crate::models::{RecordSet, SleepRecord, UpsertOutcome};

/// Persistent collection of sleep records
pub trait RecordStore {
    /// Load every stored record; an absent store is an empty set
    fn load(&self) -> Result<RecordSet, StorageError>;

    /// Replace the stored set with `records`
    fn save(&mut self, records: &RecordSet) -> Result<(), StorageError>;

    /// Human-readable location for messages
    fn location(&self) -> String;

    /// All records as a plain list, newest first
    fn list_records(&self) -> Result<Vec<SleepRecord>, StorageError> {
        Ok(self.load()?.into_vec())
    }

    /// Replace the stored records; duplicate dates collapse to the last one
    fn save_records(&mut self, records: &[SleepRecord]) -> Result<(), StorageError> {
        self.save(&RecordSet::from_records(records.to_vec()))
    }

    /// Store a record under its date.
    ///
    /// An existing record for the date is only replaced when `replace` is
    /// set, in which case it keeps its id.
    fn add_record(
        &mut self,
        record: SleepRecord,
        replace: bool,
    ) -> Result<UpsertOutcome, StorageError> {
        let mut records = self.load()?;

        if !replace && records.contains_date(record.date) {
            return Err(StorageError::Duplicate {
                date: record.date.to_string(),
            });
        }

        let date = record.date;
        let outcome = records.upsert(record);
        self.save(&records)?;

        let replaced = matches!(outcome, UpsertOutcome::Replaced { .. });
        debug!(%date, replaced, "Record stored");
        Ok(outcome)
    }

    /// Delete every record, returning how many were removed
    fn clear(&mut self) -> Result<usize, StorageError> {
        let records = self.load()?;
        let removed = records.len();
        self.save(&RecordSet::new())?;
        info!(removed, "Record store cleared");
        Ok(removed)
    }
}

/// Records stored as a pretty-printed JSON array
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn access_error(&self, err: impl std::fmt::Display) -> StorageError {
        StorageError::Access {
            path: self.path.clone(),
            reason: err.to_string(),
        }
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self) -> Result<RecordSet, StorageError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Record store not found, starting empty");
            return Ok(RecordSet::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| self.access_error(e))?;
        if content.trim().is_empty() {
            return Ok(RecordSet::new());
        }

        let records: Vec<SleepRecord> =
            serde_json::from_str(&content).map_err(|e| StorageError::Corrupted {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        debug!(count = records.len(), path = %self.path.display(), "Records loaded");
        Ok(RecordSet::from_records(records))
    }

    fn save(&mut self, records: &RecordSet) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.access_error(e))?;
        }

        let json = serde_json::to_string_pretty(records).map_err(|e| self.access_error(e))?;

        // Write next to the target and rename so a crash never leaves half a file
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| self.access_error(e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| self.access_error(e))?;

        debug!(count = records.len(), path = %self.path.display(), "Records saved");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: RecordSet,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<SleepRecord>) -> Self {
        Self {
            records: RecordSet::from_records(records),
        }
    }
}

impl RecordStore for MemoryStore {
    fn load(&self) -> Result<RecordSet, StorageError> {
        Ok(self.records.clone())
    }

    fn save(&mut self, records: &RecordSet) -> Result<(), StorageError> {
        self.records = records.clone();
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
