//! File-backed fixtures for running the nightly job outside a hosted backend.
//!
//! A data directory holds `settings.csv`, `sessions.csv`, `flags.csv` and `snapshots.json`.
//! Every file is optional; a missing file loads as an empty table.

mod export;
mod parser;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::domain::{MpiSnapshot, SnapshotKey};
use super::memory::InMemoryRankingStore;
use super::store::{SnapshotStore, StoreError};

pub const SETTINGS_FILE: &str = "settings.csv";
pub const SESSIONS_FILE: &str = "sessions.csv";
pub const FLAGS_FILE: &str = "flags.csv";
pub const SNAPSHOTS_FILE: &str = "snapshots.json";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to access data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{file} is missing required column '{column}'")]
    MissingColumn {
        file: &'static str,
        column: &'static str,
    },
    #[error("{file} line {line}: invalid {field} '{value}'")]
    InvalidField {
        file: &'static str,
        line: u64,
        field: String,
        value: String,
    },
    #[error("duplicate snapshot {0}")]
    DuplicateSnapshot(SnapshotKey),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Directory of fixture files that loads into, and saves from, an in-memory store.
#[derive(Debug, Clone)]
pub struct DataDirectory {
    root: PathBuf,
}

impl DataDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load(&self) -> Result<InMemoryRankingStore, ImportError> {
        let store = InMemoryRankingStore::new();

        if let Some(reader) = self.open(SETTINGS_FILE)? {
            for settings in parser::parse_settings(reader)? {
                store.upsert_settings(settings)?;
            }
        }

        if let Some(reader) = self.open(SESSIONS_FILE)? {
            for session in parser::parse_sessions(reader)? {
                store.insert_session(session)?;
            }
        }

        if let Some(reader) = self.open(FLAGS_FILE)? {
            for flag in parser::parse_flags(reader)? {
                store.insert_flag(flag)?;
            }
        }

        if let Some(reader) = self.open(SNAPSHOTS_FILE)? {
            let snapshots: Vec<MpiSnapshot> = serde_json::from_reader(reader)?;
            let report = store.insert_batch(snapshots)?;
            if let Some(key) = report.conflicts.into_iter().next() {
                return Err(ImportError::DuplicateSnapshot(key));
            }
        }

        info!(root = %self.root.display(), "loaded ranking data directory");
        Ok(store)
    }

    /// Write every table back so the next run sees locks, resolved flags, gates and snapshots.
    pub fn save(&self, store: &InMemoryRankingStore) -> Result<(), ImportError> {
        fs::create_dir_all(&self.root)?;

        export::write_settings(self.create(SETTINGS_FILE)?, &store.settings()?)?;
        export::write_sessions(self.create(SESSIONS_FILE)?, &store.sessions()?)?;
        export::write_flags(self.create(FLAGS_FILE)?, &store.flags()?)?;

        let mut writer = self.create(SNAPSHOTS_FILE)?;
        serde_json::to_writer_pretty(&mut writer, &store.snapshots()?)?;
        writer.flush()?;

        info!(root = %self.root.display(), "saved ranking data directory");
        Ok(())
    }

    fn open(&self, name: &str) -> Result<Option<impl Read>, ImportError> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(BufReader::new(File::open(path)?)))
    }

    fn create(&self, name: &str) -> Result<BufWriter<File>, ImportError> {
        Ok(BufWriter::new(File::create(self.root.join(name))?))
    }
}
