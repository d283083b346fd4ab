//! History archive of finished workflow runs.
//!
//! Records are kept in memory and mirrored to durable storage as one
//! JSON array under [`HISTORY_KEY`].  A snapshot is archived at most
//! once: uniqueness is deep equality of the snapshot, never the capture
//! time.  Storage problems are logged and otherwise ignored, so the
//! archive keeps working in memory when the store is unavailable.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use flowdeck_core::{normalize, WorkflowSnapshot};
use flowdeck_store::keys::HISTORY_KEY;
use flowdeck_store::{load_json, remove_key, save_json, KvStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of exported artifact file names.
pub const EXPORT_FILE_PREFIX: &str = "workflow-history-";

/// One archived run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowHistoryRecord {
    /// ISO-8601 capture time (when the run was archived, not when it ran).
    pub timestamp: String,
    pub snapshot: WorkflowSnapshot,
}

impl WorkflowHistoryRecord {
    /// Filesystem-safe artifact name derived from the capture time.
    pub fn export_file_name(&self) -> String {
        format!("{EXPORT_FILE_PREFIX}{}.json", self.timestamp.replace(':', "-"))
    }
}

/// A record serialized for download.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub file_name: String,
    /// Indented JSON of the record's snapshot.
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Failed to serialize history record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write export file: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only log of finished runs.
pub struct HistoryArchive {
    store: Arc<dyn KvStore>,
    records: Mutex<Vec<WorkflowHistoryRecord>>,
}

impl HistoryArchive {
    /// Load the archive from `store`.
    ///
    /// A missing or corrupt document yields an empty history.  Stored
    /// snapshots go through the normalizer, and entries without a
    /// capture time are dropped.
    pub fn open(store: Arc<dyn KvStore>) -> Self {
        let records: Vec<WorkflowHistoryRecord> =
            load_json::<Vec<Value>>(store.as_ref(), HISTORY_KEY)
                .unwrap_or_default()
                .iter()
                .filter_map(stored_record)
                .collect();

        tracing::debug!(records = records.len(), "History archive loaded");
        Self {
            store,
            records: Mutex::new(records),
        }
    }

    /// Archive `snapshot` unless a deep-equal one is already present.
    ///
    /// Returns whether a new record was added.  The full list is
    /// persisted before returning.
    pub fn record(&self, snapshot: &WorkflowSnapshot) -> bool {
        let mut records = self.lock();
        if records.iter().any(|r| r.snapshot == *snapshot) {
            tracing::debug!("Snapshot already archived");
            return false;
        }

        let record = WorkflowHistoryRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            snapshot: snapshot.clone(),
        };
        tracing::info!(
            timestamp = %record.timestamp,
            nodes = record.snapshot.node_count(),
            "Archived finished workflow",
        );
        records.push(record);
        save_json(self.store.as_ref(), HISTORY_KEY, &*records);
        true
    }

    /// All records, oldest first.
    pub fn list(&self) -> Vec<WorkflowHistoryRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every record, in memory and in storage.
    pub fn clear(&self) {
        self.lock().clear();
        remove_key(self.store.as_ref(), HISTORY_KEY);
    }

    /// Serialize `record` for download.
    pub fn export(record: &WorkflowHistoryRecord) -> Result<ExportArtifact, ArchiveError> {
        Ok(ExportArtifact {
            file_name: record.export_file_name(),
            bytes: serde_json::to_vec_pretty(&record.snapshot)?,
        })
    }

    /// Write the export of `record` into `dir`, returning the file path.
    pub fn export_to_dir(
        record: &WorkflowHistoryRecord,
        dir: &Path,
    ) -> Result<PathBuf, ArchiveError> {
        let artifact = Self::export(record)?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&artifact.file_name);
        std::fs::write(&path, &artifact.bytes)?;
        tracing::info!(path = %path.display(), "Exported workflow history record");
        Ok(path)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WorkflowHistoryRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn stored_record(value: &Value) -> Option<WorkflowHistoryRecord> {
    let timestamp = value.get("timestamp")?.as_str()?.to_string();
    let snapshot = normalize(value.get("snapshot").unwrap_or(&Value::Null));
    Some(WorkflowHistoryRecord {
        timestamp,
        snapshot,
    })
}
