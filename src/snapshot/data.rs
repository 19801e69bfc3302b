//! Data structures for scan snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::duplicates::FingerprintRecord;
use crate::scanner::{path_utils, Fingerprint, FingerprintMode};

/// Current version of the snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Pipeline stage a snapshot was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStage {
    /// After enumeration; no fingerprints yet.
    Listed,
    /// After fingerprinting, complete or cancelled.
    Hashed,
}

impl std::fmt::Display for SnapshotStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listed => write!(f, "listed"),
            Self::Hashed => write!(f, "hashed"),
        }
    }
}

/// A point-in-time record of one scan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSnapshot {
    /// Format version.
    pub version: u32,
    /// When this snapshot was produced.
    pub generated: DateTime<Utc>,
    /// Pipeline stage.
    pub stage: SnapshotStage,
    /// Scanned root.
    #[serde(serialize_with = "path_utils::serialize_lossy")]
    pub folder: PathBuf,
    /// Whether the scan was recursive.
    pub recurse: bool,
    /// Fingerprinting mode.
    pub method: FingerprintMode,
    /// Number of entries in `files`.
    #[serde(rename = "fileCount")]
    pub file_count: usize,
    /// One entry per record, in pipeline order.
    pub files: Vec<SnapshotFile>,
}

/// One file entry in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// Absolute path. Names that are not valid UTF-8 are stored lossily.
    #[serde(serialize_with = "path_utils::serialize_lossy")]
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Modification time.
    #[serde(rename = "lastWriteTime")]
    pub last_write_time: DateTime<Utc>,
    /// Domain-tagged fingerprint, `null` when not computed or failed.
    pub fingerprint: Option<Fingerprint>,
    /// Bare SHA-256 hex for exact fingerprints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl From<&FingerprintRecord> for SnapshotFile {
    fn from(record: &FingerprintRecord) -> Self {
        Self {
            path: record.path.clone(),
            size: record.size,
            last_write_time: DateTime::<Utc>::from(record.modified),
            sha256: record.fingerprint.as_ref().and_then(Fingerprint::sha256_hex),
            fingerprint: record.fingerprint.clone(),
        }
    }
}

impl From<&SnapshotFile> for FingerprintRecord {
    fn from(file: &SnapshotFile) -> Self {
        Self {
            path: file.path.clone(),
            size: file.size,
            modified: file.last_write_time.into(),
            fingerprint: file.fingerprint.clone(),
        }
    }
}

impl ScanSnapshot {
    /// Build a snapshot of `records` stamped with the current time.
    #[must_use]
    pub fn new(
        stage: SnapshotStage,
        folder: PathBuf,
        recurse: bool,
        method: FingerprintMode,
        records: &[FingerprintRecord],
    ) -> Self {
        let files: Vec<SnapshotFile> = records.iter().map(SnapshotFile::from).collect();
        Self {
            version: SNAPSHOT_VERSION,
            generated: Utc::now(),
            stage,
            folder,
            recurse,
            method,
            file_count: files.len(),
            files,
        }
    }

    /// Rebuild fingerprint records from this snapshot.
    #[must_use]
    pub fn records(&self) -> Vec<FingerprintRecord> {
        self.files.iter().map(FingerprintRecord::from).collect()
    }

    /// Number of entries that carry a fingerprint.
    #[must_use]
    pub fn fingerprinted_count(&self) -> usize {
        self.files.iter().filter(|f| f.fingerprint.is_some()).count()
    }
}
