//! Per-file fingerprint record.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::scanner::{path_utils, CandidateFile, Fingerprint};

/// One record per candidate file.
///
/// `fingerprint` is `None` until the engine has processed the file, and
/// stays `None` when hashing failed. Such records are kept for the snapshot
/// but never join a duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    /// Absolute path
    #[serde(serialize_with = "path_utils::serialize_lossy")]
    pub path: PathBuf,
    /// Size in bytes at enumeration time
    pub size: u64,
    /// Modification time at enumeration time
    pub modified: SystemTime,
    /// Domain-tagged fingerprint, if computed
    pub fingerprint: Option<Fingerprint>,
}

impl FingerprintRecord {
    /// Create a record with no fingerprint.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            modified,
            fingerprint: None,
        }
    }

    /// Attach a fingerprint.
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Whether the engine produced a fingerprint for this file.
    #[must_use]
    pub fn is_fingerprinted(&self) -> bool {
        self.fingerprint.is_some()
    }

    /// Identity key for this record's path.
    #[must_use]
    pub fn identity(&self) -> String {
        path_utils::path_key(&self.path)
    }

    /// Parent directory, or an empty path.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// File name as a lossy string.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl From<CandidateFile> for FingerprintRecord {
    fn from(file: CandidateFile) -> Self {
        Self::new(file.path, file.size, file.modified)
    }
}

impl From<&CandidateFile> for FingerprintRecord {
    fn from(file: &CandidateFile) -> Self {
        Self::new(file.path.clone(), file.size, file.modified)
    }
}
