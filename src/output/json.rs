//! JSON output formatter for duplicate groups.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "groups": [
//!     {
//!       "fingerprint": "exact:9f86d0...",
//!       "domain": "exact",
//!       "count": 2,
//!       "reclaimable_space": 1024,
//!       "files": [
//!         { "path": "/photos/a.jpg", "size": 1024, "modified": "2024-05-01T10:00:00Z" },
//!         { "path": "/photos/b.jpg", "size": 1024, "modified": "2024-05-01T10:00:00Z" }
//!       ]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 3,
//!     "hashed_files": 3,
//!     "failed_files": 0,
//!     "duplicate_groups": 1,
//!     "duplicate_files": 2,
//!     "reclaimable_space": 1024,
//!     "scan_duration_ms": 12,
//!     "interrupted": false,
//!     "snapshot_path": "/home/me/.local/share/mediadupe/snapshots/scan-....json",
//!     "exit_code": 0,
//!     "exit_code_name": "MD000"
//!   }
//! }
//! ```

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::error::ExitCode;
use crate::scanner::path_utils;

/// One group member in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    /// Absolute path
    #[serde(serialize_with = "path_utils::serialize_lossy")]
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Modification time
    pub modified: DateTime<Utc>,
}

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Domain-tagged fingerprint
    pub fingerprint: String,
    /// Fingerprint domain prefix
    pub domain: &'static str,
    /// Number of members
    pub count: usize,
    /// Bytes freed by keeping one copy
    pub reclaimable_space: u64,
    /// Members in grouper order
    pub files: Vec<JsonFile>,
}

impl From<&DuplicateGroup> for JsonDuplicateGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            fingerprint: group.fingerprint.to_string(),
            domain: group.fingerprint.domain().prefix(),
            count: group.len(),
            reclaimable_space: group.reclaimable_space(),
            files: group
                .members
                .iter()
                .map(|m| JsonFile {
                    path: m.path.clone(),
                    size: m.size,
                    modified: m.modified.into(),
                })
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Candidates found by the enumerator
    pub total_files: usize,
    /// Records that received a fingerprint
    pub hashed_files: usize,
    /// Records left without a fingerprint
    pub failed_files: usize,
    /// Directory entries skipped during enumeration
    pub skipped_entries: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Files across all duplicate groups
    pub duplicate_files: usize,
    /// Bytes freed by keeping one copy per group
    pub reclaimable_space: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Whether the scan was interrupted
    pub interrupted: bool,
    /// Last snapshot written
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "path_utils::serialize_lossy_opt"
    )]
    pub snapshot_path: Option<PathBuf>,
    /// Snapshot write failures
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snapshot_errors: Vec<String>,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "MD000")
    pub exit_code_name: &'static str,
}

impl JsonSummary {
    /// Create a JSON summary from a ScanSummary and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            hashed_files: summary.hashed_files,
            failed_files: summary.failed_files,
            skipped_entries: summary.skipped_entries,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
            interrupted: summary.interrupted,
            snapshot_path: summary.snapshot_path.clone(),
            snapshot_errors: summary.snapshot_errors.clone(),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate groups
    pub groups: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from duplicate groups, summary and exit code.
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            groups: groups.iter().map(JsonDuplicateGroup::from).collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    ///
    /// # Example
    ///
    /// ```
    /// use mediadupe::duplicates::ScanSummary;
    /// use mediadupe::error::ExitCode;
    /// use mediadupe::output::json::JsonOutput;
    ///
    /// let output = JsonOutput::new(&[], &ScanSummary::default(), ExitCode::NoDuplicates);
    /// let json = output.to_json_pretty().unwrap();
    /// assert!(json.contains("\"exit_code_name\": \"MD002\""));
    /// ```
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
