//! Deleting selected group members.
//!
//! # Overview
//!
//! - Move to system trash (default, recoverable)
//! - Permanent deletion (with [`DeleteConfig::permanent`])
//! - Existence and change checks immediately before each deletion
//! - Batch operations that aggregate failures instead of aborting
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::actions::delete::{delete_selected, DeleteConfig};
//! use mediadupe::duplicates::FingerprintRecord;
//! # let records: Vec<FingerprintRecord> = Vec::new();
//!
//! let report = delete_selected(&records, &DeleteConfig::default());
//! println!("{}", report.summary());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use thiserror::Error;

use super::locks::PathLocks;
use crate::duplicates::{DuplicateGroup, FingerprintRecord};

/// Why a single deletion did not happen.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File size or modification time differs from the scanned record.
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// Permanent delete operation failed.
    #[error("permanent delete failed for {path}: {message}")]
    PermanentDeleteFailed { path: PathBuf, message: String },

    /// The selection covers every member of a group.
    #[error("cannot delete all copies - at least one file must be preserved")]
    AllCopiesWouldBeDeleted,

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::TrashFailed { path: p, .. }
            | Self::PermanentDeleteFailed { path: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            Self::AllCopiesWouldBeDeleted => None,
        }
    }

    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// Aggregate outcome of a delete batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// Number of files removed
    pub deleted_count: usize,
    /// Number of files that could not be removed
    pub failed_count: usize,
    /// Total bytes freed
    pub bytes_freed: u64,
    /// Paths removed, in request order
    pub deleted: Vec<PathBuf>,
    /// Paths not removed with the reason
    pub failures: Vec<(PathBuf, String)>,
}

impl DeleteReport {
    /// Total number of attempted deletions.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.deleted_count + self.failed_count
    }

    /// Check if all deletions succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed_count == 0
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!(
                "Deleted {} file(s), freed {}",
                self.deleted_count,
                ByteSize::b(self.bytes_freed)
            )
        } else {
            format!(
                "Deleted {} file(s), {} failed, freed {}",
                self.deleted_count,
                self.failed_count,
                ByteSize::b(self.bytes_freed)
            )
        }
    }

    fn record_success(&mut self, path: &Path, size: u64) {
        self.deleted_count += 1;
        self.bytes_freed += size;
        self.deleted.push(path.to_path_buf());
    }

    fn record_failure(&mut self, path: &Path, error: &DeleteError) {
        self.failed_count += 1;
        self.failures.push((path.to_path_buf(), error.to_string()));
    }
}

/// Configuration for deletion operations.
#[derive(Debug, Clone)]
pub struct DeleteConfig {
    /// Use permanent deletion instead of trash.
    pub permanent: bool,
    /// Refuse to delete a file whose size or mtime changed since the scan.
    pub verify_unchanged: bool,
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self {
            permanent: false,
            verify_unchanged: true,
        }
    }
}

impl DeleteConfig {
    /// Create config for trash deletion.
    #[must_use]
    pub fn trash() -> Self {
        Self::default()
    }

    /// Create config for permanent deletion.
    #[must_use]
    pub fn permanent() -> Self {
        Self {
            permanent: true,
            ..Self::default()
        }
    }

    /// Enable/disable the size and mtime check.
    #[must_use]
    pub fn with_verify_unchanged(mut self, verify: bool) -> Self {
        self.verify_unchanged = verify;
        self
    }
}

/// Callback trait for deletion progress reporting.
pub trait DeleteProgressCallback: Send + Sync {
    /// Called before each file deletion.
    fn on_before_delete(&self, path: &Path, index: usize, total: usize);

    /// Called after successful deletion.
    fn on_delete_success(&self, path: &Path, size: u64);

    /// Called after failed deletion.
    fn on_delete_failure(&self, path: &Path, error: &str);

    /// Called when the batch completes.
    fn on_complete(&self, report: &DeleteReport);
}

/// Delete one record's backing file.
///
/// The file is re-checked immediately before the delete call: it must still
/// exist as a regular file, and with `verify_unchanged` its size and mtime
/// must match the record. Returns the number of bytes freed.
///
/// # Errors
///
/// Returns the [`DeleteError`] describing why the file was left in place.
pub fn delete_record(record: &FingerprintRecord, config: &DeleteConfig) -> Result<u64, DeleteError> {
    delete_record_with(record, config, PathLocks::shared())
}

/// [`delete_record`] against an explicit lock registry.
///
/// # Errors
///
/// See [`delete_record`].
pub fn delete_record_with(
    record: &FingerprintRecord,
    config: &DeleteConfig,
    locks: &PathLocks,
) -> Result<u64, DeleteError> {
    let path = record.path.as_path();
    let _guard = locks.lock(&[path]);

    let metadata = fs::symlink_metadata(path).map_err(|e| DeleteError::from_io(path, e))?;
    if !metadata.is_file() {
        return Err(DeleteError::NotFound(path.to_path_buf()));
    }

    if config.verify_unchanged {
        let size = metadata.len();
        if size != record.size {
            log::warn!(
                "File modified since scan: {} (size changed from {} to {})",
                path.display(),
                record.size,
                size
            );
            return Err(DeleteError::Modified(path.to_path_buf()));
        }
        if let Ok(mtime) = metadata.modified() {
            if mtime != record.modified {
                log::warn!("File modified since scan: {} (mtime changed)", path.display());
                return Err(DeleteError::Modified(path.to_path_buf()));
            }
        }
    }

    let size = metadata.len();
    if config.permanent {
        fs::remove_file(path).map_err(|e| DeleteError::PermanentDeleteFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        log::info!("Permanently deleted: {} ({})", path.display(), ByteSize::b(size));
    } else {
        trash::delete(path).map_err(|e| DeleteError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        log::info!("Moved to trash: {} ({})", path.display(), ByteSize::b(size));
    }

    Ok(size)
}

/// Delete every record in `records`.
///
/// Never fails as a whole: each record is attempted and its outcome counted.
#[must_use]
pub fn delete_selected(records: &[FingerprintRecord], config: &DeleteConfig) -> DeleteReport {
    delete_selected_with::<NoProgress>(records, config, PathLocks::shared(), None)
}

/// [`delete_selected`] with an explicit lock registry and progress callback.
pub fn delete_selected_with<C: DeleteProgressCallback>(
    records: &[FingerprintRecord],
    config: &DeleteConfig,
    locks: &PathLocks,
    callback: Option<&C>,
) -> DeleteReport {
    let mut report = DeleteReport::default();
    let total = records.len();

    for (index, record) in records.iter().enumerate() {
        let path = record.path.as_path();
        if let Some(cb) = callback {
            cb.on_before_delete(path, index, total);
        }

        match delete_record_with(record, config, locks) {
            Ok(size) => {
                if let Some(cb) = callback {
                    cb.on_delete_success(path, size);
                }
                report.record_success(path, size);
            }
            Err(e) => {
                log::warn!("Failed to delete {}: {}", path.display(), e);
                if let Some(cb) = callback {
                    cb.on_delete_failure(path, &e.to_string());
                }
                report.record_failure(path, &e);
            }
        }
    }

    if let Some(cb) = callback {
        cb.on_complete(&report);
    }
    log::info!("{}", report.summary());

    report
}

/// Delete a group's selected members and drop them from the group.
///
/// Members that could not be deleted stay in the group and stay selected.
/// The caller sees a collapsed group through [`DuplicateGroup::is_duplicate`].
///
/// # Errors
///
/// Returns [`DeleteError::AllCopiesWouldBeDeleted`] without touching the
/// filesystem when every member is selected.
pub fn delete_group_selection(
    group: &mut DuplicateGroup,
    config: &DeleteConfig,
) -> Result<DeleteReport, DeleteError> {
    validate_preserves_copy(group)?;

    let selected: Vec<FingerprintRecord> = group.selected_records().into_iter().cloned().collect();
    let report = delete_selected(&selected, config);

    let deleted: std::collections::HashSet<&Path> =
        report.deleted.iter().map(PathBuf::as_path).collect();
    let mut kept = Vec::with_capacity(group.members.len());
    let mut kept_selection = std::collections::BTreeSet::new();
    for (index, member) in std::mem::take(&mut group.members).into_iter().enumerate() {
        if deleted.contains(member.path.as_path()) {
            continue;
        }
        if group.selected.contains(&index) {
            kept_selection.insert(kept.len());
        }
        kept.push(member);
    }
    group.members = kept;
    group.selected = kept_selection;

    if !group.is_duplicate() {
        log::info!(
            "Group {} collapsed to {} member(s) after deletion",
            group.fingerprint,
            group.len()
        );
    }

    Ok(report)
}

/// Refuse a selection that covers every member of `group`.
///
/// # Errors
///
/// Returns [`DeleteError::AllCopiesWouldBeDeleted`] if no member would remain.
pub fn validate_preserves_copy(group: &DuplicateGroup) -> Result<(), DeleteError> {
    let preserved = group.len() - group.selected_records().len();
    if preserved == 0 {
        log::error!(
            "Attempted to delete all {} copies of group {}",
            group.len(),
            group.fingerprint
        );
        Err(DeleteError::AllCopiesWouldBeDeleted)
    } else {
        log::debug!(
            "Deletion validated: {} selected, {} preserved",
            group.selected.len(),
            preserved
        );
        Ok(())
    }
}

struct NoProgress;

impl DeleteProgressCallback for NoProgress {
    fn on_before_delete(&self, _path: &Path, _index: usize, _total: usize) {}
    fn on_delete_success(&self, _path: &Path, _size: u64) {}
    fn on_delete_failure(&self, _path: &Path, _error: &str) {}
    fn on_complete(&self, _report: &DeleteReport) {}
}
