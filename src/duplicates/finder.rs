//! Scan pipeline orchestration.
//!
//! # Overview
//!
//! [`DuplicateFinder::find_duplicates`] runs the stages in order, each a
//! full barrier before the next:
//!
//! 1. **Enumerate** candidates under the root
//! 2. **Snapshot** `listed` (all fingerprints null)
//! 3. **Fingerprint** every candidate on a bounded pool
//! 4. **Snapshot** `hashed` (also written when cancelled)
//! 5. **Group** records by fingerprint
//!
//! Snapshot failures are logged and counted, never fatal. Only a missing
//! root, a non-directory root, an empty candidate set or cancellation during
//! enumeration stop the pipeline early, and a missing root stops it before
//! anything is written.
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::config::ScanConfig;
//! use mediadupe::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let config = FinderConfig::default()
//!     .with_scan_config(ScanConfig::default().with_extensions(["jpg", "png"]))
//!     .with_snapshot_dir("/tmp/mediadupe");
//! let finder = DuplicateFinder::new(config);
//!
//! let (groups, summary) = finder.find_duplicates(Path::new("/photos")).unwrap();
//! println!("{} group(s), {} reclaimable", groups.len(), summary.reclaimable_display());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;

use super::engine::FingerprintEngine;
use super::groups::{group_with_stats, DuplicateGroup};
use super::record::FingerprintRecord;
use crate::config::ScanConfig;
use crate::logging::{audit, AuditLog};
use crate::progress::{ProgressCallback, PHASE_WALKING};
use crate::scanner::{walker, FingerprintPolicy, ScanError};
use crate::snapshot::{ScanSnapshot, SnapshotStage, SnapshotStore};

/// Configuration for the full pipeline.
#[derive(Clone, Default)]
pub struct FinderConfig {
    /// Scan settings handed to the enumerator and policy.
    pub scan: ScanConfig,
    /// Directory for snapshot artifacts. `None` disables snapshots.
    pub snapshot_dir: Option<PathBuf>,
    /// Optional shutdown flag for cooperative cancellation.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
    /// Optional audit log.
    pub audit_log: Option<Arc<AuditLog>>,
    /// Policy override. `None` builds one from `scan`.
    pub policy: Option<FingerprintPolicy>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("scan", &self.scan)
            .field("snapshot_dir", &self.snapshot_dir)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("audit_log", &self.audit_log)
            .field("policy", &self.policy)
            .finish()
    }
}

impl FinderConfig {
    /// Set the scan configuration.
    #[must_use]
    pub fn with_scan_config(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    /// Write snapshots into `dir`.
    #[must_use]
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    /// Set the shutdown flag for cooperative cancellation.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Set the audit log.
    #[must_use]
    pub fn with_audit_log(mut self, log: Arc<AuditLog>) -> Self {
        self.audit_log = Some(log);
        self
    }

    /// Use `policy` instead of one built from the scan configuration.
    #[must_use]
    pub fn with_policy(mut self, policy: FingerprintPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
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
    /// Wall-clock duration of the scan
    pub scan_duration: Duration,
    /// Whether cancellation cut fingerprinting short
    pub interrupted: bool,
    /// Last snapshot artifact successfully written
    pub snapshot_path: Option<PathBuf>,
    /// Snapshot write failures
    pub snapshot_errors: Vec<String>,
    /// Paths and reasons for records without a fingerprint
    pub failures: Vec<(PathBuf, String)>,
}

impl ScanSummary {
    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Whether any per-file or snapshot failure occurred.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed_files > 0 || self.skipped_entries > 0 || !self.snapshot_errors.is_empty()
    }
}

/// Errors that stop the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan root does not exist. Nothing was written.
    #[error("Root not found: {0}")]
    RootNotFound(PathBuf),

    /// The scan root is not a directory. Nothing was written.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// No file matched the filter. The `listed` snapshot was still written.
    #[error("No files matching the filter under {root}")]
    NoCandidates {
        /// Scanned root
        root: PathBuf,
        /// The `listed` snapshot, if written
        snapshot_path: Option<PathBuf>,
    },

    /// Cancelled before enumeration finished.
    #[error("Scan interrupted by user")]
    Interrupted {
        /// The partial `listed` snapshot, if written
        snapshot_path: Option<PathBuf>,
    },

    /// Any other enumeration failure at the root.
    #[error(transparent)]
    Scan(ScanError),
}

impl From<ScanError> for FinderError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::RootNotFound(p) => Self::RootNotFound(p),
            ScanError::NotADirectory(p) => Self::NotADirectory(p),
            other => Self::Scan(other),
        }
    }
}

/// Runs the scan pipeline.
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new finder.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a finder with default configuration and no snapshots.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The configuration this finder runs with.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Scan `root` and return its duplicate groups.
    ///
    /// # Errors
    ///
    /// See [`FinderError`]. Per-file failures are never errors; they are
    /// reflected in [`ScanSummary::failed_files`].
    pub fn find_duplicates(
        &self,
        root: &Path,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let config = &self.config;
        let scan = &config.scan;
        let audit_log = config.audit_log.as_deref();

        if !root.exists() {
            return Err(FinderError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(FinderError::NotADirectory(root.to_path_buf()));
        }
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

        audit(
            audit_log,
            format!(
                "Scan started: {} (mode={}, recursive={}, filter={})",
                root.display(),
                scan.mode,
                scan.recursive,
                if scan.extension_filter.is_empty() {
                    "*".to_string()
                } else {
                    scan.extension_filter.join(",")
                }
            ),
        );

        // Enumerate
        if let Some(ref callback) = config.progress_callback {
            callback.on_phase_start(PHASE_WALKING, 0);
        }
        let listing =
            walker::enumerate_with_shutdown(&root, &scan.enumerator(), config.shutdown_flag.clone())?;
        if let Some(ref callback) = config.progress_callback {
            callback.on_phase_end(PHASE_WALKING);
        }
        audit(
            audit_log,
            format!("Found {} file(s) matching filter", listing.files.len()),
        );

        let mut summary = ScanSummary {
            total_files: listing.files.len(),
            skipped_entries: listing.skipped,
            ..Default::default()
        };

        let store = config.snapshot_dir.as_ref().map(SnapshotStore::new);
        let listed: Vec<FingerprintRecord> =
            listing.files.iter().map(FingerprintRecord::from).collect();
        self.write_snapshot(store.as_ref(), SnapshotStage::Listed, &root, &listed, &mut summary);

        if config.is_shutdown_requested() {
            audit(
                audit_log,
                format!("Scan cancelled after 0 of {} file(s)", listing.files.len()),
            );
            return Err(FinderError::Interrupted {
                snapshot_path: summary.snapshot_path,
            });
        }
        if listing.files.is_empty() {
            log::info!("No files matching the filter under {}", root.display());
            return Err(FinderError::NoCandidates {
                root,
                snapshot_path: summary.snapshot_path,
            });
        }

        // Fingerprint
        let policy = config
            .policy
            .clone()
            .unwrap_or_else(|| FingerprintPolicy::from_config(scan));
        let mut engine = FingerprintEngine::new(policy).with_io_threads(scan.io_threads);
        if let Some(ref flag) = config.shutdown_flag {
            engine = engine.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = config.progress_callback {
            engine = engine.with_progress_callback(Arc::clone(callback));
        }
        if let Some(ref log) = config.audit_log {
            engine = engine.with_audit_log(Arc::clone(log));
        }
        let output = engine.run(&listing.files, scan.mode);

        summary.hashed_files = output.stats.hashed;
        summary.failed_files = output.stats.failed;
        summary.interrupted = output.stats.interrupted;
        summary.failures = output
            .records
            .iter()
            .filter(|r| r.fingerprint.is_none())
            .map(|r| r.path.clone())
            .zip(output.stats.errors.iter().map(ToString::to_string))
            .collect();

        self.write_snapshot(
            store.as_ref(),
            SnapshotStage::Hashed,
            &root,
            &output.records,
            &mut summary,
        );

        // Group
        let (groups, stats) = group_with_stats(output.records);
        audit(
            audit_log,
            format!("Found {} duplicate group(s)", stats.duplicate_groups),
        );

        summary.duplicate_groups = stats.duplicate_groups;
        summary.duplicate_files = stats.duplicate_files;
        summary.reclaimable_space = groups.iter().map(DuplicateGroup::reclaimable_space).sum();
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} file(s), {} group(s), {} reclaimable in {:.2?}",
            summary.total_files,
            summary.duplicate_groups,
            summary.reclaimable_display(),
            summary.scan_duration
        );

        Ok((groups, summary))
    }

    fn write_snapshot(
        &self,
        store: Option<&SnapshotStore>,
        stage: SnapshotStage,
        root: &Path,
        records: &[FingerprintRecord],
        summary: &mut ScanSummary,
    ) {
        let Some(store) = store else {
            return;
        };
        let scan = &self.config.scan;
        let snapshot = ScanSnapshot::new(stage, root.to_path_buf(), scan.recursive, scan.mode, records);
        let audit_log = self.config.audit_log.as_deref();
        match store.write(&snapshot) {
            Ok(path) => {
                audit(
                    audit_log,
                    format!("Snapshot ({}) written: {}", stage, path.display()),
                );
                summary.snapshot_path = Some(path);
            }
            Err(e) => {
                log::warn!("{}", e);
                audit(audit_log, format!("ERROR writing snapshot: {}", e));
                summary.snapshot_errors.push(e.to_string());
            }
        }
    }
}
