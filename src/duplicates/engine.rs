//! Fingerprint engine.
//!
//! Drives a [`FingerprintPolicy`] over the candidate set on a bounded rayon
//! pool. Files are independent; the only shared state is the result vector,
//! which rayon assembles in candidate order. A file that cannot be
//! fingerprinted yields a record with no fingerprint and an entry in
//! [`EngineStats::errors`], and the run continues.
//!
//! Cancellation is checked before each file. Files not yet started when the
//! flag is raised are left out of the output; everything already processed
//! is returned.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::record::FingerprintRecord;
use crate::config::ScanConfig;
use crate::logging::{audit, AuditLog};
use crate::progress::{ProgressCallback, PHASE_FINGERPRINT};
use crate::scanner::{CandidateFile, FingerprintError, FingerprintMode, FingerprintPolicy};

/// Statistics from one engine run.
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Candidates handed to the engine
    pub total: usize,
    /// Candidates actually processed (less than `total` when interrupted)
    pub processed: usize,
    /// Records that received a fingerprint
    pub hashed: usize,
    /// Records left without a fingerprint
    pub failed: usize,
    /// Whether cancellation cut the run short
    pub interrupted: bool,
    /// Per-file failures, in candidate order
    pub errors: Vec<FingerprintError>,
}

/// Output of [`FingerprintEngine::run`].
#[derive(Debug, Default)]
pub struct EngineOutput {
    /// One record per processed candidate, in candidate order
    pub records: Vec<FingerprintRecord>,
    /// Run statistics
    pub stats: EngineStats,
}

/// Parallel fingerprint driver.
#[derive(Clone)]
pub struct FingerprintEngine {
    policy: FingerprintPolicy,
    io_threads: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    audit_log: Option<Arc<AuditLog>>,
}

impl std::fmt::Debug for FingerprintEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintEngine")
            .field("policy", &self.policy)
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("audit_log", &self.audit_log.as_ref().map(|l| l.path().to_path_buf()))
            .finish()
    }
}

impl FingerprintEngine {
    /// Create an engine around `policy` with the default worker count.
    #[must_use]
    pub fn new(policy: FingerprintPolicy) -> Self {
        Self {
            policy,
            io_threads: crate::config::DEFAULT_IO_THREADS,
            shutdown_flag: None,
            progress_callback: None,
            audit_log: None,
        }
    }

    /// Create an engine whose policy and worker count come from `config`.
    #[must_use]
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(FingerprintPolicy::from_config(config)).with_io_threads(config.io_threads)
    }

    /// Set the worker count (minimum 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the cancellation flag.
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

    /// The policy this engine applies.
    #[must_use]
    pub fn policy(&self) -> &FingerprintPolicy {
        &self.policy
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Fingerprint every candidate under `mode`.
    ///
    /// Never fails as a whole; per-file failures are reported in the output.
    #[must_use]
    pub fn run(&self, candidates: &[CandidateFile], mode: FingerprintMode) -> EngineOutput {
        let total = candidates.len();
        let mut stats = EngineStats {
            total,
            ..Default::default()
        };
        if total == 0 {
            log::debug!("Fingerprint: no files to process");
            return EngineOutput {
                records: Vec::new(),
                stats,
            };
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(PHASE_FINGERPRINT, total);
        }
        log::info!("Fingerprinting {} file(s) in {} mode", total, mode);

        let done = AtomicUsize::new(0);
        let work = || -> Vec<Option<(FingerprintRecord, Option<FingerprintError>)>> {
            candidates
                .par_iter()
                .map(|file| {
                    if self.is_shutdown_requested() {
                        return None;
                    }
                    let outcome = self.process(file, mode);
                    let current = done.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback.on_item_completed(file.size);
                        callback.on_progress(current, file.path.to_string_lossy().as_ref());
                    }
                    Some(outcome)
                })
                .collect()
        };

        let results = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.io_threads)
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(e) => {
                log::warn!(
                    "Failed to create fingerprint thread pool ({}), using global pool with {} threads",
                    e,
                    rayon::current_num_threads()
                );
                work()
            }
        };

        let mut records = Vec::with_capacity(results.len());
        for (record, error) in results.into_iter().flatten() {
            stats.processed += 1;
            match error {
                Some(e) => {
                    stats.failed += 1;
                    stats.errors.push(e);
                }
                None => stats.hashed += 1,
            }
            records.push(record);
        }

        stats.interrupted = stats.processed < total;
        if stats.interrupted {
            log::info!(
                "Fingerprint: interrupted after {} of {} file(s)",
                stats.processed,
                total
            );
            audit(
                self.audit_log.as_deref(),
                format!(
                    "Scan cancelled after {} of {} file(s)",
                    stats.processed, total
                ),
            );
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(PHASE_FINGERPRINT);
        }
        log::info!(
            "Fingerprint complete: {} hashed, {} failed",
            stats.hashed,
            stats.failed
        );

        EngineOutput { records, stats }
    }

    fn process(
        &self,
        file: &CandidateFile,
        mode: FingerprintMode,
    ) -> (FingerprintRecord, Option<FingerprintError>) {
        let record = FingerprintRecord::from(file);
        match self.policy.fingerprint(file, mode) {
            Ok(fingerprint) => {
                log::trace!("Hashed {} => {}", file.path.display(), fingerprint);
                audit(
                    self.audit_log.as_deref(),
                    format!("Hashed {} => {}", file.path.display(), fingerprint),
                );
                (record.with_fingerprint(fingerprint), None)
            }
            Err(e) => {
                log::warn!("Failed to fingerprint {}: {}", file.path.display(), e);
                audit(
                    self.audit_log.as_deref(),
                    format!("ERROR hashing {}: {}", file.path.display(), e),
                );
                (record, Some(e))
            }
        }
    }
}
