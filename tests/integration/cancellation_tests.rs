use mediadupe::config::ScanConfig;
use mediadupe::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use mediadupe::error::ExitCode;
use mediadupe::logging::AuditLog;
use mediadupe::scanner::external::{AcousticFingerprinter, ToolError};
use mediadupe::scanner::{FingerprintMode, FingerprintPolicy};
use mediadupe::snapshot::{SnapshotStage, SnapshotStore};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

/// Raises the shutdown flag from inside the first fingerprint call, the way
/// a Ctrl+C arriving mid-scan would.
struct CancelOnFirstCall {
    flag: Arc<AtomicBool>,
}

impl AcousticFingerprinter for CancelOnFirstCall {
    fn fingerprint(&self, path: &Path) -> Result<String, ToolError> {
        self.flag.store(true, Ordering::SeqCst);
        Ok(path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default())
    }
}

fn populate(dir: &Path, count: usize) {
    for i in 0..count {
        fs::write(dir.join(format!("track{i:02}.mp3")), format!("audio {i}")).unwrap();
    }
}

fn cancelling_config(flag: &Arc<AtomicBool>) -> FinderConfig {
    let policy = FingerprintPolicy::exact_only().with_acoustic(Arc::new(CancelOnFirstCall {
        flag: Arc::clone(flag),
    }));
    FinderConfig::default()
        .with_scan_config(
            ScanConfig::default()
                .with_mode(FingerprintMode::Deep)
                .with_io_threads(1),
        )
        .with_policy(policy)
        .with_shutdown_flag(Arc::clone(flag))
}

#[test]
fn test_cancel_mid_scan_keeps_partial_results() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 8);
    let flag = Arc::new(AtomicBool::new(false));

    let (groups, summary) = DuplicateFinder::new(cancelling_config(&flag))
        .find_duplicates(dir.path())
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.total_files, 8);
    let processed = summary.hashed_files + summary.failed_files;
    assert!(processed >= 1, "the file that raised the flag is kept");
    assert!(processed < 8, "files after the flag are not started");
    assert!(groups.is_empty());
    assert_eq!(ExitCode::for_scan(groups.len(), &summary), ExitCode::Interrupted);
}

#[test]
fn test_cancel_mid_scan_still_writes_hashed_snapshot() {
    let dir = tempdir().unwrap();
    let snapshots = tempdir().unwrap();
    populate(dir.path(), 6);
    let flag = Arc::new(AtomicBool::new(false));

    let config = cancelling_config(&flag).with_snapshot_dir(snapshots.path());
    let (_, summary) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    let snapshot = SnapshotStore::load(summary.snapshot_path.unwrap()).unwrap();
    assert_eq!(snapshot.stage, SnapshotStage::Hashed);
    assert_eq!(snapshot.file_count, summary.hashed_files + summary.failed_files);
    assert!(snapshot.file_count < 6);
    assert_eq!(snapshot.fingerprinted_count(), summary.hashed_files);
}

#[test]
fn test_cancel_is_recorded_in_audit_log() {
    let dir = tempdir().unwrap();
    let logs = tempdir().unwrap();
    populate(dir.path(), 4);
    let flag = Arc::new(AtomicBool::new(false));
    let log_path = logs.path().join("scan.log");

    let config =
        cancelling_config(&flag).with_audit_log(Arc::new(AuditLog::open(&log_path).unwrap()));
    let (_, summary) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    let content = fs::read_to_string(&log_path).unwrap();
    let processed = summary.hashed_files + summary.failed_files;
    assert!(content.contains(&format!("Scan cancelled after {processed} of 4 file(s)")));
}

#[test]
fn test_cancel_before_fingerprinting_writes_listed_snapshot() {
    let dir = tempdir().unwrap();
    let snapshots = tempdir().unwrap();
    populate(dir.path(), 3);
    let flag = Arc::new(AtomicBool::new(true));

    let config = FinderConfig::default()
        .with_snapshot_dir(snapshots.path())
        .with_shutdown_flag(flag);
    let err = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap_err();

    let snapshot_path = match err {
        FinderError::Interrupted { snapshot_path } => snapshot_path,
        other => panic!("expected Interrupted, got {other:?}"),
    };
    let snapshot = SnapshotStore::load(snapshot_path.unwrap()).unwrap();
    assert_eq!(snapshot.stage, SnapshotStage::Listed);
    assert_eq!(snapshot.fingerprinted_count(), 0);

    let exit = ExitCode::for_error(&anyhow::Error::new(FinderError::Interrupted {
        snapshot_path: None,
    }));
    assert_eq!(exit, ExitCode::Interrupted);
}

#[test]
fn test_uncancelled_scan_is_not_interrupted() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 3);
    let flag = Arc::new(AtomicBool::new(false));

    let config = FinderConfig::default().with_shutdown_flag(Arc::clone(&flag));
    let (_, summary) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert!(!summary.interrupted);
    assert_eq!(summary.hashed_files, 3);
    assert!(!flag.load(Ordering::SeqCst));
}
