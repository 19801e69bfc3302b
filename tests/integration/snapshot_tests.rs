use mediadupe::config::ScanConfig;
use mediadupe::duplicates::{group, DuplicateFinder, FinderConfig, FinderError};
use mediadupe::scanner::FingerprintMode;
use mediadupe::snapshot::{SnapshotStage, SnapshotStore};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn write(dir: &Path, name: &str, content: &[u8]) {
    fs::write(dir.join(name), content).unwrap();
}

fn artifacts(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries.map(|e| e.unwrap().path()).collect();
    paths.sort();
    paths
}

fn finder(snapshots: &TempDir, scan: ScanConfig) -> DuplicateFinder {
    DuplicateFinder::new(
        FinderConfig::default()
            .with_scan_config(scan)
            .with_snapshot_dir(snapshots.path()),
    )
}

#[test]
fn test_completed_scan_leaves_one_hashed_artifact() {
    let root = tempdir().unwrap();
    let snapshots = tempdir().unwrap();
    write(root.path(), "A.jpg", b"same");
    write(root.path(), "B.jpg", b"same");
    write(root.path(), "C.jpg", b"other");

    let (_, summary) = finder(&snapshots, ScanConfig::default())
        .find_duplicates(root.path())
        .unwrap();

    let files = artifacts(snapshots.path());
    assert_eq!(files.len(), 1, "listed snapshot must be replaced, not kept");
    assert_eq!(summary.snapshot_path.as_deref(), Some(files[0].as_path()));
    assert!(files[0].extension().is_some_and(|e| e == "json"));

    let snapshot = SnapshotStore::load(&files[0]).unwrap();
    assert_eq!(snapshot.stage, SnapshotStage::Hashed);
    assert_eq!(snapshot.folder, root.path().canonicalize().unwrap());
    assert!(snapshot.recurse);
    assert_eq!(snapshot.method, FingerprintMode::Fast);
    assert_eq!(snapshot.file_count, 3);
    assert_eq!(snapshot.files.len(), 3);
    assert_eq!(snapshot.fingerprinted_count(), 3);
}

#[test]
fn test_artifact_is_readable_json_with_plain_field_names() {
    let root = tempdir().unwrap();
    let snapshots = tempdir().unwrap();
    write(root.path(), "one.txt", b"1");

    let (_, summary) = finder(&snapshots, ScanConfig::default().with_recursive(false))
        .find_duplicates(root.path())
        .unwrap();

    let raw = fs::read_to_string(summary.snapshot_path.unwrap()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["stage"], "hashed");
    assert_eq!(value["recurse"], false);
    assert_eq!(value["method"], "fast");
    assert_eq!(value["file_count"], 1);
    let file = &value["files"][0];
    assert_eq!(file["size"], 1);
    assert!(file["path"].as_str().unwrap().ends_with("one.txt"));
    assert!(file["last_write_time"].is_string());
    assert!(file["fingerprint"].as_str().unwrap().starts_with("exact:"));
}

#[test]
fn test_missing_root_writes_no_artifact() {
    let snapshots = tempdir().unwrap();
    let missing = snapshots.path().join("nowhere");

    let err = finder(&snapshots, ScanConfig::default())
        .find_duplicates(&missing)
        .unwrap_err();

    assert!(matches!(err, FinderError::RootNotFound(_)));
    assert!(artifacts(snapshots.path()).is_empty());
}

#[test]
fn test_empty_scan_writes_listed_artifact() {
    let root = tempdir().unwrap();
    let snapshots = tempdir().unwrap();
    write(root.path(), "song.txt", b"lyrics");

    let err = finder(&snapshots, ScanConfig::default().with_extensions(["flac"]))
        .find_duplicates(root.path())
        .unwrap_err();

    let FinderError::NoCandidates { snapshot_path, .. } = err else {
        panic!("expected NoCandidates, got {err:?}");
    };
    let snapshot = SnapshotStore::load(snapshot_path.unwrap()).unwrap();
    assert_eq!(snapshot.stage, SnapshotStage::Listed);
    assert_eq!(snapshot.file_count, 0);
    assert!(snapshot.files.is_empty());
}

#[test]
fn test_regrouping_a_loaded_snapshot_matches_the_scan() {
    let root = tempdir().unwrap();
    let snapshots = tempdir().unwrap();
    write(root.path(), "a1", b"alpha");
    write(root.path(), "a2", b"alpha");
    write(root.path(), "b1", b"beta");
    write(root.path(), "b2", b"beta");
    write(root.path(), "b3", b"beta");
    write(root.path(), "c", b"gamma");

    let (groups, summary) = finder(&snapshots, ScanConfig::default())
        .find_duplicates(root.path())
        .unwrap();

    let snapshot = SnapshotStore::load(summary.snapshot_path.unwrap()).unwrap();
    let regrouped = group(snapshot.records());

    assert_eq!(regrouped.len(), groups.len());
    for (original, reloaded) in groups.iter().zip(&regrouped) {
        assert_eq!(original.fingerprint, reloaded.fingerprint);
        assert_eq!(original.paths(), reloaded.paths());
    }
}

#[test]
fn test_separate_runs_never_share_an_artifact() {
    let root = tempdir().unwrap();
    let snapshots = tempdir().unwrap();
    write(root.path(), "x", b"x");

    let first = finder(&snapshots, ScanConfig::default())
        .find_duplicates(root.path())
        .unwrap()
        .1
        .snapshot_path
        .unwrap();
    let second = finder(&snapshots, ScanConfig::default())
        .find_duplicates(root.path())
        .unwrap()
        .1
        .snapshot_path
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(artifacts(snapshots.path()).len(), 2);
}

#[test]
fn test_no_temporary_files_left_behind() {
    let root = tempdir().unwrap();
    let snapshots = tempdir().unwrap();
    write(root.path(), "x", b"x");

    finder(&snapshots, ScanConfig::default())
        .find_duplicates(root.path())
        .unwrap();

    assert!(artifacts(snapshots.path())
        .iter()
        .all(|p| p.extension().is_some_and(|e| e == "json")));
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_name_does_not_block_snapshots() {
    use mediadupe::error::ExitCode;
    use mediadupe::output::JsonOutput;
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let root = tempdir().unwrap();
    let snapshots = tempdir().unwrap();
    write(root.path(), "a.bin", b"identical");
    let bad = root.path().join(OsStr::from_bytes(b"bad\xff.bin"));
    // Some filesystems only accept UTF-8 names; nothing to check there.
    if fs::write(&bad, b"identical").is_err() {
        return;
    }

    let (groups, summary) = finder(&snapshots, ScanConfig::default())
        .find_duplicates(root.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert!(summary.snapshot_errors.is_empty(), "{:?}", summary.snapshot_errors);
    assert_eq!(artifacts(snapshots.path()).len(), 1);

    let snapshot = SnapshotStore::load(summary.snapshot_path.clone().unwrap()).unwrap();
    assert_eq!(snapshot.stage, SnapshotStage::Hashed);
    assert_eq!(snapshot.file_count, 2);
    assert!(snapshot
        .files
        .iter()
        .any(|f| f.path.to_string_lossy().ends_with("bad\u{FFFD}.bin")));

    let code = ExitCode::for_scan(groups.len(), &summary);
    let json = JsonOutput::new(&groups, &summary, code)
        .to_json_pretty()
        .unwrap();
    assert!(json.contains("bad\u{FFFD}.bin"));
}
