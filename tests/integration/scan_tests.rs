use mediadupe::config::ScanConfig;
use mediadupe::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use mediadupe::scanner::{FingerprintDomain, FingerprintMode};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn finder(scan: ScanConfig) -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_scan_config(scan))
}

fn write(dir: &Path, name: &str, content: &[u8]) {
    if let Some(parent) = dir.join(name).parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_two_copies_and_one_unique() {
    let dir = tempdir().unwrap();
    write(dir.path(), "A.jpg", b"identical bytes");
    write(dir.path(), "B.jpg", b"identical bytes");
    write(dir.path(), "C.jpg", b"different bytes");

    let (groups, summary) = finder(ScanConfig::default()).find_duplicates(dir.path()).unwrap();

    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.fingerprint.domain(), FingerprintDomain::Exact);
    let names: Vec<String> = group.members.iter().map(|m| m.file_name()).collect();
    assert_eq!(names, ["A.jpg", "B.jpg"]);

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.hashed_files, 3);
    assert_eq!(summary.failed_files, 0);
    assert_eq!(summary.duplicate_groups, 1);
    assert_eq!(summary.duplicate_files, 2);
    assert_eq!(summary.reclaimable_space, 15);
    assert!(!summary.interrupted);
}

#[test]
fn test_unique_files_form_no_groups() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"content a");
    write(dir.path(), "b.txt", b"content b");
    write(dir.path(), "c.txt", b"content c");

    let (groups, summary) = finder(ScanConfig::default()).find_duplicates(dir.path()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_empty_files_share_a_group() {
    let dir = tempdir().unwrap();
    write(dir.path(), "empty1", b"");
    write(dir.path(), "empty2", b"");

    let (groups, _) = finder(ScanConfig::default()).find_duplicates(dir.path()).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(
        groups[0].fingerprint.to_string(),
        "exact:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn test_recursion_and_member_order() {
    let dir = tempdir().unwrap();
    write(dir.path(), "z/copy.bin", b"payload");
    write(dir.path(), "a/copy.bin", b"payload");
    write(dir.path(), "top.bin", b"payload");

    let (groups, _) = finder(ScanConfig::default()).find_duplicates(dir.path()).unwrap();
    assert_eq!(groups.len(), 1);
    let root = dir.path().canonicalize().unwrap();
    let paths: Vec<_> = groups[0].members.iter().map(|m| m.path.clone()).collect();
    assert_eq!(
        paths,
        [
            root.join("top.bin"),
            root.join("a").join("copy.bin"),
            root.join("z").join("copy.bin"),
        ]
    );

    let (flat, summary) = finder(ScanConfig::default().with_recursive(false))
        .find_duplicates(dir.path())
        .unwrap();
    assert!(flat.is_empty());
    assert_eq!(summary.total_files, 1);
}

#[test]
fn test_extension_filter_is_case_insensitive() {
    let dir = tempdir().unwrap();
    write(dir.path(), "one.JPG", b"same");
    write(dir.path(), "two.jpg", b"same");
    write(dir.path(), "three.txt", b"same");

    let (groups, summary) = finder(ScanConfig::default().with_extensions([".Jpg"]))
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    assert!(groups[0]
        .members
        .iter()
        .all(|m| m.path.extension().unwrap().eq_ignore_ascii_case("jpg")));
}

#[test]
fn test_no_candidates_after_filter() {
    let dir = tempdir().unwrap();
    write(dir.path(), "notes.txt", b"text");

    let err = finder(ScanConfig::default().with_extensions(["mp3"]))
        .find_duplicates(dir.path())
        .unwrap_err();
    assert!(matches!(err, FinderError::NoCandidates { .. }));
}

#[test]
fn test_missing_root_and_file_root() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let err = finder(ScanConfig::default()).find_duplicates(&missing).unwrap_err();
    assert!(matches!(err, FinderError::RootNotFound(ref p) if *p == missing));

    write(dir.path(), "file.txt", b"x");
    let err = finder(ScanConfig::default())
        .find_duplicates(&dir.path().join("file.txt"))
        .unwrap_err();
    assert!(matches!(err, FinderError::NotADirectory(_)));
}

#[test]
fn test_deep_mode_on_plain_files_matches_fast_mode() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.dat", b"bytes");
    write(dir.path(), "b.dat", b"bytes");

    let (fast, _) = finder(ScanConfig::default()).find_duplicates(dir.path()).unwrap();
    let (deep, _) = finder(ScanConfig::default().with_mode(FingerprintMode::Deep))
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(fast.len(), 1);
    assert_eq!(deep.len(), 1);
    assert_eq!(fast[0].fingerprint, deep[0].fingerprint);
}

#[test]
fn test_undecodable_image_falls_back_to_exact() {
    let dir = tempdir().unwrap();
    write(dir.path(), "A.jpg", b"not really a jpeg");
    write(dir.path(), "B.jpg", b"not really a jpeg");
    write(dir.path(), "C.jpg", b"also not a jpeg");

    let (groups, summary) = finder(ScanConfig::default().with_mode(FingerprintMode::Deep))
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(summary.failed_files, 0);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].fingerprint.domain(), FingerprintDomain::Exact);
    assert_eq!(groups[0].len(), 2);
}

#[cfg(unix)]
#[test]
fn test_symlinks_skipped_by_default() {
    let dir = tempdir().unwrap();
    write(dir.path(), "real.bin", b"same");
    write(dir.path(), "copy.bin", b"same");
    std::os::unix::fs::symlink(dir.path().join("real.bin"), dir.path().join("link.bin")).unwrap();

    let (groups, summary) = finder(ScanConfig::default()).find_duplicates(dir.path()).unwrap();
    assert_eq!(summary.total_files, 2);
    assert_eq!(groups[0].len(), 2);
}
