use filetime::{set_file_mtime, FileTime};
use mediadupe::actions::{
    delete_group_selection, delete_selected, rename_member, DeleteConfig, DeleteError, RenameError,
};
use mediadupe::config::ScanConfig;
use mediadupe::duplicates::{revalidate_groups, DuplicateFinder, DuplicateGroup, FinderConfig};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(dir: &Path, name: &str, content: &[u8]) {
    fs::write(dir.join(name), content).unwrap();
}

fn scan(root: &Path) -> Vec<DuplicateGroup> {
    DuplicateFinder::new(FinderConfig::default().with_scan_config(ScanConfig::default()))
        .find_duplicates(root)
        .unwrap()
        .0
}

fn names(group: &DuplicateGroup) -> Vec<String> {
    group.members.iter().map(|m| m.file_name()).collect()
}

#[test]
fn test_delete_after_scan_keeps_first_copy() {
    let dir = tempdir().unwrap();
    write(dir.path(), "A.jpg", b"identical");
    write(dir.path(), "B.jpg", b"identical");
    write(dir.path(), "C.jpg", b"identical");

    let mut groups = scan(dir.path());
    let group = &mut groups[0];
    group.select_all_but_first();

    let report = delete_group_selection(group, &DeleteConfig::permanent()).unwrap();

    assert!(report.all_succeeded());
    assert_eq!(report.deleted_count, 2);
    assert_eq!(report.bytes_freed, 18);
    assert_eq!(names(group), ["A.jpg"]);
    assert!(group.selected.is_empty());
    assert!(!group.is_duplicate());
    assert!(dir.path().join("A.jpg").exists());
    assert!(!dir.path().join("B.jpg").exists());
    assert!(!dir.path().join("C.jpg").exists());
}

#[test]
fn test_selecting_every_copy_is_refused() {
    let dir = tempdir().unwrap();
    write(dir.path(), "A.jpg", b"identical");
    write(dir.path(), "B.jpg", b"identical");

    let mut groups = scan(dir.path());
    let group = &mut groups[0];
    group.select(0);
    group.select(1);

    let err = delete_group_selection(group, &DeleteConfig::permanent()).unwrap_err();
    assert!(matches!(err, DeleteError::AllCopiesWouldBeDeleted));
    assert_eq!(group.len(), 2);
    assert!(dir.path().join("A.jpg").exists());
    assert!(dir.path().join("B.jpg").exists());
}

#[test]
fn test_vanished_member_counts_as_failure() {
    let dir = tempdir().unwrap();
    write(dir.path(), "A.jpg", b"identical");
    write(dir.path(), "B.jpg", b"identical");
    write(dir.path(), "C.jpg", b"identical");

    let groups = scan(dir.path());
    let members = groups[0].members.clone();
    fs::remove_file(dir.path().join("B.jpg")).unwrap();

    let report = delete_selected(&members[1..], &DeleteConfig::permanent());

    assert_eq!(report.deleted_count, 1);
    assert_eq!(report.failed_count, 1);
    assert!(report.failures[0].0.ends_with("B.jpg"));
    assert!(!dir.path().join("C.jpg").exists());
    assert!(dir.path().join("A.jpg").exists());
}

#[test]
fn test_file_touched_after_scan_is_kept() {
    let dir = tempdir().unwrap();
    write(dir.path(), "A.jpg", b"identical");
    write(dir.path(), "B.jpg", b"identical");

    let mut groups = scan(dir.path());
    set_file_mtime(dir.path().join("B.jpg"), FileTime::from_unix_time(1_000_000_000, 0)).unwrap();
    groups[0].select(1);

    let report = delete_group_selection(&mut groups[0], &DeleteConfig::permanent()).unwrap();

    assert_eq!(report.deleted_count, 0);
    assert_eq!(report.failed_count, 1);
    assert!(dir.path().join("B.jpg").exists());
    assert_eq!(groups[0].len(), 2);
    assert!(groups[0].selected.contains(&1));

    let report = delete_group_selection(
        &mut groups[0],
        &DeleteConfig::permanent().with_verify_unchanged(false),
    )
    .unwrap();
    assert_eq!(report.deleted_count, 1);
    assert!(!dir.path().join("B.jpg").exists());
}

#[test]
fn test_rename_onto_copy_fails_without_moving_anything() {
    let dir = tempdir().unwrap();
    write(dir.path(), "A.jpg", b"identical");
    write(dir.path(), "B.jpg", b"identical");

    let mut groups = scan(dir.path());
    let before = groups[0].paths();

    let err = rename_member(&mut groups[0], 1, "A.jpg").unwrap_err();

    assert!(matches!(err, RenameError::TargetExists(ref p) if p.ends_with("A.jpg")));
    assert_eq!(groups[0].paths(), before);
    assert_eq!(fs::read(dir.path().join("A.jpg")).unwrap(), b"identical");
    assert_eq!(fs::read(dir.path().join("B.jpg")).unwrap(), b"identical");
}

#[test]
fn test_rename_then_revalidate() {
    let dir = tempdir().unwrap();
    write(dir.path(), "A.jpg", b"identical");
    write(dir.path(), "B.jpg", b"identical");

    let mut groups = scan(dir.path());
    let renamed = rename_member(&mut groups[0], 1, "0-first.jpg").unwrap();

    assert!(renamed.ends_with("0-first.jpg"));
    assert_eq!(names(&groups[0]), ["0-first.jpg", "A.jpg"]);

    let revalidated = revalidate_groups(groups);
    assert_eq!(revalidated.groups.len(), 1);
    assert!(revalidated.removed.is_empty());
}

#[test]
fn test_external_deletion_collapses_group() {
    let dir = tempdir().unwrap();
    write(dir.path(), "A.jpg", b"one");
    write(dir.path(), "B.jpg", b"one");
    write(dir.path(), "x.bin", b"two");
    write(dir.path(), "y.bin", b"two");
    write(dir.path(), "z.bin", b"two");

    let groups = scan(dir.path());
    assert_eq!(groups.len(), 2);
    fs::remove_file(dir.path().join("B.jpg")).unwrap();
    fs::remove_file(dir.path().join("z.bin")).unwrap();

    let revalidated = revalidate_groups(groups);

    assert_eq!(revalidated.groups.len(), 1);
    assert_eq!(names(&revalidated.groups[0]), ["x.bin", "y.bin"]);
    assert_eq!(revalidated.collapsed.len(), 1);
    assert_eq!(names(&revalidated.collapsed[0]), ["A.jpg"]);
    assert_eq!(revalidated.removed.len(), 2);
}
