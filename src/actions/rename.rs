//! Renaming a single group member in place.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::locks::PathLocks;
use crate::duplicates::{DuplicateGroup, FingerprintRecord};
use crate::scanner::path_utils::same_identity;

/// Why a rename did not happen. No file is moved in any of these cases.
#[derive(Debug, Error)]
pub enum RenameError {
    /// A file already exists at the destination.
    #[error("target already exists: {0}")]
    TargetExists(PathBuf),

    /// The source file is gone or cannot be stat'ed.
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The new name is not a valid single path component.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// No group member at this index.
    #[error("no member at index {0}")]
    NoSuchMember(usize),

    /// The rename call itself failed.
    #[error("failed to rename {from} to {to}: {source}")]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Check that `name` can be used as a file name on every platform.
///
/// # Errors
///
/// Returns [`RenameError::InvalidName`] describing the first problem found.
pub fn validate_filename(name: &str) -> Result<(), RenameError> {
    let invalid = |reason: &str| {
        Err(RenameError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return invalid("name cannot be empty");
    }
    if name.len() > 255 {
        return invalid("name is longer than 255 bytes");
    }
    if name == "." || name == ".." {
        return invalid("'.' and '..' are reserved names");
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '/' | '\\' | '\0')) {
        return invalid(&format!("name cannot contain {c:?}"));
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(c) = name
            .chars()
            .find(|c| matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        {
            return invalid(&format!("name cannot contain {c:?}"));
        }
        const RESERVED: [&str; 22] = [
            "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
            "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
        ];
        let upper = name.to_uppercase();
        let base = upper.split('.').next().unwrap_or("");
        if RESERVED.contains(&base) {
            return invalid("reserved file name");
        }
    }

    if name.starts_with(' ') || name.ends_with(' ') {
        return invalid("name cannot start or end with spaces");
    }
    if name.ends_with('.') {
        return invalid("name cannot end with a dot");
    }

    Ok(())
}

/// Rename `record`'s file to `new_name` within the same directory.
///
/// On success `record.path` points at the new location. Its fingerprint is
/// unchanged. An existing destination is never overwritten, except when it
/// is the source itself under another case on a case-insensitive filesystem.
///
/// # Errors
///
/// [`RenameError::InvalidName`], [`RenameError::Unreadable`] if the source
/// vanished, [`RenameError::TargetExists`], or [`RenameError::Io`].
pub fn rename(record: &mut FingerprintRecord, new_name: &str) -> Result<(), RenameError> {
    rename_with(record, new_name, PathLocks::shared())
}

/// [`rename`] against an explicit lock registry.
///
/// # Errors
///
/// See [`rename`].
pub fn rename_with(
    record: &mut FingerprintRecord,
    new_name: &str,
    locks: &PathLocks,
) -> Result<(), RenameError> {
    validate_filename(new_name)?;

    let source = record.path.clone();
    let target = record.directory().join(new_name);
    if target == source {
        return Ok(());
    }

    let _guard = locks.lock(&[source.as_path(), target.as_path()]);

    fs::symlink_metadata(&source).map_err(|e| RenameError::Unreadable {
        path: source.clone(),
        source: e,
    })?;

    if fs::symlink_metadata(&target).is_ok() && !same_identity(&source, &target) {
        log::warn!(
            "Refusing to rename {}: {} already exists",
            source.display(),
            target.display()
        );
        return Err(RenameError::TargetExists(target));
    }

    fs::rename(&source, &target).map_err(|e| RenameError::Io {
        from: source.clone(),
        to: target.clone(),
        source: e,
    })?;

    log::info!("Renamed {} -> {}", source.display(), target.display());
    record.path = target;
    Ok(())
}

/// Rename the group member at `index` and deselect it.
///
/// The member stays in the group, since its content is unchanged, but the
/// group is re-sorted so member order keeps following `(directory, name)`.
/// Selections of other members follow them to their new indices.
///
/// # Errors
///
/// [`RenameError::NoSuchMember`] or any error from [`rename`]. On error the
/// group is left unchanged.
pub fn rename_member(
    group: &mut DuplicateGroup,
    index: usize,
    new_name: &str,
) -> Result<PathBuf, RenameError> {
    let member = group
        .members
        .get_mut(index)
        .ok_or(RenameError::NoSuchMember(index))?;
    rename(member, new_name)?;
    let renamed = member.path.clone();

    group.deselect(index);
    let selected: Vec<PathBuf> = group
        .selected_records()
        .into_iter()
        .map(|r| r.path.clone())
        .collect();
    let regrouped = DuplicateGroup::new(group.fingerprint.clone(), std::mem::take(&mut group.members));
    group.members = regrouped.members;
    group.selected = group
        .members
        .iter()
        .enumerate()
        .filter(|(_, m)| selected.contains(&m.path))
        .map(|(i, _)| i)
        .collect();

    Ok(renamed)
}
