//! Duplicate grouping.
//!
//! # Overview
//!
//! Records are partitioned by exact equality of their domain-tagged
//! fingerprint. Because the domain is part of the value, an image and a
//! video whose perceptual hashes happen to coincide never share a group.
//!
//! - Records without a fingerprint are left out entirely.
//! - Only partitions with two or more members are returned.
//! - Members are sorted by `(directory, name)`; groups by fingerprint string.
//!
//! # Example
//!
//! ```
//! use mediadupe::duplicates::{group, FingerprintRecord};
//! use mediadupe::scanner::{Fingerprint, PerceptualHash};
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let fp = Fingerprint::Image(PerceptualHash(0xabcd));
//! let records = vec![
//!     FingerprintRecord::new(PathBuf::from("/b.jpg"), 1, SystemTime::now()).with_fingerprint(fp.clone()),
//!     FingerprintRecord::new(PathBuf::from("/a.jpg"), 1, SystemTime::now()).with_fingerprint(fp),
//!     FingerprintRecord::new(PathBuf::from("/c.jpg"), 1, SystemTime::now()),
//! ];
//!
//! let groups = group(records);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].members[0].path, PathBuf::from("/a.jpg"));
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::record::FingerprintRecord;
use crate::scanner::Fingerprint;

/// Two or more files sharing one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Shared fingerprint
    pub fingerprint: Fingerprint,
    /// Members sorted by `(directory, name)`
    pub members: Vec<FingerprintRecord>,
    /// Indices into `members` currently selected for an action
    #[serde(default)]
    pub selected: BTreeSet<usize>,
}

impl DuplicateGroup {
    /// Create a group, sorting `members`.
    #[must_use]
    pub fn new(fingerprint: Fingerprint, mut members: Vec<FingerprintRecord>) -> Self {
        members.sort_by(compare_members);
        Self {
            fingerprint,
            members,
            selected: BTreeSet::new(),
        }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the group still qualifies as a duplicate group.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.members.len() >= 2
    }

    /// Total size of all members.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.members.iter().map(|m| m.size).sum()
    }

    /// Space freed by keeping only the largest member.
    #[must_use]
    pub fn reclaimable_space(&self) -> u64 {
        let largest = self.members.iter().map(|m| m.size).max().unwrap_or(0);
        self.total_size().saturating_sub(largest)
    }

    /// Number of copies beyond the first.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Paths of all members.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|m| m.path.clone()).collect()
    }

    /// Select the member at `index`. Returns `false` if out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.members.len() {
            self.selected.insert(index);
            true
        } else {
            false
        }
    }

    /// Deselect the member at `index`.
    pub fn deselect(&mut self, index: usize) {
        self.selected.remove(&index);
    }

    /// Toggle selection of the member at `index`.
    pub fn toggle(&mut self, index: usize) {
        if !self.selected.remove(&index) {
            self.select(index);
        }
    }

    /// Select every member except the first.
    pub fn select_all_but_first(&mut self) {
        self.selected = (1..self.members.len()).collect();
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Selected members, in member order.
    #[must_use]
    pub fn selected_records(&self) -> Vec<&FingerprintRecord> {
        self.selected
            .iter()
            .filter_map(|&i| self.members.get(i))
            .collect()
    }

    /// Whether every member is selected.
    #[must_use]
    pub fn is_fully_selected(&self) -> bool {
        !self.members.is_empty() && (0..self.members.len()).all(|i| self.selected.contains(&i))
    }
}

fn compare_members(a: &FingerprintRecord, b: &FingerprintRecord) -> Ordering {
    a.directory()
        .cmp(b.directory())
        .then_with(|| a.path.file_name().cmp(&b.path.file_name()))
}

/// Statistics from one grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Records examined
    pub total_records: usize,
    /// Records left out because they have no fingerprint
    pub unfingerprinted: usize,
    /// Distinct fingerprints seen
    pub unique_fingerprints: usize,
    /// Groups with two or more members
    pub duplicate_groups: usize,
    /// Members across all returned groups
    pub duplicate_files: usize,
}

/// Partition `records` into duplicate groups.
#[must_use]
pub fn group(records: impl IntoIterator<Item = FingerprintRecord>) -> Vec<DuplicateGroup> {
    group_with_stats(records).0
}

/// Partition `records` into duplicate groups and report statistics.
#[must_use]
pub fn group_with_stats(
    records: impl IntoIterator<Item = FingerprintRecord>,
) -> (Vec<DuplicateGroup>, GroupingStats) {
    let mut stats = GroupingStats::default();
    let mut partitions: BTreeMap<String, (Fingerprint, Vec<FingerprintRecord>)> = BTreeMap::new();

    for record in records {
        stats.total_records += 1;
        let Some(fingerprint) = record.fingerprint.clone() else {
            stats.unfingerprinted += 1;
            continue;
        };
        partitions
            .entry(fingerprint.to_string())
            .or_insert_with(|| (fingerprint, Vec::new()))
            .1
            .push(record);
    }
    stats.unique_fingerprints = partitions.len();

    let groups: Vec<DuplicateGroup> = partitions
        .into_values()
        .filter(|(fingerprint, members)| {
            if members.len() < 2 {
                log::trace!("Unique fingerprint {}", fingerprint);
                return false;
            }
            log::debug!("Group {}: {} member(s)", fingerprint, members.len());
            true
        })
        .map(|(fingerprint, members)| DuplicateGroup::new(fingerprint, members))
        .collect();

    stats.duplicate_groups = groups.len();
    stats.duplicate_files = groups.iter().map(DuplicateGroup::len).sum();

    log::info!(
        "Grouping complete: {} record(s) -> {} group(s), {} without fingerprint",
        stats.total_records,
        stats.duplicate_groups,
        stats.unfingerprinted
    );

    (groups, stats)
}

/// Result of re-reading group membership from the filesystem.
#[derive(Debug, Clone, Default)]
pub struct GroupRevalidation {
    /// Groups that still have two or more live members
    pub groups: Vec<DuplicateGroup>,
    /// Groups that fell below two live members
    pub collapsed: Vec<DuplicateGroup>,
    /// Member paths that no longer exist as regular files
    pub removed: Vec<PathBuf>,
}

/// Drop members whose backing files are gone and report collapsed groups.
///
/// Selections are kept for surviving members and remapped to their new
/// indices.
#[must_use]
pub fn revalidate_groups(groups: Vec<DuplicateGroup>) -> GroupRevalidation {
    let mut result = GroupRevalidation::default();

    for group in groups {
        let DuplicateGroup {
            fingerprint,
            members,
            selected,
        } = group;

        let mut live = Vec::with_capacity(members.len());
        let mut kept_selection = BTreeSet::new();
        for (index, member) in members.into_iter().enumerate() {
            let exists = std::fs::symlink_metadata(&member.path)
                .map(|m| m.is_file())
                .unwrap_or(false);
            if exists {
                if selected.contains(&index) {
                    kept_selection.insert(live.len());
                }
                live.push(member);
            } else {
                log::debug!("Member vanished: {}", member.path.display());
                result.removed.push(member.path);
            }
        }

        let revalidated = DuplicateGroup {
            fingerprint,
            members: live,
            selected: kept_selection,
        };
        if revalidated.is_duplicate() {
            result.groups.push(revalidated);
        } else {
            log::info!(
                "Group {} collapsed to {} member(s)",
                revalidated.fingerprint,
                revalidated.len()
            );
            result.collapsed.push(revalidated);
        }
    }

    result
}
