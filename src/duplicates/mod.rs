//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Per-file fingerprint records ([`record`])
//! - The parallel fingerprint engine ([`engine`])
//! - Grouping records by fingerprint and revalidating groups ([`groups`])
//! - The end-to-end scan pipeline ([`finder`])

pub mod engine;
pub mod finder;
pub mod groups;
pub mod record;

pub use engine::{EngineOutput, EngineStats, FingerprintEngine};
pub use finder::{DuplicateFinder, FinderConfig, FinderError, ScanSummary};
pub use groups::{
    group, group_with_stats, revalidate_groups, DuplicateGroup, GroupRevalidation, GroupingStats,
};
pub use record::FingerprintRecord;
