//! Snapshot module for persisting scan progress.
//!
//! Each scan run owns one snapshot artifact, named after the time the run
//! started. It is rewritten in full at every stage boundary (`listed` after
//! enumeration, `hashed` after fingerprinting) and kept afterwards for audit.
//! Writes go through a temporary file and a rename, so readers only ever see
//! a complete document.
//!
//! # Architecture
//!
//! * [`data`]: The serialisable snapshot document.
//! * [`io`]: The per-run store that writes and loads artifacts.

pub mod data;
pub mod io;

pub use data::{ScanSnapshot, SnapshotFile, SnapshotStage, SNAPSHOT_VERSION};
pub use io::{SnapshotError, SnapshotStore};
