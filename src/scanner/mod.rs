//! Scanner module for file discovery and content fingerprinting.
//!
//! This module provides functionality for:
//! - Directory walking with an extension allow-list
//! - Exact content hashing with SHA-256 (streaming)
//! - Perceptual hashing of images and video frames (aHash)
//! - Acoustic fingerprinting through an external tool
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and candidate discovery
//! - [`media`]: Media kind inference from file extensions
//! - [`hasher`]: SHA-256 file hashing (streaming)
//! - [`perceptual`]: The 9x8 grayscale grid and aHash math
//! - [`external`]: Timeout-bounded external collaborators (`fpcalc`, `ffmpeg`)
//! - [`fingerprint`]: Domain-tagged fingerprint values and the fingerprint policy
//! - [`path_utils`]: Path identity keys
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::scanner::{enumerate, EnumeratorConfig};
//! use std::path::Path;
//!
//! let config = EnumeratorConfig {
//!     recursive: true,
//!     extensions: vec!["jpg".to_string(), "png".to_string()],
//!     ..Default::default()
//! };
//!
//! let listing = enumerate(Path::new("."), &config).unwrap();
//! for file in &listing.files {
//!     println!("{}: {} bytes", file.path.display(), file.size);
//! }
//! ```

pub mod external;
pub mod fingerprint;
pub mod hasher;
pub mod media;
pub mod path_utils;
pub mod perceptual;
pub mod walker;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

// Re-export main types
pub use fingerprint::{
    Fingerprint, FingerprintDomain, FingerprintError, FingerprintMode, FingerprintPolicy,
};
pub use hasher::Hasher;
pub use media::MediaKind;
pub use perceptual::{GrayGrid, PerceptualHash};
pub use walker::{enumerate, Listing, Walker};

/// A file discovered by the enumerator.
///
/// Immutable once created. Identity is the path, compared through
/// [`path_utils::path_key`] so that case-insensitive platforms treat
/// `A.JPG` and `a.jpg` as the same file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFile {
    /// Absolute path to the file
    #[serde(serialize_with = "path_utils::serialize_lossy")]
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

impl CandidateFile {
    /// Create a new CandidateFile.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            modified,
        }
    }

    /// Lowercased extension without the leading dot, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        media::normalized_extension(&self.path)
    }

    /// Identity key for this file's path.
    #[must_use]
    pub fn identity(&self) -> String {
        path_utils::path_key(&self.path)
    }
}

/// Configuration for candidate enumeration.
#[derive(Debug, Clone, Default)]
pub struct EnumeratorConfig {
    /// Descend into subdirectories.
    pub recursive: bool,

    /// Extension allow-list (case-insensitive, with or without a leading dot).
    /// An empty list accepts every file.
    pub extensions: Vec<String>,

    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,
}

impl EnumeratorConfig {
    /// Create a configuration from the recursion flag and extension list.
    #[must_use]
    pub fn new(recursive: bool, extensions: Vec<String>) -> Self {
        Self {
            recursive,
            extensions,
            ..Self::default()
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The scan root does not exist.
    #[error("Root not found: {0}")]
    RootNotFound(PathBuf),

    /// The scan root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
