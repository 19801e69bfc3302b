//! Candidate enumeration using jwalk for parallel traversal.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct and the [`enumerate`] entry
//! point. The walker visits either the root's direct children or the whole
//! tree, keeps regular files whose extension is in the allow-list, and
//! yields per-entry failures as [`ScanError`] values instead of stopping.
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::scanner::{Walker, EnumeratorConfig};
//! use std::path::Path;
//!
//! let config = EnumeratorConfig::new(false, vec!["mp3".into()]);
//! let walker = Walker::new(Path::new("/music"), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::collections::HashSet;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use jwalk::WalkDir;

use super::media::{normalize_filter_entry, normalized_extension};
use super::{CandidateFile, EnumeratorConfig, ScanError};

/// Result of a full enumeration.
#[derive(Debug, Default)]
pub struct Listing {
    /// Candidate files, in walk order.
    pub files: Vec<CandidateFile>,
    /// Number of entries skipped because of I/O errors.
    pub skipped: usize,
    /// The errors behind `skipped`, for reporting.
    pub errors: Vec<ScanError>,
}

/// Directory walker for candidate discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: EnumeratorConfig,
    /// Normalized extension allow-list (empty accepts everything)
    extensions: HashSet<String>,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(path: &Path, config: EnumeratorConfig) -> Self {
        let extensions = config
            .extensions
            .iter()
            .map(|e| normalize_filter_entry(e))
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            root: path.to_path_buf(),
            config,
            extensions,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Check a path against the extension allow-list.
    fn passes_extension_filter(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        normalized_extension(path).is_some_and(|ext| self.extensions.contains(&ext))
    }

    /// Walk the tree, yielding candidates and per-entry errors.
    ///
    /// Directory children are visited in name order so that repeated walks
    /// of an unchanged tree yield the same sequence.
    pub fn walk(&self) -> impl Iterator<Item = Result<CandidateFile, ScanError>> + '_ {
        let max_depth = if self.config.recursive { usize::MAX } else { 1 };

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(self.config.skip_hidden)
            .max_depth(max_depth)
            .sort(true);

        walk_dir.into_iter().filter_map(move |entry_result| {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            match entry_result {
                Ok(entry) => {
                    let path = entry.path();
                    if path == self.root {
                        return None;
                    }

                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }

                    let is_symlink = file_type.is_symlink();
                    if is_symlink && !self.config.follow_symlinks {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }

                    if !self.passes_extension_filter(&path) {
                        log::trace!("Filtered by extension: {}", path.display());
                        return None;
                    }

                    let metadata = if self.config.follow_symlinks {
                        std::fs::metadata(&path)
                    } else {
                        std::fs::symlink_metadata(&path)
                    };

                    match metadata {
                        Ok(m) if m.is_file() => Some(Ok(self.make_candidate(path, &m))),
                        Ok(_) => None,
                        Err(e) => Some(Err(Self::map_io_error(path, e))),
                    }
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    let source = e
                        .io_error()
                        .map(|io_err| io::Error::new(io_err.kind(), io_err.to_string()))
                        .unwrap_or_else(|| io::Error::other(e.to_string()));
                    Some(Err(Self::map_io_error(path, source)))
                }
            }
        })
    }

    fn make_candidate(&self, path: PathBuf, metadata: &Metadata) -> CandidateFile {
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        CandidateFile::new(path, metadata.len(), modified)
    }

    fn map_io_error(path: PathBuf, e: io::Error) -> ScanError {
        match e.kind() {
            io::ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            _ => {
                log::warn!("Skipping {}: {}", path.display(), e);
                ScanError::Io { path, source: e }
            }
        }
    }

    /// Collect the whole walk into a [`Listing`].
    #[must_use]
    pub fn collect(&self) -> Listing {
        let mut listing = Listing::default();
        for result in self.walk() {
            match result {
                Ok(file) => listing.files.push(file),
                Err(e) => {
                    listing.skipped += 1;
                    listing.errors.push(e);
                }
            }
        }
        listing
    }
}

/// Enumerate candidate files under `root`.
///
/// # Errors
///
/// Returns [`ScanError::RootNotFound`] when `root` does not exist and
/// [`ScanError::NotADirectory`] when it is not a directory. Failures on
/// individual entries are counted in [`Listing::skipped`].
pub fn enumerate(root: &Path, config: &EnumeratorConfig) -> Result<Listing, ScanError> {
    enumerate_with_shutdown(root, config, None)
}

/// Enumerate with an optional shutdown flag checked between entries.
///
/// # Errors
///
/// Same as [`enumerate`].
pub fn enumerate_with_shutdown(
    root: &Path,
    config: &EnumeratorConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
) -> Result<Listing, ScanError> {
    if !root.exists() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut walker = Walker::new(root, config.clone());
    if let Some(flag) = shutdown_flag {
        walker = walker.with_shutdown_flag(flag);
    }

    let listing = walker.collect();
    log::debug!(
        "Enumerated {} candidate(s) under {} ({} skipped)",
        listing.files.len(),
        root.display(),
        listing.skipped
    );
    Ok(listing)
}
