//! Writing and loading snapshot artifacts.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Local;
use thiserror::Error;

use super::data::{ScanSnapshot, SNAPSHOT_VERSION};

/// Errors from the snapshot store.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The artifact could not be written.
    #[error("Failed to write snapshot {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact could not be read.
    #[error("Failed to read snapshot {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact is not a valid snapshot document.
    #[error("Failed to parse snapshot {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The artifact has a version this build does not understand.
    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

static RUN_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Durable store for one scan run.
///
/// The artifact name is chosen at construction from the local start time,
/// the process id and a per-process counter, so separate runs never share
/// an artifact. Nothing touches the disk until the first [`write`](Self::write).
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store for a new run inside `dir`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let pid = std::process::id();
        let mut n = RUN_COUNTER.fetch_add(1, Ordering::SeqCst);
        loop {
            let path = dir.join(format!("scan-{stamp}-{pid}-{n}.json"));
            if !path.exists() {
                return Self { path };
            }
            n = RUN_COUNTER.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Use an explicit artifact path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Artifact location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the artifact with `snapshot`.
    ///
    /// The document is written to `<name>.tmp` next to the artifact and then
    /// renamed over it.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::WriteFailed`] on any I/O or serialisation failure.
    pub fn write(&self, snapshot: &ScanSnapshot) -> Result<PathBuf, SnapshotError> {
        let fail = |source: std::io::Error| SnapshotError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| fail(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(fail)?;
        }

        let tmp = self.tmp_path();
        let result = (|| {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(fail(e));
        }

        log::debug!(
            "Snapshot ({}) written: {} ({} file(s))",
            snapshot.stage,
            self.path.display(),
            snapshot.file_count
        );
        Ok(self.path.clone())
    }

    /// Load and validate a snapshot artifact.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::ReadFailed`], [`SnapshotError::Parse`] or
    /// [`SnapshotError::UnsupportedVersion`].
    pub fn load(path: impl AsRef<Path>) -> Result<ScanSnapshot, SnapshotError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SnapshotError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let snapshot: ScanSnapshot =
            serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        if snapshot.file_count != snapshot.files.len() {
            log::warn!(
                "Snapshot {} declares {} file(s) but lists {}",
                path.display(),
                snapshot.file_count,
                snapshot.files.len()
            );
        }

        Ok(snapshot)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
