//! Path identity utilities.
//!
//! Candidate files are identified by their path string. Two spellings of the
//! same file must map to the same key:
//!
//! - Unicode: macOS stores names in NFD, so keys are normalized to NFC.
//! - Case: Windows and macOS filesystems are case-insensitive by default, so
//!   keys are lowercased there.
//!
//! # Example
//!
//! ```
//! use mediadupe::scanner::path_utils::normalize_path_str;
//!
//! let nfc = "café.jpg";
//! let nfd = "cafe\u{0301}.jpg";
//! assert_eq!(normalize_path_str(nfc), normalize_path_str(nfd));
//! ```

use serde::Serializer;
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Whether the host filesystem is treated as case-insensitive.
pub const CASE_INSENSITIVE_FS: bool = cfg!(any(windows, target_os = "macos"));

/// Normalize a path string to NFC (Composed) form.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// Identity key for a path: NFC-normalized, lowercased on case-insensitive platforms.
#[must_use]
pub fn path_key(path: &Path) -> String {
    path_key_with(path, CASE_INSENSITIVE_FS)
}

/// Identity key with explicit case handling.
#[must_use]
pub fn path_key_with(path: &Path, case_insensitive: bool) -> String {
    let normalized = normalize_path_str(&path.to_string_lossy());
    if case_insensitive {
        normalized.to_lowercase()
    } else {
        normalized
    }
}

/// Check whether two paths refer to the same candidate identity.
#[must_use]
pub fn same_identity(a: &Path, b: &Path) -> bool {
    path_key(a) == path_key(b)
}

/// Serialize a path as a string, replacing invalid UTF-8 with U+FFFD.
///
/// Filenames on Unix are arbitrary bytes; serde's own `Path` impl refuses
/// anything that is not UTF-8, which would fail a whole document over one
/// name.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize_lossy<P, S>(path: &P, serializer: S) -> Result<S::Ok, S::Error>
where
    P: AsRef<Path>,
    S: Serializer,
{
    serializer.serialize_str(&path.as_ref().to_string_lossy())
}

/// [`serialize_lossy`] for optional paths.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize_lossy_opt<S: Serializer>(
    path: &Option<PathBuf>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match path {
        Some(path) => serialize_lossy(path, serializer),
        None => serializer.serialize_none(),
    }
}
