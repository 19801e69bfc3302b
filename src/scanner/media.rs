//! Media kind inference from file extensions.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extensions dispatched to the acoustic fingerprinter in Deep mode.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "m4a", "aac", "ogg", "wma", "opus"];

/// Extensions dispatched to the frame decoder in Deep mode.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "webm", "flv", "m4v", "mpg", "mpeg",
];

/// Extensions decoded directly as images in Deep mode.
///
/// Limited to the formats the `image` crate is built with.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp",
];

/// Media kind of a file, inferred from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio file (acoustic fingerprinting).
    Audio,
    /// Video file (single-frame perceptual hash).
    Video,
    /// Still image (perceptual hash).
    Image,
    /// Anything else (always exact hashing).
    Other,
}

impl MediaKind {
    /// Infer the media kind of a path from its extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match normalized_extension(path) {
            Some(ext) => Self::from_extension(&ext),
            None => Self::Other,
        }
    }

    /// Infer the media kind from a lowercase extension without a dot.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        if AUDIO_EXTENSIONS.contains(&ext) {
            Self::Audio
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Self::Video
        } else if IMAGE_EXTENSIONS.contains(&ext) {
            Self::Image
        } else {
            Self::Other
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
            Self::Image => write!(f, "image"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Lowercased extension of `path` without the leading dot.
#[must_use]
pub fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty())
}

/// Normalize one extension filter entry: trim, strip a leading dot, lowercase.
#[must_use]
pub fn normalize_filter_entry(entry: &str) -> String {
    entry.trim().trim_start_matches('.').to_lowercase()
}
