//! Domain-tagged fingerprints and the fingerprinting policy.
//!
//! A [`Fingerprint`] names the hash space that produced it. Its string form
//! is `<domain>:<value>`:
//!
//! | Domain | Produced by |
//! |---|---|
//! | `exact:<64 hex>` | SHA-256 of the full content |
//! | `perc-image:<16 hex>` | aHash of a decoded image |
//! | `perc-video:<16 hex>` | aHash of a decoded video frame |
//! | `perc-audio:<opaque>` | external acoustic fingerprint |
//!
//! Values from different domains never compare equal, even when their
//! suffixes coincide.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::external::{
    resolve_tool, AcousticFingerprinter, FfmpegFrameDecoder, FrameDecoder, Fpcalc, ToolError,
};
use super::hasher::{hash_to_hex, hex_to_hash, Hash, Hasher};
use super::media::MediaKind;
use super::perceptual::{GrayGrid, PerceptualHash};
use super::CandidateFile;
use crate::config::ScanConfig;

/// Fingerprinting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMode {
    /// Always SHA-256 of the full content.
    #[default]
    Fast,
    /// Media-aware perceptual hashing with exact fallback.
    Deep,
}

impl std::fmt::Display for FingerprintMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Deep => write!(f, "deep"),
        }
    }
}

/// Hash space a fingerprint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FingerprintDomain {
    /// `exact:`
    Exact,
    /// `perc-image:`
    Image,
    /// `perc-video:`
    Video,
    /// `perc-audio:`
    Audio,
}

impl FingerprintDomain {
    /// String prefix (without the colon).
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Image => "perc-image",
            Self::Video => "perc-video",
            Self::Audio => "perc-audio",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "exact" => Some(Self::Exact),
            "perc-image" => Some(Self::Image),
            "perc-video" => Some(Self::Video),
            "perc-audio" => Some(Self::Audio),
            _ => None,
        }
    }
}

impl std::fmt::Display for FingerprintDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A content fingerprint tagged with its domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Fingerprint {
    /// SHA-256 digest of the full content.
    Exact(Hash),
    /// aHash of a still image.
    Image(PerceptualHash),
    /// aHash of a video frame (or majority of several frames).
    Video(PerceptualHash),
    /// Opaque acoustic fingerprint.
    Audio(String),
}

impl Fingerprint {
    /// Domain of this fingerprint.
    #[must_use]
    pub fn domain(&self) -> FingerprintDomain {
        match self {
            Self::Exact(_) => FingerprintDomain::Exact,
            Self::Image(_) => FingerprintDomain::Image,
            Self::Video(_) => FingerprintDomain::Video,
            Self::Audio(_) => FingerprintDomain::Audio,
        }
    }

    /// The value after the domain prefix.
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Self::Exact(hash) => hash_to_hex(hash),
            Self::Image(h) | Self::Video(h) => h.to_hex(),
            Self::Audio(raw) => raw.clone(),
        }
    }

    /// Bare SHA-256 hex digest for exact fingerprints.
    #[must_use]
    pub fn sha256_hex(&self) -> Option<String> {
        match self {
            Self::Exact(hash) => Some(hash_to_hex(hash)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.domain(), self.value())
    }
}

/// Error parsing a fingerprint string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid fingerprint: {0}")]
pub struct ParseFingerprintError(String);

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseFingerprintError(s.to_string());
        let (prefix, value) = s.split_once(':').ok_or_else(invalid)?;
        let domain = FingerprintDomain::from_prefix(prefix).ok_or_else(invalid)?;
        match domain {
            FingerprintDomain::Exact => hex_to_hash(value).map(Self::Exact).ok_or_else(invalid),
            FingerprintDomain::Image => PerceptualHash::from_hex(value)
                .map(Self::Image)
                .ok_or_else(invalid),
            FingerprintDomain::Video => PerceptualHash::from_hex(value)
                .map(Self::Video)
                .ok_or_else(invalid),
            FingerprintDomain::Audio if !value.is_empty() => Ok(Self::Audio(value.to_string())),
            FingerprintDomain::Audio => Err(invalid()),
        }
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_string()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = ParseFingerprintError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Ord for Fingerprint {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl PartialOrd for Fingerprint {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Errors that can occur while fingerprinting one file.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The file vanished, could not be read, or an external tool timed out.
    #[error("unreadable {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// Deep mode could not decode the media; Fast mode is used instead.
    #[error("decode failed for {path}: {reason}")]
    DecodeFailed { path: PathBuf, reason: String },
}

impl FingerprintError {
    fn from_tool(path: &Path, err: ToolError) -> Self {
        match err {
            ToolError::Timeout { .. } => Self::Unreadable {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
            other => Self::DecodeFailed {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        }
    }
}

/// Maps a file to a fingerprint under a [`FingerprintMode`].
///
/// The policy holds everything it needs: no global state is consulted.
/// Collaborators that are not configured (or not installed) are simply
/// absent, and the affected media kinds use exact hashing.
#[derive(Clone)]
pub struct FingerprintPolicy {
    hasher: Hasher,
    acoustic: Option<Arc<dyn AcousticFingerprinter>>,
    frames: Option<Arc<dyn FrameDecoder>>,
    video_offsets: Vec<f64>,
}

impl std::fmt::Debug for FingerprintPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintPolicy")
            .field("hasher", &self.hasher)
            .field("acoustic", &self.acoustic.as_ref().map(|_| "<acoustic>"))
            .field("frames", &self.frames.as_ref().map(|_| "<frames>"))
            .field("video_offsets", &self.video_offsets)
            .finish()
    }
}

impl Default for FingerprintPolicy {
    fn default() -> Self {
        Self::exact_only()
    }
}

impl FingerprintPolicy {
    /// A policy with no external collaborators.
    #[must_use]
    pub fn exact_only() -> Self {
        Self {
            hasher: Hasher::new(),
            acoustic: None,
            frames: None,
            video_offsets: vec![0.0],
        }
    }

    /// Build a policy from a scan configuration, resolving tool paths.
    #[must_use]
    pub fn from_config(config: &ScanConfig) -> Self {
        let mut policy = Self::exact_only().with_video_offsets(config.video_sample_offsets.clone());
        if config.mode == FingerprintMode::Fast {
            return policy;
        }

        let tools = &config.tools;
        match resolve_tool(&tools.fpcalc) {
            Some(program) => {
                policy.acoustic = Some(Arc::new(Fpcalc::new(
                    program,
                    tools.audio_length_secs,
                    tools.timeout,
                )));
            }
            None => log::info!(
                "Acoustic fingerprinter {} not found; audio uses exact hashing",
                tools.fpcalc.display()
            ),
        }
        match resolve_tool(&tools.ffmpeg) {
            Some(program) => {
                policy.frames = Some(Arc::new(FfmpegFrameDecoder::new(program, tools.timeout)));
            }
            None => log::info!(
                "Frame decoder {} not found; video uses exact hashing",
                tools.ffmpeg.display()
            ),
        }
        policy
    }

    /// Replace the acoustic fingerprinter.
    #[must_use]
    pub fn with_acoustic(mut self, acoustic: Arc<dyn AcousticFingerprinter>) -> Self {
        self.acoustic = Some(acoustic);
        self
    }

    /// Replace the frame decoder.
    #[must_use]
    pub fn with_frame_decoder(mut self, frames: Arc<dyn FrameDecoder>) -> Self {
        self.frames = Some(frames);
        self
    }

    /// Set the video seek offsets in seconds. An empty list means `[0.0]`.
    #[must_use]
    pub fn with_video_offsets(mut self, offsets: Vec<f64>) -> Self {
        self.video_offsets = if offsets.is_empty() { vec![0.0] } else { offsets };
        self
    }

    /// Fingerprint `file` under `mode`.
    ///
    /// Deep mode failures of any kind fall back to exact hashing; only an
    /// exact-hash failure is returned.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::Unreadable`] when the file content cannot be read.
    pub fn fingerprint(
        &self,
        file: &CandidateFile,
        mode: FingerprintMode,
    ) -> Result<Fingerprint, FingerprintError> {
        if mode == FingerprintMode::Deep {
            match self.deep(file) {
                Some(Ok(fp)) => return Ok(fp),
                Some(Err(e)) => {
                    log::debug!("Deep fingerprint fell back to exact: {}", e);
                }
                None => {}
            }
        }
        self.exact(&file.path)
    }

    /// Exact SHA-256 fingerprint of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::Unreadable`] on any I/O failure.
    pub fn exact(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        self.hasher
            .full_hash(path)
            .map(Fingerprint::Exact)
            .map_err(|e| FingerprintError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Media-aware fingerprint, or `None` when the kind has no perceptual path.
    fn deep(&self, file: &CandidateFile) -> Option<Result<Fingerprint, FingerprintError>> {
        let path = file.path.as_path();
        match MediaKind::from_path(path) {
            MediaKind::Audio => {
                let acoustic = self.acoustic.as_ref()?;
                Some(
                    acoustic
                        .fingerprint(path)
                        .map(Fingerprint::Audio)
                        .map_err(|e| FingerprintError::from_tool(path, e)),
                )
            }
            MediaKind::Video => {
                let frames = self.frames.as_ref()?;
                Some(self.video_hash(frames.as_ref(), path).map(Fingerprint::Video))
            }
            MediaKind::Image => Some(
                GrayGrid::from_image_path(path)
                    .map(|grid| Fingerprint::Image(grid.ahash()))
                    .map_err(|e| FingerprintError::DecodeFailed {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    }),
            ),
            MediaKind::Other => None,
        }
    }

    fn video_hash(
        &self,
        frames: &dyn FrameDecoder,
        path: &Path,
    ) -> Result<PerceptualHash, FingerprintError> {
        let mut hashes = Vec::with_capacity(self.video_offsets.len());
        let mut last_error = None;
        for &offset in &self.video_offsets {
            match frames.decode_frame(path, offset) {
                Ok(grid) => hashes.push(grid.ahash()),
                Err(e) => {
                    log::trace!("No frame at {:.3}s in {}: {}", offset, path.display(), e);
                    last_error = Some(e);
                }
            }
        }

        PerceptualHash::majority(&hashes).ok_or_else(|| match last_error {
            Some(e) => FingerprintError::from_tool(path, e),
            None => FingerprintError::DecodeFailed {
                path: path.to_path_buf(),
                reason: "no frames decoded".to_string(),
            },
        })
    }
}
