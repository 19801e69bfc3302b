//! Scan and application configuration.
//!
//! [`ScanConfig`] is the value object handed to every engine call. Nothing in
//! the hashing path reads global state; tool paths, mode and filters all flow
//! through this struct.
//!
//! [`AppConfig`] holds user defaults and is layered with figment:
//! built-in defaults, then a TOML file, then `MEDIADUPE_*` environment
//! variables. CLI flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::scanner::media::normalize_filter_entry;
use crate::scanner::{EnumeratorConfig, FingerprintMode};

/// Default bounded audio prefix handed to the acoustic fingerprinter.
pub const DEFAULT_AUDIO_LENGTH_SECS: u32 = 120;

/// Default external tool timeout.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of fingerprinting workers.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Locations and limits for external collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalToolPaths {
    /// Acoustic fingerprinting executable.
    pub fpcalc: PathBuf,
    /// Video frame decoder executable.
    pub ffmpeg: PathBuf,
    /// Seconds of audio to fingerprint.
    pub audio_length_secs: u32,
    /// Per-invocation timeout.
    pub timeout: Duration,
}

impl Default for ExternalToolPaths {
    fn default() -> Self {
        Self {
            fpcalc: PathBuf::from("fpcalc"),
            ffmpeg: PathBuf::from("ffmpeg"),
            audio_length_secs: DEFAULT_AUDIO_LENGTH_SECS,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

/// Everything a scan needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Fingerprinting strategy.
    pub mode: FingerprintMode,
    /// Lowercase extensions without a dot. Empty matches every file.
    pub extension_filter: Vec<String>,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Follow symbolic links during the walk.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// External collaborator settings.
    pub tools: ExternalToolPaths,
    /// Fingerprinting worker count.
    pub io_threads: usize,
    /// Seek offsets (seconds) sampled from each video in Deep mode.
    pub video_sample_offsets: Vec<f64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: FingerprintMode::Fast,
            extension_filter: Vec::new(),
            recursive: true,
            follow_symlinks: false,
            skip_hidden: false,
            tools: ExternalToolPaths::default(),
            io_threads: DEFAULT_IO_THREADS,
            video_sample_offsets: vec![0.0],
        }
    }
}

impl ScanConfig {
    /// Set the fingerprinting mode.
    #[must_use]
    pub fn with_mode(mut self, mode: FingerprintMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the extension allow-list. Entries are normalised and deduplicated.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = extensions
            .into_iter()
            .map(|e| normalize_filter_entry(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();
        self.extension_filter = normalized;
        self
    }

    /// Enable or disable recursion.
    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Enable or disable following symlinks.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Enable or disable skipping hidden entries.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Replace external tool settings.
    #[must_use]
    pub fn with_tools(mut self, tools: ExternalToolPaths) -> Self {
        self.tools = tools;
        self
    }

    /// Set the worker count (minimum 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the video seek offsets. Negative and non-finite values are dropped.
    #[must_use]
    pub fn with_video_offsets(mut self, offsets: Vec<f64>) -> Self {
        let offsets: Vec<f64> = offsets
            .into_iter()
            .filter(|o| o.is_finite() && *o >= 0.0)
            .collect();
        self.video_sample_offsets = if offsets.is_empty() { vec![0.0] } else { offsets };
        self
    }

    /// Enumerator settings derived from this config.
    #[must_use]
    pub fn enumerator(&self) -> EnumeratorConfig {
        EnumeratorConfig {
            recursive: self.recursive,
            extensions: self.extension_filter.clone(),
            follow_symlinks: self.follow_symlinks,
            skip_hidden: self.skip_hidden,
        }
    }
}

/// Persistent user defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default fingerprinting mode.
    pub mode: FingerprintMode,
    /// Default extension filter.
    pub extensions: Vec<String>,
    /// Default recursion.
    pub recursive: bool,
    /// Follow symlinks.
    pub follow_symlinks: bool,
    /// Skip hidden files.
    pub skip_hidden: bool,
    /// Directory for snapshot artifacts. `None` uses the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_dir: Option<PathBuf>,
    /// Audit log file. `None` disables the audit log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Fingerprinting worker count.
    pub io_threads: usize,
    /// Acoustic fingerprinter path.
    pub fpcalc: PathBuf,
    /// Frame decoder path.
    pub ffmpeg: PathBuf,
    /// Seconds of audio to fingerprint.
    pub audio_length_secs: u32,
    /// External tool timeout in seconds.
    pub tool_timeout_secs: u64,
    /// Video seek offsets in seconds.
    pub video_sample_offsets: Vec<f64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: FingerprintMode::Fast,
            extensions: Vec::new(),
            recursive: true,
            follow_symlinks: false,
            skip_hidden: false,
            snapshot_dir: None,
            log_file: None,
            io_threads: DEFAULT_IO_THREADS,
            fpcalc: PathBuf::from("fpcalc"),
            ffmpeg: PathBuf::from("ffmpeg"),
            audio_length_secs: DEFAULT_AUDIO_LENGTH_SECS,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT.as_secs(),
            video_sample_offsets: vec![0.0],
        }
    }
}

impl AppConfig {
    /// Environment variable prefix.
    pub const ENV_PREFIX: &'static str = "MEDIADUPE_";

    /// Load defaults, then `path` (or the platform config file), then environment.
    ///
    /// A missing file is not an error. A malformed one is.
    ///
    /// # Errors
    ///
    /// Returns an error when the TOML file or an environment variable cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path(),
        };
        Self::figment(file.as_deref())
            .extract()
            .context("Failed to load configuration")
    }

    /// The layered figment used by [`AppConfig::load`].
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            log::debug!("Reading configuration from {}", file.display());
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(Self::ENV_PREFIX))
    }

    /// Platform-specific configuration file location.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "mediadupe", "mediadupe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Platform-specific default snapshot directory.
    #[must_use]
    pub fn default_snapshot_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "mediadupe", "mediadupe")
            .map(|dirs| dirs.data_dir().join("snapshots"))
    }

    /// Serialise to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialise configuration")
    }

    /// Convert user defaults into a [`ScanConfig`].
    #[must_use]
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::default()
            .with_mode(self.mode)
            .with_extensions(&self.extensions)
            .with_recursive(self.recursive)
            .with_follow_symlinks(self.follow_symlinks)
            .with_skip_hidden(self.skip_hidden)
            .with_io_threads(self.io_threads)
            .with_video_offsets(self.video_sample_offsets.clone())
            .with_tools(ExternalToolPaths {
                fpcalc: self.fpcalc.clone(),
                ffmpeg: self.ffmpeg.clone(),
                audio_length_secs: self.audio_length_secs,
                timeout: Duration::from_secs(self.tool_timeout_secs.max(1)),
            })
    }
}
