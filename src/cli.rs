//! Command-line interface definitions for mediadupe.
//!
//! Global options control verbosity and error rendering; subcommands select
//! the operation.
//!
//! # Example
//!
//! ```bash
//! # Exact duplicates of JPEG and PNG files, text report
//! mediadupe scan ~/Pictures --ext jpg --ext png
//!
//! # Perceptual duplicates, JSON for scripting
//! mediadupe scan ~/Media --mode deep --output json
//!
//! # Re-group a snapshot written by an earlier scan
//! mediadupe show ~/.local/share/mediadupe/snapshots/scan-20240501-100000-1234-0.json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::scanner::FingerprintMode;

/// Content-addressable duplicate finder for files, images, video and audio.
#[derive(Debug, Parser)]
#[command(name = "mediadupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate files
    Scan(ScanArgs),
    /// Group the records of a saved snapshot
    Show(ShowArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Only scan the top-level directory
    #[arg(long)]
    pub no_recurse: bool,

    /// Extension to include (repeatable, e.g. --ext jpg --ext .PNG)
    ///
    /// Without any --ext every file is a candidate.
    #[arg(short, long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Fingerprinting mode
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Directory for snapshot artifacts
    #[arg(long, value_name = "DIR", conflicts_with = "no_snapshot")]
    pub snapshot_dir: Option<PathBuf>,

    /// Do not write snapshot artifacts
    #[arg(long)]
    pub no_snapshot: bool,

    /// Append audit lines to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Acoustic fingerprinter executable
    #[arg(long, value_name = "PATH")]
    pub fpcalc: Option<PathBuf>,

    /// Frame decoder executable
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Timeout for each external tool invocation, in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub tool_timeout: Option<u64>,

    /// Number of fingerprinting threads
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub io_threads: Option<u64>,

    /// Follow symbolic links during scan
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the show subcommand.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Snapshot artifact to read
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Fingerprinting mode as a CLI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// SHA-256 of file content
    Fast,
    /// Perceptual fingerprints for media, SHA-256 otherwise
    Deep,
}

impl From<ModeArg> for FingerprintMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fast => FingerprintMode::Fast,
            ModeArg::Deep => FingerprintMode::Deep,
        }
    }
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text report
    Text,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
