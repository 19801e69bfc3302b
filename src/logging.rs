//! Logging for mediadupe.
//!
//! Two sinks live here:
//!
//! - Diagnostic logging through the `log` facade with an `env_logger`
//!   backend. `RUST_LOG` wins when set; otherwise `--quiet` selects errors
//!   only, `-v` debug and `-vv` trace, with info as the default.
//! - [`AuditLog`], the plain append-only scan log. One line per pipeline
//!   event, each prefixed with a local wall-clock timestamp. It is written
//!   for people and never read back.
//!
//! # Example
//!
//! ```rust,no_run
//! use mediadupe::logging::{init_logging, AuditLog};
//!
//! init_logging(1, false);
//! let audit = AuditLog::open("scan.log").unwrap();
//! audit.record("Found 3 file(s) matching filter");
//! ```

use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use env_logger::Builder;
use log::LevelFilter;

/// Timestamp format used by the audit log.
pub const AUDIT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Initialize the logging subsystem based on CLI verbosity flags.
///
/// Call once, before any logging. Later calls are ignored.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=normal, 1=debug, 2+=trace)
/// * `quiet` - If true, only show errors (overridden by RUST_LOG)
pub fn init_logging(verbose: u8, quiet: bool) {
    let use_env = env::var("RUST_LOG").is_ok();

    let mut builder = Builder::new();
    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    configure_format(&mut builder, verbose);

    if builder.try_init().is_err() {
        return;
    }

    if use_env {
        log::debug!("Logging initialized from RUST_LOG");
    } else {
        log::debug!(
            "Logging initialized at level: {:?}",
            determine_level(verbose, quiet)
        );
    }
}

/// Determine the log level from CLI flags.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Debug builds get timestamps and, when verbose, module paths. Release
/// builds print level and message only.
fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_seconds();
            let level = record.level();
            let level_style = buf.default_level_style(level);

            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} {}",
                    timestamp,
                    level,
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let level_style = buf.default_level_style(level);
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        });
    }
}

/// Append-only, timestamped scan log.
///
/// Writes are serialised through a mutex so lines from worker threads never
/// interleave. A failed write is reported through `log::warn!` and otherwise
/// ignored; the audit log never aborts a scan.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLog {
    /// Open (or create) the log at `path` in append mode.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file or its parent directory cannot be created.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line.
    pub fn record(&self, message: impl AsRef<str>) {
        let line = format!(
            "{} {}\n",
            Local::now().format(AUDIT_TIMESTAMP_FORMAT),
            message.as_ref()
        );
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(e) = file.write_all(line.as_bytes()).and_then(|()| file.flush()) {
            log::warn!("Failed to write audit log {}: {}", self.path.display(), e);
        }
    }
}

/// Record to an optional audit log.
pub(crate) fn audit(log: Option<&AuditLog>, message: impl AsRef<str>) {
    if let Some(log) = log {
        log.record(message);
    }
}
