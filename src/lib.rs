//! mediadupe - content-addressable duplicate detection
//!
//! Finds files with identical content (SHA-256) or, in deep mode, images,
//! video and audio that look or sound the same (perceptual fingerprints).
//! Every scan leaves a JSON snapshot of its progress, and a small mutation
//! layer deletes or renames group members safely.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod snapshot;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, OutputFormat, ScanArgs, ShowArgs};
use crate::config::AppConfig;
use crate::duplicates::{group_with_stats, DuplicateFinder, FinderConfig, FinderError, ScanSummary};
use crate::error::ExitCode;
use crate::logging::AuditLog;
use crate::output::{JsonOutput, TextReport};
use crate::progress::Progress;
use crate::snapshot::{SnapshotStage, SnapshotStore};

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for configuration problems, a missing or invalid scan
/// root, cancellation during enumeration and unreadable snapshots.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let app_config = AppConfig::load(cli.config.as_deref())?;
    log::debug!("Effective configuration: {:?}", app_config);

    match cli.command {
        Commands::Scan(ref args) => run_scan(&cli, args, &app_config),
        Commands::Show(ref args) => run_show(&cli, args),
    }
}

fn run_scan(cli: &Cli, args: &ScanArgs, app_config: &AppConfig) -> Result<ExitCode> {
    let mut scan = app_config
        .scan_config()
        .with_follow_symlinks(args.follow_symlinks || app_config.follow_symlinks)
        .with_skip_hidden(args.skip_hidden || app_config.skip_hidden);
    if args.no_recurse {
        scan = scan.with_recursive(false);
    }
    if !args.extensions.is_empty() {
        scan = scan.with_extensions(&args.extensions);
    }
    if let Some(mode) = args.mode {
        scan = scan.with_mode(mode.into());
    }
    if let Some(threads) = args.io_threads {
        scan = scan.with_io_threads(usize::try_from(threads).unwrap_or(usize::MAX));
    }
    let mut tools = scan.tools.clone();
    if let Some(ref fpcalc) = args.fpcalc {
        tools.fpcalc = fpcalc.clone();
    }
    if let Some(ref ffmpeg) = args.ffmpeg {
        tools.ffmpeg = ffmpeg.clone();
    }
    if let Some(secs) = args.tool_timeout {
        tools.timeout = std::time::Duration::from_secs(secs);
    }
    let scan = scan.with_tools(tools);

    let mut finder_config = FinderConfig::default().with_scan_config(scan);

    if !args.no_snapshot {
        let dir = args
            .snapshot_dir
            .clone()
            .or_else(|| app_config.snapshot_dir.clone())
            .or_else(AppConfig::default_snapshot_dir);
        match dir {
            Some(dir) => finder_config = finder_config.with_snapshot_dir(dir),
            None => log::warn!("No snapshot directory available; snapshots disabled"),
        }
    }

    if let Some(path) = args.log_file.as_ref().or(app_config.log_file.as_ref()) {
        let audit = AuditLog::open(path)
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;
        finder_config = finder_config.with_audit_log(Arc::new(audit));
    }

    match signal::install_handler() {
        Ok(handler) => finder_config = finder_config.with_shutdown_flag(handler.get_flag()),
        Err(e) => log::warn!("{e}; Ctrl+C will terminate immediately"),
    }

    if !cli.quiet && args.output == OutputFormat::Text {
        finder_config = finder_config.with_progress_callback(Arc::new(Progress::new(false)));
    }

    let finder = DuplicateFinder::new(finder_config);
    let (groups, summary) = match finder.find_duplicates(&args.root) {
        Ok(result) => result,
        Err(FinderError::NoCandidates { root, snapshot_path }) => {
            log::info!("No candidate files under {}", root.display());
            let summary = ScanSummary {
                snapshot_path,
                ..ScanSummary::default()
            };
            (Vec::new(), summary)
        }
        Err(e) => {
            return Err(anyhow::Error::new(e))
                .with_context(|| format!("Scan of {} failed", args.root.display()))
        }
    };

    for (path, reason) in &summary.failures {
        log::debug!("Not fingerprinted: {}: {}", path.display(), reason);
    }

    let exit_code = ExitCode::for_scan(groups.len(), &summary);
    write_report(cli, args.output, &groups, &summary, exit_code)?;
    Ok(exit_code)
}

fn run_show(cli: &Cli, args: &ShowArgs) -> Result<ExitCode> {
    let snapshot = SnapshotStore::load(&args.snapshot)
        .with_context(|| format!("Failed to load snapshot {}", args.snapshot.display()))?;

    let fingerprinted = snapshot.fingerprinted_count();
    let (groups, stats) = group_with_stats(snapshot.records());
    let summary = ScanSummary {
        total_files: snapshot.file_count,
        hashed_files: fingerprinted,
        failed_files: match snapshot.stage {
            SnapshotStage::Hashed => snapshot.files.len() - fingerprinted,
            SnapshotStage::Listed => 0,
        },
        duplicate_groups: stats.duplicate_groups,
        duplicate_files: stats.duplicate_files,
        reclaimable_space: groups.iter().map(|g| g.reclaimable_space()).sum(),
        snapshot_path: Some(args.snapshot.clone()),
        ..ScanSummary::default()
    };

    if snapshot.stage == SnapshotStage::Listed {
        log::warn!(
            "Snapshot {} was taken before fingerprinting; no groups can be formed",
            args.snapshot.display()
        );
    }

    let exit_code = ExitCode::for_scan(groups.len(), &summary);
    write_report(cli, args.output, &groups, &summary, exit_code)?;
    Ok(exit_code)
}

fn write_report(
    cli: &Cli,
    format: OutputFormat,
    groups: &[duplicates::DuplicateGroup],
    summary: &ScanSummary,
    exit_code: ExitCode,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => JsonOutput::new(groups, summary, exit_code)
            .write_to(&mut out, true)
            .context("Failed to write JSON output")?,
        OutputFormat::Text => {
            let mut report = TextReport::new(groups).with_color(!cli.no_color && out.is_terminal());
            if !cli.quiet {
                report = report.with_summary(summary);
            }
            report
                .write_to(&mut out)
                .context("Failed to write report")?;
        }
    }
    out.flush().context("Failed to flush output")
}
