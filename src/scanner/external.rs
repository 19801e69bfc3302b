//! External collaborators used by Deep mode.
//!
//! Two capabilities are consumed from outside the process:
//!
//! - An acoustic fingerprinter (Chromaprint's `fpcalc`), invoked with a
//!   bounded-duration flag and expected to print `FINGERPRINT=<opaque>`.
//! - A frame decoder (`ffmpeg`), asked for one frame at a seek offset,
//!   scaled to 9x8 and emitted as raw 8-bit grayscale.
//!
//! Both sit behind traits so the fingerprint policy can be driven by fakes.
//! Every invocation goes through [`run_with_timeout`]; a hung tool is killed
//! once its deadline passes.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::perceptual::{GrayGrid, GRID_HEIGHT, GRID_SAMPLES, GRID_WIDTH};

/// Interval between child status polls.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long to wait for pipes to close once the child has exited. A
/// grandchild holding an inherited pipe open must not stall the scan.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Errors from external tool invocations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool could not be found or started.
    #[error("{tool} is not available: {reason}")]
    Unavailable { tool: String, reason: String },

    /// The tool did not finish before its deadline and was killed.
    #[error("{tool} timed out after {timeout:?}")]
    Timeout { tool: String, timeout: Duration },

    /// The tool exited unsuccessfully.
    #[error("{tool} failed ({status}): {stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The tool succeeded but its output was not understood.
    #[error("{tool} produced unexpected output: {reason}")]
    BadOutput { tool: String, reason: String },
}

/// Captured output of a finished process.
#[derive(Debug)]
pub struct ToolOutput {
    /// Exit status.
    pub status: ExitStatus,
    /// Everything written to stdout.
    pub stdout: Vec<u8>,
    /// Everything written to stderr.
    pub stderr: Vec<u8>,
}

/// Run `cmd` to completion, killing it if it outlives `timeout`.
///
/// stdout and stderr are drained on helper threads so a chatty child can
/// never block on a full pipe.
///
/// # Errors
///
/// Returns [`ToolError::Unavailable`] if the process cannot be spawned and
/// [`ToolError::Timeout`] if the deadline passes.
pub fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<ToolOutput, ToolError> {
    let tool = cmd.get_program().to_string_lossy().into_owned();

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ToolError::Unavailable {
            tool: tool.clone(),
            reason: e.to_string(),
        })?;

    let stdout_reader = child.stdout.take().map(drain);
    let stderr_reader = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                log::warn!("{} exceeded {:?}, killed", tool, timeout);
                return Err(ToolError::Timeout { tool, timeout });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                return Err(ToolError::Unavailable {
                    tool,
                    reason: e.to_string(),
                });
            }
        }
    };

    let grace = Instant::now() + DRAIN_GRACE;
    let finish = |pipe: Option<Drain>| pipe.map(|p| p.finish(grace)).unwrap_or_default();

    Ok(ToolOutput {
        status,
        stdout: finish(stdout_reader),
        stderr: finish(stderr_reader),
    })
}

/// A pipe being read on a helper thread.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    closed: Receiver<()>,
}

impl Drain {
    /// Wait for EOF until `deadline`, then take whatever has been read.
    fn finish(self, deadline: Instant) -> Vec<u8> {
        let wait = deadline.saturating_duration_since(Instant::now());
        if self.closed.recv_timeout(wait).is_err() {
            log::debug!("Pipe still open after child exit, keeping partial output");
        }
        let mut buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *buf)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Drain {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let (tx, closed) = mpsc::channel();
    let sink = Arc::clone(&buf);
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => sink
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        let _ = tx.send(());
    });
    Drain { buf, closed }
}

/// Resolve a tool path: explicit paths are used as-is, bare names are
/// searched on `PATH`.
#[must_use]
pub fn resolve_tool(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }

    let path_var: OsString = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Produces an opaque acoustic fingerprint for an audio file.
pub trait AcousticFingerprinter: Send + Sync {
    /// Fingerprint the audio at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] when the fingerprint cannot be produced.
    fn fingerprint(&self, path: &Path) -> Result<String, ToolError>;
}

/// Decodes one representative video frame as a grayscale grid.
pub trait FrameDecoder: Send + Sync {
    /// Decode the frame at `offset_secs` and downsample it to 9x8.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] when no frame can be produced.
    fn decode_frame(&self, path: &Path, offset_secs: f64) -> Result<GrayGrid, ToolError>;
}

/// Chromaprint `fpcalc` wrapper.
#[derive(Debug, Clone)]
pub struct Fpcalc {
    program: PathBuf,
    length_secs: u32,
    timeout: Duration,
}

impl Fpcalc {
    /// Create a wrapper around the `fpcalc` executable at `program`.
    #[must_use]
    pub fn new(program: PathBuf, length_secs: u32, timeout: Duration) -> Self {
        Self {
            program,
            length_secs,
            timeout,
        }
    }
}

/// Extract the value of the first `FINGERPRINT=` line.
#[must_use]
pub fn parse_fpcalc_output(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("FINGERPRINT="))
        .map(|fp| fp.trim().to_string())
        .filter(|fp| !fp.is_empty())
}

impl AcousticFingerprinter for Fpcalc {
    fn fingerprint(&self, path: &Path) -> Result<String, ToolError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-length").arg(self.length_secs.to_string()).arg(path);

        let output = run_with_timeout(cmd, self.timeout)?;
        let tool = self.program.display().to_string();
        if !output.status.success() {
            return Err(ToolError::Failed {
                tool,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_fpcalc_output(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            ToolError::BadOutput {
                tool,
                reason: "no FINGERPRINT= line".to_string(),
            }
        })
    }
}

/// `ffmpeg` single-frame decoder.
#[derive(Debug, Clone)]
pub struct FfmpegFrameDecoder {
    program: PathBuf,
    timeout: Duration,
}

impl FfmpegFrameDecoder {
    /// Create a decoder around the `ffmpeg` executable at `program`.
    #[must_use]
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }

    fn command(&self, path: &Path, offset_secs: f64) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-nostdin", "-v", "error", "-ss"])
            .arg(format!("{offset_secs:.3}"))
            .arg("-i")
            .arg(path)
            .args(["-frames:v", "1", "-vf"])
            .arg(format!("scale={GRID_WIDTH}:{GRID_HEIGHT}:flags=area,format=gray"))
            .args(["-pix_fmt", "gray", "-f", "rawvideo", "pipe:1"]);
        cmd
    }
}

impl FrameDecoder for FfmpegFrameDecoder {
    fn decode_frame(&self, path: &Path, offset_secs: f64) -> Result<GrayGrid, ToolError> {
        let output = run_with_timeout(self.command(path, offset_secs), self.timeout)?;
        let tool = self.program.display().to_string();
        if !output.status.success() {
            return Err(ToolError::Failed {
                tool,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.len() != GRID_SAMPLES {
            return Err(ToolError::BadOutput {
                tool,
                reason: format!(
                    "expected {} bytes of gray samples, got {}",
                    GRID_SAMPLES,
                    output.stdout.len()
                ),
            });
        }
        GrayGrid::from_raw(&output.stdout).map_err(|e| ToolError::BadOutput {
            tool,
            reason: e.to_string(),
        })
    }
}
