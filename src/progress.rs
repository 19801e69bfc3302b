//! Progress reporting.
//!
//! The engine only ever talks to a [`ProgressCallback`]. It never holds a
//! presentation object and never waits on one:
//!
//! - [`Progress`] draws indicatif bars in the terminal.
//! - [`ChannelProgress`] forwards events over a bounded channel and drops
//!   them when the receiver falls behind, so a slow observer cannot stall
//!   the fingerprinting workers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Phase name used while enumerating candidates.
pub const PHASE_WALKING: &str = "walking";
/// Phase name used while fingerprinting.
pub const PHASE_FINGERPRINT: &str = "fingerprint";

/// Progress callback for the scan pipeline.
///
/// Implementations must return quickly. The engine ignores anything they do.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ([`PHASE_WALKING`], [`PHASE_FINGERPRINT`])
    /// * `total` - Total number of items to process (0 when unknown)
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called after each item is processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Number of items finished so far (1-based)
    /// * `path` - Path just processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// A progress event as delivered by [`ChannelProgress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A phase began.
    PhaseStart { phase: String, total: usize },
    /// An item finished.
    Progress { current: usize, path: String },
    /// Bytes processed by a finished item.
    ItemCompleted { bytes: u64 },
    /// A phase finished.
    PhaseEnd { phase: String },
    /// Free-form status message.
    Message(String),
}

/// Fire-and-forget forwarder onto a bounded channel.
///
/// Events that do not fit are counted and dropped. Phase boundaries use the
/// same path, so a receiver that must never miss them should keep up or use
/// a generous capacity.
pub struct ChannelProgress {
    sender: SyncSender<ProgressEvent>,
    dropped: AtomicU64,
}

impl ChannelProgress {
    /// Create a forwarder and its receiving end.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, Receiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        (
            Self {
                sender,
                dropped: AtomicU64::new(0),
            },
            receiver,
        )
    }

    /// Number of events dropped because the channel was full or closed.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn send(&self, event: ProgressEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl ProgressCallback for ChannelProgress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        self.send(ProgressEvent::PhaseStart {
            phase: phase.to_string(),
            total,
        });
    }

    fn on_progress(&self, current: usize, path: &str) {
        self.send(ProgressEvent::Progress {
            current,
            path: path.to_string(),
        });
    }

    fn on_item_completed(&self, bytes: u64) {
        self.send(ProgressEvent::ItemCompleted { bytes });
    }

    fn on_phase_end(&self, phase: &str) {
        self.send(ProgressEvent::PhaseEnd {
            phase: phase.to_string(),
        });
    }

    fn on_message(&self, message: &str) {
        self.send(ProgressEvent::Message(message.to_string()));
    }
}

/// Terminal progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    walking: Mutex<Option<ProgressBar>>,
    fingerprint: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use mediadupe::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            walking: Mutex::new(None),
            fingerprint: Mutex::new(None),
            quiet,
        }
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn fingerprint_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        match phase {
            PHASE_WALKING => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::walking_style());
                pb.set_message("Listing files");
                pb.enable_steady_tick(Duration::from_millis(100));
                *lock(&self.walking) = Some(pb);
            }
            _ => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::fingerprint_style());
                pb.set_message("Fingerprinting");
                *lock(&self.fingerprint) = Some(pb);
            }
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        let message = truncate_path(path, 30);
        if let Some(ref pb) = *lock(&self.fingerprint) {
            pb.set_position(current as u64);
            pb.set_message(message);
        } else if let Some(ref pb) = *lock(&self.walking) {
            pb.set_message(message);
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        match phase {
            PHASE_WALKING => {
                if let Some(pb) = lock(&self.walking).take() {
                    pb.finish_with_message("Listing complete");
                }
            }
            _ => {
                if let Some(pb) = lock(&self.fingerprint).take() {
                    pb.finish_with_message("Fingerprinting complete");
                }
            }
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *lock(&self.fingerprint) {
            pb.set_message(message.to_string());
        } else if let Some(ref pb) = *lock(&self.walking) {
            pb.set_message(message.to_string());
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let count = file_name.chars().count();
    if count + 4 > max_len {
        let tail: String = file_name.chars().skip(count + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
