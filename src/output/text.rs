//! Plain-text report of duplicate groups.
//!
//! ```text
//! hash=exact:9f86d081884c7d65... (x2)
//!   - /photos/A.jpg [exact]
//!   - /photos/B.jpg [exact]
//!
//! 1 duplicate group(s), 2 file(s), 1.0 KiB reclaimable
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::{Condition, Paint};

use crate::duplicates::{DuplicateGroup, ScanSummary};

/// Text report over a set of groups.
#[derive(Debug)]
pub struct TextReport<'a> {
    groups: &'a [DuplicateGroup],
    summary: Option<&'a ScanSummary>,
    color: bool,
}

impl<'a> TextReport<'a> {
    /// Report `groups` with no summary footer and no color.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self {
            groups,
            summary: None,
            color: false,
        }
    }

    /// Append a summary footer.
    #[must_use]
    pub fn with_summary(mut self, summary: &'a ScanSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Enable/disable ANSI colors.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn condition(&self) -> Condition {
        if self.color {
            Condition::ALWAYS
        } else {
            Condition::NEVER
        }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let when = self.condition();

        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                writeln!(writer)?;
            }
            writeln!(
                writer,
                "hash={} {}",
                group.fingerprint.bold().whenever(when),
                format!("(x{})", group.len()).dim().whenever(when)
            )?;
            let domain = group.fingerprint.domain().prefix();
            for member in &group.members {
                writeln!(
                    writer,
                    "  - {} {}",
                    member.path.display(),
                    format!("[{domain}]").cyan().whenever(when)
                )?;
            }
        }

        if let Some(summary) = self.summary {
            if !self.groups.is_empty() {
                writeln!(writer)?;
            }
            self.write_summary(writer, summary)?;
        }
        Ok(())
    }

    fn write_summary<W: Write>(&self, writer: &mut W, summary: &ScanSummary) -> io::Result<()> {
        let when = self.condition();

        if self.groups.is_empty() {
            writeln!(writer, "{}", "No duplicates found".green().whenever(when))?;
        } else {
            writeln!(
                writer,
                "{} duplicate group(s), {} file(s), {} reclaimable",
                self.groups.len(),
                summary.duplicate_files,
                ByteSize::b(summary.reclaimable_space).green().whenever(when)
            )?;
        }

        if summary.failed_files > 0 {
            writeln!(
                writer,
                "{}",
                format!("{} file(s) could not be fingerprinted", summary.failed_files)
                    .yellow()
                    .whenever(when)
            )?;
        }
        if summary.interrupted {
            writeln!(
                writer,
                "{}",
                format!(
                    "Interrupted after {} of {} file(s)",
                    summary.hashed_files + summary.failed_files,
                    summary.total_files
                )
                .yellow()
                .whenever(when)
            )?;
        }
        if let Some(path) = &summary.snapshot_path {
            writeln!(writer, "Snapshot: {}", path.display())?;
        }
        Ok(())
    }

    /// Render to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
