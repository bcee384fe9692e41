//! Per-run audit trail.
//!
//! Every import run keeps an ordered log of human-readable status
//! lines. Each line is written to the process log as it happens and
//! retained so the caller can inspect the full trail after the run
//! finishes, including runs that abort partway.

use std::fmt;

use chrono::{DateTime, Utc};

/// One timestamped status line.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub line: String,
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.at.format("%Y-%m-%dT%H:%M:%S%.3fZ"), self.line)
    }
}

/// Ordered, append-only log of audit entries for one run.
///
/// Owned exclusively by the pipeline that produced it; handed back to
/// the caller (read-only from then on) when the run completes or
/// aborts.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a status line and mirror it to the process log at info
    /// level.
    pub fn info(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!("{line}");
        self.push(line);
    }

    /// Append a status line and mirror it at warn level. Used for
    /// per-index skips and other recovered problems.
    pub fn warn(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::warn!("{line}");
        self.push(line);
    }

    fn push(&mut self, line: String) {
        self.entries.push(AuditEntry {
            at: Utc::now(),
            line,
        });
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// The raw lines, without timestamps. Handy for assertions.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.line.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
