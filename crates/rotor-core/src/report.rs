//! Status and log events for the display collaborator.
//!
//! The core emits [`Report`]s; presentation and retention belong to the
//! collaborator. [`RecentLog`] is the bounded "most recent N entries" store
//! most collaborators want.

use std::{collections::VecDeque, fmt};

/// Default number of entries kept by [`RecentLog`].
pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// Severity tag attached to every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Progress information
    Info,
    /// A step completed
    Success,
    /// Something went wrong but the session continues
    Warning,
    /// The session failed
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// A status line for the display collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Severity tag
    pub severity: Severity,
    /// Human-readable text; never contains the credential or secret
    pub message: String,
}

impl Report {
    /// Report with explicit severity.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self { severity, message: message.into() }
    }

    /// Info report.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Success report.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    /// Warning report.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Error report.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Receiver of status reports.
pub trait StatusSink {
    /// Accept one report.
    fn report(&mut self, report: &Report);
}

/// Bounded log of the most recent reports, newest first.
#[derive(Debug, Clone)]
pub struct RecentLog {
    entries: VecDeque<Report>,
    capacity: usize,
}

impl RecentLog {
    /// Log keeping at most `capacity` entries (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &Report> {
        self.entries.iter()
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&Report> {
        self.entries.front()
    }
}

impl Default for RecentLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl StatusSink for RecentLog {
    fn report(&mut self, report: &Report) {
        self.entries.push_front(report.clone());
        self.entries.truncate(self.capacity);
    }
}
