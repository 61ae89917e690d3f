//! Operator-facing reporting.
//!
//! Components receive a `&dyn Reporter` at construction instead of reaching
//! for a global UI handle. [`TracingReporter`] forwards to `tracing`;
//! [`MemoryReporter`] records everything for assertions in tests.

use std::sync::Mutex;

use crate::types::DiffResult;

/// Sink for messages meant for the person running a sync.
pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn fatal(&self, message: &str);

    /// Per-cookbook progress line: does the local cookbook match the server?
    fn cookbook_status(&self, cookbook: &str, diff: &DiffResult) {
        if diff.is_empty() {
            self.info(&format!("{cookbook} => match"));
        } else {
            self.info(&format!("{cookbook} => mismatch {}", format_diff(diff)));
        }
    }
}

/// Compact one-line rendering of a diff: `recipes[default.rb, a.rb] templates[x.erb]`.
pub fn format_diff(diff: &DiffResult) -> String {
    diff.iter()
        .map(|(segment, files)| format!("{segment}[{}]", files.join(", ")))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// TracingReporter
// ---------------------------------------------------------------------------

/// Reporter that emits `tracing` events only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn fatal(&self, message: &str) {
        tracing::error!("{message}");
    }
}

// ---------------------------------------------------------------------------
// MemoryReporter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Warn,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub level: ReportLevel,
    pub message: String,
}

/// Reporter that keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<ReportLine>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<ReportLine> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|l| l.message).collect()
    }

    /// Whether any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.message.contains(needle))
    }

    fn push(&self, level: ReportLevel, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(ReportLine {
                level,
                message: message.to_string(),
            });
        }
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, message: &str) {
        self.push(ReportLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(ReportLevel::Warn, message);
    }

    fn fatal(&self, message: &str) {
        self.push(ReportLevel::Fatal, message);
    }
}
