//! Progress and warning reporting
//!
//! Scan progress ("Scanning dir X", "Scanned X file ...") and warnings go
//! to stderr so that stdout carries only the rendered results. This keeps
//! `--format json` output machine-parseable.

use std::io::Write;

/// Writes progress and warnings to stderr.
///
/// The wording of progress lines is part of the CLI contract and must not
/// go through the tracing pipeline (which applies its own formatting).
pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    /// Emit a progress line to stderr.
    pub fn progress(&self, message: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{message}");
    }

    /// Emit a warning or error line to stderr.
    pub fn warn(&self, message: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{message}");
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}
