//! CLI output formatting for scans, checks and watch batches.
//!
//! # Output Format
//!
//! Directories without an index document are the common case and are left
//! out; everything else gets one line, with failures indented underneath.
//!
//! ## Scan
//!
//! ```text
//! 001 Projects → updated
//! 002 Projects/Alpha → unchanged
//! 003 Archive → failed
//!     IO error at Archive/Archive.md: permission denied
//!
//! 12 folders: 1 updated, 1 unchanged, 9 without index, 1 failed
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 Projects → stale
//!
//! 12 folders: 1 stale, 1 unchanged, 10 without index
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function for testability and a `print_*`
//! wrapper that writes to stdout.

use crate::reconcile::{Outcome, SyncReport};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// One line per directory that has an index document or failed.
pub fn format_report(report: &SyncReport) -> Vec<String> {
    let mut lines = Vec::new();
    let shown = report
        .results
        .iter()
        .filter(|r| !matches!(r.result, Ok(Outcome::NoIndex)));
    for (i, r) in shown.enumerate() {
        let label = match &r.result {
            Ok(outcome) => outcome.label(),
            Err(_) => "failed",
        };
        lines.push(format!("{} {} → {}", format_index(i + 1), r.dir, label));
        if let Err(e) = &r.result {
            lines.push(format!("{}{}", indent(1), e));
        }
    }
    lines
}

/// Totals line, listing only outcomes that occurred.
pub fn format_summary(report: &SyncReport) -> String {
    let counts = [
        (report.count(Outcome::Updated), "updated"),
        (report.count(Outcome::Stale), "stale"),
        (report.count(Outcome::Unchanged), "unchanged"),
        (report.count(Outcome::NoIndex), "without index"),
        (report.errors().count(), "failed"),
    ];
    let parts: Vec<String> = counts
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{n} {label}"))
        .collect();
    let total = report.results.len();
    let noun = if total == 1 { "folder" } else { "folders" };
    if parts.is_empty() {
        format!("{total} {noun}")
    } else {
        format!("{total} {noun}: {}", parts.join(", "))
    }
}

/// The full printed form: report lines, a blank line, then the summary.
pub fn format_block(report: &SyncReport) -> String {
    let mut block = String::new();
    let lines = format_report(report);
    for line in &lines {
        block.push_str(line);
        block.push('\n');
    }
    if !lines.is_empty() {
        block.push('\n');
    }
    block.push_str(&format_summary(report));
    block.push('\n');
    block
}

/// Print a report in one write, so reports from concurrent work never interleave.
pub fn print_report(report: &SyncReport) {
    print!("{}", format_block(report));
}
