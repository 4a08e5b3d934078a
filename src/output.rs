//! CLI output formatting for `build` and `status`.
//!
//! # Information-First Display
//!
//! Every document leads with its positional index and identity; the source
//! path follows on an indented `Source:` line. Lines go to stdout; progress
//! and diagnostics go through `tracing` to stderr, so the report stays
//! clean when piped.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Published
//! 001 Hello World → hello-world.html (new)
//!     Source: posts/hello-world.md
//! 002 About → about.html (republished)
//!     Source: about.md
//!
//! Failed
//!     broken.md: front matter is not valid YAML: ...
//!
//! Menu
//! 001 About → about.html
//! 002 Hello World → hello-world.html
//!
//! Published 2 documents, 1 failed
//! ```
//!
//! A dry run lists what would be published under `Would publish` and
//! writes nothing.
//!
//! ## Status
//!
//! ```text
//! 001 hello-world [new]
//!     Source: posts/hello-world.md
//! 002 about [unchanged]
//!     Source: about.md
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::pipeline::{BuildReport, Failure, Plan};
use crate::select::DocumentStatus;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

fn failure_lines(failures: &[Failure], root: &Path) -> Vec<String> {
    let mut lines = vec!["Failed".to_string()];
    for failure in failures {
        lines.push(format!(
            "    {}: {}",
            display_relative(&failure.source_path, root),
            failure.error
        ));
    }
    lines
}

// ============================================================================
// Build
// ============================================================================

/// Format the outcome of a build.
pub fn format_build_report(report: &BuildReport, content_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    if report.dry_run {
        lines.push("Would publish".to_string());
        for (i, doc) in report.documents.iter().filter(|d| d.selected).enumerate() {
            lines.push(format!(
                "{} {} ({})",
                format_index(i + 1),
                doc.id,
                doc.status.label()
            ));
            lines.push(format!("    Source: {}", doc.content_path));
        }
    } else if !report.published.is_empty() {
        lines.push("Published".to_string());
        for (i, entry) in report.published.iter().enumerate() {
            let action = match (entry.status, entry.written) {
                (_, false) => "existing page kept",
                (DocumentStatus::New, true) => "new",
                (_, true) => "republished",
            };
            lines.push(format!(
                "{} {} → {} ({})",
                format_index(i + 1),
                entry.name,
                entry.output_path,
                action
            ));
            lines.push(format!("    Source: {}", entry.content_path));
        }
    }

    let changed: Vec<_> = report
        .documents
        .iter()
        .filter(|d| d.status == DocumentStatus::Changed && !d.selected)
        .collect();
    if !changed.is_empty() {
        push_gap(&mut lines);
        lines.push("Changed since last publish (use --republish)".to_string());
        for doc in changed {
            lines.push(format!("    {}", doc.content_path));
        }
    }

    if report.has_failures() {
        push_gap(&mut lines);
        lines.extend(failure_lines(&report.failures, content_root));
    }

    if let Some(menu) = &report.menu {
        push_gap(&mut lines);
        lines.push("Menu".to_string());
        for (i, entry) in menu.iter().enumerate() {
            lines.push(format!(
                "{} {} → {}",
                format_index(i + 1),
                entry.name,
                entry.url
            ));
        }
    }

    push_gap(&mut lines);
    let summary = if report.dry_run {
        format!(
            "Dry run: {} would be published",
            plural(report.documents.iter().filter(|d| d.selected).count(), "document")
        )
    } else if report.published.is_empty() && !report.has_failures() {
        "Nothing to publish".to_string()
    } else {
        format!("Published {}", plural(report.published.len(), "document"))
    };
    if report.has_failures() {
        lines.push(format!("{}, {} failed", summary, report.failures.len()));
    } else {
        lines.push(summary);
    }
    lines
}

fn push_gap(lines: &mut Vec<String>) {
    if !lines.is_empty() {
        lines.push(String::new());
    }
}

pub fn print_build_report(report: &BuildReport, content_root: &Path) {
    for line in format_build_report(report, content_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Status
// ============================================================================

/// Format the classification of every discovered document.
pub fn format_status(plan: &Plan, content_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, candidate) in plan.selection.candidates.iter().enumerate() {
        lines.push(format!(
            "{} {} [{}]",
            format_index(i + 1),
            candidate.document.id,
            candidate.status.label()
        ));
        lines.push(format!("    Source: {}", candidate.content_path));
    }
    if !plan.failures.is_empty() {
        push_gap(&mut lines);
        lines.extend(failure_lines(&plan.failures, content_root));
    }
    push_gap(&mut lines);
    lines.push(format!(
        "{}, {} published",
        plural(plan.selection.candidates.len(), "document"),
        plan.state.articles.len()
    ));
    lines
}

pub fn print_status(plan: &Plan, content_root: &Path) {
    for line in format_status(plan, content_root) {
        println!("{}", line);
    }
}
