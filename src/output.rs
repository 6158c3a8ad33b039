//! CLI output formatting.
//!
//! Output is record-centric: the primary line for every record is its kind
//! and id, with the record path and the artifact location shown as
//! secondary context.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! Generating 2 pages, 1 media file → webroot
//! page home /index.html → index.html
//! media logo /img/logo.png → img/logo.png
//! FAILED page orphan /orphan.html
//!     Stage: render
//!     Error: template 'deleted' not found
//!
//! Generated 1 page, 1 media file in 12ms (1 failed)
//! ```
//!
//! ## Check
//!
//! ```text
//! Templates
//! base Base
//!
//! Pages
//! home /index.html
//!     Template: Base
//! orphan /orphan.html
//!     Template: missing 'deleted'
//!
//! Media
//! logo /img/logo.png
//!     Source: logo.png
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::generate::{GenerateEvent, RecordFailure, SiteReport};
use crate::model::{MediaFile, RecordRef, ResolvedPage, Template};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn counts(pages: usize, media: usize) -> String {
    format!(
        "{}, {}",
        plural(pages, "page", "pages"),
        plural(media, "media file", "media files")
    )
}

/// `kind id /path`, or `kind id` when the record was never found.
fn record_line(record: &RecordRef) -> String {
    match &record.path {
        Some(path) => format!("{} {} {}", record.kind, record.id, path),
        None => format!("{} {}", record.kind, record.id),
    }
}

/// Artifact location relative to the output root when it lies inside it.
fn display_output(output: &Path, output_root: &Path) -> String {
    output
        .strip_prefix(output_root)
        .unwrap_or(output)
        .display()
        .to_string()
}

fn failure_lines(record: &RecordRef, stage: impl std::fmt::Display, error: &str) -> Vec<String> {
    vec![
        format!("FAILED {}", record_line(record)),
        format!("{}Stage: {}", indent(1), stage),
        format!("{}Error: {}", indent(1), error),
    ]
}

// ============================================================================
// Generate
// ============================================================================

/// Format one progress event from a sweep.
pub fn format_event(event: &GenerateEvent, output_root: &Path) -> Vec<String> {
    match event {
        GenerateEvent::Started { pages, media } => vec![format!(
            "Generating {} → {}",
            counts(*pages, *media),
            output_root.display()
        )],
        GenerateEvent::Generated { record, output } => vec![format!(
            "{} → {}",
            record_line(record),
            display_output(output, output_root)
        )],
        GenerateEvent::Failed {
            record,
            stage,
            message,
        } => failure_lines(record, stage, message),
        GenerateEvent::Skipped { record } => vec![format!("skipped {}", record_line(record))],
        GenerateEvent::Finished { .. } => Vec::new(),
    }
}

pub fn print_event(event: &GenerateEvent, output_root: &Path) {
    for line in format_event(event, output_root) {
        println!("{}", line);
    }
}

/// Format the summary of a finished sweep.
///
/// Failures were already shown as they happened, so they are only counted
/// here; [`format_failures`] lists them again in full.
pub fn format_report(report: &SiteReport) -> Vec<String> {
    let mut summary = format!(
        "Generated {} in {}ms",
        counts(report.pages, report.media),
        report.duration_ms
    );
    let mut problems = Vec::new();
    if !report.failures.is_empty() {
        problems.push(format!("{} failed", report.failures.len()));
    }
    if !report.skipped.is_empty() {
        problems.push(format!("{} skipped", report.skipped.len()));
    }
    if !problems.is_empty() {
        summary.push_str(&format!(" ({})", problems.join(", ")));
    }
    vec![String::new(), summary]
}

pub fn print_report(report: &SiteReport) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

/// Every failure of a sweep, in report order.
pub fn format_failures(failures: &[RecordFailure]) -> Vec<String> {
    failures
        .iter()
        .flat_map(|f| failure_lines(&f.record, f.stage, &f.kind.to_string()))
        .collect()
}

/// Result line for a single-record command.
pub fn format_single(
    record: &RecordRef,
    result: &Result<String, RecordFailure>,
) -> Vec<String> {
    match result {
        Ok(outcome) => vec![format!("{} → {}", record_line(record), outcome)],
        Err(failure) => failure_lines(&failure.record, failure.stage, &failure.kind.to_string()),
    }
}

// ============================================================================
// Check
// ============================================================================

/// Inventory of a record store: templates, pages with their template
/// resolution, and media with their sources.
pub fn format_inventory(
    templates: &[Template],
    pages: &[ResolvedPage],
    media: &[MediaFile],
) -> Vec<String> {
    let mut lines = Vec::new();

    if !templates.is_empty() {
        lines.push("Templates".to_string());
        for template in templates {
            lines.push(format!("{} {}", template.id, template.name));
        }
    }

    if !pages.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Pages".to_string());
        for resolved in pages {
            let page = &resolved.page;
            lines.push(format!("{} {}", page.id, page.path));
            let status = match (&resolved.template, &page.template) {
                (Some(template), _) => template.name.clone(),
                (None, Some(reference)) => format!("missing '{}'", reference),
                (None, None) => "none".to_string(),
            };
            lines.push(format!("{}Template: {}", indent(1), status));
        }
    }

    if !media.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Media".to_string());
        for file in media {
            lines.push(format!("{} {}", file.id, file.path));
            lines.push(format!("{}Source: {}", indent(1), file.source.display()));
        }
    }

    lines
}

/// Pages that cannot be rendered because their template does not resolve.
pub fn unrenderable_pages(pages: &[ResolvedPage]) -> Vec<RecordRef> {
    pages
        .iter()
        .filter(|p| p.template.is_none())
        .map(|p| RecordRef::from(&p.page))
        .collect()
}

/// Print the inventory and return the number of pages that cannot be
/// rendered.
pub fn print_inventory(
    templates: &[Template],
    pages: &[ResolvedPage],
    media: &[MediaFile],
) -> usize {
    for line in format_inventory(templates, pages, media) {
        println!("{}", line);
    }
    let broken = unrenderable_pages(pages).len();
    println!();
    println!(
        "{} ({} without a template)",
        counts(pages.len(), media.len()),
        broken
    );
    broken
}
