//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every document leads with its positional index and title, followed by its
//! permalink. Identity, tags, status and media counts follow as indented
//! context lines. Skipped pages are listed by source path with the reason
//! underneath.
//!
//! # Output Format
//!
//! ## Ingest / Check
//!
//! ```text
//! Documents
//! 001 Hello World → /articles/hello-world.html
//!     Id: JI
//!     Tags: go, web
//!     Images: 3
//!     Headings: 4
//! 002 Notes → /articles/notes.html
//!     Id: 5d17a9
//!     Status: draft (hidden)
//!
//! Tags
//!     all (2)
//!     go (1)
//!     web (1)
//!
//! Skipped
//!     content/bad.json
//!         document bad: invalid date date: ... (in 'date: someday')
//!
//! Media: 3 cached, 1 stored (4 total)
//! Ingested 2 documents, 1 skipped
//! ```
//!
//! ## Toc
//!
//! ```text
//! h1 Intro #intro
//!     h2 Setup #setup (3)
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::BatchFailure;
use crate::cache::CacheStats;
use crate::store::{DocumentStore, TagInfo};
use crate::toc::HeadingNode;
use crate::types::Document;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Number of headings in a table of contents, at any depth.
fn count_headings(nodes: &[HeadingNode]) -> usize {
    nodes
        .iter()
        .map(|n| 1 + count_headings(&n.children))
        .sum()
}

// ============================================================================
// Ingest
// ============================================================================

/// Header plus context lines for one document.
pub fn format_document(index: usize, doc: &Document) -> Vec<String> {
    let mut lines = vec![format!("{} {} → {}", format_index(index), doc.title, doc.url())];
    lines.push(format!("    Id: {}", doc.id));
    if !doc.tags.is_empty() {
        lines.push(format!("    Tags: {}", doc.tags.join(", ")));
    }
    if doc.is_hidden() {
        lines.push(format!("    Status: {} (hidden)", doc.status));
    }
    if !doc.paths.is_empty() {
        lines.push(format!("    Path: {}", doc.path_as_text()));
    }
    if !doc.summary.is_empty() {
        lines.push(format!("    Summary: {}", truncate(doc.summary.trim(), 60)));
    }
    if !doc.images.is_empty() {
        lines.push(format!("    Images: {}", doc.images.len()));
    }
    if !doc.toc.is_empty() {
        lines.push(format!("    Headings: {}", count_headings(&doc.toc)));
    }
    lines
}

pub fn format_tags(tags: &[TagInfo]) -> Vec<String> {
    tags.iter()
        .map(|t| format!("{}{} ({})", indent(1), t.name, t.count))
        .collect()
}

pub fn format_failures(failures: &[BatchFailure]) -> Vec<String> {
    let mut lines = Vec::new();
    for failure in failures {
        lines.push(format!("{}{}", indent(1), failure.path.display()));
        lines.push(format!("{}{}", indent(2), failure.error));
    }
    lines
}

/// Full report for an ingest or check run.
pub fn format_ingest_output(
    store: &DocumentStore,
    failures: &[BatchFailure],
    media: Option<&CacheStats>,
) -> Vec<String> {
    let mut lines = vec!["Documents".to_string()];
    for (i, doc) in store.documents().iter().enumerate() {
        lines.extend(format_document(i + 1, doc));
    }

    if !store.is_empty() {
        lines.push(String::new());
        lines.push("Tags".to_string());
        lines.extend(format_tags(store.tags()));
    }

    if !failures.is_empty() {
        lines.push(String::new());
        lines.push("Skipped".to_string());
        lines.extend(format_failures(failures));
    }

    lines.push(String::new());
    if let Some(stats) = media
        && stats.total() > 0
    {
        lines.push(format!("Media: {stats}"));
    }
    lines.push(format!(
        "Ingested {}, {} skipped",
        plural(store.len(), "document"),
        failures.len()
    ));
    lines
}

pub fn print_ingest_output(
    store: &DocumentStore,
    failures: &[BatchFailure],
    media: Option<&CacheStats>,
) {
    for line in format_ingest_output(store, failures, media) {
        println!("{}", line);
    }
}

// ============================================================================
// Toc
// ============================================================================

/// One line per heading, indented by tree depth. The content-node count is
/// shown when non-zero.
pub fn format_toc(nodes: &[HeadingNode]) -> Vec<String> {
    let mut lines = Vec::new();
    format_toc_recursive(nodes, 0, &mut lines);
    lines
}

fn format_toc_recursive(nodes: &[HeadingNode], depth: usize, lines: &mut Vec<String>) {
    for node in nodes {
        let count = if node.siblings_count > 0 {
            format!(" ({})", node.siblings_count)
        } else {
            String::new()
        };
        lines.push(format!(
            "{}h{} {} #{}{}",
            indent(depth),
            node.level,
            node.content,
            node.id,
            count
        ));
        format_toc_recursive(&node.children, depth + 1, lines);
    }
}

pub fn print_toc(nodes: &[HeadingNode]) {
    for line in format_toc(nodes) {
        println!("{}", line);
    }
}
