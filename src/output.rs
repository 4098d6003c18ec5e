//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Image progress (during `build`)
//!
//! ```text
//! photos/harbour.jpg (2000×1333)
//!     300w avif: encoded
//!     300w webp: cached
//! ```
//!
//! ## Build summary
//!
//! ```text
//! Stylesheets (3f2a9c1d)
//!     /css/style.css?v=3f2a9c1d
//! Pages
//!     index.html
//!     posts/hello-world/index.html
//! Feed → feed.xml
//! Passthrough
//!     css (2 files)
//!     fonts: not found
//! Worker → sw.js (precaches 1 URL)
//! Images: 4 cached, 2 encoded (6 total)
//!
//! Built 1 post, 1 page
//! ```

use crate::imaging::VariantStatus;
use crate::shortcode::image::ImageEvent;
use crate::site::{BuildReport, CheckReport};
use std::path::{Path, PathBuf};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 post`, `2 posts`.
fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// `path` relative to `root` when it lies inside it.
fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn drafts_section(drafts: &[PathBuf], lines: &mut Vec<String>) {
    if drafts.is_empty() {
        return;
    }
    lines.push("Drafts (skipped)".to_string());
    for draft in drafts {
        lines.push(format!("{}{}", indent(1), draft.display()));
    }
}

fn stylesheets_section(hash: &str, urls: &[String], lines: &mut Vec<String>) {
    lines.push(format!("Stylesheets ({hash})"));
    for url in urls {
        lines.push(format!("{}{}", indent(1), url));
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format one processed image: header with source and size, then one line
/// per variant with its cache status.
pub fn format_image_event(event: &ImageEvent) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}\u{00d7}{})",
        event.source, event.width, event.height
    )];
    for variant in &event.variants {
        let status = match variant.status {
            VariantStatus::Cached => "cached",
            VariantStatus::Copied => "copied",
            VariantStatus::Encoded => "encoded",
        };
        lines.push(format!(
            "{}{}w {}: {}",
            indent(1),
            variant.width,
            variant.format.extension(),
            status
        ));
    }
    lines
}

pub fn format_build_report(report: &BuildReport, output: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    stylesheets_section(&report.stylesheet_hash, &report.stylesheets, &mut lines);

    lines.push("Pages".to_string());
    for page in &report.written {
        lines.push(format!("{}{}", indent(1), page.display()));
    }

    if let Some(feed) = &report.feed {
        lines.push(format!("Feed \u{2192} {}", relative_display(feed, output)));
    }

    if !report.passthrough.copied.is_empty() || !report.passthrough.missing.is_empty() {
        lines.push("Passthrough".to_string());
        for (entry, count) in &report.passthrough.copied {
            lines.push(format!("{}{} ({})", indent(1), entry, plural(*count, "file")));
        }
        for entry in &report.passthrough.missing {
            lines.push(format!("{}{}: not found", indent(1), entry));
        }
    }

    if let Some(worker) = &report.worker {
        lines.push(format!(
            "Worker \u{2192} {} (precaches {})",
            relative_display(&worker.path, output),
            plural(worker.precache.len(), "URL")
        ));
    }

    if report.images.total() > 0 {
        lines.push(format!("Images: {}", report.images));
    }

    drafts_section(&report.drafts, &mut lines);

    lines.push(String::new());
    lines.push(format!(
        "Built {}, {}",
        plural(report.posts, "post"),
        plural(report.pages, "page")
    ));
    lines
}

pub fn print_build_report(report: &BuildReport, output: &Path) {
    for line in format_build_report(report, output) {
        println!("{}", line);
    }
}

// ============================================================================
// Check / hash
// ============================================================================

pub fn format_check_report(report: &CheckReport) -> Vec<String> {
    let mut lines = Vec::new();
    stylesheets_section(&report.stylesheet_hash, &report.stylesheets, &mut lines);
    lines.push(format!(
        "Content: {}, {}, {}",
        plural(report.posts, "post"),
        plural(report.pages, "page"),
        plural(report.images, "image")
    ));
    drafts_section(&report.drafts, &mut lines);
    lines
}

pub fn print_check_report(report: &CheckReport) {
    for line in format_check_report(report) {
        println!("{}", line);
    }
}

/// `quire hash` prints the bare hash first so scripts can take line one.
pub fn format_hash(hash: &str, urls: &[String]) -> Vec<String> {
    let mut lines = vec![hash.to_string()];
    lines.extend(urls.iter().map(|u| format!("{}{}", indent(1), u)));
    lines
}

pub fn print_hash(hash: &str, urls: &[String]) {
    for line in format_hash(hash, urls) {
        println!("{}", line);
    }
}
