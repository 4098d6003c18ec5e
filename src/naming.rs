//! Filename parsing for the `YYYY-MM-DD-slug` convention.
//!
//! Posts are named with a date prefix so they sort chronologically on disk:
//! - `2024-03-09-hello-world.md` → date 2024-03-09, slug `hello-world`
//! - `about.md` → no date, slug `about`
//!
//! ## Display Titles
//!
//! Dashes in the slug are converted to spaces for display. This is the last
//! title fallback, after front matter and the first `# heading`:
//! - `2024-03-09-hello-world.md` → "hello world"

use chrono::NaiveDate;

/// Result of parsing a file stem like `2024-03-09-hello-world`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Date prefix if present and a valid calendar date.
    pub date: Option<NaiveDate>,
    /// Name part after the date, dashes preserved. For undated entries this
    /// is the full (slugified) input.
    pub slug: String,
    /// Display title: slug with dashes converted to spaces.
    pub display_title: String,
}

/// Parse an entry stem following the `YYYY-MM-DD-slug` convention.
///
/// - `"2024-03-09-hello-world"` → date=2024-03-09, slug="hello-world"
/// - `"2024-03-09"` → date=2024-03-09, slug=""
/// - `"2024-13-40-typo"` → date=None, slug="2024-13-40-typo"
/// - `"About Me"` → date=None, slug="about-me"
pub fn parse_entry_name(stem: &str) -> ParsedName {
    let (date, rest) = match stem.get(..10).and_then(parse_date) {
        Some(date) if stem.len() == 10 => (Some(date), ""),
        Some(date) if stem[10..].starts_with('-') => (Some(date), &stem[11..]),
        _ => (None, stem),
    };
    let slug = slugify(rest);
    ParsedName {
        date,
        display_title: slug.replace('-', " "),
        slug,
    }
}

/// Parse a `YYYY-MM-DD` date. Datetime strings are accepted and truncated to
/// their date part (`2024-03-09T10:00:00Z` → 2024-03-09).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let date_part = value.get(..10)?;
    if value.len() > 10 && !value[10..].starts_with(['T', 't', ' ']) {
        return None;
    }
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// URL-safe slug: lowercase, alphanumeric runs joined by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
