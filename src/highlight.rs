//! Syntax highlighting for fenced code blocks.
//!
//! Wraps syntect's bundled syntax definitions and themes. Output is inline
//! styled HTML (`<pre style=...><span style=...>`), so pages need no extra
//! stylesheet for code.

use std::sync::LazyLock;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use thiserror::Error;

/// Theme used when `[highlight] theme` is not set.
pub const DEFAULT_THEME: &str = "base16-ocean.dark";

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEMES: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("unknown highlight theme '{0}'")]
    UnknownTheme(String),
    #[error("highlighting failed: {0}")]
    Syntect(#[from] syntect::Error),
}

/// Names of the bundled themes, sorted.
pub fn available_themes() -> Vec<String> {
    THEMES.themes.keys().cloned().collect()
}

/// Highlighter bound to one theme.
pub struct Highlighter {
    theme: Theme,
}

impl Highlighter {
    pub fn new(theme_name: &str) -> Result<Self, HighlightError> {
        let theme = THEMES
            .themes
            .get(theme_name)
            .cloned()
            .ok_or_else(|| HighlightError::UnknownTheme(theme_name.to_string()))?;
        Ok(Self { theme })
    }

    /// Highlight `code` as `language` (a token such as `rust`, `rs` or `py`).
    ///
    /// Unknown or missing languages are rendered as plain text.
    pub fn highlight(&self, code: &str, language: Option<&str>) -> Result<String, HighlightError> {
        let syntax = language
            .and_then(|lang| SYNTAXES.find_syntax_by_token(lang))
            .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text());
        Ok(highlighted_html_for_string(
            code,
            &SYNTAXES,
            syntax,
            &self.theme,
        )?)
    }
}
