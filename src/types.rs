//! Content types shared by scanning, rendering and the feed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// YAML front matter of a markdown document.
///
/// Every key is optional. Keys not listed here (`layout`, `permalink`, ...)
/// are accepted and ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    /// `YYYY-MM-DD`, optionally followed by a time.
    pub date: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub draft: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Dated entry under `posts/`, listed on the home page and in the feed.
    Post,
    /// Standalone page from the content root.
    Page,
}

/// A markdown document ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub kind: DocumentKind,
    /// URL slug. `index` for the home page.
    pub slug: String,
    pub title: String,
    /// Always set for posts.
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Markdown body without front matter.
    pub body: String,
    /// Source file, relative to the content root.
    pub source: PathBuf,
}

impl Document {
    pub fn is_home(&self) -> bool {
        self.kind == DocumentKind::Page && self.slug == "index"
    }

    /// Site-absolute URL with a trailing slash.
    pub fn url(&self) -> String {
        match self.kind {
            DocumentKind::Post => format!("/posts/{}/", self.slug),
            DocumentKind::Page if self.is_home() => "/".to_string(),
            DocumentKind::Page => format!("/{}/", self.slug),
        }
    }

    /// Output file, relative to the output root.
    pub fn output_path(&self) -> PathBuf {
        match self.kind {
            DocumentKind::Post => PathBuf::from("posts").join(&self.slug).join("index.html"),
            DocumentKind::Page if self.is_home() => PathBuf::from("index.html"),
            DocumentKind::Page => PathBuf::from(&self.slug).join("index.html"),
        }
    }
}

/// A document with its body rendered to HTML.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub doc: Document,
    /// Body HTML with shortcode output restored.
    pub html: String,
    /// Body contains math that needs KaTeX on the client.
    pub has_math: bool,
}
