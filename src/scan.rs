//! Content directory scanning.
//!
//! ## Directory Structure
//!
//! ```text
//! content/                            # Content root
//! ├── site.toml                       # Site configuration (optional)
//! ├── index.md                        # Home page intro (optional) → /
//! ├── about.md                        # Page → /about/
//! ├── posts/
//! │   ├── 2024-03-09-hello-world.md   # Post → /posts/hello-world/
//! │   └── 2024-04-01-second.md
//! ├── css/                            # Fingerprinted stylesheets
//! └── img/, fonts/, ...               # Passthrough files
//! ```
//!
//! ## Metadata Resolution
//!
//! First available wins:
//! - **Title**: front matter `title` → first `# heading` → slug with dashes as spaces
//! - **Date**: front matter `date` → `YYYY-MM-DD-` filename prefix (posts only; required)
//! - **Slug**: `YYYY-MM-DD-slug` filename with the date stripped
//!
//! Documents with `draft: true` are skipped and listed in [`Content::drafts`].
//!
//! ## Validation
//!
//! - Every post must have a date
//! - No two posts (or two pages) may share a slug
//! - Front matter must be valid YAML

use crate::naming::{parse_date, parse_entry_name};
use crate::types::{Document, DocumentKind, FrontMatter};
use gray_matter::{Matter, engine::YAML};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory under the content root that holds posts.
pub const POSTS_DIR: &str = "posts";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Content directory not found: {}", .0.display())]
    MissingRoot(PathBuf),
    #[error("Invalid front matter in {}: {message}", path.display())]
    FrontMatter { path: PathBuf, message: String },
    #[error("Post has no date (add `date:` or a YYYY-MM-DD- filename prefix): {}", .0.display())]
    MissingDate(PathBuf),
    #[error("Invalid date '{value}' in {}", path.display())]
    InvalidDate { path: PathBuf, value: String },
    #[error("Cannot derive a slug from file name: {}", .0.display())]
    EmptySlug(PathBuf),
    #[error("Duplicate slug '{slug}': {} and {}", first.display(), second.display())]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Everything the scanner found.
#[derive(Debug, Clone, Default)]
pub struct Content {
    /// Published posts, newest first.
    pub posts: Vec<Document>,
    /// Published pages (home page first, then by slug).
    pub pages: Vec<Document>,
    /// Skipped draft documents, relative to the content root.
    pub drafts: Vec<PathBuf>,
}

impl Content {
    pub fn home(&self) -> Option<&Document> {
        self.pages.iter().find(|p| p.is_home())
    }

    /// Posts followed by pages.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.posts.iter().chain(self.pages.iter())
    }
}

pub fn scan(root: &Path) -> Result<Content, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }
    let mut content = Content::default();

    let posts_dir = root.join(POSTS_DIR);
    if posts_dir.is_dir() {
        for path in markdown_files(&posts_dir)? {
            match parse_document(root, &path, DocumentKind::Post)? {
                Some(doc) => content.posts.push(doc),
                None => content.drafts.push(relative(root, &path)),
            }
        }
    }
    for path in markdown_files(root)? {
        match parse_document(root, &path, DocumentKind::Page)? {
            Some(doc) => content.pages.push(doc),
            None => content.drafts.push(relative(root, &path)),
        }
    }

    check_unique_slugs(&content.posts)?;
    check_unique_slugs(&content.pages)?;

    // Newest first; same-day posts by slug for a stable order
    content
        .posts
        .sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
    content
        .pages
        .sort_by(|a, b| b.is_home().cmp(&a.is_home()).then_with(|| a.slug.cmp(&b.slug)));
    Ok(content)
}

/// `.md` files directly inside `dir`, sorted by path.
fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("md"))
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn relative(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// Split front matter from body. A document without front matter gets
/// defaults.
pub fn split_front_matter(path: &Path, text: &str) -> Result<(FrontMatter, String), ScanError> {
    let front_matter_err = |message: String| ScanError::FrontMatter {
        path: path.to_path_buf(),
        message,
    };
    let matter = Matter::<YAML>::new();
    let parsed = matter
        .parse(text)
        .map_err(|e| front_matter_err(e.to_string()))?;
    let front_matter = match parsed.data {
        Some(yaml) => serde_yaml::from_value::<FrontMatter>(yaml)
            .map_err(|e| front_matter_err(e.to_string()))?,
        None => FrontMatter::default(),
    };
    Ok((front_matter, parsed.content))
}

/// Parse one markdown file. Returns `None` for drafts.
fn parse_document(
    root: &Path,
    path: &Path,
    kind: DocumentKind,
) -> Result<Option<Document>, ScanError> {
    let text = fs::read_to_string(path)?;
    let (front_matter, body) = split_front_matter(path, &text)?;
    if front_matter.draft {
        return Ok(None);
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let parsed = parse_entry_name(&stem);
    if parsed.slug.is_empty() {
        return Err(ScanError::EmptySlug(path.to_path_buf()));
    }

    let date = match &front_matter.date {
        Some(value) => Some(parse_date(value).ok_or_else(|| ScanError::InvalidDate {
            path: path.to_path_buf(),
            value: value.clone(),
        })?),
        None => parsed.date,
    };
    if kind == DocumentKind::Post && date.is_none() {
        return Err(ScanError::MissingDate(path.to_path_buf()));
    }

    let title = front_matter
        .title
        .filter(|t| !t.trim().is_empty())
        .or_else(|| first_heading(&body))
        .unwrap_or(parsed.display_title);

    Ok(Some(Document {
        kind,
        slug: parsed.slug,
        title,
        date,
        description: front_matter.description,
        tags: front_matter.tags,
        body,
        source: relative(root, path),
    }))
}

/// Text of the first `# ` heading, outside fenced code.
fn first_heading(body: &str) -> Option<String> {
    let mut in_fence = false;
    for line in body.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence && let Some(heading) = trimmed.strip_prefix("# ") {
            let heading = heading.trim().trim_end_matches('#').trim();
            if !heading.is_empty() {
                return Some(heading.to_string());
            }
        }
    }
    None
}

fn check_unique_slugs(docs: &[Document]) -> Result<(), ScanError> {
    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for doc in docs {
        if let Some(first) = seen.insert(&doc.slug, &doc.source) {
            return Err(ScanError::DuplicateSlug {
                slug: doc.slug.clone(),
                first: first.to_path_buf(),
                second: doc.source.clone(),
            });
        }
    }
    Ok(())
}
