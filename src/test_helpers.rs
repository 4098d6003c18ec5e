//! Shared test utilities for the quire test suite.
//!
//! Provides a content-tree builder plus lookup helpers that work with
//! scan-phase data structures (`Content`, `Document`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = ContentBuilder::new()
//!     .post("2024-03-09-hello.md", "# Hello")
//!     .page("about.md", "About me")
//!     .stylesheet("style.css", "body {}")
//!     .build();
//! let content = scan(site.path()).unwrap();
//!
//! assert_eq!(post_slugs(&content), vec!["hello"]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::scan::{Content, POSTS_DIR};
use crate::types::Document;

// =========================================================================
// Fixture setup
// =========================================================================

/// Builds a content directory in a fresh temp dir.
#[derive(Default)]
pub struct ContentBuilder {
    files: Vec<(String, Vec<u8>)>,
}

impl ContentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any file, path relative to the content root.
    pub fn file(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.files
            .push((path.to_string(), content.as_ref().to_vec()));
        self
    }

    pub fn post(self, name: &str, content: &str) -> Self {
        self.file(&format!("{POSTS_DIR}/{name}"), content)
    }

    pub fn page(self, name: &str, content: &str) -> Self {
        self.file(name, content)
    }

    pub fn stylesheet(self, name: &str, content: &str) -> Self {
        self.file(&format!("css/{name}"), content)
    }

    pub fn config(self, toml: &str) -> Self {
        self.file(crate::config::CONFIG_FILENAME, toml)
    }

    /// A solid-color PNG of the given size.
    pub fn png(self, path: &str, width: u32, height: u32) -> Self {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([90, 140, 200]),
        ))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
        self.file(path, bytes)
    }

    pub fn build(self) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (path, content) in &self.files {
            write_file(tmp.path(), path, content);
        }
        tmp
    }
}

fn write_file(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Minimal site: one stylesheet, a home page, a page and two posts.
pub fn sample_site() -> TempDir {
    ContentBuilder::new()
        .config("[site]\ntitle = \"Test Site\"\nurl = \"https://test.example\"\n")
        .stylesheet("style.css", "body { margin: 0; }")
        .page("index.md", "Welcome to the **test** site.")
        .page("about.md", "---\ntitle: About\n---\nAbout me.")
        .post(
            "2024-03-09-hello-world.md",
            "---\ntitle: Hello World\ndescription: First\n---\nHello $x^2$ at https://example.com",
        )
        .post("2024-04-01-second.md", "# Second\n\n```rust\nfn main() {}\n```\n")
        .file("favicon.ico", [0u8, 1, 2, 3])
        .build()
}

// =========================================================================
// Content lookups: panic with a clear message on miss
// =========================================================================

/// Find a post by slug. Panics if not found.
pub fn find_post<'a>(content: &'a Content, slug: &str) -> &'a Document {
    content
        .posts
        .iter()
        .find(|p| p.slug == slug)
        .unwrap_or_else(|| panic!("post '{slug}' not found. Available: {:?}", post_slugs(content)))
}

/// Find a page by slug. Panics if not found.
pub fn find_page<'a>(content: &'a Content, slug: &str) -> &'a Document {
    content
        .pages
        .iter()
        .find(|p| p.slug == slug)
        .unwrap_or_else(|| panic!("page '{slug}' not found. Available: {:?}", page_slugs(content)))
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// All post slugs in content order (newest first).
pub fn post_slugs(content: &Content) -> Vec<&str> {
    content.posts.iter().map(|p| p.slug.as_str()).collect()
}

/// All page slugs in content order.
pub fn page_slugs(content: &Content) -> Vec<&str> {
    content.pages.iter().map(|p| p.slug.as_str()).collect()
}

/// Read a file under `root`, panicking with the path on failure.
pub fn read(root: &Path, relative: &str) -> String {
    std::fs::read_to_string(root.join(relative))
        .unwrap_or_else(|e| panic!("cannot read {relative}: {e}"))
}
