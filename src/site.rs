//! Build orchestration.
//!
//! One pass from content root to output directory:
//!
//! ```text
//! site.toml ─→ config
//! css/      ─→ stylesheet hash ─→ versioned URLs
//! *.md      ─→ scan ─→ shortcodes ─→ markdown ─→ pages, feed
//! images    ─→ variants (inside the image shortcode)
//! static    ─→ passthrough copy
//!           ─→ sw.js
//! ```
//!
//! Any failure aborts the build. Files already written stay in place.

use crate::cache::CacheStats;
use crate::config::{self, ConfigError, SiteConfig};
use crate::feed::{self, FeedError};
use crate::fingerprint::{self, FingerprintError};
use crate::generate::{self, GenerateError, Layout, RenderedSite};
use crate::imaging::{ImageBackend, RustBackend};
use crate::markdown::{MarkdownError, MarkdownRenderer};
use crate::passthrough::{self, PassthroughError, PassthroughReport};
use crate::scan::{self, ScanError};
use crate::shortcode::image::{ImageEvent, ImageShortcode};
use crate::shortcode::{ShortcodeError, Shortcodes};
use crate::types::{Document, RenderedDocument};
use crate::worker::{self, WorkerError};
use chrono::Datelike;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Stylesheet error: {0}")]
    Fingerprint(#[from] FingerprintError),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Markdown error: {0}")]
    Markdown(#[from] MarkdownError),
    #[error("{}: {source}", path.display())]
    Shortcode {
        path: PathBuf,
        source: ShortcodeError,
    },
    #[error("{}: {source}", path.display())]
    Render {
        path: PathBuf,
        source: MarkdownError,
    },
    #[error("Generate error: {0}")]
    Generate(#[from] GenerateError),
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("Passthrough error: {0}")]
    Passthrough(#[from] PassthroughError),
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Reuse variants recorded in the image cache manifest of a previous build.
    pub use_cache: bool,
    /// Receives an [`ImageEvent`] per processed image.
    pub events: Option<Sender<ImageEvent>>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            events: None,
        }
    }
}

/// Emitted worker script and what it precaches.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSummary {
    pub path: PathBuf,
    pub precache: Vec<String>,
}

/// Everything a build produced, for reporting.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub stylesheet_hash: String,
    pub stylesheets: Vec<String>,
    pub posts: usize,
    /// Pages including the home page.
    pub pages: usize,
    pub drafts: Vec<PathBuf>,
    /// HTML files written, relative to the output.
    pub written: Vec<PathBuf>,
    pub feed: Option<PathBuf>,
    pub passthrough: PassthroughReport,
    pub worker: Option<WorkerSummary>,
    pub images: CacheStats,
}

/// Result of [`check`]: what a build would do, without writing anything.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub stylesheet_hash: String,
    pub stylesheets: Vec<String>,
    pub posts: usize,
    pub pages: usize,
    pub drafts: Vec<PathBuf>,
    /// Image shortcode calls whose source was found and decoded.
    pub images: usize,
}

/// Stylesheet hash plus versioned URLs for a content root.
pub fn stylesheets(
    source: &Path,
    config: &SiteConfig,
) -> Result<(String, Vec<String>), FingerprintError> {
    let dir = source.join(&config.stylesheets.dir);
    let hash = fingerprint::stylesheet_hash(&dir, config.stylesheets.hash_length)?;
    let urls = fingerprint::stylesheet_urls(
        &dir,
        &config.stylesheets.dir,
        &hash,
        &config.worker.version_param,
    )?;
    Ok((hash, urls))
}

pub fn build(source: &Path, output: &Path, options: BuildOptions) -> Result<BuildReport, BuildError> {
    build_with_backend(RustBackend::new(), source, output, options)
}

pub fn build_with_backend<B>(
    backend: B,
    source: &Path,
    output: &Path,
    options: BuildOptions,
) -> Result<BuildReport, BuildError>
where
    B: ImageBackend + Send + 'static,
{
    let config = config::load_config(source)?;
    let (hash, stylesheet_urls) = stylesheets(source, &config)?;
    let content = scan::scan(source)?;
    fs::create_dir_all(output)?;

    let mut images = ImageShortcode::new(backend, source, output, &config.images, options.use_cache);
    if let Some(events) = options.events {
        images = images.with_events(events);
    }
    let images = Arc::new(images);
    let shortcodes = Shortcodes::with_builtins(Arc::clone(&images), chrono::Local::now().year());
    let renderer = MarkdownRenderer::new(&config.markdown, &config.highlight)?;

    let render_all = |docs: &[Document]| -> Result<Vec<RenderedDocument>, BuildError> {
        docs.iter()
            .map(|doc| render_document(&shortcodes, &renderer, doc))
            .collect()
    };
    let rendered = RenderedSite {
        posts: render_all(&content.posts)?,
        pages: render_all(&content.pages)?,
    };

    let feed_url = config
        .feed
        .enabled
        .then(|| format!("/{}", config.feed.path.trim_start_matches('/')));
    let layout = Layout {
        site: &config.site,
        stylesheets: &stylesheet_urls,
        feed_url,
        register_worker: config.worker.enabled,
        katex_url: &config.markdown.katex_url,
    };
    let written = generate::generate(output, &layout, &rendered)?;

    let feed = if config.feed.enabled {
        Some(feed::write_feed(
            output,
            &config.site,
            &config.feed,
            &rendered.posts,
        )?)
    } else {
        None
    };

    let passthrough = passthrough::copy_passthrough(source, output, &config.passthrough.paths)?;

    let worker = if config.worker.enabled {
        let precache = worker::script::precache_list(&config.worker, &stylesheet_urls);
        let js = worker::render_service_worker(&config.worker, &precache)?;
        let path = output.join(worker::script::SCRIPT_FILENAME);
        fs::write(&path, js)?;
        Some(WorkerSummary { path, precache })
    } else {
        None
    };

    images.save_cache()?;

    Ok(BuildReport {
        stylesheet_hash: hash,
        stylesheets: stylesheet_urls,
        posts: rendered.posts.len(),
        pages: rendered.pages.len(),
        drafts: content.drafts,
        written,
        feed,
        passthrough,
        worker,
        images: images.cache_stats(),
    })
}

fn render_document(
    shortcodes: &Shortcodes,
    renderer: &MarkdownRenderer,
    doc: &Document,
) -> Result<RenderedDocument, BuildError> {
    let expanded = shortcodes
        .expand(&doc.body)
        .map_err(|source| BuildError::Shortcode {
            path: doc.source.clone(),
            source,
        })?;
    let rendered = renderer
        .render(&expanded.text)
        .map_err(|source| BuildError::Render {
            path: doc.source.clone(),
            source,
        })?;
    Ok(RenderedDocument {
        doc: doc.clone(),
        html: expanded.restore(&rendered.html),
        has_math: rendered.has_math,
    })
}

/// The `sw.js` a build of `source` would emit, regardless of
/// `worker.enabled`.
pub fn service_worker(source: &Path) -> Result<String, BuildError> {
    let config = config::load_config(source)?;
    let (_, stylesheet_urls) = stylesheets(source, &config)?;
    let precache = worker::script::precache_list(&config.worker, &stylesheet_urls);
    Ok(worker::render_service_worker(&config.worker, &precache)?)
}

/// Load, hash, scan and validate every shortcode call without writing or
/// encoding anything.
pub fn check(source: &Path) -> Result<CheckReport, BuildError> {
    let config = config::load_config(source)?;
    let (hash, stylesheet_urls) = stylesheets(source, &config)?;
    let content = scan::scan(source)?;

    // Output root is never written: validation only reads sources
    let images = Arc::new(ImageShortcode::new(
        RustBackend::new(),
        source,
        source,
        &config.images,
        false,
    ));
    let checked = Arc::new(AtomicUsize::new(0));
    let shortcodes = Shortcodes::for_validation(images, Arc::clone(&checked));
    for doc in content.documents() {
        shortcodes
            .expand(&doc.body)
            .map_err(|source| BuildError::Shortcode {
                path: doc.source.clone(),
                source,
            })?;
    }

    Ok(CheckReport {
        stylesheet_hash: hash,
        stylesheets: stylesheet_urls,
        posts: content.posts.len(),
        pages: content.pages.len(),
        drafts: content.drafts,
        images: checked.load(Ordering::Relaxed),
    })
}
