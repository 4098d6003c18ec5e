//! HTML generation.
//!
//! Renders rendered documents into final pages using [Maud](https://maud.lambda.xyz/)
//! for compile-time checked, auto-escaped HTML templates.
//!
//! ## Generated Pages
//!
//! - **Home** (`/index.html`): intro from `index.md` (if present) and the post list
//! - **Post pages** (`/posts/{slug}/index.html`): title, date, tags, body
//! - **Pages** (`/{slug}/index.html`): title and body
//!
//! ## Every Page Carries
//!
//! - `<link rel="stylesheet">` for each stylesheet, with `?v=<hash>` appended
//!   so a stylesheet change yields a new URL (and a fresh cache entry)
//! - `<link rel="alternate">` to the RSS feed when the feed is enabled
//! - The service-worker registration snippet when the worker is enabled
//! - KaTeX stylesheet and scripts, only on pages whose body contains math
//!
//! Document bodies are already HTML and are inserted with `PreEscaped`.
//! Everything else (titles, descriptions, tags) is escaped by Maud.

use crate::config::SiteMeta;
use crate::types::RenderedDocument;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Registers `/sw.js`. Browsers without service workers skip it.
const SW_REGISTER: &str = r#"if ('serviceWorker' in navigator) {
  navigator.serviceWorker.register('/sw.js');
}"#;

/// Typesets every `.math` span once KaTeX has loaded.
const KATEX_RENDER: &str = r#"document.addEventListener('DOMContentLoaded', function () {
  document.querySelectorAll('.math').forEach(function (el) {
    katex.render(el.textContent, el, {
      displayMode: el.classList.contains('math-display'),
      throwOnError: false
    });
  });
});"#;

/// Everything the layout needs besides the page itself.
#[derive(Debug, Clone)]
pub struct Layout<'a> {
    pub site: &'a SiteMeta,
    /// Versioned stylesheet URLs, e.g. `/css/style.css?v=3f2a9c1d`.
    pub stylesheets: &'a [String],
    /// Site-absolute feed URL when the feed is enabled.
    pub feed_url: Option<String>,
    pub register_worker: bool,
    /// Base URL of the KaTeX distribution.
    pub katex_url: &'a str,
}

/// All rendered documents of a site.
#[derive(Debug, Clone, Default)]
pub struct RenderedSite {
    /// Newest first.
    pub posts: Vec<RenderedDocument>,
    /// Home page (if any) first.
    pub pages: Vec<RenderedDocument>,
}

impl RenderedSite {
    pub fn home(&self) -> Option<&RenderedDocument> {
        self.pages.iter().find(|p| p.doc.is_home())
    }

    /// Pages linked from the navigation: everything but the home page.
    fn nav_pages(&self) -> impl Iterator<Item = &RenderedDocument> {
        self.pages.iter().filter(|p| !p.doc.is_home())
    }
}

/// Write every page of `site` under `output`. Returns the written paths,
/// relative to `output`.
pub fn generate(
    output: &Path,
    layout: &Layout<'_>,
    site: &RenderedSite,
) -> Result<Vec<PathBuf>, GenerateError> {
    let mut written = Vec::new();

    let home = render_home(layout, site);
    written.push(write_page(output, Path::new("index.html"), home)?);

    for post in &site.posts {
        let html = render_post(layout, site, post);
        written.push(write_page(output, &post.doc.output_path(), html)?);
    }
    for page in site.nav_pages() {
        let html = render_page(layout, site, page);
        written.push(write_page(output, &page.doc.output_path(), html)?);
    }
    Ok(written)
}

fn write_page(output: &Path, relative: &Path, markup: Markup) -> Result<PathBuf, GenerateError> {
    let path = output.join(relative);
    let write_err = |source| GenerateError::Write {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(&path, markup.into_string()).map_err(write_err)?;
    Ok(relative.to_path_buf())
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(
    layout: &Layout<'_>,
    title: &str,
    description: Option<&str>,
    has_math: bool,
    content: Markup,
) -> Markup {
    let description = description.filter(|d| !d.is_empty()).or(
        Some(layout.site.description.as_str()).filter(|d| !d.is_empty()),
    );
    html! {
        (DOCTYPE)
        html lang=(layout.site.language) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                @if let Some(description) = description {
                    meta name="description" content=(description);
                }
                @if !layout.site.author.is_empty() {
                    meta name="author" content=(layout.site.author);
                }
                @for href in layout.stylesheets {
                    link rel="stylesheet" href=(href);
                }
                @if let Some(feed) = &layout.feed_url {
                    link rel="alternate" type="application/rss+xml" title=(layout.site.title) href=(feed);
                }
                @if has_math {
                    (katex_assets(layout.katex_url))
                }
            }
            body {
                (content)
                @if layout.register_worker {
                    script { (PreEscaped(SW_REGISTER)) }
                }
            }
        }
    }
}

fn katex_assets(base: &str) -> Markup {
    let base = base.trim_end_matches('/');
    html! {
        link rel="stylesheet" href={ (base) "/katex.min.css" };
        script defer src={ (base) "/katex.min.js" } {}
        script { (PreEscaped(KATEX_RENDER)) }
    }
}

/// Site title plus links to every page
fn site_header(layout: &Layout<'_>, site: &RenderedSite, current: &str) -> Markup {
    html! {
        header.site-header {
            a.site-title href="/" { (layout.site.title) }
            nav.site-nav {
                ul {
                    @for page in site.nav_pages() {
                        @let url = page.doc.url();
                        li class=[(url == current).then_some("current")] {
                            a href=(url) { (page.doc.title) }
                        }
                    }
                }
            }
        }
    }
}

fn post_meta(post: &RenderedDocument) -> Markup {
    html! {
        @if let Some(date) = post.doc.date {
            time datetime=(date.format("%Y-%m-%d").to_string()) {
                (date.format("%B %-d, %Y").to_string())
            }
        }
        @if !post.doc.tags.is_empty() {
            ul.tags {
                @for tag in &post.doc.tags {
                    li { (tag) }
                }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders the home page: optional intro, then every post, newest first
fn render_home(layout: &Layout<'_>, site: &RenderedSite) -> Markup {
    let home = site.home();
    let content = html! {
        (site_header(layout, site, "/"))
        main.home {
            @if let Some(home) = home {
                section.intro { (PreEscaped(&home.html)) }
            }
            @if !site.posts.is_empty() {
                ol.post-list {
                    @for post in &site.posts {
                        li {
                            a href=(post.doc.url()) { (post.doc.title) }
                            " "
                            (post_meta(post))
                            @if let Some(description) = &post.doc.description {
                                p.summary { (description) }
                            }
                        }
                    }
                }
            }
        }
    };
    base_document(
        layout,
        &layout.site.title,
        home.and_then(|h| h.doc.description.as_deref()),
        home.is_some_and(|h| h.has_math),
        content,
    )
}

/// Renders a single post
fn render_post(layout: &Layout<'_>, site: &RenderedSite, post: &RenderedDocument) -> Markup {
    let content = html! {
        (site_header(layout, site, &post.doc.url()))
        main {
            article.post {
                header {
                    h1 { (post.doc.title) }
                    (post_meta(post))
                }
                (PreEscaped(&post.html))
            }
        }
    };
    base_document(
        layout,
        &page_title(&post.doc.title, &layout.site.title),
        post.doc.description.as_deref(),
        post.has_math,
        content,
    )
}

/// Renders a standalone page
fn render_page(layout: &Layout<'_>, site: &RenderedSite, page: &RenderedDocument) -> Markup {
    let content = html! {
        (site_header(layout, site, &page.doc.url()))
        main {
            article.page {
                h1 { (page.doc.title) }
                (PreEscaped(&page.html))
            }
        }
    };
    base_document(
        layout,
        &page_title(&page.doc.title, &layout.site.title),
        page.doc.description.as_deref(),
        page.has_math,
        content,
    )
}

fn page_title(title: &str, site_title: &str) -> String {
    if title == site_title {
        title.to_string()
    } else {
        format!("{title} | {site_title}")
    }
}
