//! RSS 2.0 feed of the newest posts.
//!
//! Item descriptions carry the full rendered body as escaped HTML, which is
//! what feed readers expect from `<description>`. Root-relative `href`, `src`
//! and `srcset` URLs in the body are made absolute against the site URL,
//! since readers resolve them against their own origin otherwise.

use crate::config::{FeedConfig, SiteMeta};
use crate::types::RenderedDocument;
use chrono::NaiveDate;
use maud::{Markup, PreEscaped, html};
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static URL_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(href|src|srcset)="([^"]*)""#).expect("invalid URL attribute regex")
});

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("cannot write feed {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Render the feed document. `posts` must be sorted newest first.
pub fn render_feed(site: &SiteMeta, feed: &FeedConfig, posts: &[RenderedDocument]) -> String {
    let base = site.url.trim_end_matches('/');
    let items = &posts[..posts.len().min(feed.limit)];
    let last_build = items.iter().filter_map(|p| p.doc.date).max();

    let markup: Markup = html! {
        (PreEscaped(XML_DECLARATION))
        rss version="2.0" {
            channel {
                title { (site.title) }
                link { (base) "/" }
                description { (site.description) }
                language { (site.language) }
                @if let Some(date) = last_build {
                    lastBuildDate { (rfc2822(date)) }
                }
                @for post in items {
                    @let url = format!("{base}{}", post.doc.url());
                    item {
                        title { (post.doc.title) }
                        link { (url) }
                        guid isPermaLink="true" { (url) }
                        @if let Some(date) = post.doc.date {
                            pubDate { (rfc2822(date)) }
                        }
                        @if !site.author.is_empty() {
                            author { (site.author) }
                        }
                        @for tag in &post.doc.tags {
                            category { (tag) }
                        }
                        description { (absolute_urls(&post.html, base)) }
                    }
                }
            }
        }
    };
    markup.into_string()
}

/// Rewrite root-relative URLs in `href`, `src` and `srcset` attributes of
/// `html` to absolute ones under `base` (no trailing slash).
pub fn absolute_urls(html: &str, base: &str) -> String {
    URL_ATTRIBUTE
        .replace_all(html, |caps: &Captures| {
            let attr = &caps[1];
            let value = if attr == "srcset" {
                caps[2]
                    .split(',')
                    .map(|candidate| match candidate.trim().split_once(' ') {
                        Some((url, descriptor)) => {
                            format!("{} {descriptor}", absolute_url(url, base))
                        }
                        None => absolute_url(candidate.trim(), base),
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            } else {
                absolute_url(&caps[2], base)
            };
            format!(r#"{attr}="{value}""#)
        })
        .into_owned()
}

fn absolute_url(url: &str, base: &str) -> String {
    if url.starts_with('/') && !url.starts_with("//") {
        format!("{base}{url}")
    } else {
        url.to_string()
    }
}

/// Midnight UTC of `date`, RFC 2822 formatted.
fn rfc2822(date: NaiveDate) -> String {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().to_rfc2822())
        .unwrap_or_default()
}

/// Render and write the feed under `output`. Returns the written path.
pub fn write_feed(
    output: &Path,
    site: &SiteMeta,
    feed: &FeedConfig,
    posts: &[RenderedDocument],
) -> Result<PathBuf, FeedError> {
    let path = output.join(&feed.path);
    let write_err = |source| FeedError::Write {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(&path, render_feed(site, feed, posts)).map_err(write_err)?;
    Ok(path)
}
