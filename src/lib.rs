//! # quire
//!
//! A small static site generator for a personal website and blog, with the
//! offline cache worker the generated site ships with.
//!
//! # Build Pipeline
//!
//! A build is a single pass from a content directory to an output directory:
//!
//! ```text
//! site.toml        →  config          (stock defaults + overrides, validated)
//! css/             →  stylesheet hash (cache-busting ?v=<hash> on every link)
//! posts/*.md, *.md →  scan            (front matter, dates, slugs, drafts)
//!                  →  shortcodes      (image variants encoded here)
//!                  →  markdown        (math, highlighting, linkify)
//!                  →  generate        (HTML pages), feed (RSS)
//! passthrough list →  copied verbatim
//!                  →  sw.js           (offline cache worker)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`site`] | Build orchestration and `check` |
//! | [`config`] | `site.toml` loading, merging over stock defaults, validation |
//! | [`scan`] | Walks the content directory into posts and pages |
//! | [`naming`] | `YYYY-MM-DD-slug` filename convention parser |
//! | [`types`] | Front matter and document types shared across stages |
//! | [`shortcode`] | Shortcode registry, invocation syntax, the `image` shortcode |
//! | [`markdown`] | pulldown-cmark rendering with the `[markdown]` switches |
//! | [`highlight`] | syntect code block highlighting |
//! | [`imaging`] | Pure-Rust resize/encode backend and the responsive width ladder |
//! | [`cache`] | Content-addressed cache of encoded image variants |
//! | [`fingerprint`] | Stylesheet hash and versioned URLs |
//! | [`generate`] | Maud page templates |
//! | [`feed`] | RSS 2.0 feed |
//! | [`passthrough`] | Verbatim copy of static files |
//! | [`worker`] | Offline cache policy and the emitted `sw.js` |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Versioned Cache, Not Cache-Everything
//!
//! The worker only caches URLs that carry the version parameter. Such a URL
//! names immutable content: the hash in it changes whenever any stylesheet
//! changes, so an entry can be served forever without revalidation. Pages
//! and other unversioned resources always go to the network, so a deploy is
//! visible on the next load. The old unconditional cache-first behaviour is
//! still available as `policy = "cache-first"`.
//!
//! ## Policy as a Library
//!
//! The caching rules live in [`worker::ServiceWorker`] with the store and the
//! network injected through traits, so they are unit-tested natively. The
//! emitted `sw.js` is a fixed template implementing the same rules with the
//! configured values substituted.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time HTML
//! macro system. Malformed templates are build errors and all interpolation is
//! auto-escaped. There is no template directory to ship.
//!
//! ## Shortcodes Before Markdown
//!
//! Shortcodes are expanded on the markdown source, but their HTML output is
//! held back behind placeholders and restored after rendering, so the
//! markdown pass never re-wraps or escapes it.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decoding, Lanczos3
//! resampling and AVIF/WebP encoding. No ImageMagick, no system libraries.

pub mod cache;
pub mod config;
pub mod feed;
pub mod fingerprint;
pub mod generate;
pub mod highlight;
pub mod imaging;
pub mod markdown;
pub mod naming;
pub mod output;
pub mod passthrough;
pub mod scan;
pub mod shortcode;
pub mod site;
pub mod types;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_helpers;
