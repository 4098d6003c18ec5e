//! Site configuration module.
//!
//! Handles loading, validating, and merging `site.toml`. The user file lives in
//! the content root and is layered on top of the stock defaults, so it only
//! needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! title = "My Site"
//! url = "https://example.com"   # Absolute base URL, used by the feed
//! author = ""
//! description = ""
//! language = "en"
//!
//! [markdown]
//! html = true                   # Pass raw HTML through (false = escape it)
//! linkify = true                # Turn bare URLs into links
//! typographer = true            # Smart quotes and dashes
//! math = true                   # $inline$ and $$display$$ math
//! katex_url = "https://cdn.jsdelivr.net/npm/katex@0.16.11/dist"
//!
//! [highlight]
//! enabled = true
//! theme = "base16-ocean.dark"
//!
//! [images]
//! output_dir = "img"            # Generated variants, relative to the output root
//! width_step = 300              # Width ladder: original, 300, 600, ... up to max_width
//! max_width = 1500
//! formats = ["avif", "webp"]
//! quality = 80
//! sizes = "100vw"               # Default `sizes` hint for the image shortcode
//!
//! [stylesheets]
//! dir = "css"                   # Fingerprinted for cache-busting
//! hash_length = 8
//!
//! [feed]
//! enabled = true
//! path = "feed.xml"
//! limit = 20
//!
//! [passthrough]
//! paths = ["css", "fonts", "manifest.json", "favicon.ico", "icons", "img", "videos", "specs", "profile.jpg"]
//!
//! [worker]
//! enabled = true
//! policy = "versioned"          # or "cache-first"
//! version_param = "v"
//! cache_name = "quire-cache"
//! precache_stylesheets = true
//! precache = []
//!
//! [processing]
//! max_processes = 4             # Max parallel encoders (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::highlight;
use crate::imaging::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;

/// Name of the configuration file inside the content root.
pub const CONFIG_FILENAME: &str = "site.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `site.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site identity used in page titles and the feed.
    pub site: SiteMeta,
    /// Markdown renderer switches.
    pub markdown: MarkdownConfig,
    /// Code block highlighting.
    pub highlight: HighlightConfig,
    /// Responsive image generation.
    pub images: ImagesConfig,
    /// Stylesheet fingerprinting.
    pub stylesheets: StylesheetsConfig,
    /// RSS feed.
    pub feed: FeedConfig,
    /// Files and directories copied verbatim.
    pub passthrough: PassthroughConfig,
    /// Offline cache worker.
    pub worker: WorkerConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.site.url.starts_with("http://") || self.site.url.starts_with("https://")) {
            return Err(ConfigError::Validation(
                "site.url must be an absolute http(s) URL".into(),
            ));
        }
        if self.images.quality > 100 {
            return Err(ConfigError::Validation(
                "images.quality must be 0-100".into(),
            ));
        }
        if self.images.width_step == 0 {
            return Err(ConfigError::Validation(
                "images.width_step must be non-zero".into(),
            ));
        }
        if self.images.max_width < self.images.width_step {
            return Err(ConfigError::Validation(
                "images.max_width must be at least images.width_step".into(),
            ));
        }
        if self.images.formats.is_empty() {
            return Err(ConfigError::Validation(
                "images.formats must not be empty".into(),
            ));
        }
        if !is_relative_path(&self.images.output_dir) {
            return Err(ConfigError::Validation(
                "images.output_dir must be a relative path inside the output".into(),
            ));
        }
        if self.stylesheets.hash_length == 0 || self.stylesheets.hash_length > 64 {
            return Err(ConfigError::Validation(
                "stylesheets.hash_length must be 1-64".into(),
            ));
        }
        if !is_relative_path(&self.stylesheets.dir) {
            return Err(ConfigError::Validation(
                "stylesheets.dir must be a relative path inside the content root".into(),
            ));
        }
        if self.feed.enabled && !is_relative_path(&self.feed.path) {
            return Err(ConfigError::Validation(
                "feed.path must be a relative path inside the output".into(),
            ));
        }
        if let Some(bad) = self
            .passthrough
            .paths
            .iter()
            .find(|p| !is_relative_path(p))
        {
            return Err(ConfigError::Validation(format!(
                "passthrough path '{bad}' must be relative and stay inside the content root"
            )));
        }
        let stylesheets = Path::new(&self.stylesheets.dir);
        if !self
            .passthrough
            .paths
            .iter()
            .any(|p| stylesheets.starts_with(Path::new(p)))
        {
            return Err(ConfigError::Validation(format!(
                "stylesheets.dir '{}' must be copied: add it to passthrough.paths",
                self.stylesheets.dir
            )));
        }
        let param = &self.worker.version_param;
        if param.is_empty()
            || !param
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Validation(
                "worker.version_param must be a non-empty alphanumeric name".into(),
            ));
        }
        if self.worker.cache_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "worker.cache_name must not be empty".into(),
            ));
        }
        if self.highlight.enabled && !highlight::available_themes().contains(&self.highlight.theme)
        {
            return Err(ConfigError::Validation(format!(
                "highlight.theme '{}' is not a known theme (available: {})",
                self.highlight.theme,
                highlight::available_themes().join(", ")
            )));
        }
        Ok(())
    }
}

/// A path is acceptable when it is non-empty, relative, and never climbs out
/// of its base directory.
fn is_relative_path(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Site identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteMeta {
    pub title: String,
    /// Absolute base URL, e.g. `https://example.com`. Feed links are built on it.
    pub url: String,
    pub author: String,
    pub description: String,
    /// Value of the `lang` attribute on every page.
    pub language: String,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            title: "My Site".to_string(),
            url: "https://example.com".to_string(),
            author: String::new(),
            description: String::new(),
            language: "en".to_string(),
        }
    }
}

/// Markdown renderer switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    /// Pass raw HTML in markdown through to the output. When false it is escaped.
    pub html: bool,
    /// Turn bare `https://` and `www.` URLs into links.
    pub linkify: bool,
    /// Smart quotes, dashes and ellipses.
    pub typographer: bool,
    /// Recognise `$inline$` and `$$display$$` math.
    pub math: bool,
    /// Where the KaTeX stylesheet and script are loaded from on pages with math.
    pub katex_url: String,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            html: true,
            linkify: true,
            typographer: true,
            math: true,
            katex_url: "https://cdn.jsdelivr.net/npm/katex@0.16.11/dist".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlightConfig {
    pub enabled: bool,
    /// One of syntect's bundled theme names.
    pub theme: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            theme: "base16-ocean.dark".to_string(),
        }
    }
}

/// Responsive image generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Directory, relative to the output root, that receives generated variants.
    pub output_dir: String,
    /// Distance between rungs of the width ladder.
    pub width_step: u32,
    /// Largest ladder width.
    pub max_width: u32,
    /// Encodings produced for every width.
    pub formats: Vec<OutputFormat>,
    /// Lossy encoding quality (0 = worst, 100 = best).
    pub quality: u32,
    /// Default `sizes` attribute when the shortcode does not pass one.
    pub sizes: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            output_dir: "img".to_string(),
            width_step: 300,
            max_width: 1500,
            formats: vec![OutputFormat::Avif, OutputFormat::Webp],
            quality: 80,
            sizes: "100vw".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesheetsConfig {
    /// Directory (relative to the content root) whose files are fingerprinted.
    pub dir: String,
    /// Number of hex characters kept from the digest.
    pub hash_length: usize,
}

impl Default for StylesheetsConfig {
    fn default() -> Self {
        Self {
            dir: "css".to_string(),
            hash_length: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    pub enabled: bool,
    /// Output path of the RSS document.
    pub path: String,
    /// Maximum number of posts in the feed.
    pub limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "feed.xml".to_string(),
            limit: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PassthroughConfig {
    /// Files and directories, relative to the content root.
    pub paths: Vec<String>,
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self {
            paths: [
                "css",
                "fonts",
                "manifest.json",
                "favicon.ico",
                "icons",
                "img",
                "videos",
                "specs",
                "profile.jpg",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Which request-caching policy the worker applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerPolicy {
    /// Cache only URLs carrying the version parameter, populated lazily.
    Versioned,
    /// Answer every request from the cache when possible. Never refreshes.
    CacheFirst,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Emit `sw.js` and register it from every page.
    pub enabled: bool,
    pub policy: WorkerPolicy,
    /// Query parameter that marks a URL as immutable.
    pub version_param: String,
    /// Name of the browser cache the worker opens.
    pub cache_name: String,
    /// Add the fingerprinted stylesheet URLs to the install-time resource list.
    pub precache_stylesheets: bool,
    /// Extra URLs fetched and stored at install time.
    pub precache: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: WorkerPolicy::Versioned,
            version_param: "v".to_string(),
            cache_name: "quire-cache".to_string(),
            precache_stylesheets: true,
            precache: Vec::new(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image encoders.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `site.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `site.toml`.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the site configuration for a content root.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `site.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# quire site configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Site identity
# ---------------------------------------------------------------------------
[site]
title = "My Site"
# Absolute base URL. Feed links and GUIDs are built on it.
url = "https://example.com"
author = ""
description = ""
language = "en"

# ---------------------------------------------------------------------------
# Markdown
# ---------------------------------------------------------------------------
[markdown]
# Pass raw HTML through. When false, HTML in markdown is escaped.
html = true
# Turn bare URLs (https://..., www....) into links.
linkify = true
# Smart quotes, dashes and ellipses.
typographer = true
# $inline$ and $$display$$ math, rendered in the browser by KaTeX.
math = true
katex_url = "https://cdn.jsdelivr.net/npm/katex@0.16.11/dist"

# ---------------------------------------------------------------------------
# Code highlighting
# ---------------------------------------------------------------------------
[highlight]
enabled = true
theme = "base16-ocean.dark"

# ---------------------------------------------------------------------------
# Responsive images ({% image "src", "alt", "sizes" %})
# ---------------------------------------------------------------------------
[images]
# Generated variants land here, relative to the output root.
output_dir = "img"
# Width ladder: the original width, then width_step, 2 * width_step, ...
# up to max_width. Widths larger than the source are skipped.
width_step = 300
max_width = 1500
formats = ["avif", "webp"]
quality = 80
sizes = "100vw"

# ---------------------------------------------------------------------------
# Stylesheet fingerprint (appended to stylesheet URLs as ?v=<hash>)
# ---------------------------------------------------------------------------
[stylesheets]
# Also listed in [passthrough] paths so the files reach the output
dir = "css"
hash_length = 8

# ---------------------------------------------------------------------------
# RSS feed
# ---------------------------------------------------------------------------
[feed]
enabled = true
path = "feed.xml"
limit = 20

# ---------------------------------------------------------------------------
# Files and directories copied verbatim into the output
# ---------------------------------------------------------------------------
[passthrough]
paths = ["css", "fonts", "manifest.json", "favicon.ico", "icons", "img", "videos", "specs", "profile.jpg"]

# ---------------------------------------------------------------------------
# Offline cache worker (sw.js)
# ---------------------------------------------------------------------------
[worker]
enabled = true
# "versioned": cache only URLs carrying ?v=..., filled on first fetch.
# "cache-first": serve anything cached, never refresh.
policy = "versioned"
version_param = "v"
cache_name = "quire-cache"
# Fetch the fingerprinted stylesheets when the worker installs.
precache_stylesheets = true
precache = []

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image encoders.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_site_identity() {
        let config = SiteConfig::default();
        assert_eq!(config.site.title, "My Site");
        assert_eq!(config.site.url, "https://example.com");
        assert_eq!(config.site.language, "en");
    }

    #[test]
    fn default_markdown_options_all_enabled() {
        let config = SiteConfig::default();
        assert!(config.markdown.html);
        assert!(config.markdown.linkify);
        assert!(config.markdown.typographer);
        assert!(config.markdown.math);
    }

    #[test]
    fn default_image_settings() {
        let config = SiteConfig::default();
        assert_eq!(config.images.width_step, 300);
        assert_eq!(config.images.max_width, 1500);
        assert_eq!(
            config.images.formats,
            vec![OutputFormat::Avif, OutputFormat::Webp]
        );
        assert_eq!(config.images.sizes, "100vw");
    }

    #[test]
    fn default_passthrough_list() {
        let config = SiteConfig::default();
        for expected in ["css", "fonts", "manifest.json", "icons", "specs", "profile.jpg"] {
            assert!(
                config.passthrough.paths.iter().any(|p| p == expected),
                "missing {expected}"
            );
        }
    }

    #[test]
    fn default_worker_is_versioned() {
        let config = SiteConfig::default();
        assert_eq!(config.worker.policy, WorkerPolicy::Versioned);
        assert_eq!(config.worker.version_param, "v");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[site]
title = "Notebook"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.site.title, "Notebook");
        assert_eq!(config.site.url, "https://example.com");
        assert_eq!(config.feed.path, "feed.xml");
    }

    #[test]
    fn parse_worker_policy_kebab_case() {
        let toml = r#"
[worker]
policy = "cache-first"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.worker.policy, WorkerPolicy::CacheFirst);
    }

    #[test]
    fn parse_image_formats() {
        let toml = r#"
[images]
formats = ["webp"]
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.images.formats, vec![OutputFormat::Webp]);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.site.title, "My Site");
        assert_eq!(config.stylesheets.dir, "css");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[site]
title = "Field Notes"
url = "https://notes.example.org"

[markdown]
html = false
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.site.title, "Field Notes");
        assert_eq!(config.site.url, "https://notes.example.org");
        assert!(!config.markdown.html);
        // Unspecified values should be defaults
        assert!(config.markdown.linkify);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[images]
quality = 200
"#,
        )
        .unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[markdown]
linkfy = true
"#,
        )
        .unwrap();

        assert!(load_config(tmp.path()).is_err());
    }

    // =========================================================================
    // Processing config tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_never_zero() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"quality = 90"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"quality = 70"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("quality").unwrap().as_integer(), Some(70));
    }

    #[test]
    fn merge_toml_table_merge_preserves_siblings() {
        let base: toml::Value = toml::from_str(
            r#"
[feed]
path = "feed.xml"
limit = 20
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[feed]
limit = 5
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let feed = merged.get("feed").unwrap();
        assert_eq!(feed.get("limit").unwrap().as_integer(), Some(5));
        assert_eq!(feed.get("path").unwrap().as_str(), Some("feed.xml"));
    }

    #[test]
    fn merge_toml_arrays_replace_not_append() {
        let base: toml::Value = toml::from_str(r#"paths = ["css", "fonts"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"paths = ["img"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("paths").unwrap().as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[images]
qualty = 90
"#;
        let result: Result<SiteConfig, _> = toml::from_str(toml_str);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[plugins]\nrss = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_policy_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[worker]\npolicy = \"network-first\"\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_too_high() {
        let mut config = SiteConfig::default();
        config.images.quality = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality"));
    }

    #[test]
    fn validate_width_ladder() {
        let mut config = SiteConfig::default();
        config.images.width_step = 0;
        assert!(config.validate().is_err());

        let mut config = SiteConfig::default();
        config.images.max_width = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_formats_empty() {
        let mut config = SiteConfig::default();
        config.images.formats.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_hash_length_bounds() {
        let mut config = SiteConfig::default();
        config.stylesheets.hash_length = 0;
        assert!(config.validate().is_err());
        config.stylesheets.hash_length = 65;
        assert!(config.validate().is_err());
        config.stylesheets.hash_length = 64;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_passthrough_rejects_escaping_paths() {
        let mut config = SiteConfig::default();
        config.passthrough.paths = vec!["../secrets".to_string()];
        assert!(config.validate().is_err());

        config.passthrough.paths = vec!["/etc/passwd".to_string()];
        assert!(config.validate().is_err());

        config.passthrough.paths = vec!["css".to_string(), "fonts/inter".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_requires_stylesheets_in_passthrough() {
        let mut config = SiteConfig::default();
        config.passthrough.paths = vec!["img".to_string(), "fonts".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stylesheets.dir 'css'"));

        config.passthrough.paths = vec!["css/".to_string()];
        assert!(config.validate().is_ok());

        config.stylesheets.dir = "assets/css".to_string();
        assert!(config.validate().is_err());
        config.passthrough.paths = vec!["assets".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_version_param() {
        let mut config = SiteConfig::default();
        config.worker.version_param = String::new();
        assert!(config.validate().is_err());
        config.worker.version_param = "v=1".to_string();
        assert!(config.validate().is_err());
        config.worker.version_param = "rev".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_site_url_must_be_absolute() {
        let mut config = SiteConfig::default();
        config.site.url = "/blog".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_unknown_highlight_theme() {
        let mut config = SiteConfig::default();
        config.highlight.theme = "no-such-theme".to_string();
        assert!(config.validate().is_err());

        // Theme is irrelevant when highlighting is off
        config.highlight.enabled = false;
        assert!(config.validate().is_ok());
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.site.title, defaults.site.title);
        assert_eq!(config.images.width_step, defaults.images.width_step);
        assert_eq!(config.images.formats, defaults.images.formats);
        assert_eq!(config.passthrough.paths, defaults.passthrough.paths);
        assert_eq!(config.worker.policy, defaults.worker.policy);
        assert_eq!(config.markdown.katex_url, defaults.markdown.katex_url);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in [
            "[site]",
            "[markdown]",
            "[highlight]",
            "[images]",
            "[stylesheets]",
            "[feed]",
            "[passthrough]",
            "[worker]",
            "[processing]",
        ] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        for key in ["site", "markdown", "images", "feed", "worker", "processing"] {
            assert!(val.get(key).is_some(), "missing {key}");
        }
    }
}
