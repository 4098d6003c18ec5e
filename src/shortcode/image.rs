//! The `image` shortcode: responsive `<picture>` markup.
//!
//! ```text
//! {% image "photos/harbour.jpg", "Boats at dusk", "(min-width: 40em) 50vw, 100vw" %}
//! ```
//!
//! The source path is relative to the content root. Every width of the
//! ladder (see [`width_ladder`]) is encoded in every configured format into
//! `<output>/<images.output_dir>/<hash>-<width>.<ext>`, where `<hash>` is the
//! first 10 hex digits of the SHA-256 of the source file. The markup is:
//!
//! ```html
//! <picture>
//!   <source type="image/avif" srcset="/img/3f2a…-300.avif 300w, …" sizes="100vw">
//!   <source type="image/webp" srcset="/img/3f2a…-300.webp 300w, …" sizes="100vw">
//!   <img src="/img/3f2a…-300.webp" alt="…" width="2000" height="1333" loading="lazy" decoding="async">
//! </picture>
//! ```
//!
//! The fallback `<img>` points at the smallest variant of the last format and
//! carries the dimensions of the largest, so the browser reserves the right
//! aspect ratio before any file arrives.

use super::ShortcodeError;
use crate::cache::{self, CacheManifest, CacheStats};
use crate::config::ImagesConfig;
use crate::imaging::{
    BackendError, GeneratedVariant, ImageBackend, OutputFormat, Quality, ResponsiveConfig,
    VariantCache, create_responsive_images, get_dimensions, is_supported_source, width_ladder,
};
use maud::html;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Hex digits of the source hash used in variant file names.
const STEM_LENGTH: usize = 10;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("image not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("image path must stay inside the content root: {0}")]
    OutsideRoot(String),
    #[error("unsupported image format: {}", .0.display())]
    Unsupported(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{}: {source}", path.display())]
    Backend {
        path: PathBuf,
        source: BackendError,
    },
}

/// Progress report for one processed source image.
#[derive(Debug, Clone)]
pub struct ImageEvent {
    /// Source path as written in the content.
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub variants: Vec<GeneratedVariant>,
}

/// State shared by every `image` call of one build.
pub struct ImageShortcode<B: ImageBackend> {
    backend: B,
    content_root: PathBuf,
    /// Absolute directory the variants are written to.
    image_dir: PathBuf,
    /// URL prefix of `image_dir`, e.g. `/img`.
    url_prefix: String,
    config: ImagesConfig,
    manifest: Mutex<CacheManifest>,
    stats: Mutex<CacheStats>,
    events: Option<Sender<ImageEvent>>,
}

impl<B: ImageBackend> ImageShortcode<B> {
    /// `use_cache = false` starts from an empty cache manifest.
    pub fn new(
        backend: B,
        content_root: &Path,
        output_root: &Path,
        config: &ImagesConfig,
        use_cache: bool,
    ) -> Self {
        let image_dir = output_root.join(&config.output_dir);
        let manifest = if use_cache {
            CacheManifest::load(&image_dir)
        } else {
            CacheManifest::empty()
        };
        Self {
            backend,
            content_root: content_root.to_path_buf(),
            url_prefix: format!("/{}", config.output_dir.trim_matches('/')),
            image_dir,
            config: config.clone(),
            manifest: Mutex::new(manifest),
            stats: Mutex::new(CacheStats::default()),
            events: None,
        }
    }

    /// Send an [`ImageEvent`] for every processed image.
    pub fn with_events(mut self, events: Sender<ImageEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Shortcode entry point: `src, alt[, sizes]`.
    pub fn call(&self, args: &[String]) -> Result<String, ShortcodeError> {
        let (src, alt, sizes) = split_args(args)?;
        Ok(self.render(src, alt, sizes)?)
    }

    /// Check the arguments and that the source decodes, without encoding
    /// anything. Returns the source dimensions.
    pub fn validate(&self, args: &[String]) -> Result<(u32, u32), ShortcodeError> {
        let (src, _, _) = split_args(args)?;
        let path = self.resolve_source(src)?;
        let dims = get_dimensions(&self.backend, &path)
            .map_err(|source| ImageError::Backend { path, source })?;
        Ok(dims)
    }

    /// Encode every variant of `src` and return the `<picture>` markup.
    pub fn render(&self, src: &str, alt: &str, sizes: Option<&str>) -> Result<String, ImageError> {
        let path = self.resolve_source(src)?;
        let backend_err = |source| ImageError::Backend {
            path: path.clone(),
            source,
        };

        let source_hash = cache::hash_file(&path)?;
        let stem = &source_hash[..STEM_LENGTH];
        let (width, height) = get_dimensions(&self.backend, &path).map_err(backend_err)?;

        let responsive = ResponsiveConfig {
            ladder: width_ladder(self.config.width_step, self.config.max_width),
            formats: self.config.formats.clone(),
            quality: Quality::new(self.config.quality),
        };
        let variant_cache = VariantCache {
            manifest: &self.manifest,
            stats: &self.stats,
            source_hash: &source_hash,
        };
        let variants = create_responsive_images(
            &self.backend,
            &path,
            &self.image_dir,
            stem,
            (width, height),
            &responsive,
            Some(&variant_cache),
        )
        .map_err(backend_err)?;

        let markup = picture_markup(
            &variants,
            &self.config.formats,
            &self.url_prefix,
            alt,
            sizes.unwrap_or(&self.config.sizes),
        );

        if let Some(events) = &self.events {
            // Printer may have gone away; progress output is best-effort
            let _ = events.send(ImageEvent {
                source: src.to_string(),
                width,
                height,
                variants,
            });
        }
        Ok(markup)
    }

    fn resolve_source(&self, src: &str) -> Result<PathBuf, ImageError> {
        let relative = Path::new(src.trim_start_matches('/'));
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ImageError::OutsideRoot(src.to_string()));
        }
        let path = self.content_root.join(relative);
        if !path.is_file() {
            return Err(ImageError::NotFound(path));
        }
        if !is_supported_source(&path) {
            return Err(ImageError::Unsupported(path));
        }
        Ok(path)
    }

    /// Write the cache manifest next to the variants. A build without images
    /// leaves no manifest behind.
    pub fn save_cache(&self) -> std::io::Result<()> {
        if self.cache_stats().total() == 0 {
            return Ok(());
        }
        lock(&self.manifest).save(&self.image_dir)
    }

    pub fn cache_stats(&self) -> CacheStats {
        *lock(&self.stats)
    }
}

fn split_args(args: &[String]) -> Result<(&str, &str, Option<&str>), ShortcodeError> {
    let arg_error = |message: &str| ShortcodeError::Arguments {
        name: "image".to_string(),
        message: message.to_string(),
    };
    match args {
        [src, alt] => Ok((src.as_str(), alt.as_str(), None)),
        [src, alt, sizes] => Ok((src.as_str(), alt.as_str(), Some(sizes.as_str()))),
        [] | [_] => Err(arg_error("expected a source path and alt text")),
        _ => Err(arg_error("expected at most 3 arguments: src, alt, sizes")),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Build the `<picture>` element for generated variants.
///
/// `variants` must be grouped by format and ascending in width within each
/// group, as returned by [`create_responsive_images`].
pub fn picture_markup(
    variants: &[GeneratedVariant],
    formats: &[OutputFormat],
    url_prefix: &str,
    alt: &str,
    sizes: &str,
) -> String {
    let url = |v: &GeneratedVariant| format!("{}/{}", url_prefix, v.file_name);
    let srcset = |format: OutputFormat| {
        variants
            .iter()
            .filter(|v| v.format == format)
            .map(|v| format!("{} {}w", url(v), v.width))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let fallback_format = formats.last().copied();
    let fallback = variants
        .iter()
        .find(|v| Some(v.format) == fallback_format)
        .or_else(|| variants.first());
    let largest = variants.iter().max_by_key(|v| v.width);

    html! {
        picture {
            @for format in formats {
                source type=(format.mime_type()) srcset=(srcset(*format)) sizes=(sizes);
            }
            img src=[fallback.map(url)]
                alt=(alt)
                width=[largest.map(|v| v.width)]
                height=[largest.map(|v| v.height)]
                loading="lazy"
                decoding="async";
        }
    }
    .into_string()
}
