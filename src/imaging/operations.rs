//! High-level image operations.
//!
//! These functions combine the width calculations with backend execution:
//! plan every (width × format) variant of a source image, then encode the
//! ones the incremental cache cannot supply.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{VariantSize, resolve_widths};
use super::params::{OutputFormat, Quality, ResizeParams};
use crate::cache::{CacheManifest, CacheStats, hash_variant_params};
use rayon::prelude::*;
use std::path::Path;
use std::sync::Mutex;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// How a variant came to be on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantStatus {
    Encoded,
    Cached,
    Copied,
}

/// One generated file.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedVariant {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    /// File name inside the image output directory.
    pub file_name: String,
    pub status: VariantStatus,
}

/// Configuration for responsive image generation.
#[derive(Debug, Clone)]
pub struct ResponsiveConfig {
    /// Ladder from [`width_ladder`](super::width_ladder); `None` is the original width.
    pub ladder: Vec<Option<u32>>,
    pub formats: Vec<OutputFormat>,
    pub quality: Quality,
}

/// Incremental cache handed to [`create_responsive_images`].
pub struct VariantCache<'a> {
    pub manifest: &'a Mutex<CacheManifest>,
    pub stats: &'a Mutex<CacheStats>,
    /// SHA-256 of the source file.
    pub source_hash: &'a str,
}

/// Create every (width × format) variant of one image.
///
/// Variants are written to `output_dir` as `{stem}-{width}.{ext}` and
/// encoded in parallel. Returned variants are ordered by format (in config
/// order), then by ascending width.
pub fn create_responsive_images(
    backend: &impl ImageBackend,
    source: &Path,
    output_dir: &Path,
    stem: &str,
    original_dims: (u32, u32),
    config: &ResponsiveConfig,
    cache: Option<&VariantCache<'_>>,
) -> Result<Vec<GeneratedVariant>> {
    std::fs::create_dir_all(output_dir)?;

    let sizes = resolve_widths(original_dims, &config.ladder);
    let jobs: Vec<(OutputFormat, VariantSize)> = config
        .formats
        .iter()
        .flat_map(|&format| sizes.iter().map(move |&size| (format, size)))
        .collect();

    jobs.into_par_iter()
        .map(|(format, size)| {
            let file_name = format!("{}-{}.{}", stem, size.width, format.extension());
            let status = produce_variant(
                backend, source, output_dir, &file_name, format, size, config, cache,
            )?;
            Ok(GeneratedVariant {
                width: size.width,
                height: size.height,
                format,
                file_name,
                status,
            })
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn produce_variant(
    backend: &impl ImageBackend,
    source: &Path,
    output_dir: &Path,
    file_name: &str,
    format: OutputFormat,
    size: VariantSize,
    config: &ResponsiveConfig,
    cache: Option<&VariantCache<'_>>,
) -> Result<VariantStatus> {
    let output = output_dir.join(file_name);
    let params_hash = hash_variant_params(size.width, format, config.quality.value());

    if let Some(cache) = cache {
        let stored = lock(cache.manifest).find_cached(cache.source_hash, &params_hash, output_dir);
        match stored {
            Some(stored) if stored == file_name => {
                lock(cache.stats).hit();
                return Ok(VariantStatus::Cached);
            }
            Some(stored) => {
                std::fs::copy(output_dir.join(&stored), &output)?;
                lock(cache.manifest).insert(
                    file_name.to_string(),
                    cache.source_hash.to_string(),
                    params_hash,
                );
                lock(cache.stats).copy();
                return Ok(VariantStatus::Copied);
            }
            None => {}
        }
    }

    backend.resize(&ResizeParams {
        source: source.to_path_buf(),
        output,
        width: size.width,
        height: size.height,
        format,
        quality: config.quality,
    })?;

    if let Some(cache) = cache {
        lock(cache.manifest).insert(
            file_name.to_string(),
            cache.source_hash.to_string(),
            params_hash,
        );
        lock(cache.stats).miss();
    }
    Ok(VariantStatus::Encoded)
}

/// Lock a mutex, recovering the data if another encoder panicked while holding it.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
