//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait covers the two operations the image shortcode
//! needs: identify and resize. The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::ResizeParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` because variants of one image are encoded in parallel with rayon.
pub trait ImageBackend: Sync {
    /// Get image dimensions. Fails if the file cannot be read or decoded.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Resize the source and encode it in the requested format.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;
}
