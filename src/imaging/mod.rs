//! Image processing for the `image` shortcode, in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize** | Lanczos3 via `DynamicImage::resize_exact` |
//! | **Encode → AVIF** | `image::codecs::avif::AvifEncoder` (rav1e) |
//! | **Encode → WebP** | `image::codecs::webp::WebPEncoder` (lossless) |
//!
//! The module is split into:
//! - **Calculations**: the width ladder and per-variant dimension math
//! - **Parameters**: data structures describing one encode
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: plan every (width × format) variant and run the encodes

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{VariantSize, resolve_widths, width_ladder};
pub use operations::{
    GeneratedVariant, ResponsiveConfig, VariantCache, VariantStatus, create_responsive_images,
    get_dimensions,
};
pub use params::{OutputFormat, Quality, ResizeParams};
pub use rust_backend::{RustBackend, is_supported_source, supported_input_extensions};
