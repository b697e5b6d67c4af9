//! Data types shared by the image cache.

use super::image::ImageOrientation;
use std::sync::Arc;
use thiserror::Error;

/// Callback run (on a cache worker thread) once a requested image is ready.
///
/// Interactive renderers use it to schedule a repaint on their own thread.
pub type RepaintHandle = Arc<dyn Fn() + Send + Sync>;

/// Identity of one decoded bitmap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageKey {
    /// Absolute URL.
    pub url: String,
    pub level: u8,
    pub orientation: ImageOrientation,
}

/// Counters for work the cache has started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub downloads: usize,
    pub decodes: usize,
}

/// Errors that can occur while fetching or decoding an image.
///
/// None of these reach renderers; a failed entry simply resolves to no value.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid image location '{0}'")]
    InvalidUrl(String),

    #[error("No fetcher for '{0}' URLs")]
    UnsupportedScheme(String),

    #[error("Failed to download image: {0}")]
    Transport(String),

    #[error("Image cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image cache worker failed: {0}")]
    Worker(String),
}
