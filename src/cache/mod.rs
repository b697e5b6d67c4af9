//! Asynchronous multi-resolution image cache.
//!
//! Images are fetched once per URL into a local file, then decoded at any
//! number of decimation levels. Requests never block: they return a
//! [`Handle`] that interactive renderers poll and batch renderers wait on.
//!
//! Three bounded pools do the work: downloads, "fast" decodes for on-screen
//! requests whose bytes are already local, and "scale" decodes for
//! everything else.

pub mod decode;
pub mod dependencies;
pub mod file;
pub mod handle;
pub mod image;
pub mod manager;
pub mod types;

pub use dependencies::{CacheDependencies, ImageFetcher};
pub use handle::Handle;
pub use self::image::{DecodedImage, ImageOrientation, MAX_LEVEL};
pub use manager::{ImageCache, ImageHandle, PoolSizes};
pub use types::{CacheError, CacheStats, ImageKey, RepaintHandle};
