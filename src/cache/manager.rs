use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use url::Url;

use crate::cache::{
    decode,
    dependencies::CacheDependencies,
    file,
    handle::{self, Handle},
    image::{DecodedImage, ImageOrientation, MAX_LEVEL},
    types::{CacheError, CacheStats, ImageKey, RepaintHandle},
};
use crate::config::CacheConfig;

/// Handle to a decoded bitmap; resolves to nothing when fetching or decoding failed.
pub type ImageHandle = Handle<Arc<DecodedImage>>;

/// Worker counts for the three pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSizes {
    pub download: usize,
    pub fast: usize,
    pub scale: usize,
}

impl PoolSizes {
    /// Sizes from the config, filling zeros from the core count.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::for_cores(config, num_cpus::get())
    }

    pub(crate) fn for_cores(config: &CacheConfig, cores: usize) -> Self {
        let cores = cores.max(1);
        let pick = |configured: usize, auto: usize| if configured > 0 { configured } else { auto };
        Self {
            download: pick(config.download_workers, 2 * cores),
            fast: pick(config.fast_workers, (cores / 2).max(1)),
            scale: pick(config.scale_workers, cores),
        }
    }
}

/// A decoded-image slot.
enum Entry {
    /// Pending or resolved; the map keeps the bitmap alive.
    Live(ImageHandle),
    /// Released under memory pressure; alive only while someone else holds it.
    Soft(Weak<DecodedImage>),
}

struct Cached {
    entry: Entry,
    /// Tick of the last request, for least-recently-used eviction.
    used: u64,
}

/// State shared between the cache front end and its worker tasks.
struct Shared {
    directory: PathBuf,
    dependencies: CacheDependencies,
    files: Mutex<HashMap<String, Handle<PathBuf>>>,
    images: Mutex<HashMap<ImageKey, Cached>>,
    sizes: Mutex<HashMap<String, Handle<(u32, u32)>>>,
    download_pool: Arc<Semaphore>,
    fast_pool: Arc<Semaphore>,
    scale_pool: Arc<Semaphore>,
    memory_budget: usize,
    downloads: AtomicUsize,
    decodes: AtomicUsize,
    clock: AtomicU64,
}

/// Concurrent, memoizing multi-resolution image loader.
///
/// Every request returns immediately with a [`Handle`]. Work runs on a
/// runtime owned by the cache, so the cache can be used from threads that
/// know nothing about tokio.
pub struct ImageCache {
    shared: Arc<Shared>,
    runtime: Option<Runtime>,
    handle: tokio::runtime::Handle,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ImageCache {
    /// Create a cache with the default fetcher.
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        Self::with_dependencies(config, CacheDependencies::default())
    }

    /// Create a cache with custom dependencies (useful for testing).
    pub fn with_dependencies(
        config: &CacheConfig,
        dependencies: CacheDependencies,
    ) -> Result<Self, CacheError> {
        let pools = PoolSizes::from_config(config);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(pools.fast.max(2))
            .max_blocking_threads(pools.fast + pools.scale)
            .thread_keep_alive(Duration::from_secs(config.idle_timeout_secs.max(1)))
            .thread_name("corescope-cache")
            .enable_all()
            .build()?;

        log::debug!(
            "Image cache pools: download={} fast={} scale={}",
            pools.download,
            pools.fast,
            pools.scale
        );

        let shared = Arc::new(Shared {
            directory: config.resolved_directory(),
            dependencies,
            files: Mutex::new(HashMap::new()),
            images: Mutex::new(HashMap::new()),
            sizes: Mutex::new(HashMap::new()),
            download_pool: Arc::new(Semaphore::new(pools.download)),
            fast_pool: Arc::new(Semaphore::new(pools.fast)),
            scale_pool: Arc::new(Semaphore::new(pools.scale)),
            memory_budget: (config.memory_budget_mb as usize).saturating_mul(1024 * 1024),
            downloads: AtomicUsize::new(0),
            decodes: AtomicUsize::new(0),
            clock: AtomicU64::new(0),
        });

        Ok(Self {
            shared,
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    fn runtime(&self) -> &tokio::runtime::Handle {
        &self.handle
    }

    /// Request `url` at decimation `level`.
    ///
    /// Returns the existing handle for a known key. With `repaint`, the
    /// callback runs once the handle resolves.
    pub fn get(
        &self,
        url: &str,
        level: u8,
        orientation: ImageOrientation,
        repaint: Option<RepaintHandle>,
    ) -> ImageHandle {
        let url = match file::normalize(url) {
            Ok(url) => url,
            Err(err) => {
                log::warn!("{}", err);
                let (resolver, handle) = handle::pending();
                resolver.fail();
                return handle;
            }
        };
        let key = ImageKey {
            url: url.to_string(),
            level: level.min(MAX_LEVEL),
            orientation,
        };
        let handle = self.lookup_or_decode(url, key, repaint.is_some());
        if let Some(repaint) = repaint {
            self.notify_when_ready(&handle, repaint);
        }
        handle
    }

    /// Request `url` at the level that suits drawing it into `target` pixels.
    ///
    /// With `repaint` and an unknown natural size the coarsest level is
    /// requested right away while the size is read in the background.
    /// Without `repaint` this blocks until the size is known.
    pub fn get_sized(
        &self,
        url: &str,
        target: (f64, f64),
        orientation: ImageOrientation,
        repaint: Option<RepaintHandle>,
    ) -> ImageHandle {
        let level = self
            .level_for(url, target, orientation, repaint.is_none())
            .unwrap_or(MAX_LEVEL);
        self.get(url, level, orientation, repaint)
    }

    /// Level for drawing `url` into `target`; `None` if the natural size is
    /// still unknown and `block` is false.
    pub fn level_for(
        &self,
        url: &str,
        target: (f64, f64),
        orientation: ImageOrientation,
        block: bool,
    ) -> Option<u8> {
        let size = self.natural_size_handle(url);
        let stored = if block { size.wait() } else { size.try_get() };
        let stored = match stored {
            Some(stored) => stored,
            None if size.is_ready() || block => (1, 1),
            None => return None,
        };
        let natural = orientation.display_size(stored.0, stored.1);
        Some(decode::level_for(natural, target))
    }

    /// Natural display size of `url`, blocking until it is known.
    ///
    /// Falls back to 1x1 when the image cannot be read.
    pub fn natural_size(&self, url: &str, orientation: ImageOrientation) -> (u32, u32) {
        let (w, h) = self.natural_size_handle(url).wait().unwrap_or((1, 1));
        orientation.display_size(w, h)
    }

    /// The resolved bitmap for `url` whose level is closest to `level`.
    ///
    /// On a tie the finer level wins.
    pub fn closest(
        &self,
        url: &str,
        level: u8,
        orientation: ImageOrientation,
    ) -> Option<Arc<DecodedImage>> {
        let url = file::normalize(url).ok()?.to_string();
        let images = lock(&self.shared.images);
        images
            .iter()
            .filter(|(key, _)| key.url == url && key.orientation == orientation)
            .filter_map(|(key, cached)| {
                let image = match &cached.entry {
                    Entry::Live(handle) => handle.try_get(),
                    Entry::Soft(weak) => weak.upgrade(),
                }?;
                Some((key.level, image))
            })
            .min_by_key(|(candidate, _)| (candidate.abs_diff(level), *candidate))
            .map(|(_, image)| image)
    }

    /// Downgrades every resolved bitmap to a weak reference.
    ///
    /// Bitmaps still held elsewhere survive and are picked up again on the
    /// next request; the rest are freed and re-decoded from the local file
    /// when requested. Failed entries are dropped so they are retried.
    pub fn release_memory(&self) {
        self.shared.release_memory();
    }

    /// Bytes of decoded pixels currently held by the cache.
    pub fn resident_bytes(&self) -> usize {
        self.shared.resident_bytes()
    }

    /// Downloads and decodes started so far.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            downloads: self.shared.downloads.load(Ordering::SeqCst),
            decodes: self.shared.decodes.load(Ordering::SeqCst),
        }
    }

    fn lookup_or_decode(&self, url: Url, key: ImageKey, interactive: bool) -> ImageHandle {
        let tick = self.shared.clock.fetch_add(1, Ordering::SeqCst);
        let mut images = lock(&self.shared.images);
        if let Some(cached) = images.get_mut(&key) {
            cached.used = tick;
            match &cached.entry {
                Entry::Live(handle) => {
                    log::debug!("Image cache hit: {} level {}", key.url, key.level);
                    return handle.clone();
                }
                Entry::Soft(weak) => {
                    if let Some(image) = weak.upgrade() {
                        let handle = Handle::ready(image);
                        cached.entry = Entry::Live(handle.clone());
                        return handle;
                    }
                }
            }
        }

        let (resolver, handle) = handle::pending();
        images.insert(
            key.clone(),
            Cached {
                entry: Entry::Live(handle.clone()),
                used: tick,
            },
        );
        drop(images);

        let file = self.file_handle(&url);
        let pool = if interactive && file.is_ready() {
            self.shared.fast_pool.clone()
        } else {
            self.shared.scale_pool.clone()
        };
        self.shared.decodes.fetch_add(1, Ordering::SeqCst);

        let shared = self.shared.clone();
        self.runtime().spawn(async move {
            let Some(path) = file.resolved().await else {
                log::warn!("No local file for {}, image unavailable", key.url);
                resolver.fail();
                return;
            };
            let Ok(_permit) = pool.acquire_owned().await else {
                resolver.fail();
                return;
            };
            let (level, orientation) = (key.level, key.orientation);
            let result =
                tokio::task::spawn_blocking(move || decode::decode_file(&path, level, orientation))
                    .await
                    .map_err(|e| CacheError::Worker(e.to_string()))
                    .and_then(|r| r);
            match result {
                Ok(image) => {
                    resolver.resolve(Arc::new(image));
                    shared.enforce_budget(&key);
                }
                Err(err) => {
                    log::warn!("Failed to decode {} at level {}: {}", key.url, key.level, err);
                    resolver.fail();
                }
            }
        });

        handle
    }

    /// Memoized local file for `url`; downloads at most once per URL.
    fn file_handle(&self, url: &Url) -> Handle<PathBuf> {
        let mut files = lock(&self.shared.files);
        if let Some(handle) = files.get(url.as_str()) {
            return handle.clone();
        }

        if let Some(path) = file::local_path(url) {
            let handle = Handle::ready(path);
            files.insert(url.to_string(), handle.clone());
            return handle;
        }

        let (resolver, handle) = handle::pending();
        files.insert(url.to_string(), handle.clone());
        drop(files);

        self.shared.downloads.fetch_add(1, Ordering::SeqCst);
        let shared = self.shared.clone();
        let url = url.clone();
        self.runtime().spawn(async move {
            let Ok(_permit) = shared.download_pool.clone().acquire_owned().await else {
                resolver.fail();
                return;
            };
            log::debug!("Downloading {}", url);
            let bytes = match shared.dependencies.fetcher.fetch(&url).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    log::warn!("Failed to fetch {}: {}", url, err);
                    resolver.fail();
                    return;
                }
            };
            let directory = shared.directory.clone();
            let target = url.clone();
            let persisted = tokio::task::spawn_blocking(move || {
                file::persist_download(&directory, &target, &bytes)
            })
            .await
            .map_err(|e| CacheError::Worker(e.to_string()))
            .and_then(|r| r);
            match persisted {
                Ok(path) => resolver.resolve(path),
                Err(err) => {
                    log::warn!("Failed to store {}: {}", url, err);
                    resolver.fail();
                }
            }
        });

        handle
    }

    /// Memoized stored pixel size for `url`; resolves to 1x1 on failure.
    fn natural_size_handle(&self, location: &str) -> Handle<(u32, u32)> {
        let url = match file::normalize(location) {
            Ok(url) => url,
            Err(err) => {
                log::warn!("{}", err);
                return Handle::ready((1, 1));
            }
        };

        let mut sizes = lock(&self.shared.sizes);
        if let Some(handle) = sizes.get(url.as_str()) {
            return handle.clone();
        }
        let (resolver, handle) = handle::pending();
        sizes.insert(url.to_string(), handle.clone());
        drop(sizes);

        let file = self.file_handle(&url);
        let pool = self.shared.scale_pool.clone();
        self.runtime().spawn(async move {
            let size = match file.resolved().await {
                Some(path) => {
                    let _permit = pool.acquire_owned().await;
                    tokio::task::spawn_blocking(move || decode::stored_size(&path))
                        .await
                        .map_err(|e| CacheError::Worker(e.to_string()))
                        .and_then(|r| r)
                        .unwrap_or_else(|err| {
                            log::warn!("Failed to read size of {}: {}", url, err);
                            (1, 1)
                        })
                }
                None => (1, 1),
            };
            resolver.resolve(size);
        });

        handle
    }

    fn notify_when_ready(&self, handle: &ImageHandle, repaint: RepaintHandle) {
        if handle.is_ready() {
            return;
        }
        let handle = handle.clone();
        self.runtime().spawn(async move {
            let _ = handle.resolved().await;
            repaint();
        });
    }
}

impl Shared {
    fn resident_bytes(&self) -> usize {
        resident_in(&lock(&self.images))
    }

    /// Evicts least-recently-used bitmaps until the decoded pixels fit the
    /// budget again.
    ///
    /// `keep` (the bitmap that was just decoded) and bitmaps whose handle or
    /// pixels are still held elsewhere are never evicted.
    fn enforce_budget(&self, keep: &ImageKey) {
        if self.memory_budget == 0 {
            return;
        }
        let mut images = lock(&self.images);
        let mut resident = resident_in(&images);
        if resident <= self.memory_budget {
            return;
        }

        let mut candidates: Vec<(u64, ImageKey, usize)> = images
            .iter()
            .filter(|(key, _)| *key != keep)
            .filter_map(|(key, cached)| match &cached.entry {
                Entry::Live(handle) if handle.holders() == 1 => {
                    let image = handle.try_get()?;
                    // One reference in the handle's slot, one here.
                    (Arc::strong_count(&image) == 2)
                        .then(|| (cached.used, key.clone(), image.byte_size()))
                }
                _ => None,
            })
            .collect();
        candidates.sort_by_key(|(used, _, _)| *used);

        let mut evicted = 0;
        for (_, key, size) in candidates {
            if resident <= self.memory_budget {
                break;
            }
            images.remove(&key);
            resident -= size;
            evicted += 1;
        }
        log::info!(
            "Decoded images over budget ({} bytes): evicted {}, {} bytes resident",
            self.memory_budget,
            evicted,
            resident
        );
    }

    fn release_memory(&self) {
        let mut images = lock(&self.images);
        let before = images.len();
        images.retain(|_, cached| match &cached.entry {
            Entry::Live(handle) => !handle.is_failed(),
            Entry::Soft(weak) => weak.strong_count() > 0,
        });
        for cached in images.values_mut() {
            if let Entry::Live(handle) = &cached.entry {
                if let Some(image) = handle.try_get() {
                    cached.entry = Entry::Soft(Arc::downgrade(&image));
                }
            }
        }
        log::debug!(
            "Released image cache: {} entries kept of {}",
            images.len(),
            before
        );
    }
}

/// Bytes of resolved bitmaps held by live entries.
fn resident_in(images: &HashMap<ImageKey, Cached>) -> usize {
    images
        .values()
        .filter_map(|cached| match &cached.entry {
            Entry::Live(handle) => handle.try_get(),
            Entry::Soft(_) => None,
        })
        .map(|image| image.byte_size())
        .sum()
}

impl Drop for ImageCache {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
