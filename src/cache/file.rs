//! Locations of image bytes on local disk.

use super::types::CacheError;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use url::Url;

/// Turns a URL or a local path into an absolute URL.
///
/// Relative paths are resolved against the current directory.
pub fn normalize(location: &str) -> Result<Url, CacheError> {
    let location = location.trim();
    if location.is_empty() {
        return Err(CacheError::InvalidUrl(location.to_string()));
    }
    match Url::parse(location) {
        // Single-letter schemes are Windows drive letters, not URLs.
        Ok(url) if url.scheme().len() > 1 => Ok(url),
        _ => {
            let path = Path::new(location);
            let absolute = if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()?.join(path)
            };
            Url::from_file_path(&absolute)
                .map_err(|_| CacheError::InvalidUrl(location.to_string()))
        }
    }
}

/// Local path of a `file:` URL.
pub fn local_path(url: &Url) -> Option<PathBuf> {
    if url.scheme() == "file" {
        url.to_file_path().ok()
    } else {
        None
    }
}

/// Name under which a downloaded URL is stored in the cache directory.
pub fn cache_file_name(url: &Url) -> String {
    let mut hasher = DefaultHasher::new();
    url.as_str().hash(&mut hasher);
    let extension = Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{:016x}{}", hasher.finish(), extension)
}

/// Writes `bytes` into `directory` under the URL's cache name.
///
/// The bytes go to a temporary file in the same directory first and are
/// renamed into place, so readers never see a partially written file.
pub fn persist_download(directory: &Path, url: &Url, bytes: &[u8]) -> Result<PathBuf, CacheError> {
    if !directory.exists() {
        log::info!("Creating image cache directory: {}", directory.display());
        fs::create_dir_all(directory)?;
    }

    let target = directory.join(cache_file_name(url));
    let mut temp = NamedTempFile::new_in(directory)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.persist(&target).map_err(|e| CacheError::Io(e.error))?;

    log::debug!("Cached {} as {}", url, target.display());
    Ok(target)
}
