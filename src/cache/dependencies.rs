use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::cache::types::CacheError;

/// Abstraction over how raw image bytes are fetched for non-`file:` URLs.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, CacheError>;
}

/// Bundle of dependencies used by the image cache. Each component can be mocked in tests.
#[derive(Clone)]
pub struct CacheDependencies {
    pub fetcher: Arc<dyn ImageFetcher>,
}

impl Default for CacheDependencies {
    fn default() -> Self {
        Self {
            fetcher: Arc::new(DefaultFetcher::default()),
        }
    }
}

/// Fetches `http`/`https` URLs when built with the `http` feature.
#[derive(Default)]
struct DefaultFetcher {
    #[cfg(feature = "http")]
    client: reqwest::Client,
}

#[async_trait]
impl ImageFetcher for DefaultFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, CacheError> {
        match url.scheme() {
            #[cfg(feature = "http")]
            "http" | "https" => self.fetch_http(url).await,
            other => Err(CacheError::UnsupportedScheme(other.to_string())),
        }
    }
}

#[cfg(feature = "http")]
impl DefaultFetcher {
    async fn fetch_http(&self, url: &Url) -> Result<Vec<u8>, CacheError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CacheError::Transport(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CacheError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
