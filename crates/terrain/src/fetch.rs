//! Byte fetching over HTTP.

use reqwest::StatusCode;
use reqwest::header::ACCEPT;

use crate::cache::Cache;
use crate::error::Result;

/// Source of raw response bytes.
///
/// `Ok(None)` means the server explicitly has no data at `url`, as
/// opposed to a failed request.
pub trait Fetch {
    fn fetch(&self, url: &str, accept: &str) -> impl Future<Output = Result<Option<Vec<u8>>>>;
}

impl<F: Fetch> Fetch for &F {
    fn fetch(&self, url: &str, accept: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> {
        (**self).fetch(url, accept)
    }
}

/// HTTP client with an optional response cache.
#[derive(Debug)]
pub struct HttpClient<C: Cache> {
    client: reqwest::Client,
    cache: C,
}

impl<C: Cache> HttpClient<C> {
    #[must_use]
    pub fn with_cache(cache: C) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// GET `url`, consulting the cache first.
    ///
    /// A 404 response is reported as `Ok(None)`; other error statuses fail.
    pub async fn fetch_bytes_from_url(&self, url: &str, accept: &str) -> Result<Option<Vec<u8>>> {
        if let Some(bytes) = self.cache.get(url) {
            tracing::trace!(url, "cache hit");
            return Ok(Some(bytes));
        }

        let response = self.client.get(url).header(ACCEPT, accept).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(url, "server has no data");
            return Ok(None);
        }

        let bytes = response.error_for_status()?.bytes().await?;
        tracing::trace!(url, len = bytes.len(), "fetched");
        self.cache.insert(url, &bytes);
        Ok(Some(bytes.to_vec()))
    }
}

impl<C: Cache> Fetch for HttpClient<C> {
    fn fetch(&self, url: &str, accept: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> {
        self.fetch_bytes_from_url(url, accept)
    }
}
