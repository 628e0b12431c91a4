//! HTTP fetch collaborator for field values that are external image URLs

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP fetching is disabled")]
    Disabled,
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// GET the url, following redirects; 4xx/5xx responses are errors
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// [`HttpFetch`] backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    http: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        log::debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// Fetcher that refuses every request, for offline rendering
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetch;

#[async_trait]
impl HttpFetch for NoFetch {
    async fn get(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Disabled)
    }
}
