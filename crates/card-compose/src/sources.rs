//! Where image-kind field values come from
//!
//! A reference is tried, in order, as an inline `data:image/...;base64,`
//! URI, an internal storage path `/<files_prefix>/<bucket>/<id>`, an
//! `http(s)` URL and finally a path relative to the base directory.

use crate::http::{FetchError, HttpFetch};
use crate::storage::{ObjectStore, StoreError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_FILES_PREFIX: &str = "files";

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Malformed data URI: {0}")]
    DataUri(String),
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Path escapes the base directory: {0}")]
    PathRejected(String),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Clone)]
pub struct ImageSources {
    store: Arc<dyn ObjectStore>,
    http: Arc<dyn HttpFetch>,
    base_dir: PathBuf,
    files_prefix: String,
}

impl ImageSources {
    pub fn new(store: Arc<dyn ObjectStore>, http: Arc<dyn HttpFetch>) -> Self {
        Self {
            store,
            http,
            base_dir: PathBuf::from("."),
            files_prefix: DEFAULT_FILES_PREFIX.to_string(),
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_files_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.files_prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Fetch the raw bytes behind an image reference
    pub async fn fetch(&self, reference: &str) -> Result<Vec<u8>, ResolveError> {
        let reference = reference.trim();

        if let Some(bytes) = decode_data_uri(reference)? {
            return Ok(bytes);
        }

        if let Some((bucket, id)) = self.storage_key(reference) {
            log::debug!("Reading {}/{} from storage", bucket, id);
            return Ok(self.store.read_by_id(bucket, id).await?);
        }

        if is_http_url(reference) {
            return Ok(self.http.get(reference).await?);
        }

        self.read_local(reference).await
    }

    /// `/<files_prefix>/<bucket>/<id>` -> `(bucket, id)`
    fn storage_key<'a>(&self, reference: &'a str) -> Option<(&'a str, &'a str)> {
        let path = reference.strip_prefix('/')?;
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let mut parts = path.split('/');
        let prefix = parts.next()?;
        let bucket = parts.next()?;
        let id = parts.next()?;
        if parts.next().is_some() || prefix != self.files_prefix {
            return None;
        }
        if bucket.is_empty() || id.is_empty() {
            return None;
        }
        Some((bucket, id))
    }

    async fn read_local(&self, reference: &str) -> Result<Vec<u8>, ResolveError> {
        let relative = Path::new(reference.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ResolveError::PathRejected(reference.to_string()));
        }

        let path = self.base_dir.join(relative);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ResolveError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn is_http_url(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// `Ok(None)` when the reference is not a data URI at all
fn decode_data_uri(reference: &str) -> Result<Option<Vec<u8>>, ResolveError> {
    let Some(scheme) = reference.get(..5) else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case("data:") {
        return Ok(None);
    }

    let (meta, payload) = reference
        .split_once(',')
        .ok_or_else(|| ResolveError::DataUri("missing ',' separator".to_string()))?;
    let meta = meta.to_ascii_lowercase();
    if !meta.starts_with("data:image/") || !meta.ends_with(";base64") {
        return Err(ResolveError::DataUri(format!(
            "expected data:image/<type>;base64, got {}",
            meta
        )));
    }

    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(Some(STANDARD.decode(payload)?))
}
