//! Object storage collaborator
//!
//! Template base images, image-kind field values that point into internal
//! storage, and finished documents all go through [`ObjectStore`].
//! Implementations must allow concurrent reads of distinct ids.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object {bucket}/{id} not found")]
    NotFound { bucket: String, id: String },
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn read_by_id(&self, bucket: &str, id: &str) -> Result<Vec<u8>, StoreError>;

    /// Store a buffer and return the id it can be read back with
    async fn write_buffer(
        &self,
        bucket: &str,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, StoreError>;
}

/// In-process store, used for embedding and tests
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    next_id: AtomicU64,
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    filename: String,
    content_type: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object under a caller-chosen id
    pub fn insert(&self, bucket: &str, id: &str, bytes: Vec<u8>) {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert(
            (bucket.to_string(), id.to_string()),
            StoredObject {
                bytes,
                filename: id.to_string(),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    /// Filename and content type an object was written with
    pub fn metadata(&self, bucket: &str, id: &str) -> Option<(String, String)> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        objects
            .get(&(bucket.to_string(), id.to_string()))
            .map(|o| (o.filename.clone(), o.content_type.clone()))
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn read_by_id(&self, bucket: &str, id: &str) -> Result<Vec<u8>, StoreError> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        objects
            .get(&(bucket.to_string(), id.to_string()))
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                id: id.to_string(),
            })
    }

    async fn write_buffer(
        &self,
        bucket: &str,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let id = format!("{:016x}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert(
            (bucket.to_string(), id.clone()),
            StoredObject {
                bytes,
                filename: filename.to_string(),
                content_type: content_type.to_string(),
            },
        );
        Ok(id)
    }
}

/// Filesystem store laid out as `<root>/<bucket>/<id>`
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, id: &str) -> Result<PathBuf, StoreError> {
        validate_key(bucket)?;
        validate_key(id)?;
        Ok(self.root.join(bucket).join(id))
    }
}

#[async_trait]
impl ObjectStore for DirStore {
    async fn read_by_id(&self, bucket: &str, id: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(bucket, id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                id: id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_buffer(
        &self,
        bucket: &str,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let id = format!("{}-{}", uuid::Uuid::new_v4().simple(), sanitize(filename));
        let path = self.object_path(bucket, &id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        log::debug!(
            "Stored {} ({}) as {}/{}",
            filename,
            content_type,
            bucket,
            id
        );
        Ok(id)
    }
}

/// Keys are single path segments
fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn sanitize(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "object".to_string()
    } else {
        cleaned.to_string()
    }
}
