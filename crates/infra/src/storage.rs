//! Object storage for uploaded files (product images).
//!
//! Keys are relative, slash-separated paths. Backends return a public URL
//! built from a configured base URL, so the API never exposes filesystem
//! paths.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const IMAGE_TYPES: [(&str, &str); 4] = [
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("unsupported content type '{0}'")]
    UnsupportedContentType(String),

    #[error("object is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("object is empty")]
    Empty,

    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, StorageError>;

    async fn get(&self, key: &str) -> Result<StoredBlob, StorageError>;

    /// `false` when the key did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    fn name(&self) -> &'static str;
}

/// Reject absolute paths, `.`/`..` segments and anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_key(key: &str) -> Result<String, StorageError> {
    let invalid = || StorageError::InvalidKey(key.to_string());
    if key.is_empty() || key.starts_with('/') || key.len() > 512 {
        return Err(invalid());
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(invalid());
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(invalid());
        }
    }
    Ok(key.to_string())
}

/// Validate an image upload; returns the file extension to store it under.
pub fn validate_image(content_type: &str, size: usize) -> Result<&'static str, StorageError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let ext = IMAGE_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| StorageError::UnsupportedContentType(content_type.to_string()))?;
    if size == 0 {
        return Err(StorageError::Empty);
    }
    if size > MAX_IMAGE_BYTES {
        return Err(StorageError::TooLarge {
            size,
            max: MAX_IMAGE_BYTES,
        });
    }
    Ok(ext)
}

fn content_type_for(key: &str) -> &'static str {
    let ext = key.rsplit('.').next().unwrap_or_default();
    IMAGE_TYPES
        .iter()
        .find(|(_, e)| *e == ext)
        .map(|(mime, _)| *mime)
        .unwrap_or("application/octet-stream")
}

fn public_url(base_url: &str, key: &str) -> String {
    format!("{}/uploads/{key}", base_url.trim_end_matches('/'))
}

/// Files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(sanitize_key(key)?))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()), err)]
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let size = bytes.len() as u64;
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), "object written");
        Ok(StoredObject {
            key: key.to_string(),
            url: public_url(&self.base_url, key),
            content_type: content_type.to_string(),
            size,
        })
    }

    async fn get(&self, key: &str) -> Result<StoredBlob, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(StoredBlob {
                content_type: content_type_for(key).to_string(),
                bytes,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Process-local store for dev/tests.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, StoredBlob>>,
    base_url: String,
}

impl InMemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            base_url: base_url.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Backend("lock poisoned".to_string())
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, StorageError> {
        let key = sanitize_key(key)?;
        let size = bytes.len() as u64;
        self.objects.write().map_err(poisoned)?.insert(
            key.clone(),
            StoredBlob {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(StoredObject {
            url: public_url(&self.base_url, &key),
            key,
            content_type: content_type.to_string(),
            size,
        })
    }

    async fn get(&self, key: &str) -> Result<StoredBlob, StorageError> {
        let key = sanitize_key(key)?;
        self.objects
            .read()
            .map_err(poisoned)?
            .get(&key)
            .cloned()
            .ok_or(StorageError::NotFound(key))
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let key = sanitize_key(key)?;
        Ok(self.objects.write().map_err(poisoned)?.remove(&key).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
