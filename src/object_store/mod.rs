mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),
}

/// Abstraction over blob storage backends.
///
/// Keys are flat names relative to the store's base location: a file's content
/// lives at `<file_id>`, its metadata sidecar at `<file_id>.json`, and table
/// documents at `<table>.json`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
    /// Removing a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;
}

/// Check that `key` names a single object directly under the store's base
/// location. Empty keys, path separators, `..` and absolute paths are rejected.
pub fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    let invalid = key.is_empty()
        || key == "."
        || key.contains(['/', '\\'])
        || key.contains("..")
        || std::path::Path::new(key).is_absolute();

    if invalid {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Key of the JSON metadata sidecar stored next to a blob.
pub fn sidecar_key(file_id: &str) -> String {
    format!("{file_id}.json")
}
