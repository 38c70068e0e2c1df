use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use super::backend::{JsonFileStorage, ObjectTableStorage, TableStorage};
use super::table::Table;
use crate::config::{StorageBackend, StorageConfig};
use crate::model::{Mapper, Model};
use crate::object_store::{GcsStore, LocalStore, ObjectStore, ObjectStoreError};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt table {table}: {reason}")]
    Corrupt { table: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),
}

/// Handle to the document tables and the blob store.
///
/// Cloning is cheap; every clone talks to the same drivers. Nothing is cached,
/// so each operation re-reads the backend.
#[derive(Clone)]
pub struct Database {
    tables: Arc<dyn TableStorage>,
    blobs: Arc<dyn ObjectStore>,
}

impl Database {
    pub fn new(tables: Arc<dyn TableStorage>, blobs: Arc<dyn ObjectStore>) -> Self {
        Self { tables, blobs }
    }

    /// Open local JSON tables under `db_path` and local blobs under `file_path`.
    pub fn open_local<P: AsRef<Path>, Q: AsRef<Path>>(
        db_path: P,
        file_path: Q,
    ) -> Result<Self, StorageError> {
        let tables = JsonFileStorage::new(db_path)?;
        let blobs = LocalStore::new(file_path)?;
        Ok(Self::new(Arc::new(tables), Arc::new(blobs)))
    }

    /// Wire the drivers selected by the storage configuration.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, anyhow::Error> {
        match config.backend {
            StorageBackend::Local => {
                info!(
                    db_path = %config.db_path,
                    file_path = %config.file_path,
                    "Using local storage backend"
                );
                Ok(Self::open_local(&config.db_path, &config.file_path)?)
            }
            StorageBackend::Gcs => {
                let bucket = config
                    .gcs_bucket
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("GCS_BUCKET is required for the gcs backend"))?;
                let credentials = config.gcs_credentials_file.as_deref();

                let table_store = GcsStore::new(bucket, &config.db_path, credentials).await?;
                let blobs = GcsStore::new(bucket, &config.file_path, credentials).await?;
                info!(bucket, "Using GCS storage backend");

                let tables = ObjectTableStorage::new(Arc::new(table_store));
                Ok(Self::new(Arc::new(tables), Arc::new(blobs)))
            }
        }
    }

    /// A raw table by name.
    pub fn table(&self, name: &'static str) -> Table {
        Table::new(name, Arc::clone(&self.tables))
    }

    /// Entity mapper over the model's table.
    pub fn mapper<M: Model>(&self) -> Mapper<M> {
        Mapper::new(self.table(M::TABLE))
    }

    /// Blob store holding file content and metadata sidecars.
    pub fn blobs(&self) -> &Arc<dyn ObjectStore> {
        &self.blobs
    }
}
