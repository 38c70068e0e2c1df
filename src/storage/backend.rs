use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::db::StorageError;
use super::table::{Document, Eid};
use crate::object_store::{ObjectStore, ObjectStoreError};

/// Persisted form of one table.
///
/// `last_eid` is a high-water mark: identities handed out by inserts are never
/// reused, even after the row holding the highest one is removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDocument {
    #[serde(default)]
    pub last_eid: Eid,
    #[serde(default)]
    pub rows: BTreeMap<Eid, Document>,
}

impl TableDocument {
    /// Identity for the next insert.
    pub fn next_eid(&self) -> Eid {
        let highest_row = self.rows.keys().next_back().copied().unwrap_or(0);
        self.last_eid.max(highest_row) + 1
    }
}

/// Durable medium for whole-table documents.
///
/// Drivers load and replace a table in one piece. No locking is done: two
/// writers doing read-modify-write on the same table race, and the last
/// `write` wins.
#[async_trait]
pub trait TableStorage: Send + Sync {
    /// `None` when the table has never been written.
    async fn read(&self, table: &str) -> Result<Option<TableDocument>, StorageError>;
    async fn write(&self, table: &str, document: &TableDocument) -> Result<(), StorageError>;
}

fn table_key(table: &str) -> String {
    format!("{table}.json")
}

fn decode(table: &str, raw: &[u8]) -> Result<TableDocument, StorageError> {
    // A zero-length file is an empty table
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(TableDocument::default());
    }
    serde_json::from_slice(raw).map_err(|e| StorageError::Corrupt {
        table: table.to_string(),
        reason: e.to_string(),
    })
}

// ============================================================================
// Local JSON files
// ============================================================================

/// One `<table>.json` file per table inside a local directory.
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, std::io::Error> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(table_key(table))
    }
}

#[async_trait]
impl TableStorage for JsonFileStorage {
    async fn read(&self, table: &str) -> Result<Option<TableDocument>, StorageError> {
        match tokio::fs::read(self.table_path(table)).await {
            Ok(raw) => decode(table, &raw).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, table: &str, document: &TableDocument) -> Result<(), StorageError> {
        let dir = self.dir.clone();
        let path = self.table_path(table);
        let data = serde_json::to_vec(document)?;

        // Each write gets its own temp file, renamed over the table in one step
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&data)?;
            tmp.persist(&path)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;
        Ok(())
    }
}

// ============================================================================
// Object storage
// ============================================================================

/// Table documents kept as `<table>.json` objects in any [`ObjectStore`].
pub struct ObjectTableStorage {
    store: Arc<dyn ObjectStore>,
}

impl ObjectTableStorage {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TableStorage for ObjectTableStorage {
    async fn read(&self, table: &str) -> Result<Option<TableDocument>, StorageError> {
        match self.store.get(&table_key(table)).await {
            Ok(raw) => decode(table, &raw).map(Some),
            Err(ObjectStoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, table: &str, document: &TableDocument) -> Result<(), StorageError> {
        let data = serde_json::to_vec(document)?;
        self.store.put(&table_key(table), Bytes::from(data)).await?;
        Ok(())
    }
}
