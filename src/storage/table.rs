use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::backend::{TableDocument, TableStorage};
use super::db::StorageError;

/// Backend-assigned row identity. Zero is never handed out.
pub type Eid = u64;

/// A stored row: flat field name -> scalar value. The identity is the row key,
/// not a member of the document.
pub type Document = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub eid: Eid,
    pub doc: Document,
}

/// A named table over a [`TableStorage`] driver.
///
/// Every call is one full read (plus one full write for mutations) of the
/// table document. Lookups scan; there are no secondary indexes.
#[derive(Clone)]
pub struct Table {
    name: &'static str,
    storage: Arc<dyn TableStorage>,
}

impl Table {
    pub fn new(name: &'static str, storage: Arc<dyn TableStorage>) -> Self {
        Self { name, storage }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    async fn load(&self) -> Result<TableDocument, StorageError> {
        Ok(self.storage.read(self.name).await?.unwrap_or_default())
    }

    async fn store(&self, document: &TableDocument) -> Result<(), StorageError> {
        self.storage.write(self.name, document).await
    }

    pub async fn all(&self) -> Result<Vec<Row>, StorageError> {
        Ok(self
            .load()
            .await?
            .rows
            .into_iter()
            .map(|(eid, doc)| Row { eid, doc })
            .collect())
    }

    /// Rows whose `field` equals `value`, in identity order.
    pub async fn search(&self, field: &str, value: &Value) -> Result<Vec<Row>, StorageError> {
        let rows: Vec<Row> = self
            .load()
            .await?
            .rows
            .into_iter()
            .filter(|(_, doc)| doc.get(field) == Some(value))
            .map(|(eid, doc)| Row { eid, doc })
            .collect();

        debug!(table = self.name, field, %value, matches = rows.len(), "search");
        Ok(rows)
    }

    pub async fn get(&self, eid: Eid) -> Result<Option<Row>, StorageError> {
        Ok(self
            .load()
            .await?
            .rows
            .remove(&eid)
            .map(|doc| Row { eid, doc }))
    }

    /// Insert a new row and return the identity assigned to it.
    pub async fn insert(&self, doc: Document) -> Result<Eid, StorageError> {
        let mut table = self.load().await?;
        let eid = table.next_eid();
        table.last_eid = eid;
        table.rows.insert(eid, doc);
        self.store(&table).await?;

        debug!(table = self.name, eid, "insert");
        Ok(eid)
    }

    /// Merge `fields` into the row at `eid`. Returns the number of rows touched.
    pub async fn update(&self, fields: Document, eid: Eid) -> Result<usize, StorageError> {
        let mut table = self.load().await?;
        let Some(row) = table.rows.get_mut(&eid) else {
            return Ok(0);
        };

        if !fields.is_empty() {
            row.extend(fields);
            self.store(&table).await?;
        }

        debug!(table = self.name, eid, "update");
        Ok(1)
    }

    /// Drop one field from the row at `eid`. `false` if the row or field is absent.
    pub async fn remove_field(&self, field: &str, eid: Eid) -> Result<bool, StorageError> {
        let mut table = self.load().await?;
        let removed = table
            .rows
            .get_mut(&eid)
            .is_some_and(|row| row.remove(field).is_some());

        if removed {
            self.store(&table).await?;
            debug!(table = self.name, eid, field, "remove field");
        }
        Ok(removed)
    }

    /// Remove the row at `eid`. `false` if it was already absent.
    pub async fn remove(&self, eid: Eid) -> Result<bool, StorageError> {
        let mut table = self.load().await?;
        if table.rows.remove(&eid).is_none() {
            return Ok(false);
        }
        self.store(&table).await?;

        debug!(table = self.name, eid, "remove");
        Ok(true)
    }

    /// Remove every row, keeping the identity high-water mark.
    pub async fn purge(&self) -> Result<usize, StorageError> {
        let mut table = self.load().await?;
        let count = table.rows.len();
        if count > 0 {
            table.last_eid = table.next_eid() - 1;
            table.rows.clear();
            self.store(&table).await?;
        }
        Ok(count)
    }
}
