use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, warn};

use super::db::{Database, StorageError};
use super::models::GalleryFile;
use super::table::Eid;
use crate::model::{Entity, Mapper};
use crate::object_store::{sidecar_key, validate_key, ObjectStoreError};

/// Which blob artifacts a file delete actually found and removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileRemoval {
    pub blob: bool,
    pub sidecar: bool,
}

impl Database {
    // ========================================================================
    // File operations
    // ========================================================================

    pub fn files(&self) -> Mapper<GalleryFile> {
        self.mapper()
    }

    /// Register a file in a gallery. Idempotent by `file_id`: an existing row
    /// keeps its identity and its original gallery.
    ///
    /// `file_id` doubles as the blob key, so it must be a valid object key.
    pub async fn add_file(&self, gallery_id: Eid, file_id: &str) -> Result<Eid, StorageError> {
        validate_key(file_id)?;
        self.files()
            .get_or_create(&GalleryFile::entity(gallery_id, file_id))
            .await
    }

    /// Identity of the file row for an external file id.
    pub async fn file_eid(&self, file_id: &str) -> Result<Option<Eid>, StorageError> {
        Ok(self
            .files()
            .search(&[("file_id", Value::from(file_id))])
            .await?
            .and_then(|f| f.eid()))
    }

    pub async fn files_in_gallery(
        &self,
        gallery_id: Eid,
    ) -> Result<Vec<Entity<GalleryFile>>, StorageError> {
        self.files()
            .filter(&[("gallery_id", Value::from(gallery_id))])
            .await
    }

    /// Delete a file row and its blob artifacts: content blob first, then the
    /// metadata sidecar, then the row. Artifacts that are already missing are
    /// skipped, as are the artifacts of a row whose `file_id` is not a valid
    /// object key. Returns `None` when there is no row at `eid`.
    ///
    /// Not atomic: an error part way leaves the earlier steps applied.
    pub async fn delete_file(&self, eid: Eid) -> Result<Option<FileRemoval>, StorageError> {
        let Some(file) = self.files().get(eid).await? else {
            return Ok(None);
        };

        let mut removal = FileRemoval::default();
        let file_id = file.value_str("file_id").filter(|id| match validate_key(id) {
            Ok(()) => true,
            Err(e) => {
                warn!(eid, error = %e, "Not touching blobs of file with unusable id");
                false
            }
        });

        if let Some(file_id) = file_id {
            let blobs = self.blobs();

            if blobs.exists(&file_id).await? {
                blobs.delete(&file_id).await?;
                removal.blob = true;
            }

            let sidecar = sidecar_key(&file_id);
            if blobs.exists(&sidecar).await? {
                blobs.delete(&sidecar).await?;
                removal.sidecar = true;
            }
        }

        self.files().delete_eid(eid).await?;
        debug!(eid, blob = removal.blob, sidecar = removal.sidecar, "Deleted file");
        Ok(Some(removal))
    }

    /// Parsed metadata sidecar of the file at `eid`. `None` when the row or
    /// the sidecar does not exist.
    pub async fn file_metadata(&self, eid: Eid) -> Result<Option<Value>, StorageError> {
        let Some(file_id) = self
            .files()
            .get(eid)
            .await?
            .and_then(|f| f.value_str("file_id"))
        else {
            return Ok(None);
        };

        match self.blobs().get(&sidecar_key(&file_id)).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(ObjectStoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store a file's content blob and its metadata sidecar.
    pub async fn put_file_content(
        &self,
        file_id: &str,
        content: Bytes,
        metadata: &Value,
    ) -> Result<(), StorageError> {
        let sidecar = serde_json::to_vec(metadata)?;
        self.blobs().put(file_id, content).await?;
        self.blobs()
            .put(&sidecar_key(file_id), Bytes::from(sidecar))
            .await?;
        Ok(())
    }
}
