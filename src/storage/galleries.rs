use serde_json::Value;
use tracing::info;

use super::db::{Database, StorageError};
use super::files::FileRemoval;
use super::models::Gallery;
use super::table::Eid;
use crate::model::{Entity, Mapper};

/// What a gallery cascade removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CascadeReport {
    pub files: usize,
    pub blobs: usize,
    pub sidecars: usize,
}

impl CascadeReport {
    fn record(&mut self, removal: FileRemoval) {
        self.files += 1;
        self.blobs += usize::from(removal.blob);
        self.sidecars += usize::from(removal.sidecar);
    }
}

impl Database {
    // ========================================================================
    // Gallery operations
    // ========================================================================

    pub fn galleries(&self) -> Mapper<Gallery> {
        self.mapper()
    }

    /// Create the gallery for `tgid`, or return the identity of the one that
    /// already exists. An existing gallery keeps its name.
    pub async fn create_gallery(&self, tgid: i64, name: &str) -> Result<Eid, StorageError> {
        self.galleries()
            .get_or_create(&Gallery::entity(tgid, name))
            .await
    }

    pub async fn gallery_by_tgid(
        &self,
        tgid: i64,
    ) -> Result<Option<Entity<Gallery>>, StorageError> {
        self.galleries().search(&[("tgid", Value::from(tgid))]).await
    }

    pub async fn gallery_eid(&self, tgid: i64) -> Result<Option<Eid>, StorageError> {
        Ok(self.gallery_by_tgid(tgid).await?.and_then(|g| g.eid()))
    }

    pub async fn gallery(&self, eid: Eid) -> Result<Option<Entity<Gallery>>, StorageError> {
        self.galleries().get(eid).await
    }

    /// Delete every file of the gallery for `tgid`, with their blobs and
    /// sidecars. The gallery row itself is left in place; see
    /// [`Database::remove_gallery`]. Returns `None` when no gallery has `tgid`.
    ///
    /// The cascade is not atomic. If a file delete fails, the files handled
    /// before it stay deleted and the error is returned.
    pub async fn delete_gallery(&self, tgid: i64) -> Result<Option<CascadeReport>, StorageError> {
        let Some(gallery_id) = self.gallery_eid(tgid).await? else {
            return Ok(None);
        };

        let mut report = CascadeReport::default();
        for file in self.files_in_gallery(gallery_id).await? {
            let Some(eid) = file.eid() else { continue };
            if let Some(removal) = self.delete_file(eid).await? {
                report.record(removal);
            }
        }

        info!(
            tgid,
            gallery_id,
            files = report.files,
            blobs = report.blobs,
            sidecars = report.sidecars,
            "Cascaded gallery delete"
        );
        Ok(Some(report))
    }

    /// Run the file cascade for `tgid` and then remove the gallery row.
    pub async fn remove_gallery(&self, tgid: i64) -> Result<Option<CascadeReport>, StorageError> {
        let Some(gallery_id) = self.gallery_eid(tgid).await? else {
            return Ok(None);
        };

        let report = self.delete_gallery(tgid).await?.unwrap_or_default();
        self.galleries().delete_eid(gallery_id).await?;
        Ok(Some(report))
    }
}
