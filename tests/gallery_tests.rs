use std::sync::Arc;

use bytes::Bytes;
use gallery_store::object_store::{LocalStore, ObjectStore, ObjectStoreError};
use gallery_store::storage::{
    CascadeReport, Database, FileRemoval, ObjectTableStorage, StorageError,
};
use serde_json::json;

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_local(dir.path().join("db"), dir.path().join("files")).unwrap();
    (dir, db)
}

async fn store_blob(db: &Database, file_id: &str) {
    db.put_file_content(file_id, Bytes::from("jpeg"), &json!({"file_id": file_id, "size": 4}))
        .await
        .unwrap();
}

async fn blob_exists(db: &Database, key: &str) -> bool {
    db.blobs().exists(key).await.unwrap()
}

// ============================================================================
// Galleries
// ============================================================================

#[tokio::test]
async fn test_create_gallery_is_idempotent() {
    let (_dir, db) = test_db();

    let first = db.create_gallery(100, "G1").await.unwrap();
    let again = db.create_gallery(100, "ignored").await.unwrap();
    assert_eq!(first, 1);
    assert_eq!(again, 1);

    let galleries = db.galleries().all().await.unwrap();
    assert_eq!(galleries.len(), 1);
    assert_eq!(galleries[0].value_str("name").as_deref(), Some("G1"));
}

#[tokio::test]
async fn test_gallery_lookups() {
    let (_dir, db) = test_db();
    let eid = db.create_gallery(-1001, "Group").await.unwrap();

    assert_eq!(db.gallery_eid(-1001).await.unwrap(), Some(eid));
    assert_eq!(db.gallery_eid(42).await.unwrap(), None);

    let gallery = db.gallery(eid).await.unwrap().unwrap();
    assert_eq!(gallery.value_i64("tgid"), Some(-1001));
    assert!(db.gallery(eid + 1).await.unwrap().is_none());

    let by_tgid = db.gallery_by_tgid(-1001).await.unwrap().unwrap();
    assert_eq!(by_tgid.eid(), Some(eid));
}

#[tokio::test]
async fn test_delete_gallery_cascades_files_and_blobs() {
    let (_dir, db) = test_db();
    let gallery = db.create_gallery(100, "G1").await.unwrap();
    let other = db.create_gallery(200, "G2").await.unwrap();

    let f1 = db.add_file(gallery, "f1").await.unwrap();
    let f2 = db.add_file(gallery, "f2").await.unwrap();
    let kept = db.add_file(other, "kept").await.unwrap();
    for file_id in ["f1", "f2", "kept"] {
        store_blob(&db, file_id).await;
    }

    let report = db.delete_gallery(100).await.unwrap().unwrap();
    assert_eq!(
        report,
        CascadeReport {
            files: 2,
            blobs: 2,
            sidecars: 2,
        }
    );

    for (eid, file_id) in [(f1, "f1"), (f2, "f2")] {
        assert!(db.files().get(eid).await.unwrap().is_none());
        assert!(!blob_exists(&db, file_id).await);
        assert!(!blob_exists(&db, &format!("{file_id}.json")).await);
    }

    // Other galleries are untouched
    assert!(db.files().get(kept).await.unwrap().is_some());
    assert!(blob_exists(&db, "kept").await);

    // The gallery row itself is left for the caller to remove
    assert_eq!(db.gallery_eid(100).await.unwrap(), Some(gallery));
}

#[tokio::test]
async fn test_delete_gallery_skips_missing_artifacts() {
    let (_dir, db) = test_db();
    let gallery = db.create_gallery(100, "G1").await.unwrap();
    db.add_file(gallery, "with-blob").await.unwrap();
    db.add_file(gallery, "bare").await.unwrap();
    store_blob(&db, "with-blob").await;
    db.blobs().delete("with-blob.json").await.unwrap();

    let report = db.delete_gallery(100).await.unwrap().unwrap();
    assert_eq!(
        report,
        CascadeReport {
            files: 2,
            blobs: 1,
            sidecars: 0,
        }
    );
    assert!(db.files().all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_unknown_gallery_is_noop() {
    let (_dir, db) = test_db();
    let gallery = db.create_gallery(100, "G1").await.unwrap();
    db.add_file(gallery, "f1").await.unwrap();

    assert_eq!(db.delete_gallery(999).await.unwrap(), None);
    assert_eq!(db.files().all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove_gallery_deletes_row_after_cascade() {
    let (_dir, db) = test_db();
    let gallery = db.create_gallery(100, "G1").await.unwrap();
    db.add_file(gallery, "f1").await.unwrap();
    store_blob(&db, "f1").await;

    let report = db.remove_gallery(100).await.unwrap().unwrap();
    assert_eq!(report.files, 1);
    assert_eq!(db.gallery_eid(100).await.unwrap(), None);
    assert!(db.files().all().await.unwrap().is_empty());

    assert_eq!(db.remove_gallery(100).await.unwrap(), None);

    // A recreated gallery gets a fresh identity
    assert_eq!(db.create_gallery(100, "G1").await.unwrap(), gallery + 1);
}

// ============================================================================
// Files
// ============================================================================

#[tokio::test]
async fn test_file_lifecycle_example() {
    let (_dir, db) = test_db();

    assert_eq!(db.create_gallery(100, "G1").await.unwrap(), 1);
    assert_eq!(db.create_gallery(100, "ignored").await.unwrap(), 1);
    assert_eq!(db.add_file(1, "abc").await.unwrap(), 1);
    store_blob(&db, "abc").await;
    assert!(blob_exists(&db, "abc").await);
    assert!(blob_exists(&db, "abc.json").await);

    let removal = db.delete_file(1).await.unwrap();
    assert_eq!(
        removal,
        Some(FileRemoval {
            blob: true,
            sidecar: true,
        })
    );
    assert!(!blob_exists(&db, "abc").await);
    assert!(!blob_exists(&db, "abc.json").await);
    assert!(db.files().get(1).await.unwrap().is_none());

    assert_eq!(db.delete_file(1).await.unwrap(), None);
}

#[tokio::test]
async fn test_add_file_is_idempotent() {
    let (_dir, db) = test_db();

    let first = db.add_file(1, "abc").await.unwrap();
    let again = db.add_file(2, "abc").await.unwrap();
    assert_eq!(first, again);

    let file = db.files().get(first).await.unwrap().unwrap();
    assert_eq!(file.value_i64("gallery_id"), Some(1));
    assert_eq!(db.file_eid("abc").await.unwrap(), Some(first));
    assert_eq!(db.file_eid("nope").await.unwrap(), None);
}

#[tokio::test]
async fn test_add_file_rejects_unusable_ids() {
    let (dir, db) = test_db();
    let gallery = db.create_gallery(100, "G1").await.unwrap();

    for file_id in ["", "../db/gallery", "a/b"] {
        assert!(matches!(
            db.add_file(gallery, file_id).await,
            Err(StorageError::ObjectStore(ObjectStoreError::InvalidKey(_)))
        ));
    }
    assert!(db.files().all().await.unwrap().is_empty());

    assert!(db
        .put_file_content("../db/gallery", Bytes::from("x"), &json!({}))
        .await
        .is_err());
    assert!(dir.path().join("db").join("gallery.json").exists());
    assert_eq!(db.galleries().all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_files_in_gallery() {
    let (_dir, db) = test_db();
    db.add_file(1, "a").await.unwrap();
    db.add_file(2, "b").await.unwrap();
    db.add_file(1, "c").await.unwrap();

    let files = db.files_in_gallery(1).await.unwrap();
    let ids: Vec<_> = files
        .iter()
        .map(|f| f.value_str("file_id").unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert!(db.files_in_gallery(3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_metadata() {
    let (_dir, db) = test_db();
    let eid = db.add_file(1, "meta").await.unwrap();
    assert_eq!(db.file_metadata(eid).await.unwrap(), None);

    store_blob(&db, "meta").await;
    assert_eq!(
        db.file_metadata(eid).await.unwrap(),
        Some(json!({"file_id": "meta", "size": 4}))
    );
}

#[tokio::test]
async fn test_file_metadata_corrupt_sidecar_is_an_error() {
    let (_dir, db) = test_db();
    let eid = db.add_file(1, "broken").await.unwrap();
    db.blobs()
        .put("broken.json", Bytes::from("{oops"))
        .await
        .unwrap();

    assert!(db.file_metadata(eid).await.is_err());
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_register_user_is_idempotent() {
    let (_dir, db) = test_db();

    let eid = db.register_user(555).await.unwrap();
    assert_eq!(db.register_user(555).await.unwrap(), eid);

    let mut user = db.user_by_tgid(555).await.unwrap().unwrap();
    user.set("username", "alice")
        .unwrap()
        .set("password", "hunter2")
        .unwrap()
        .set("password_confirm", "hunter2")
        .unwrap();
    db.users().save(&mut user).await.unwrap();

    let stored = db.users().table().get(eid).await.unwrap().unwrap();
    assert_eq!(stored.doc["username"], json!("alice"));
    assert_eq!(stored.doc["password"], json!("hunter2"));
    assert!(!stored.doc.contains_key("password_confirm"));
    assert!(db.user_by_tgid(1).await.unwrap().is_none());
}

// ============================================================================
// Object-storage tables
// ============================================================================

#[tokio::test]
async fn test_aggregates_over_object_table_storage() {
    let dir = tempfile::tempdir().unwrap();
    let bucket: Arc<dyn ObjectStore> =
        Arc::new(LocalStore::new(dir.path().join("tables")).unwrap());
    let blobs = Arc::new(LocalStore::new(dir.path().join("blobs")).unwrap());
    let db = Database::new(Arc::new(ObjectTableStorage::new(bucket)), blobs);

    let gallery = db.create_gallery(7, "Remote").await.unwrap();
    let file = db.add_file(gallery, "r1").await.unwrap();
    store_blob(&db, "r1").await;

    let report = db.delete_gallery(7).await.unwrap().unwrap();
    assert_eq!(report.files, 1);
    assert!(db.files().get(file).await.unwrap().is_none());
    assert!(dir.path().join("tables").join("gallery.json").exists());
    assert!(!dir.path().join("blobs").join("r1").exists());
}
