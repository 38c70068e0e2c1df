use bytes::Bytes;
use gallery_store::object_store::{
    sidecar_key, validate_key, LocalStore, ObjectStore, ObjectStoreError,
};

#[tokio::test]
async fn test_local_store_put_get() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let data = Bytes::from("photo bytes");
    store.put("AgADBAAD", data.clone()).await.unwrap();

    assert_eq!(store.get("AgADBAAD").await.unwrap(), data);
    assert!(dir.path().join("AgADBAAD").exists());
}

#[tokio::test]
async fn test_local_store_exists() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    assert!(!store.exists("missing").await.unwrap());

    store.put("present", Bytes::from("data")).await.unwrap();
    assert!(store.exists("present").await.unwrap());
}

#[tokio::test]
async fn test_local_store_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store.put("to-delete", Bytes::from("data")).await.unwrap();
    store.delete("to-delete").await.unwrap();
    assert!(!store.exists("to-delete").await.unwrap());

    // Deleting again is fine
    store.delete("to-delete").await.unwrap();
}

#[tokio::test]
async fn test_local_store_get_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    assert!(matches!(
        store.get("missing").await,
        Err(ObjectStoreError::NotFound(key)) if key == "missing"
    ));
}

#[tokio::test]
async fn test_local_store_creates_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let store = LocalStore::new(&nested).unwrap();

    assert!(nested.is_dir());
    assert_eq!(store.base_path(), nested.as_path());
}

#[tokio::test]
async fn test_local_store_rejects_keys_outside_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("files");
    let store = LocalStore::new(&base).unwrap();
    std::fs::write(dir.path().join("gallery.json"), "{}").unwrap();

    for key in ["", ".", "..", "../gallery.json", "sub/key", "sub\\key", "/etc/passwd"] {
        assert!(
            matches!(store.exists(key).await, Err(ObjectStoreError::InvalidKey(_))),
            "exists accepted {key:?}"
        );
        assert!(matches!(
            store.delete(key).await,
            Err(ObjectStoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.put(key, Bytes::from("x")).await,
            Err(ObjectStoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get(key).await,
            Err(ObjectStoreError::InvalidKey(_))
        ));
    }

    // Nothing outside the base directory was touched
    assert!(dir.path().join("gallery.json").exists());
}

#[test]
fn test_validate_key() {
    assert!(validate_key("AgADBAAD").is_ok());
    assert!(validate_key("abc.json").is_ok());
    assert!(validate_key("a.b-c_d").is_ok());
    assert!(validate_key("").is_err());
    assert!(validate_key("a/../b").is_err());
}

#[test]
fn test_sidecar_key() {
    assert_eq!(sidecar_key("abc"), "abc.json");
}
