//! Shared helpers for unit tests.

use crate::storage::Database;

/// A database with local JSON tables and blobs inside `temp_dir`.
pub fn test_db(temp_dir: &tempfile::TempDir) -> Database {
    Database::open_local(temp_dir.path().join("db"), temp_dir.path().join("files"))
        .expect("Failed to open test database")
}
