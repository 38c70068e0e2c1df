use serde_json::Value;

use super::db::{Database, StorageError};
use super::models::User;
use super::table::Eid;
use crate::model::{Entity, Mapper};

impl Database {
    // ========================================================================
    // User operations
    // ========================================================================

    pub fn users(&self) -> Mapper<User> {
        self.mapper()
    }

    /// Create the user row for `tgid` unless one exists.
    pub async fn register_user(&self, tgid: i64) -> Result<Eid, StorageError> {
        self.users().get_or_create(&User::entity(tgid)).await
    }

    pub async fn user_by_tgid(&self, tgid: i64) -> Result<Option<Entity<User>>, StorageError> {
        self.users().search(&[("tgid", Value::from(tgid))]).await
    }
}
