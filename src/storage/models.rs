use serde_json::Value;

use super::table::{Document, Eid};
use super::tables::{FILES, GALLERIES, USERS};
use crate::model::{Entity, FieldSpec, FieldType, Model};

fn document<const N: usize>(pairs: [(&str, Value); N]) -> Document {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// A chat group's gallery, keyed externally by the group id.
#[derive(Debug, Clone, Copy)]
pub struct Gallery;

impl Model for Gallery {
    const TABLE: &'static str = GALLERIES;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("tgid", FieldType::Int).primary(),
        FieldSpec::new("name", FieldType::Str),
    ];
}

impl Gallery {
    pub fn entity(tgid: i64, name: &str) -> Entity<Gallery> {
        Entity::from_parts(
            None,
            document([("tgid", Value::from(tgid)), ("name", Value::from(name))]),
        )
    }
}

/// A file posted to a gallery. `file_id` addresses its blob and sidecar.
#[derive(Debug, Clone, Copy)]
pub struct GalleryFile;

impl Model for GalleryFile {
    const TABLE: &'static str = FILES;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("gallery_id", FieldType::Int),
        FieldSpec::new("file_id", FieldType::Str).primary(),
    ];
}

impl GalleryFile {
    pub fn entity(gallery_id: Eid, file_id: &str) -> Entity<GalleryFile> {
        Entity::from_parts(
            None,
            document([
                ("gallery_id", Value::from(gallery_id)),
                ("file_id", Value::from(file_id)),
            ]),
        )
    }
}

/// A registered user, keyed externally by the chat user id.
///
/// `password_confirm` only exists to carry form input and is never stored.
#[derive(Debug, Clone, Copy)]
pub struct User;

impl Model for User {
    const TABLE: &'static str = USERS;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("tgid", FieldType::Int).primary(),
        FieldSpec::new("username", FieldType::Str),
        FieldSpec::new("password", FieldType::Str),
        FieldSpec::new("password_confirm", FieldType::Str).hidden(),
    ];
}

impl User {
    pub fn entity(tgid: i64) -> Entity<User> {
        Entity::from_parts(None, document([("tgid", Value::from(tgid))]))
    }
}
