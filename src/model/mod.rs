//! Typed entity mapping over schema-less document tables.
//!
//! A [`Model`] declares a table name and a fixed list of [`FieldSpec`]s.
//! [`Entity`] holds one row's values for that schema and tracks explicit field
//! removals; [`Mapper`] moves entities in and out of the table.

mod entity;
mod field;
mod mapper;
mod query;

pub use entity::{Entity, EID};
pub use field::{Field, FieldError, FieldSpec, FieldType, Scalar};
pub use mapper::Mapper;
pub use query::Query;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Unknown field: {0}")]
    UnknownField(String),
}

/// Declared schema of an entity type.
pub trait Model: Send + Sync + 'static {
    /// Backing table name.
    const TABLE: &'static str;
    /// Declared fields, in serialization order. `eid` is reserved.
    const FIELDS: &'static [FieldSpec];

    fn field_spec(name: &str) -> Option<&'static FieldSpec> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }
}
