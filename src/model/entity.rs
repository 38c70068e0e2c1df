use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;

use serde_json::Value;
use tracing::trace;

use super::field::{Field, FieldError};
use super::{Model, ModelError};
use crate::storage::{Document, Eid, Row};

/// Key under which the identity appears in form payloads.
pub const EID: &str = "eid";

/// One row's worth of declared fields for model `M`.
///
/// An entity is a transient value: load it, change it, save it or drop it.
/// `eid` is `None` until the first successful create and never changes after.
pub struct Entity<M: Model> {
    pub(super) eid: Option<Eid>,
    fields: Vec<Field>,
    pub(super) deleted: BTreeSet<&'static str>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Entity<M> {
    /// An unsaved entity with every declared field unset.
    pub fn new() -> Self {
        debug_assert!(
            M::FIELDS.iter().all(|f| f.name != EID),
            "{} declares the reserved field `{EID}`",
            M::TABLE
        );

        Self {
            eid: None,
            fields: M::FIELDS.iter().map(Field::new).collect(),
            deleted: BTreeSet::new(),
            _model: PhantomData,
        }
    }

    /// Build an entity from a document. Keys the schema does not declare are
    /// dropped.
    pub fn from_parts(eid: Option<Eid>, doc: Document) -> Self {
        let mut entity = Self::new();
        entity.eid = eid;
        for (key, value) in doc {
            match entity.field_mut(&key) {
                Some(field) => field.set(value),
                None => trace!(table = M::TABLE, field = %key, "ignoring undeclared field"),
            }
        }
        entity
    }

    /// Materialize a stored row. Each call yields an independent value.
    pub fn from_row(row: Row) -> Self {
        Self::from_parts(Some(row.eid), row.doc)
    }

    pub fn eid(&self) -> Option<Eid> {
        self.eid
    }

    pub fn is_persisted(&self) -> bool {
        self.eid.is_some()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name() == name)
    }

    /// Assign a raw value. It is not checked until the field is validated.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self, ModelError> {
        let field = self
            .field_mut(name)
            .ok_or_else(|| ModelError::UnknownField(name.to_string()))?;
        field.set(value.into());
        self.deleted.remove(name);
        Ok(self)
    }

    /// Builder form of [`Entity::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, ModelError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Remove a field's value and mark it for removal from the stored row on
    /// the next update.
    pub fn unset(&mut self, name: &str) -> Result<&mut Self, ModelError> {
        let field = self
            .field_mut(name)
            .ok_or_else(|| ModelError::UnknownField(name.to_string()))?;
        field.clear();
        let name = field.name();
        self.deleted.insert(name);
        Ok(self)
    }

    /// Fields unset since the entity was loaded or last updated.
    pub fn deleted_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.deleted.iter().copied()
    }

    /// Raw value as assigned.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.field(name).and_then(Field::raw)
    }

    /// Value coerced to the declared type, `None` if unset or invalid.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.field(name).and_then(|f| f.coerced().ok())
    }

    pub fn value_str(&self, name: &str) -> Option<String> {
        match self.value(name)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn value_i64(&self, name: &str) -> Option<i64> {
        self.value(name)?.as_i64()
    }

    /// Validate every field in place and report the ones that failed.
    pub fn validate(&mut self) -> Vec<FieldError> {
        self.fields
            .iter_mut()
            .filter_map(|f| f.validate().err())
            .collect()
    }

    /// Fields that hold a value which does not coerce. Unset fields are not
    /// included.
    pub fn invalid_fields(&self) -> Vec<FieldError> {
        self.fields
            .iter()
            .filter_map(|f| match f.coerced() {
                Err(e @ FieldError::Coercion { .. }) => Some(e),
                _ => None,
            })
            .collect()
    }

    /// Every field that currently validates, coerced. Invalid and unset fields
    /// are omitted.
    pub fn as_dict(&self) -> Document {
        self.collect_valid(|_| true)
    }

    /// The part of [`Entity::as_dict`] that is written to the table. Without
    /// `with_defaults`, fields holding no value are left out even if they
    /// declare a default, so a merge never overwrites stored values with one.
    pub(super) fn persisted(&self, with_defaults: bool) -> Document {
        self.collect_valid(|f| {
            !f.spec().hidden && (with_defaults || f.raw().is_some_and(|v| !v.is_null()))
        })
    }

    fn collect_valid(&self, keep: impl Fn(&Field) -> bool) -> Document {
        self.fields
            .iter()
            .filter(|f| keep(f))
            .filter_map(|f| f.coerced().ok().map(|v| (f.name().to_string(), v)))
            .collect()
    }

    /// Flat key -> raw value payload for forms and command arguments. Unset
    /// fields appear as null; the identity appears under `eid` once assigned.
    pub fn as_form(&self) -> BTreeMap<String, Value> {
        let mut form: BTreeMap<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name().to_string(), f.raw().cloned().unwrap_or(Value::Null)))
            .collect();
        if let Some(eid) = self.eid {
            form.insert(EID.to_string(), Value::from(eid));
        }
        form
    }

    /// Assign every declared key of a form payload. `eid` and undeclared keys
    /// (submit buttons and the like) are skipped.
    pub fn from_form<I, K, V>(&mut self, form: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in form {
            let key = key.as_ref();
            if key == EID || self.set(key, value).is_err() {
                trace!(table = M::TABLE, field = key, "skipping form key");
            }
        }
        self
    }

    /// Primary fields that validate, in declaration order.
    pub fn primary_criteria(&self) -> Vec<(&'static str, Value)> {
        self.fields
            .iter()
            .filter(|f| f.spec().primary)
            .filter_map(|f| f.coerced().ok().map(|v| (f.name(), v)))
            .collect()
    }
}

impl<M: Model> Default for Entity<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for Entity<M> {
    fn clone(&self) -> Self {
        Self {
            eid: self.eid,
            fields: self.fields.clone(),
            deleted: self.deleted.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> PartialEq for Entity<M> {
    fn eq(&self, other: &Self) -> bool {
        self.eid == other.eid && self.fields == other.fields && self.deleted == other.deleted
    }
}

impl<M: Model> fmt::Debug for Entity<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("table", &M::TABLE)
            .field("eid", &self.eid)
            .field("fields", &self.as_form())
            .finish()
    }
}
