use std::collections::BTreeSet;
use std::marker::PhantomData;

use serde_json::Value;
use tracing::{debug, warn};

use super::entity::Entity;
use super::field::Field;
use super::query::Query;
use super::Model;
use crate::storage::{Eid, StorageError, Table};

/// Reads and writes entities of model `M` in its table.
///
/// Absence is never an error: lookups return `None` or an empty list, and
/// removing something already gone is a no-op. Field values that fail
/// validation are left out of writes without being reported; use
/// [`Entity::invalid_fields`] to find them.
pub struct Mapper<M: Model> {
    table: Table,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Mapper<M> {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            _model: PhantomData,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Resolve a caller-supplied criterion against the schema. `None` when the
    /// field is undeclared or the value does not coerce.
    fn criterion(name: &str, raw: &Value) -> Option<(&'static str, Value)> {
        let spec = M::field_spec(name)?;
        match Field::with_value(spec, raw.clone()).coerced() {
            Ok(value) => Some((spec.name, value)),
            Err(e) => {
                debug!(table = M::TABLE, error = %e, "skipping criterion");
                None
            }
        }
    }

    pub async fn all(&self) -> Result<Vec<Entity<M>>, StorageError> {
        Ok(self
            .table
            .all()
            .await?
            .into_iter()
            .map(Entity::from_row)
            .collect())
    }

    /// Union of the rows matching any criterion, without duplicate identities.
    /// Criteria whose value does not validate are skipped.
    pub async fn filter(
        &self,
        criteria: &[(&str, Value)],
    ) -> Result<Vec<Entity<M>>, StorageError> {
        let mut seen = BTreeSet::new();
        let mut found = Vec::new();

        for (name, raw) in criteria {
            let Some((field, value)) = Self::criterion(name, raw) else {
                continue;
            };
            for row in self.table.search(field, &value).await? {
                if seen.insert(row.eid) {
                    found.push(Entity::from_row(row));
                }
            }
        }

        Ok(found)
    }

    pub async fn get(&self, eid: Eid) -> Result<Option<Entity<M>>, StorageError> {
        Ok(self.table.get(eid).await?.map(Entity::from_row))
    }

    /// First row matching a single criterion.
    ///
    /// Criteria are tried one at a time in the given order, skipping those
    /// whose value does not validate. The first criterion with a match decides
    /// the result; predicates are never combined. Use [`Mapper::query`] for
    /// AND/OR lookups.
    pub async fn search(
        &self,
        criteria: &[(&str, Value)],
    ) -> Result<Option<Entity<M>>, StorageError> {
        for (name, raw) in criteria {
            let Some((field, value)) = Self::criterion(name, raw) else {
                continue;
            };
            if let Some(row) = self.table.search(field, &value).await?.into_iter().next() {
                return Ok(Some(Entity::from_row(row)));
            }
        }

        Ok(None)
    }

    /// Rows matching an explicit AND/OR combination of equality predicates.
    pub async fn query(&self, query: &Query) -> Result<Vec<Entity<M>>, StorageError> {
        let bound = query.bind::<M>();
        Ok(self
            .table
            .all()
            .await?
            .into_iter()
            .filter(|row| bound.matches(&row.doc))
            .map(Entity::from_row)
            .collect())
    }

    /// Insert the entity's valid, non-hidden fields as a new row.
    ///
    /// The entity itself is not modified; [`Mapper::save`] records the
    /// returned identity.
    pub async fn create(&self, entity: &Entity<M>) -> Result<Eid, StorageError> {
        self.table.insert(entity.persisted(true)).await
    }

    /// Merge the entity's valid fields into its stored row and remove the
    /// fields it has unset. Returns the number of rows updated, `0` for an
    /// entity that was never saved or whose row is gone.
    ///
    /// Field removal is best-effort: a field already missing is fine, and a
    /// failed removal is logged and skipped.
    pub async fn update(&self, entity: &mut Entity<M>) -> Result<usize, StorageError> {
        let Some(eid) = entity.eid else {
            return Ok(0);
        };

        for &field in &entity.deleted {
            if let Err(e) = self.table.remove_field(field, eid).await {
                warn!(table = M::TABLE, eid, field, error = %e, "failed to remove field");
            }
        }

        // Removals are kept pending until the merge lands, so a retry redoes them
        let updated = self.table.update(entity.persisted(false), eid).await?;
        entity.deleted.clear();
        Ok(updated)
    }

    /// Update a persisted entity, or create it and assign its identity.
    pub async fn save(&self, entity: &mut Entity<M>) -> Result<Eid, StorageError> {
        match entity.eid {
            Some(eid) => {
                self.update(entity).await?;
                Ok(eid)
            }
            None => {
                let eid = self.create(entity).await?;
                entity.eid = Some(eid);
                Ok(eid)
            }
        }
    }

    /// Remove the entity's row. `false` if unsaved or already gone.
    pub async fn delete(&self, entity: &Entity<M>) -> Result<bool, StorageError> {
        match entity.eid {
            Some(eid) => self.delete_eid(eid).await,
            None => Ok(false),
        }
    }

    pub async fn delete_eid(&self, eid: Eid) -> Result<bool, StorageError> {
        self.table.remove(eid).await
    }

    /// Identity of the row sharing the entity's primary key, inserting the
    /// entity first if there is none. Primary fields are looked up one at a
    /// time as in [`Mapper::search`]; an entity with no valid primary field is
    /// always inserted.
    pub async fn get_or_create(&self, entity: &Entity<M>) -> Result<Eid, StorageError> {
        let criteria = entity.primary_criteria();
        if let Some(existing) = self.search(&criteria).await? {
            if let Some(eid) = existing.eid() {
                debug!(table = M::TABLE, eid, "primary key already present");
                return Ok(eid);
            }
        }

        self.create(entity).await
    }
}

impl<M: Model> Clone for Mapper<M> {
    fn clone(&self) -> Self {
        Self::new(self.table.clone())
    }
}
