use serde_json::Value;

use super::field::Field;
use super::Model;
use crate::storage::Document;

/// Explicit equality predicate combinators.
///
/// Each `Eq` value is coerced to the field's declared type before comparing.
/// A value that does not coerce, or a field the model does not declare,
/// matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Eq(String, Value),
    /// Every sub-query matches. Empty matches all rows.
    All(Vec<Query>),
    /// At least one sub-query matches. Empty matches no rows.
    Any(Vec<Query>),
}

impl Query {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Eq(field.into(), value.into())
    }

    pub fn and(self, other: Query) -> Self {
        match self {
            Query::All(mut parts) => {
                parts.push(other);
                Query::All(parts)
            }
            q => Query::All(vec![q, other]),
        }
    }

    pub fn or(self, other: Query) -> Self {
        match self {
            Query::Any(mut parts) => {
                parts.push(other);
                Query::Any(parts)
            }
            q => Query::Any(vec![q, other]),
        }
    }

    /// Resolve field names and coerce values against `M`'s schema.
    pub(super) fn bind<M: Model>(&self) -> Bound {
        match self {
            Query::Eq(name, raw) => Bound::Eq(
                name.clone(),
                M::field_spec(name)
                    .and_then(|spec| Field::with_value(spec, raw.clone()).coerced().ok()),
            ),
            Query::All(parts) => Bound::All(parts.iter().map(Query::bind::<M>).collect()),
            Query::Any(parts) => Bound::Any(parts.iter().map(Query::bind::<M>).collect()),
        }
    }
}

pub(super) enum Bound {
    Eq(String, Option<Value>),
    All(Vec<Bound>),
    Any(Vec<Bound>),
}

impl Bound {
    pub(super) fn matches(&self, doc: &Document) -> bool {
        match self {
            Bound::Eq(name, Some(value)) => doc.get(name) == Some(value),
            Bound::Eq(_, None) => false,
            Bound::All(parts) => parts.iter().all(|p| p.matches(doc)),
            Bound::Any(parts) => parts.iter().any(|p| p.matches(doc)),
        }
    }
}
