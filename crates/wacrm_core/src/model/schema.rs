//! Per-entity schema descriptors consumed by the façade and record stores.
//!
//! # Invariants
//! - Every serialized record field appears exactly once in its schema.
//! - `id`, `user_id` and `created_at` are never mutable.

use crate::model::errors::ValidationError;
use crate::model::{Entity, EntityKind};
use serde_json::{Map, Value};

/// Storage type of one persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Id,
    Timestamp,
    Integer,
    Real,
    Bool,
}

/// Schema entry for one persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    /// Must be present, and non-blank for text.
    pub required: bool,
    /// May change through an update payload.
    pub mutable: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
            mutable: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn mutable(mut self) -> Self {
        self.mutable = true;
        self
    }
}

/// Default list ordering of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    /// Dense `position` key, renumbered within the scope on every write.
    ///
    /// `scope` names the grouping field; `None` scopes by owner only.
    Position { scope: Option<&'static str> },
    /// `created_at` ascending.
    CreatedAt,
}

/// Foreign key held by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub kind: EntityKind,
    pub id: crate::model::RecordId,
}

/// Delete behavior for records pointing at a deleted parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    Restrict,
}

/// Child entity whose `field` references the parent id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependent {
    pub kind: EntityKind,
    pub field: &'static str,
    pub on_delete: OnDelete,
}

pub fn field_spec<E: Entity>(name: &str) -> Option<&'static FieldSpec> {
    E::SCHEMA.iter().find(|spec| spec.name == name)
}

/// Serializes a record into its persisted field map.
pub fn to_fields<E: Entity>(record: &E) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "{} did not serialize to an object: {other}",
            E::KIND
        ))),
    }
}

/// Checks schema-level required fields on a serialized record.
pub fn check_required<E: Entity>(fields: &Map<String, Value>) -> Result<(), ValidationError> {
    for spec in E::SCHEMA.iter().filter(|spec| spec.required) {
        match fields.get(spec.name) {
            None | Some(Value::Null) => return Err(ValidationError::MissingField(spec.name)),
            Some(Value::String(text)) if text.trim().is_empty() => {
                return Err(ValidationError::MissingField(spec.name));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Rejects any difference between `before` and `after` outside mutable fields.
///
/// `updated_at` is owned by the store and ignored here.
pub fn check_mutations<E: Entity>(
    before: &Map<String, Value>,
    after: &Map<String, Value>,
) -> Result<(), ValidationError> {
    for spec in E::SCHEMA {
        if spec.mutable || spec.name == "updated_at" {
            continue;
        }
        if before.get(spec.name) != after.get(spec.name) {
            return Err(ValidationError::ImmutableField(spec.name.to_string()));
        }
    }
    Ok(())
}
