//! Lead pipeline board: columns and the leads placed in them.
//!
//! # Invariants
//! - Column positions form `0..n-1` per owner; lead positions form `0..n-1`
//!   per column.
//! - At most one column per owner has `is_default = true`.
//! - Column membership and position of a lead change only through moves.

use crate::model::schema::{Dependent, FieldSpec, FieldType, ListOrder, OnDelete, Reference};
use crate::model::validation::{check_email, check_phone, optional_text};
use crate::model::{
    timestamp, Creatable, Entity, EntityKind, Patch, RecordId, Timestamp, Updatable,
    ValidationError,
};
use serde::{Deserialize, Serialize};

/// Requested position meaning "after the last sibling".
pub const APPEND_POSITION: i64 = i64::MAX;

/// Board column grouping leads by pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadColumn {
    pub id: RecordId,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub position: i64,
    pub is_default: bool,
    #[serde(with = "timestamp")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp")]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLeadColumnData {
    pub name: String,
    pub color: String,
    /// Target slot; appended when absent or past the end.
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateLeadColumnData {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

const LEAD_COLUMN_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("id", FieldType::Id).required(),
    FieldSpec::new("user_id", FieldType::Text).required(),
    FieldSpec::new("name", FieldType::Text).required().mutable(),
    FieldSpec::new("color", FieldType::Text).required().mutable(),
    FieldSpec::new("position", FieldType::Integer).required(),
    FieldSpec::new("is_default", FieldType::Bool)
        .required()
        .mutable(),
    FieldSpec::new("created_at", FieldType::Timestamp).required(),
    FieldSpec::new("updated_at", FieldType::Timestamp).required(),
];

const LEAD_COLUMN_DEPENDENTS: &[Dependent] = &[Dependent {
    kind: EntityKind::Lead,
    field: "column_id",
    on_delete: OnDelete::Restrict,
}];

impl Entity for LeadColumn {
    const KIND: EntityKind = EntityKind::LeadColumn;
    const SCHEMA: &'static [FieldSpec] = LEAD_COLUMN_SCHEMA;
    const ORDER: ListOrder = ListOrder::Position { scope: None };

    fn id(&self) -> RecordId {
        self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: Timestamp) {
        self.updated_at = at;
    }

    fn dependents() -> &'static [Dependent] {
        LEAD_COLUMN_DEPENDENTS
    }

    fn position(&self) -> Option<i64> {
        Some(self.position)
    }

    fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

impl Creatable for LeadColumn {
    type Create = CreateLeadColumnData;

    fn from_create(id: RecordId, user_id: &str, now: Timestamp, data: CreateLeadColumnData) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            name: data.name,
            color: data.color,
            position: data.position.unwrap_or(APPEND_POSITION),
            is_default: data.is_default,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Updatable for LeadColumn {
    type Update = UpdateLeadColumnData;

    fn update_target(update: &UpdateLeadColumnData) -> RecordId {
        update.id
    }

    fn merge(&mut self, update: UpdateLeadColumnData) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(color) = update.color {
            self.color = color;
        }
        if let Some(is_default) = update.is_default {
            self.is_default = is_default;
        }
    }
}

/// Sales opportunity card on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: RecordId,
    pub user_id: String,
    pub column_id: RecordId,
    pub name: String,
    pub position: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub value: Option<f64>,
    pub notes: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp")]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLeadData {
    pub column_id: RecordId,
    pub name: String,
    /// Target slot in the column; appended when absent or past the end.
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateLeadData {
    pub fn new(column_id: RecordId, name: impl Into<String>) -> Self {
        Self {
            column_id,
            name: name.into(),
            position: None,
            email: None,
            phone: None,
            company: None,
            value: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateLeadData {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub email: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub phone: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub company: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub value: Patch<f64>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub notes: Patch<String>,
}

/// Structural relocation of a lead to a column slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveLeadData {
    pub id: RecordId,
    pub column_id: RecordId,
    pub position: i64,
}

const LEAD_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("id", FieldType::Id).required(),
    FieldSpec::new("user_id", FieldType::Text).required(),
    FieldSpec::new("column_id", FieldType::Id).required(),
    FieldSpec::new("name", FieldType::Text).required().mutable(),
    FieldSpec::new("position", FieldType::Integer).required(),
    FieldSpec::new("email", FieldType::Text).mutable(),
    FieldSpec::new("phone", FieldType::Text).mutable(),
    FieldSpec::new("company", FieldType::Text).mutable(),
    FieldSpec::new("value", FieldType::Real).mutable(),
    FieldSpec::new("notes", FieldType::Text).mutable(),
    FieldSpec::new("created_at", FieldType::Timestamp).required(),
    FieldSpec::new("updated_at", FieldType::Timestamp).required(),
];

impl Entity for Lead {
    const KIND: EntityKind = EntityKind::Lead;
    const SCHEMA: &'static [FieldSpec] = LEAD_SCHEMA;
    const ORDER: ListOrder = ListOrder::Position {
        scope: Some("column_id"),
    };

    fn id(&self) -> RecordId {
        self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: Timestamp) {
        self.updated_at = at;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(email) = self.email.as_deref() {
            check_email("email", email)?;
        }
        if let Some(phone) = self.phone.as_deref() {
            check_phone("phone", phone)?;
        }
        optional_text("company", self.company.as_deref())?;
        optional_text("notes", self.notes.as_deref())?;
        if self.value.is_some_and(|value| !value.is_finite()) {
            return Err(ValidationError::NonFiniteNumber("value"));
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference {
            field: "column_id",
            kind: EntityKind::LeadColumn,
            id: self.column_id,
        }]
    }

    fn position(&self) -> Option<i64> {
        Some(self.position)
    }

    fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

impl Creatable for Lead {
    type Create = CreateLeadData;

    fn from_create(id: RecordId, user_id: &str, now: Timestamp, data: CreateLeadData) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            column_id: data.column_id,
            name: data.name,
            position: data.position.unwrap_or(APPEND_POSITION),
            email: data.email,
            phone: data.phone,
            company: data.company,
            value: data.value,
            notes: data.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Updatable for Lead {
    type Update = UpdateLeadData;

    fn update_target(update: &UpdateLeadData) -> RecordId {
        update.id
    }

    fn merge(&mut self, update: UpdateLeadData) {
        if let Some(name) = update.name {
            self.name = name;
        }
        update.email.apply_to(&mut self.email);
        update.phone.apply_to(&mut self.phone);
        update.company.apply_to(&mut self.company);
        update.value.apply_to(&mut self.value);
        update.notes.apply_to(&mut self.notes);
    }
}
