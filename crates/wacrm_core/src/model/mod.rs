//! Owner-scoped CRM record model.
//!
//! # Responsibility
//! - Define the persisted shape of every entity and its create/update payloads.
//! - Describe each entity through a static schema used by generic CRUD code.
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId` and owned by one `user_id`.
//! - `created_at`/`updated_at` are assigned by the store, never by callers.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod contact;
pub mod errors;
pub mod lead;
pub mod patch;
pub mod quick_reply;
pub mod scheduled_message;
pub mod schema;
pub mod timestamp;
pub mod validation;

pub use errors::{ConflictError, ValidationError};
pub use patch::Patch;
pub use schema::{Dependent, FieldSpec, FieldType, ListOrder, OnDelete, Reference};
pub use timestamp::Timestamp;

/// Stable identifier of every record.
pub type RecordId = Uuid;

/// Entity family, used for storage routing and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Contact,
    ContactList,
    ContactListMember,
    LeadColumn,
    Lead,
    QuickReply,
    ScheduledMessage,
}

impl EntityKind {
    /// Stable snake_case name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::ContactList => "contact_list",
            Self::ContactListMember => "contact_list_member",
            Self::LeadColumn => "lead_column",
            Self::Lead => "lead",
            Self::QuickReply => "quick_reply",
            Self::ScheduledMessage => "scheduled_message",
        }
    }

    /// Persisted schema of this entity family.
    pub fn schema(self) -> &'static [FieldSpec] {
        match self {
            Self::Contact => <contact::Contact as Entity>::SCHEMA,
            Self::ContactList => <contact::ContactList as Entity>::SCHEMA,
            Self::ContactListMember => <contact::ContactListMember as Entity>::SCHEMA,
            Self::LeadColumn => <lead::LeadColumn as Entity>::SCHEMA,
            Self::Lead => <lead::Lead as Entity>::SCHEMA,
            Self::QuickReply => <quick_reply::QuickReply as Entity>::SCHEMA,
            Self::ScheduledMessage => <scheduled_message::ScheduledMessage as Entity>::SCHEMA,
        }
    }

    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::Contact => "contacts",
            Self::ContactList => "contact_lists",
            Self::ContactListMember => "contact_list_members",
            Self::LeadColumn => "lead_columns",
            Self::Lead => "leads",
            Self::QuickReply => "quick_replies",
            Self::ScheduledMessage => "scheduled_messages",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted, owner-scoped record.
///
/// Serialization must produce exactly the fields listed in `SCHEMA`, using
/// the persisted names.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    const KIND: EntityKind;
    const SCHEMA: &'static [FieldSpec];
    const ORDER: ListOrder;

    fn id(&self) -> RecordId;
    fn user_id(&self) -> &str;
    fn updated_at(&self) -> Timestamp;
    fn set_updated_at(&mut self, at: Timestamp);

    /// Entity-specific format checks beyond schema-required fields.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Foreign keys that must resolve under the same owner.
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    /// Child entities affected when this record is deleted.
    fn dependents() -> &'static [Dependent] {
        &[]
    }

    /// Ordering key for `ListOrder::Position` entities.
    fn position(&self) -> Option<i64> {
        None
    }

    fn set_position(&mut self, _position: i64) {}
}

/// Entity created from a caller payload.
pub trait Creatable: Entity {
    type Create;

    /// Builds the record; `now` seeds both `created_at` and `updated_at`.
    fn from_create(id: RecordId, user_id: &str, now: Timestamp, data: Self::Create) -> Self;
}

/// Entity mutated by a partial update payload.
pub trait Updatable: Entity {
    type Update;

    fn update_target(update: &Self::Update) -> RecordId;

    /// Merges present payload fields into `self`, leaving absent ones as-is.
    fn merge(&mut self, update: Self::Update);

    /// Rejects updates against records that no longer accept changes.
    fn ensure_mutable(&self) -> Result<(), ConflictError> {
        Ok(())
    }
}
