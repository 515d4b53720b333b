//! Contacts, contact lists and list membership.
//!
//! # Invariants
//! - `phone_number` is required and phone-shaped; `email` is optional and
//!   email-shaped when present.
//! - A contact appears at most once per list.

use crate::model::schema::{Dependent, FieldSpec, FieldType, ListOrder, OnDelete, Reference};
use crate::model::validation::{check_email, check_phone, optional_text};
use crate::model::{
    timestamp, Creatable, Entity, EntityKind, Patch, RecordId, Timestamp, Updatable,
    ValidationError,
};
use serde::{Deserialize, Serialize};

/// Person reachable through the messaging channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: RecordId,
    pub user_id: String,
    pub name: String,
    pub phone_number: String,
    pub email: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp")]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateContactData {
    pub name: String,
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateContactData {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub email: Patch<String>,
}

const CONTACT_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("id", FieldType::Id).required(),
    FieldSpec::new("user_id", FieldType::Text).required(),
    FieldSpec::new("name", FieldType::Text).required().mutable(),
    FieldSpec::new("phone_number", FieldType::Text)
        .required()
        .mutable(),
    FieldSpec::new("email", FieldType::Text).mutable(),
    FieldSpec::new("created_at", FieldType::Timestamp).required(),
    FieldSpec::new("updated_at", FieldType::Timestamp).required(),
];

const CONTACT_DEPENDENTS: &[Dependent] = &[Dependent {
    kind: EntityKind::ContactListMember,
    field: "contact_id",
    on_delete: OnDelete::Cascade,
}];

impl Entity for Contact {
    const KIND: EntityKind = EntityKind::Contact;
    const SCHEMA: &'static [FieldSpec] = CONTACT_SCHEMA;
    const ORDER: ListOrder = ListOrder::CreatedAt;

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
        check_phone("phone_number", &self.phone_number)?;
        if let Some(email) = self.email.as_deref() {
            check_email("email", email)?;
        }
        Ok(())
    }

    fn dependents() -> &'static [Dependent] {
        CONTACT_DEPENDENTS
    }
}

impl Creatable for Contact {
    type Create = CreateContactData;

    fn from_create(id: RecordId, user_id: &str, now: Timestamp, data: CreateContactData) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            name: data.name,
            phone_number: data.phone_number,
            email: data.email,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Updatable for Contact {
    type Update = UpdateContactData;

    fn update_target(update: &UpdateContactData) -> RecordId {
        update.id
    }

    fn merge(&mut self, update: UpdateContactData) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(phone_number) = update.phone_number {
            self.phone_number = phone_number;
        }
        update.email.apply_to(&mut self.email);
    }
}

/// Named group of contacts, e.g. a broadcast audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactList {
    pub id: RecordId,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp")]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateContactListData {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateContactListData {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub description: Patch<String>,
}

const CONTACT_LIST_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("id", FieldType::Id).required(),
    FieldSpec::new("user_id", FieldType::Text).required(),
    FieldSpec::new("name", FieldType::Text).required().mutable(),
    FieldSpec::new("description", FieldType::Text).mutable(),
    FieldSpec::new("created_at", FieldType::Timestamp).required(),
    FieldSpec::new("updated_at", FieldType::Timestamp).required(),
];

const CONTACT_LIST_DEPENDENTS: &[Dependent] = &[Dependent {
    kind: EntityKind::ContactListMember,
    field: "contact_list_id",
    on_delete: OnDelete::Cascade,
}];

impl Entity for ContactList {
    const KIND: EntityKind = EntityKind::ContactList;
    const SCHEMA: &'static [FieldSpec] = CONTACT_LIST_SCHEMA;
    const ORDER: ListOrder = ListOrder::CreatedAt;

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
        optional_text("description", self.description.as_deref())
    }

    fn dependents() -> &'static [Dependent] {
        CONTACT_LIST_DEPENDENTS
    }
}

impl Creatable for ContactList {
    type Create = CreateContactListData;

    fn from_create(
        id: RecordId,
        user_id: &str,
        now: Timestamp,
        data: CreateContactListData,
    ) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            name: data.name,
            description: data.description,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Updatable for ContactList {
    type Update = UpdateContactListData;

    fn update_target(update: &UpdateContactListData) -> RecordId {
        update.id
    }

    fn merge(&mut self, update: UpdateContactListData) {
        if let Some(name) = update.name {
            self.name = name;
        }
        update.description.apply_to(&mut self.description);
    }
}

/// Join row linking one contact to one list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactListMember {
    pub id: RecordId,
    pub user_id: String,
    pub contact_list_id: RecordId,
    pub contact_id: RecordId,
    #[serde(with = "timestamp")]
    pub added_at: Timestamp,
    #[serde(with = "timestamp")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp")]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateContactListMemberData {
    pub contact_list_id: RecordId,
    pub contact_id: RecordId,
}

const MEMBER_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("id", FieldType::Id).required(),
    FieldSpec::new("user_id", FieldType::Text).required(),
    FieldSpec::new("contact_list_id", FieldType::Id).required(),
    FieldSpec::new("contact_id", FieldType::Id).required(),
    FieldSpec::new("added_at", FieldType::Timestamp).required(),
    FieldSpec::new("created_at", FieldType::Timestamp).required(),
    FieldSpec::new("updated_at", FieldType::Timestamp).required(),
];

impl Entity for ContactListMember {
    const KIND: EntityKind = EntityKind::ContactListMember;
    const SCHEMA: &'static [FieldSpec] = MEMBER_SCHEMA;
    const ORDER: ListOrder = ListOrder::CreatedAt;

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

    fn references(&self) -> Vec<Reference> {
        vec![
            Reference {
                field: "contact_list_id",
                kind: EntityKind::ContactList,
                id: self.contact_list_id,
            },
            Reference {
                field: "contact_id",
                kind: EntityKind::Contact,
                id: self.contact_id,
            },
        ]
    }
}

impl Creatable for ContactListMember {
    type Create = CreateContactListMemberData;

    fn from_create(
        id: RecordId,
        user_id: &str,
        now: Timestamp,
        data: CreateContactListMemberData,
    ) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            contact_list_id: data.contact_list_id,
            contact_id: data.contact_id,
            added_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}
