//! Canned message templates.
//!
//! `shortcut`, when present, is unique per owner; the store's unique index
//! is the source of truth for that rule.

use crate::model::schema::{FieldSpec, FieldType, ListOrder};
use crate::model::validation::optional_text;
use crate::model::{
    timestamp, Creatable, Entity, EntityKind, Patch, RecordId, Timestamp, Updatable,
    ValidationError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    pub id: RecordId,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub shortcut: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp")]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQuickReplyData {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub shortcut: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateQuickReplyData {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub shortcut: Patch<String>,
}

const QUICK_REPLY_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("id", FieldType::Id).required(),
    FieldSpec::new("user_id", FieldType::Text).required(),
    FieldSpec::new("title", FieldType::Text).required().mutable(),
    FieldSpec::new("message", FieldType::Text).required().mutable(),
    FieldSpec::new("shortcut", FieldType::Text).mutable(),
    FieldSpec::new("created_at", FieldType::Timestamp).required(),
    FieldSpec::new("updated_at", FieldType::Timestamp).required(),
];

impl Entity for QuickReply {
    const KIND: EntityKind = EntityKind::QuickReply;
    const SCHEMA: &'static [FieldSpec] = QUICK_REPLY_SCHEMA;
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
        optional_text("shortcut", self.shortcut.as_deref())
    }
}

impl Creatable for QuickReply {
    type Create = CreateQuickReplyData;

    fn from_create(id: RecordId, user_id: &str, now: Timestamp, data: CreateQuickReplyData) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            title: data.title,
            message: data.message,
            shortcut: data.shortcut,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Updatable for QuickReply {
    type Update = UpdateQuickReplyData;

    fn update_target(update: &UpdateQuickReplyData) -> RecordId {
        update.id
    }

    fn merge(&mut self, update: UpdateQuickReplyData) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(message) = update.message {
            self.message = message;
        }
        update.shortcut.apply_to(&mut self.shortcut);
    }
}
