//! Outbound messages queued for later delivery.
//!
//! # Invariants
//! - New messages start `pending`.
//! - `sent`, `failed` and `cancelled` are terminal: no transition leaves
//!   them and their content is frozen.
//! - `sent_at` is set only by the `sent` transition, `error_message` only by
//!   the `failed` transition.

use crate::model::schema::{FieldSpec, FieldType, ListOrder};
use crate::model::validation::{check_phone, optional_text, require_text};
use crate::model::{
    timestamp, ConflictError, Creatable, Entity, EntityKind, Patch, RecordId, Timestamp,
    Updatable, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Delivery status; persisted as the lowercase literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledStatus {
    Pending,
    Sent,
    Failed,
    Cancelled,
}

impl ScheduledStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl Display for ScheduledStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusTransition {
    /// Delivered; `sent_at` defaults to the transition time.
    Sent { sent_at: Option<Timestamp> },
    /// Delivery failed with a reason.
    Failed { error_message: String },
    Cancelled,
}

impl StatusTransition {
    pub fn target(&self) -> ScheduledStatus {
        match self {
            Self::Sent { .. } => ScheduledStatus::Sent,
            Self::Failed { .. } => ScheduledStatus::Failed,
            Self::Cancelled => ScheduledStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub id: RecordId,
    pub user_id: String,
    pub instance_name: String,
    pub whatsapp_number: String,
    pub message: String,
    pub attachment_url: Option<String>,
    pub pushname: Option<String>,
    #[serde(with = "timestamp")]
    pub scheduled_for: Timestamp,
    pub status: ScheduledStatus,
    #[serde(default, with = "timestamp::option")]
    pub sent_at: Option<Timestamp>,
    pub error_message: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp")]
    pub updated_at: Timestamp,
}

impl ScheduledMessage {
    /// Applies `transition` in place.
    ///
    /// # Errors
    /// - `ConflictError::InvalidTransition` when the message is already terminal.
    /// - `ValidationError` when a failure reason is blank.
    pub fn apply_transition(
        &mut self,
        transition: StatusTransition,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Conflict(
                ConflictError::InvalidTransition {
                    from: self.status,
                    to: transition.target(),
                },
            ));
        }

        match transition {
            StatusTransition::Sent { sent_at } => {
                self.status = ScheduledStatus::Sent;
                self.sent_at = Some(sent_at.map(timestamp::truncate).unwrap_or(now));
            }
            StatusTransition::Failed { error_message } => {
                require_text("error_message", &error_message)
                    .map_err(TransitionError::Validation)?;
                self.status = ScheduledStatus::Failed;
                self.error_message = Some(error_message);
            }
            StatusTransition::Cancelled => {
                self.status = ScheduledStatus::Cancelled;
            }
        }
        Ok(())
    }
}

/// Failure of `ScheduledMessage::apply_transition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    Conflict(ConflictError),
    Validation(ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateScheduledMessageData {
    pub instance_name: String,
    pub whatsapp_number: String,
    pub message: String,
    #[serde(with = "timestamp")]
    pub scheduled_for: Timestamp,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub pushname: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateScheduledMessageData {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub scheduled_for: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub attachment_url: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub pushname: Patch<String>,
}

const SCHEDULED_MESSAGE_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("id", FieldType::Id).required(),
    FieldSpec::new("user_id", FieldType::Text).required(),
    FieldSpec::new("instance_name", FieldType::Text)
        .required()
        .mutable(),
    FieldSpec::new("whatsapp_number", FieldType::Text)
        .required()
        .mutable(),
    FieldSpec::new("message", FieldType::Text).required().mutable(),
    FieldSpec::new("attachment_url", FieldType::Text).mutable(),
    FieldSpec::new("pushname", FieldType::Text).mutable(),
    FieldSpec::new("scheduled_for", FieldType::Timestamp)
        .required()
        .mutable(),
    FieldSpec::new("status", FieldType::Text).required(),
    FieldSpec::new("sent_at", FieldType::Timestamp),
    FieldSpec::new("error_message", FieldType::Text),
    FieldSpec::new("created_at", FieldType::Timestamp).required(),
    FieldSpec::new("updated_at", FieldType::Timestamp).required(),
];

impl Entity for ScheduledMessage {
    const KIND: EntityKind = EntityKind::ScheduledMessage;
    const SCHEMA: &'static [FieldSpec] = SCHEDULED_MESSAGE_SCHEMA;
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
        check_phone("whatsapp_number", &self.whatsapp_number)?;
        optional_text("attachment_url", self.attachment_url.as_deref())?;
        optional_text("pushname", self.pushname.as_deref())
    }
}

impl Creatable for ScheduledMessage {
    type Create = CreateScheduledMessageData;

    fn from_create(
        id: RecordId,
        user_id: &str,
        now: Timestamp,
        data: CreateScheduledMessageData,
    ) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            instance_name: data.instance_name,
            whatsapp_number: data.whatsapp_number,
            message: data.message,
            attachment_url: data.attachment_url,
            pushname: data.pushname,
            scheduled_for: timestamp::truncate(data.scheduled_for),
            status: ScheduledStatus::Pending,
            sent_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Updatable for ScheduledMessage {
    type Update = UpdateScheduledMessageData;

    fn update_target(update: &UpdateScheduledMessageData) -> RecordId {
        update.id
    }

    fn merge(&mut self, update: UpdateScheduledMessageData) {
        if let Some(instance_name) = update.instance_name {
            self.instance_name = instance_name;
        }
        if let Some(whatsapp_number) = update.whatsapp_number {
            self.whatsapp_number = whatsapp_number;
        }
        if let Some(message) = update.message {
            self.message = message;
        }
        if let Some(scheduled_for) = update.scheduled_for {
            self.scheduled_for = timestamp::truncate(scheduled_for);
        }
        update.attachment_url.apply_to(&mut self.attachment_url);
        update.pushname.apply_to(&mut self.pushname);
    }

    fn ensure_mutable(&self) -> Result<(), ConflictError> {
        if self.status.is_terminal() {
            return Err(ConflictError::TerminalState {
                id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ScheduledMessage, ScheduledStatus, StatusTransition, TransitionError};
    use crate::model::{timestamp, ConflictError, ValidationError};
    use uuid::Uuid;

    fn pending_message() -> ScheduledMessage {
        let now = timestamp::now();
        ScheduledMessage {
            id: Uuid::new_v4(),
            user_id: "owner-1".to_string(),
            instance_name: "main".to_string(),
            whatsapp_number: "+5511987654321".to_string(),
            message: "hello".to_string(),
            attachment_url: None,
            pushname: None,
            scheduled_for: now,
            status: ScheduledStatus::Pending,
            sent_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn sent_records_timestamp_and_becomes_terminal() {
        let mut message = pending_message();
        let now = timestamp::now();
        message
            .apply_transition(StatusTransition::Sent { sent_at: None }, now)
            .unwrap();
        assert_eq!(message.status, ScheduledStatus::Sent);
        assert_eq!(message.sent_at, Some(now));

        let err = message
            .apply_transition(
                StatusTransition::Failed {
                    error_message: "late".to_string(),
                },
                now,
            )
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Conflict(ConflictError::InvalidTransition {
                from: ScheduledStatus::Sent,
                to: ScheduledStatus::Failed,
            })
        );
        assert_eq!(message.status, ScheduledStatus::Sent);
        assert_eq!(message.error_message, None);
    }

    #[test]
    fn failed_requires_reason() {
        let mut message = pending_message();
        let err = message
            .apply_transition(
                StatusTransition::Failed {
                    error_message: "  ".to_string(),
                },
                timestamp::now(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Validation(ValidationError::MissingField("error_message"))
        );
        assert_eq!(message.status, ScheduledStatus::Pending);
    }

    #[test]
    fn cancelled_is_terminal() {
        let mut message = pending_message();
        message
            .apply_transition(StatusTransition::Cancelled, timestamp::now())
            .unwrap();
        assert!(message.status.is_terminal());
        assert!(message
            .apply_transition(StatusTransition::Cancelled, timestamp::now())
            .is_err());
    }

    #[test]
    fn status_literals_round_trip() {
        for status in [
            ScheduledStatus::Pending,
            ScheduledStatus::Sent,
            ScheduledStatus::Failed,
            ScheduledStatus::Cancelled,
        ] {
            assert_eq!(ScheduledStatus::parse(status.as_str()), Some(status));
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.as_str().to_string())
            );
        }
        assert_eq!(ScheduledStatus::parse("queued"), None);
    }
}
