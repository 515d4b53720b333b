//! Domain-level validation and conflict errors.

use crate::model::scheduled_message::ScheduledStatus;
use crate::model::{EntityKind, RecordId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Record shape or reference rejected before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is missing or blank after trim.
    MissingField(&'static str),
    /// Email field is not `local@domain.tld` shaped.
    InvalidEmail { field: &'static str, value: String },
    /// Phone field is not a plausible international number.
    InvalidPhone { field: &'static str, value: String },
    /// Ordering key is negative.
    NegativePosition(i64),
    /// Numeric field is NaN or infinite.
    NonFiniteNumber(&'static str),
    /// Referenced record does not exist under the caller's owner scope.
    UnknownReference {
        field: &'static str,
        kind: EntityKind,
        id: RecordId,
    },
    /// Store refused a write because a referenced record vanished.
    ReferenceRejected { kind: EntityKind, detail: String },
    /// Update attempted to change a field outside the mutable set.
    ImmutableField(String),
    /// Filter or order names a field the entity does not have.
    UnknownField { kind: EntityKind, field: String },
    /// Operation arguments contradict each other.
    InvalidArgument(&'static str),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "field `{field}` is required"),
            Self::InvalidEmail { field, value } => {
                write!(f, "field `{field}` is not a valid email: `{value}`")
            }
            Self::InvalidPhone { field, value } => {
                write!(f, "field `{field}` is not a valid phone number: `{value}`")
            }
            Self::NegativePosition(position) => {
                write!(f, "position must not be negative, got {position}")
            }
            Self::NonFiniteNumber(field) => write!(f, "field `{field}` must be a finite number"),
            Self::UnknownReference { field, kind, id } => {
                write!(f, "field `{field}` references unknown {kind} {id}")
            }
            Self::ReferenceRejected { kind, detail } => {
                write!(f, "{kind} references a missing record: {detail}")
            }
            Self::ImmutableField(field) => write!(f, "field `{field}` cannot be updated"),
            Self::UnknownField { kind, field } => write!(f, "{kind} has no field `{field}`"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
        }
    }
}

impl Error for ValidationError {}

/// Write rejected because it collides with existing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    /// Backend unique index rejected the write.
    Unique { kind: EntityKind, detail: String },
    /// Record changed since it was read; the caller may retry.
    StaleWrite { kind: EntityKind, id: RecordId },
    /// Status transition not allowed by the message state machine.
    InvalidTransition {
        from: ScheduledStatus,
        to: ScheduledStatus,
    },
    /// Message is in a terminal status and no longer editable.
    TerminalState {
        id: RecordId,
        status: ScheduledStatus,
    },
}

impl Display for ConflictError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unique { kind, detail } => write!(f, "duplicate {kind}: {detail}"),
            Self::StaleWrite { kind, id } => {
                write!(f, "{kind} {id} was modified concurrently")
            }
            Self::InvalidTransition { from, to } => {
                write!(f, "cannot transition scheduled message from {from} to {to}")
            }
            Self::TerminalState { id, status } => {
                write!(f, "scheduled message {id} is {status} and can no longer change")
            }
        }
    }
}

impl Error for ConflictError {}
