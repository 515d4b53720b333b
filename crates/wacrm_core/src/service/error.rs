//! Typed failures surfaced to façade callers.

use crate::model::scheduled_message::TransitionError;
use crate::model::{ConflictError, EntityKind, RecordId, ValidationError};
use crate::repo::record_store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type FacadeResult<T> = Result<T, FacadeError>;

/// Error taxonomy of the record façade.
#[derive(Debug)]
pub enum FacadeError {
    /// Payload or merged record is malformed.
    Validation(ValidationError),
    /// Target record does not exist under the caller's owner scope.
    NotFound { kind: EntityKind, id: RecordId },
    /// The contact is not a member of the list.
    NotMember {
        contact_list_id: RecordId,
        contact_id: RecordId,
    },
    /// Unique collision, stale write or forbidden status change.
    Conflict(ConflictError),
    /// Delete blocked by child records.
    Dependency {
        kind: EntityKind,
        id: RecordId,
        dependent: EntityKind,
        count: u64,
    },
    /// Storage transport failure.
    Store(StoreError),
}

impl FacadeError {
    /// Whether repeating the same call may succeed.
    ///
    /// Only lost compare-and-set races qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(ConflictError::StaleWrite { .. }))
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } | Self::NotMember { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Dependency { .. } => "dependency",
            Self::Store(_) => "store",
        }
    }
}

impl Display for FacadeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::NotMember {
                contact_list_id,
                contact_id,
            } => write!(f, "contact {contact_id} is not in list {contact_list_id}"),
            Self::Conflict(err) => write!(f, "{err}"),
            Self::Dependency {
                kind,
                id,
                dependent,
                count,
            } => write!(f, "{kind} {id} still has {count} {dependent} record(s)"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FacadeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Conflict(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::NotFound { .. } | Self::NotMember { .. } | Self::Dependency { .. } => None,
        }
    }
}

impl From<ValidationError> for FacadeError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ConflictError> for FacadeError {
    fn from(value: ConflictError) -> Self {
        Self::Conflict(value)
    }
}

impl From<TransitionError> for FacadeError {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::Conflict(err) => Self::Conflict(err),
            TransitionError::Validation(err) => Self::Validation(err),
        }
    }
}

impl From<StoreError> for FacadeError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { kind, id } => Self::NotFound { kind, id },
            StoreError::StaleWrite { kind, id } => {
                Self::Conflict(ConflictError::StaleWrite { kind, id })
            }
            StoreError::UniqueViolation { kind, detail } => {
                Self::Conflict(ConflictError::Unique { kind, detail })
            }
            StoreError::ForeignKeyViolation { kind, detail } => {
                Self::Validation(ValidationError::ReferenceRejected { kind, detail })
            }
            StoreError::UnknownField { kind, field } => {
                Self::Validation(ValidationError::UnknownField { kind, field })
            }
            other => Self::Store(other),
        }
    }
}
