//! Storage contract consumed by the record façade.
//!
//! # Invariants
//! - `put` without an expected version inserts; with one, it updates only
//!   when the stored `updated_at` still equals that version.
//! - `atomically` runs all nested store calls in one transaction.

use crate::db::DbError;
use crate::model::{Entity, EntityKind, RecordId, Timestamp};
use crate::repo::filter::Filter;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by record store implementations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// No record with this id under the owner scope.
    NotFound { kind: EntityKind, id: RecordId },
    /// Conditional write lost against a concurrent writer.
    StaleWrite { kind: EntityKind, id: RecordId },
    /// Unique index rejected the write.
    UniqueViolation { kind: EntityKind, detail: String },
    /// Foreign key rejected the write or delete.
    ForeignKeyViolation { kind: EntityKind, detail: String },
    /// Filter, order or kind-level helper named an unknown field.
    UnknownField { kind: EntityKind, field: String },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted or serialized data does not match the entity schema.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::StaleWrite { kind, id } => write!(f, "stale write on {kind} {id}"),
            Self::UniqueViolation { kind, detail } => {
                write!(f, "unique constraint on {kind}: {detail}")
            }
            Self::ForeignKeyViolation { kind, detail } => {
                write!(f, "foreign key constraint on {kind}: {detail}")
            }
            Self::UnknownField { kind, field } => write!(f, "{kind} has no field `{field}`"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Owner-scoped persistence of schema-described records.
pub trait RecordStore {
    /// Loads one record.
    fn get<E: Entity>(&self, user_id: &str, id: RecordId) -> StoreResult<Option<E>>;

    /// Lists records matching `filter`, in the entity's natural order unless
    /// the filter overrides it.
    fn query<E: Entity>(&self, user_id: &str, filter: &Filter) -> StoreResult<Vec<E>>;

    /// Inserts (`expected_version = None`) or conditionally updates a record
    /// and returns the stored state.
    fn put<E: Entity>(&self, record: &E, expected_version: Option<Timestamp>) -> StoreResult<E>;

    /// Deletes one record.
    fn delete<E: Entity>(&self, user_id: &str, id: RecordId) -> StoreResult<()>;

    fn exists(&self, user_id: &str, kind: EntityKind, id: RecordId) -> StoreResult<bool>;

    /// Counts `kind` records whose `field` equals `id`.
    fn count_where(
        &self,
        user_id: &str,
        kind: EntityKind,
        field: &str,
        id: RecordId,
    ) -> StoreResult<u64>;

    /// Deletes `kind` records whose `field` equals `id`; returns the count.
    fn delete_where(
        &self,
        user_id: &str,
        kind: EntityKind,
        field: &str,
        id: RecordId,
    ) -> StoreResult<u64>;

    /// Runs `work` as one atomic unit.
    ///
    /// An error from `work` rolls back every write it made. Inside an open
    /// transaction the unit becomes a savepoint, so only its own writes are
    /// undone and the outer transaction stays usable.
    fn atomically<T, Fail, F>(&self, work: F) -> Result<T, Fail>
    where
        F: FnOnce(&Self) -> Result<T, Fail>,
        Fail: From<StoreError>,
        Self: Sized;
}
