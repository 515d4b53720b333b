//! Generic record façade.
//!
//! # Responsibility
//! - Create, partially update, delete, get and list any `Entity`.
//! - Enforce schema-required fields, format rules, owner-scoped foreign
//!   keys and dense positions for ordered entities.
//!
//! # Invariants
//! - The façade keeps no mutable state; the store handle is its only field.
//! - Updates merge only payload-present fields and are written with a
//!   compare-and-set on the previous `updated_at`.
//! - Ordered scopes are renumbered to `0..n-1` in the same atomic unit as
//!   the write that disturbed them.

use crate::model::schema::{check_mutations, check_required, to_fields};
use crate::model::validation::{check_position, require_text};
use crate::model::{
    timestamp, Creatable, Entity, EntityKind, ListOrder, OnDelete, RecordId, Updatable,
};
use crate::repo::filter::Filter;
use crate::repo::record_store::{RecordStore, StoreError};
use crate::service::error::{FacadeError, FacadeResult};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Record façade over a store implementation.
pub struct RecordFacade<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> RecordFacade<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store, for callers composing their own atomic units.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates one record from a caller payload.
    ///
    /// Ordered entities are inserted at the requested position, clamped to
    /// append, and their siblings are shifted.
    ///
    /// # Errors
    /// - `Validation` for blank required fields, bad formats, negative
    ///   positions or unknown references.
    /// - `Conflict` when a unique rule rejects the record.
    pub fn create<E: Creatable>(&self, user_id: &str, data: E::Create) -> FacadeResult<E> {
        let result = self.create_inner::<E>(user_id, data);
        log_outcome("record_create", E::KIND, &result);
        result
    }

    fn create_inner<E: Creatable>(&self, user_id: &str, data: E::Create) -> FacadeResult<E> {
        require_owner(user_id)?;
        let record = E::from_create(Uuid::new_v4(), user_id, timestamp::now(), data);
        check_record(&record)?;

        self.store.atomically(|store| {
            check_references(store, &record)?;
            match E::ORDER {
                ListOrder::Position { .. } => insert_ordered(store, record),
                ListOrder::CreatedAt => Ok(store.put(&record, None)?),
            }
        })
    }

    /// Applies a partial update.
    ///
    /// Fields absent from the payload keep their stored value; `updated_at`
    /// strictly increases.
    ///
    /// # Errors
    /// - `NotFound` when the id is unknown under `user_id`.
    /// - `Validation` when the merged record breaks a rule.
    /// - `Conflict` on unique collisions, terminal records or lost races.
    pub fn update<E: Updatable>(&self, user_id: &str, update: E::Update) -> FacadeResult<E> {
        let result = self.update_inner::<E>(user_id, update);
        log_outcome("record_update", E::KIND, &result);
        result
    }

    fn update_inner<E: Updatable>(&self, user_id: &str, update: E::Update) -> FacadeResult<E> {
        require_owner(user_id)?;
        let id = E::update_target(&update);

        self.store.atomically(|store| {
            let current = load_required::<S, E>(store, user_id, id)?;
            current.ensure_mutable()?;

            let before = record_fields(&current)?;
            let mut merged = current;
            merged.merge(update);
            let after = record_fields(&merged)?;

            check_mutations::<E>(&before, &after)?;
            check_required::<E>(&after)?;
            merged.validate()?;
            check_references(store, &merged)?;

            put_next_version(store, merged)
        })
    }

    /// Deletes one record with its dependent policy applied.
    ///
    /// # Errors
    /// - `NotFound` when the id is unknown under `user_id`.
    /// - `Dependency` when a restricting child still exists.
    pub fn delete<E: Entity>(&self, user_id: &str, id: RecordId) -> FacadeResult<()> {
        let result = self
            .store
            .atomically(|store| delete_record::<S, E>(store, user_id, id));
        log_outcome("record_delete", E::KIND, &result);
        result
    }

    /// Loads one record.
    pub fn get<E: Entity>(&self, user_id: &str, id: RecordId) -> FacadeResult<E> {
        require_owner(user_id)?;
        load_required::<S, E>(&self.store, user_id, id)
    }

    /// Lists owner records, ordered by position or creation time.
    pub fn list<E: Entity>(&self, user_id: &str, filter: &Filter) -> FacadeResult<Vec<E>> {
        require_owner(user_id)?;
        Ok(self.store.query::<E>(user_id, filter)?)
    }
}

pub(crate) fn require_owner(user_id: &str) -> FacadeResult<()> {
    require_text("user_id", user_id)?;
    Ok(())
}

pub(crate) fn load_required<S: RecordStore, E: Entity>(
    store: &S,
    user_id: &str,
    id: RecordId,
) -> FacadeResult<E> {
    store
        .get::<E>(user_id, id)?
        .ok_or(FacadeError::NotFound { kind: E::KIND, id })
}

/// Writes `record` with a fresh version, conditioned on its current one.
pub(crate) fn put_next_version<S: RecordStore, E: Entity>(
    store: &S,
    mut record: E,
) -> FacadeResult<E> {
    let previous = record.updated_at();
    record.set_updated_at(timestamp::next_version(previous));
    Ok(store.put(&record, Some(previous))?)
}

/// Persists `ordered` so that each record's position equals its index.
///
/// Records already in place are left untouched unless listed in `force`.
/// Returns the final sequence as stored.
pub(crate) fn renumber<S: RecordStore, E: Entity>(
    store: &S,
    ordered: Vec<E>,
    force: &[RecordId],
) -> FacadeResult<Vec<E>> {
    let mut stored = Vec::with_capacity(ordered.len());
    for (index, mut record) in ordered.into_iter().enumerate() {
        let index = index as i64;
        if record.position() == Some(index) && !force.contains(&record.id()) {
            stored.push(record);
            continue;
        }
        record.set_position(index);
        stored.push(put_next_version(store, record)?);
    }
    Ok(stored)
}

/// Maps a requested position onto `0..=len`, clamping past-the-end to append.
pub(crate) fn clamp_index(requested: i64, len: usize) -> usize {
    usize::try_from(requested.max(0)).map_or(len, |index| index.min(len))
}

/// Filter selecting the ordered scope `record` belongs to.
pub(crate) fn scope_filter<E: Entity>(record: &E) -> FacadeResult<Filter> {
    match E::ORDER {
        ListOrder::Position { scope: Some(field) } => {
            let fields = record_fields(record)?;
            let value = fields.get(field).cloned().unwrap_or(Value::Null);
            Ok(Filter::new().eq(field, value))
        }
        ListOrder::Position { scope: None } | ListOrder::CreatedAt => Ok(Filter::new()),
    }
}

fn insert_ordered<S: RecordStore, E: Entity>(store: &S, mut record: E) -> FacadeResult<E> {
    let siblings = store.query::<E>(record.user_id(), &scope_filter(&record)?)?;
    let requested = record.position().unwrap_or(i64::MAX);
    let index = clamp_index(requested, siblings.len());

    let mut shifted = Vec::with_capacity(siblings.len());
    for (current, mut sibling) in siblings.into_iter().enumerate() {
        let target = if current < index { current } else { current + 1 } as i64;
        if sibling.position() != Some(target) {
            sibling.set_position(target);
            sibling = put_next_version(store, sibling)?;
        }
        shifted.push(sibling);
    }

    record.set_position(index as i64);
    let created = store.put(&record, None)?;
    debug!(
        "event=positions_shift module=facade kind={} index={} siblings={}",
        E::KIND,
        index,
        shifted.len()
    );
    Ok(created)
}

/// Delete body shared by the generic and column-reassigning paths.
pub(crate) fn delete_record<S: RecordStore, E: Entity>(
    store: &S,
    user_id: &str,
    id: RecordId,
) -> FacadeResult<()> {
    require_owner(user_id)?;
    let existing = load_required::<S, E>(store, user_id, id)?;

    for dependent in E::dependents() {
        match dependent.on_delete {
            OnDelete::Restrict => {
                let count = store.count_where(user_id, dependent.kind, dependent.field, id)?;
                if count > 0 {
                    return Err(FacadeError::Dependency {
                        kind: E::KIND,
                        id,
                        dependent: dependent.kind,
                        count,
                    });
                }
            }
            OnDelete::Cascade => {
                let removed = store.delete_where(user_id, dependent.kind, dependent.field, id)?;
                debug!(
                    "event=record_cascade module=facade kind={} dependent={} removed={}",
                    E::KIND,
                    dependent.kind,
                    removed
                );
            }
        }
    }

    store.delete::<E>(user_id, id)?;

    if let ListOrder::Position { .. } = E::ORDER {
        let remaining = store.query::<E>(user_id, &scope_filter(&existing)?)?;
        renumber(store, remaining, &[])?;
    }
    Ok(())
}

fn check_record<E: Entity>(record: &E) -> FacadeResult<()> {
    check_required::<E>(&record_fields(record)?)?;
    if let Some(position) = record.position() {
        check_position(position)?;
    }
    record.validate()?;
    Ok(())
}

pub(crate) fn check_references<S: RecordStore, E: Entity>(
    store: &S,
    record: &E,
) -> FacadeResult<()> {
    for reference in record.references() {
        if !store.exists(record.user_id(), reference.kind, reference.id)? {
            return Err(crate::model::ValidationError::UnknownReference {
                field: reference.field,
                kind: reference.kind,
                id: reference.id,
            }
            .into());
        }
    }
    Ok(())
}

fn record_fields<E: Entity>(record: &E) -> FacadeResult<Map<String, Value>> {
    to_fields(record).map_err(|err| {
        FacadeError::Store(StoreError::InvalidData(format!(
            "cannot serialize {}: {err}",
            E::KIND
        )))
    })
}

pub(crate) fn log_outcome<T>(event: &str, kind: EntityKind, result: &FacadeResult<T>) {
    match result {
        Ok(_) => info!("event={event} module=facade status=ok kind={kind}"),
        Err(err) => warn!(
            "event={event} module=facade status=error kind={kind} error_code={} retryable={} error={err}",
            err.code(),
            err.is_retryable()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::clamp_index;

    #[test]
    fn clamp_index_appends_past_the_end() {
        assert_eq!(clamp_index(0, 0), 0);
        assert_eq!(clamp_index(2, 5), 2);
        assert_eq!(clamp_index(9, 3), 3);
        assert_eq!(clamp_index(i64::MAX, 4), 4);
        assert_eq!(clamp_index(-1, 4), 0);
    }
}
