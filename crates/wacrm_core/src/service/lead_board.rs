//! Lead board operations: moves, column reorder, default swap and column
//! deletion with lead reassignment.
//!
//! # Invariants
//! - Every operation here runs in one atomic unit; after it returns, both
//!   the touched column scopes and the column list are dense `0..n-1`.
//! - Positions past the end of a scope clamp to append.

use crate::model::lead::{Lead, LeadColumn, MoveLeadData};
use crate::model::validation::check_position;
use crate::model::{Entity, RecordId, ValidationError};
use crate::repo::filter::Filter;
use crate::repo::record_store::RecordStore;
use crate::service::error::FacadeResult;
use crate::service::facade::{
    check_references, clamp_index, delete_record, load_required, log_outcome, put_next_version,
    renumber, require_owner, RecordFacade,
};
use log::debug;

/// One board column with its leads in position order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumn {
    pub column: LeadColumn,
    pub leads: Vec<Lead>,
}

impl<S: RecordStore> RecordFacade<S> {
    /// Relocates a lead to `position` within `column_id`.
    ///
    /// Source and destination columns are renumbered in the same unit; a
    /// same-column move just reorders.
    ///
    /// # Errors
    /// - `NotFound` when the lead is unknown.
    /// - `Validation` for a negative position or an unknown destination.
    pub fn move_lead(&self, user_id: &str, data: MoveLeadData) -> FacadeResult<Lead> {
        let result = self.store().atomically(|store| move_lead_in(store, user_id, data));
        log_outcome("lead_move", Lead::KIND, &result);
        result
    }

    /// Moves a column to `position` among the owner's columns.
    pub fn move_lead_column(
        &self,
        user_id: &str,
        id: RecordId,
        position: i64,
    ) -> FacadeResult<LeadColumn> {
        let result: FacadeResult<LeadColumn> = self.store().atomically(|store| {
            require_owner(user_id)?;
            check_position(position)?;
            let column = load_required::<S, LeadColumn>(store, user_id, id)?;
            let others = store
                .query::<LeadColumn>(user_id, &Filter::new())?
                .into_iter()
                .filter(|other| other.id != id)
                .collect::<Vec<_>>();
            let stored = renumber(store, insert_at(others, column, position), &[id])?;
            take_record(stored, id)
        });
        log_outcome("lead_column_move", LeadColumn::KIND, &result);
        result
    }

    /// Marks `id` as the owner's default column, clearing the previous one.
    pub fn set_default_lead_column(&self, user_id: &str, id: RecordId) -> FacadeResult<LeadColumn> {
        let result: FacadeResult<LeadColumn> = self.store().atomically(|store| {
            require_owner(user_id)?;
            let mut column = load_required::<S, LeadColumn>(store, user_id, id)?;
            if column.is_default {
                return Ok(column);
            }

            let previous = store.query::<LeadColumn>(user_id, &Filter::new().eq("is_default", true))?;
            for mut old in previous {
                old.is_default = false;
                put_next_version(store, old)?;
            }

            column.is_default = true;
            put_next_version(store, column)
        });
        log_outcome("lead_column_default", LeadColumn::KIND, &result);
        result
    }

    /// Deletes a column.
    ///
    /// Without `reassign_to`, a column holding leads is rejected with a
    /// dependency error. With it, the leads are appended to the target
    /// column in their current order before the delete.
    pub fn delete_lead_column(
        &self,
        user_id: &str,
        id: RecordId,
        reassign_to: Option<RecordId>,
    ) -> FacadeResult<()> {
        let result: FacadeResult<()> = self.store().atomically(|store| {
            require_owner(user_id)?;
            if let Some(target) = reassign_to {
                reassign_leads(store, user_id, id, target)?;
            }
            delete_record::<S, LeadColumn>(store, user_id, id)
        });
        log_outcome("lead_column_delete", LeadColumn::KIND, &result);
        result
    }

    /// Columns in board order, each with its leads.
    pub fn list_board(&self, user_id: &str) -> FacadeResult<Vec<BoardColumn>> {
        require_owner(user_id)?;
        let store = self.store();
        let columns = store.query::<LeadColumn>(user_id, &Filter::new())?;
        let mut board = Vec::with_capacity(columns.len());
        for column in columns {
            let leads = store.query::<Lead>(user_id, &leads_in(column.id))?;
            board.push(BoardColumn { column, leads });
        }
        Ok(board)
    }
}

fn move_lead_in<S: RecordStore>(
    store: &S,
    user_id: &str,
    data: MoveLeadData,
) -> FacadeResult<Lead> {
    require_owner(user_id)?;
    check_position(data.position)?;
    let mut lead = load_required::<S, Lead>(store, user_id, data.id)?;
    let source = lead.column_id;

    lead.column_id = data.column_id;
    check_references(store, &lead)?;

    let destination = store
        .query::<Lead>(user_id, &leads_in(data.column_id))?
        .into_iter()
        .filter(|other| other.id != data.id)
        .collect::<Vec<_>>();
    let stored = renumber(store, insert_at(destination, lead, data.position), &[data.id])?;

    if source != data.column_id {
        let remaining = store.query::<Lead>(user_id, &leads_in(source))?;
        renumber(store, remaining, &[])?;
    }

    debug!(
        "event=lead_move module=lead_board cross_column={} position={}",
        source != data.column_id,
        data.position
    );
    take_record(stored, data.id)
}

fn reassign_leads<S: RecordStore>(
    store: &S,
    user_id: &str,
    id: RecordId,
    target: RecordId,
) -> FacadeResult<()> {
    if target == id {
        return Err(ValidationError::InvalidArgument(
            "reassignment target must differ from the deleted column",
        )
        .into());
    }
    load_required::<S, LeadColumn>(store, user_id, id)?;
    if !store.exists(user_id, LeadColumn::KIND, target)? {
        return Err(ValidationError::UnknownReference {
            field: "reassign_to",
            kind: LeadColumn::KIND,
            id: target,
        }
        .into());
    }

    let mut moved = store.query::<Lead>(user_id, &leads_in(id))?;
    let moved_ids = moved.iter().map(|lead| lead.id).collect::<Vec<_>>();
    for lead in &mut moved {
        lead.column_id = target;
    }

    let mut combined = store.query::<Lead>(user_id, &leads_in(target))?;
    combined.extend(moved);
    renumber(store, combined, &moved_ids)?;
    debug!(
        "event=lead_reassign module=lead_board moved={}",
        moved_ids.len()
    );
    Ok(())
}

fn leads_in(column_id: RecordId) -> Filter {
    Filter::new().eq("column_id", column_id.to_string())
}

fn insert_at<E>(mut ordered: Vec<E>, record: E, position: i64) -> Vec<E> {
    let index = clamp_index(position, ordered.len());
    ordered.insert(index, record);
    ordered
}

fn take_record<E: Entity>(stored: Vec<E>, id: RecordId) -> FacadeResult<E> {
    stored
        .into_iter()
        .find(|record| record.id() == id)
        .ok_or(crate::service::error::FacadeError::NotFound { kind: E::KIND, id })
}

#[cfg(test)]
mod tests {
    use super::insert_at;

    #[test]
    fn insert_at_clamps_to_append() {
        assert_eq!(insert_at(vec![1, 2], 9, 0), vec![9, 1, 2]);
        assert_eq!(insert_at(vec![1, 2], 9, 1), vec![1, 9, 2]);
        assert_eq!(insert_at(vec![1, 2], 9, 40), vec![1, 2, 9]);
        assert_eq!(insert_at(Vec::new(), 9, 3), vec![9]);
    }
}
