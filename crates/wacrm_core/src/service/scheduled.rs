//! Scheduled message status transitions and due-message listing.

use crate::model::scheduled_message::{ScheduledMessage, ScheduledStatus, StatusTransition};
use crate::model::{timestamp, Entity, RecordId, Timestamp};
use crate::repo::filter::Filter;
use crate::repo::record_store::RecordStore;
use crate::service::error::FacadeResult;
use crate::service::facade::{
    load_required, log_outcome, put_next_version, require_owner, RecordFacade,
};
use log::debug;

impl<S: RecordStore> RecordFacade<S> {
    /// Applies one status transition.
    ///
    /// Terminal messages reject every transition with a conflict and stay
    /// unchanged.
    pub fn transition_scheduled_message(
        &self,
        user_id: &str,
        id: RecordId,
        transition: StatusTransition,
    ) -> FacadeResult<ScheduledMessage> {
        let target = transition.target();
        let result: FacadeResult<ScheduledMessage> = self.store().atomically(|store| {
            require_owner(user_id)?;
            let mut message = load_required::<S, ScheduledMessage>(store, user_id, id)?;
            let from = message.status;
            message.apply_transition(transition, timestamp::now())?;
            debug!("event=message_transition module=scheduled from={from} to={target}");
            put_next_version(store, message)
        });
        log_outcome("message_transition", ScheduledMessage::KIND, &result);
        result
    }

    /// `pending -> sent`; `sent_at` defaults to now.
    pub fn mark_sent(
        &self,
        user_id: &str,
        id: RecordId,
        sent_at: Option<Timestamp>,
    ) -> FacadeResult<ScheduledMessage> {
        self.transition_scheduled_message(user_id, id, StatusTransition::Sent { sent_at })
    }

    /// `pending -> failed` with a non-blank reason.
    pub fn mark_failed(
        &self,
        user_id: &str,
        id: RecordId,
        error_message: impl Into<String>,
    ) -> FacadeResult<ScheduledMessage> {
        self.transition_scheduled_message(
            user_id,
            id,
            StatusTransition::Failed {
                error_message: error_message.into(),
            },
        )
    }

    pub fn cancel_scheduled_message(
        &self,
        user_id: &str,
        id: RecordId,
    ) -> FacadeResult<ScheduledMessage> {
        self.transition_scheduled_message(user_id, id, StatusTransition::Cancelled)
    }

    /// Pending messages with `scheduled_for <= now`, earliest first.
    pub fn list_due_messages(
        &self,
        user_id: &str,
        now: Timestamp,
    ) -> FacadeResult<Vec<ScheduledMessage>> {
        let filter = Filter::new()
            .eq("status", ScheduledStatus::Pending.as_str())
            .lte("scheduled_for", timestamp::format(&timestamp::truncate(now)))
            .order_by("scheduled_for");
        self.list(user_id, &filter)
    }
}
