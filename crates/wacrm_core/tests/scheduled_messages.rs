use chrono::{Duration, TimeZone, Utc};
use rusqlite::Connection;
use wacrm_core::db::open_db_in_memory;
use wacrm_core::model::timestamp;
use wacrm_core::{
    ConflictError, CreateScheduledMessageData, FacadeError, RecordFacade, ScheduledMessage,
    ScheduledStatus, SqliteRecordStore, Timestamp, UpdateScheduledMessageData, ValidationError,
};

const OWNER: &str = "owner-a";

fn facade(conn: &Connection) -> RecordFacade<SqliteRecordStore<'_>> {
    RecordFacade::new(SqliteRecordStore::try_new(conn).unwrap())
}

fn schedule(
    crm: &RecordFacade<SqliteRecordStore<'_>>,
    message: &str,
    scheduled_for: Timestamp,
) -> ScheduledMessage {
    crm.create::<ScheduledMessage>(
        OWNER,
        CreateScheduledMessageData {
            instance_name: "main".to_string(),
            whatsapp_number: "+5511987654321".to_string(),
            message: message.to_string(),
            scheduled_for,
            attachment_url: None,
            pushname: Some("Ana".to_string()),
        },
    )
    .unwrap()
}

#[test]
fn new_messages_start_pending() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);
    let message = schedule(&crm, "hello", timestamp::now());

    assert_eq!(message.status, ScheduledStatus::Pending);
    assert_eq!(message.sent_at, None);
    assert_eq!(message.error_message, None);
}

#[test]
fn sent_then_failed_conflicts_and_status_stays_sent() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);
    let message = schedule(&crm, "hello", timestamp::now());
    let delivered_at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

    let sent = crm.mark_sent(OWNER, message.id, Some(delivered_at)).unwrap();
    assert_eq!(sent.status, ScheduledStatus::Sent);
    assert_eq!(sent.sent_at, Some(delivered_at));

    let err = crm.mark_failed(OWNER, message.id, "gateway down").unwrap_err();
    assert!(matches!(
        err,
        FacadeError::Conflict(ConflictError::InvalidTransition {
            from: ScheduledStatus::Sent,
            to: ScheduledStatus::Failed,
        })
    ));

    let stored = crm.get::<ScheduledMessage>(OWNER, message.id).unwrap();
    assert_eq!(stored, sent);
}

#[test]
fn failure_requires_reason_and_records_it() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);
    let message = schedule(&crm, "hello", timestamp::now());

    let err = crm.mark_failed(OWNER, message.id, " ").unwrap_err();
    assert!(matches!(
        err,
        FacadeError::Validation(ValidationError::MissingField("error_message"))
    ));

    let failed = crm
        .mark_failed(OWNER, message.id, "number not on WhatsApp")
        .unwrap();
    assert_eq!(failed.status, ScheduledStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("number not on WhatsApp"));
}

#[test]
fn terminal_message_rejects_content_edits() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);
    let message = schedule(&crm, "hello", timestamp::now());
    let cancelled = crm.cancel_scheduled_message(OWNER, message.id).unwrap();

    let err = crm
        .update::<ScheduledMessage>(
            OWNER,
            UpdateScheduledMessageData {
                id: message.id,
                message: Some("edited".to_string()),
                ..UpdateScheduledMessageData::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        FacadeError::Conflict(ConflictError::TerminalState {
            status: ScheduledStatus::Cancelled,
            ..
        })
    ));
    assert!(matches!(
        crm.cancel_scheduled_message(OWNER, message.id).unwrap_err(),
        FacadeError::Conflict(ConflictError::InvalidTransition { .. })
    ));
    assert_eq!(
        crm.get::<ScheduledMessage>(OWNER, message.id).unwrap(),
        cancelled
    );
}

#[test]
fn pending_message_can_be_rescheduled() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);
    let original = timestamp::now() + Duration::hours(1);
    let message = schedule(&crm, "hello", original);

    let later = original + Duration::days(1);
    let updated = crm
        .update::<ScheduledMessage>(
            OWNER,
            UpdateScheduledMessageData {
                id: message.id,
                scheduled_for: Some(later),
                ..UpdateScheduledMessageData::default()
            },
        )
        .unwrap();

    assert_eq!(updated.scheduled_for, timestamp::truncate(later));
    assert_eq!(updated.message, "hello");
    assert_eq!(updated.status, ScheduledStatus::Pending);
}

#[test]
fn due_messages_are_pending_and_ordered_by_schedule() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);
    let now = timestamp::now();
    let late = schedule(&crm, "late", now - Duration::minutes(5));
    let early = schedule(&crm, "early", now - Duration::hours(2));
    let future = schedule(&crm, "future", now + Duration::hours(2));
    let done = schedule(&crm, "done", now - Duration::hours(1));
    crm.mark_sent(OWNER, done.id, None).unwrap();

    let due = crm
        .list_due_messages(OWNER, now)
        .unwrap()
        .into_iter()
        .map(|message| message.id)
        .collect::<Vec<_>>();
    assert_eq!(due, vec![early.id, late.id]);
    assert!(!due.contains(&future.id));

    assert!(crm.list_due_messages("owner-b", now).unwrap().is_empty());
}
