use wacrm_core::db::open_db_in_memory;
use wacrm_core::{
    ConflictError, CreateQuickReplyData, EntityKind, FacadeError, Filter, Patch, QuickReply,
    RecordFacade, SqliteRecordStore, UpdateQuickReplyData, ValidationError,
};

fn reply(title: &str, shortcut: Option<&str>) -> CreateQuickReplyData {
    CreateQuickReplyData {
        title: title.to_string(),
        message: format!("{title} body"),
        shortcut: shortcut.map(str::to_string),
    }
}

#[test]
fn shortcut_is_unique_per_owner() {
    let conn = open_db_in_memory().unwrap();
    let crm = RecordFacade::new(SqliteRecordStore::try_new(&conn).unwrap());

    crm.create::<QuickReply>("owner-a", reply("Greeting", Some("/hi")))
        .unwrap();
    let err = crm
        .create::<QuickReply>("owner-a", reply("Hello", Some("/hi")))
        .unwrap_err();
    assert!(matches!(
        err,
        FacadeError::Conflict(ConflictError::Unique {
            kind: EntityKind::QuickReply,
            ..
        })
    ));
    assert!(!err.is_retryable());

    crm.create::<QuickReply>("owner-b", reply("Greeting", Some("/hi")))
        .unwrap();
    assert_eq!(
        crm.list::<QuickReply>("owner-a", &Filter::new())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn replies_without_shortcut_do_not_collide() {
    let conn = open_db_in_memory().unwrap();
    let crm = RecordFacade::new(SqliteRecordStore::try_new(&conn).unwrap());

    crm.create::<QuickReply>("owner-a", reply("One", None)).unwrap();
    crm.create::<QuickReply>("owner-a", reply("Two", None)).unwrap();

    assert_eq!(
        crm.list::<QuickReply>("owner-a", &Filter::new().eq("shortcut", serde_json::Value::Null))
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn update_onto_taken_shortcut_conflicts_and_keeps_record() {
    let conn = open_db_in_memory().unwrap();
    let crm = RecordFacade::new(SqliteRecordStore::try_new(&conn).unwrap());
    crm.create::<QuickReply>("owner-a", reply("Greeting", Some("/hi")))
        .unwrap();
    let other = crm
        .create::<QuickReply>("owner-a", reply("Bye", Some("/bye")))
        .unwrap();

    let err = crm
        .update::<QuickReply>(
            "owner-a",
            UpdateQuickReplyData {
                id: other.id,
                shortcut: Patch::Set("/hi".to_string()),
                ..UpdateQuickReplyData::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, FacadeError::Conflict(_)));
    assert_eq!(crm.get::<QuickReply>("owner-a", other.id).unwrap(), other);
}

#[test]
fn blank_shortcut_must_be_cleared_explicitly() {
    let conn = open_db_in_memory().unwrap();
    let crm = RecordFacade::new(SqliteRecordStore::try_new(&conn).unwrap());
    let created = crm
        .create::<QuickReply>("owner-a", reply("Greeting", Some("/hi")))
        .unwrap();

    let err = crm
        .update::<QuickReply>(
            "owner-a",
            UpdateQuickReplyData {
                id: created.id,
                shortcut: Patch::Set("  ".to_string()),
                ..UpdateQuickReplyData::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        FacadeError::Validation(ValidationError::MissingField("shortcut"))
    ));

    let cleared = crm
        .update::<QuickReply>(
            "owner-a",
            UpdateQuickReplyData {
                id: created.id,
                shortcut: Patch::Clear,
                ..UpdateQuickReplyData::default()
            },
        )
        .unwrap();
    assert_eq!(cleared.shortcut, None);
    assert_eq!(cleared.title, "Greeting");
}
