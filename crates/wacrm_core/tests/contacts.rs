use rusqlite::Connection;
use uuid::Uuid;
use wacrm_core::db::open_db_in_memory;
use wacrm_core::{
    ConflictError, Contact, ContactList, ContactListMember, CreateContactData,
    CreateContactListData, EntityKind, FacadeError, Filter, Patch, RecordFacade,
    SqliteRecordStore, UpdateContactData, ValidationError,
};

const OWNER: &str = "owner-a";

fn facade(conn: &Connection) -> RecordFacade<SqliteRecordStore<'_>> {
    RecordFacade::new(SqliteRecordStore::try_new(conn).unwrap())
}

fn contact_data(name: &str, phone: &str) -> CreateContactData {
    CreateContactData {
        name: name.to_string(),
        phone_number: phone.to_string(),
        email: None,
    }
}

fn list_data(name: &str) -> CreateContactListData {
    CreateContactListData {
        name: name.to_string(),
        description: None,
    }
}

#[test]
fn create_then_get_returns_equal_record() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);

    let created = crm
        .create::<Contact>(
            OWNER,
            CreateContactData {
                email: Some("ana@example.com".to_string()),
                ..contact_data("Ana", "+55 11 98765-4321")
            },
        )
        .unwrap();

    assert_eq!(created.user_id, OWNER);
    assert_eq!(created.created_at, created.updated_at);
    let loaded = crm.get::<Contact>(OWNER, created.id).unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn create_rejects_blank_name_and_malformed_formats() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);

    let err = crm
        .create::<Contact>(OWNER, contact_data("   ", "+5511987654321"))
        .unwrap_err();
    assert!(matches!(
        err,
        FacadeError::Validation(ValidationError::MissingField("name"))
    ));

    let err = crm
        .create::<Contact>(OWNER, contact_data("Ana", "call me"))
        .unwrap_err();
    assert!(matches!(
        err,
        FacadeError::Validation(ValidationError::InvalidPhone { .. })
    ));

    let err = crm
        .create::<Contact>(
            OWNER,
            CreateContactData {
                email: Some("not-an-email".to_string()),
                ..contact_data("Ana", "+5511987654321")
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        FacadeError::Validation(ValidationError::InvalidEmail { .. })
    ));

    assert!(crm.list::<Contact>(OWNER, &Filter::new()).unwrap().is_empty());
}

#[test]
fn update_can_clear_optional_email() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);
    let contact = crm
        .create::<Contact>(
            OWNER,
            CreateContactData {
                email: Some("ana@example.com".to_string()),
                ..contact_data("Ana", "+5511987654321")
            },
        )
        .unwrap();

    let updated = crm
        .update::<Contact>(
            OWNER,
            UpdateContactData {
                id: contact.id,
                email: Patch::Clear,
                ..UpdateContactData::default()
            },
        )
        .unwrap();

    assert_eq!(updated.email, None);
    assert_eq!(updated.name, "Ana");
    assert!(updated.updated_at > contact.updated_at);
}

#[test]
fn membership_is_unique_per_list() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);
    let contact = crm
        .create::<Contact>(OWNER, contact_data("Ana", "+5511987654321"))
        .unwrap();
    let list = crm.create::<ContactList>(OWNER, list_data("VIP")).unwrap();

    let member = crm.add_contact_to_list(OWNER, list.id, contact.id).unwrap();
    assert_eq!(member.contact_id, contact.id);
    assert_eq!(member.added_at, member.created_at);

    let err = crm
        .add_contact_to_list(OWNER, list.id, contact.id)
        .unwrap_err();
    assert!(matches!(
        err,
        FacadeError::Conflict(ConflictError::Unique {
            kind: EntityKind::ContactListMember,
            ..
        })
    ));
}

#[test]
fn membership_requires_records_of_same_owner() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);
    let foreign_contact = crm
        .create::<Contact>("owner-b", contact_data("Bia", "+5511912345678"))
        .unwrap();
    let list = crm.create::<ContactList>(OWNER, list_data("VIP")).unwrap();

    let err = crm
        .add_contact_to_list(OWNER, list.id, foreign_contact.id)
        .unwrap_err();
    assert!(matches!(
        err,
        FacadeError::Validation(ValidationError::UnknownReference {
            field: "contact_id",
            ..
        })
    ));
}

#[test]
fn deleting_list_cascades_members_but_keeps_contacts() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);
    let ana = crm
        .create::<Contact>(OWNER, contact_data("Ana", "+5511987654321"))
        .unwrap();
    let bia = crm
        .create::<Contact>(OWNER, contact_data("Bia", "+5511912345678"))
        .unwrap();
    let list = crm.create::<ContactList>(OWNER, list_data("VIP")).unwrap();
    crm.add_contact_to_list(OWNER, list.id, ana.id).unwrap();
    crm.add_contact_to_list(OWNER, list.id, bia.id).unwrap();

    let mut in_list = crm
        .list_contacts_in_list(OWNER, list.id)
        .unwrap()
        .into_iter()
        .map(|contact| contact.id)
        .collect::<Vec<_>>();
    in_list.sort();
    let mut expected = vec![ana.id, bia.id];
    expected.sort();
    assert_eq!(in_list, expected);

    crm.delete::<ContactList>(OWNER, list.id).unwrap();

    assert!(crm
        .list::<ContactListMember>(OWNER, &Filter::new())
        .unwrap()
        .is_empty());
    assert_eq!(crm.list::<Contact>(OWNER, &Filter::new()).unwrap().len(), 2);
    assert!(matches!(
        crm.list_contacts_in_list(OWNER, list.id).unwrap_err(),
        FacadeError::NotFound {
            kind: EntityKind::ContactList,
            ..
        }
    ));
}

#[test]
fn deleting_contact_removes_its_memberships() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);
    let ana = crm
        .create::<Contact>(OWNER, contact_data("Ana", "+5511987654321"))
        .unwrap();
    let list = crm.create::<ContactList>(OWNER, list_data("VIP")).unwrap();
    crm.add_contact_to_list(OWNER, list.id, ana.id).unwrap();

    crm.delete::<Contact>(OWNER, ana.id).unwrap();

    assert!(crm.list_members(OWNER, list.id).unwrap().is_empty());
    assert!(crm.get::<ContactList>(OWNER, list.id).is_ok());
}

#[test]
fn remove_contact_from_list_reports_missing_membership() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);
    let ana = crm
        .create::<Contact>(OWNER, contact_data("Ana", "+5511987654321"))
        .unwrap();
    let list = crm.create::<ContactList>(OWNER, list_data("VIP")).unwrap();
    crm.add_contact_to_list(OWNER, list.id, ana.id).unwrap();

    crm.remove_contact_from_list(OWNER, list.id, ana.id).unwrap();
    assert!(crm.list_members(OWNER, list.id).unwrap().is_empty());

    let err = crm
        .remove_contact_from_list(OWNER, list.id, ana.id)
        .unwrap_err();
    assert!(matches!(
        err,
        FacadeError::NotMember { contact_list_id, contact_id }
            if contact_list_id == list.id && contact_id == ana.id
    ));
    assert_eq!(err.code(), "not_found");
}

#[test]
fn delete_unknown_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let crm = facade(&conn);
    let id = Uuid::new_v4();

    let err = crm.delete::<Contact>(OWNER, id).unwrap_err();
    assert!(matches!(
        err,
        FacadeError::NotFound {
            kind: EntityKind::Contact,
            id: missing,
        } if missing == id
    ));
}
