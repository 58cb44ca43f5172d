use crmcsv_core::db::open_db_in_memory;
use crmcsv_core::{
    ContactFields, ContactStatus, ContactStore, NewContact, RepoError, SegmentKind,
    SqliteContactStore,
};
use rusqlite::Connection;

fn fields(first: &str, last: &str, phone: &str) -> ContactFields {
    ContactFields {
        first_name: first.to_string(),
        last_name: last.to_string(),
        phone: phone.to_string(),
    }
}

#[test]
fn create_then_find_by_email_ignores_case() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::try_new(&conn).unwrap();

    let created = store
        .create_contact(&NewContact::subscribed(
            "Ada@Example.com",
            fields("Ada", "Lovelace", "555-1"),
        ))
        .unwrap();
    assert_eq!(created.status, ContactStatus::Subscribed);
    assert_eq!(created.first_name, "Ada");

    let found = store
        .find_contact_by_email("ada@example.com")
        .unwrap()
        .unwrap();
    assert_eq!(found.id, created.id);
    assert!(store
        .find_contact_by_email("nobody@example.com")
        .unwrap()
        .is_none());
}

#[test]
fn duplicate_email_is_rejected_on_create() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::try_new(&conn).unwrap();

    store
        .create_contact(&NewContact::subscribed("ada@example.com", fields("Ada", "", "")))
        .unwrap();
    let err = store
        .create_contact(&NewContact::subscribed("ADA@example.com", fields("Ada", "", "")))
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateEmail(_)));
}

#[test]
fn blank_email_fails_validation_before_insert() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::try_new(&conn).unwrap();

    let err = store
        .create_contact(&NewContact::subscribed(" ", ContactFields::default()))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(store.count_contacts().unwrap(), 0);
}

#[test]
fn update_overwrites_profile_fields_only() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::try_new(&conn).unwrap();

    let mut request = NewContact::subscribed("ada@example.com", fields("Ada", "Byron", "1"));
    request.status = ContactStatus::Pending;
    let contact = store.create_contact(&request).unwrap();

    store
        .update_contact(&contact, &fields("Augusta", "Lovelace", "2"))
        .unwrap();

    let reloaded = store
        .find_contact_by_email("ada@example.com")
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.first_name, "Augusta");
    assert_eq!(reloaded.last_name, "Lovelace");
    assert_eq!(reloaded.phone, "2");
    assert_eq!(reloaded.status, ContactStatus::Pending);
}

#[test]
fn update_of_deleted_contact_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::try_new(&conn).unwrap();
    let contact = store
        .create_contact(&NewContact::subscribed("ada@example.com", fields("Ada", "", "")))
        .unwrap();

    conn.execute("DELETE FROM contacts WHERE id = ?1;", [contact.id])
        .unwrap();

    let err = store
        .update_contact(&contact, &fields("Ada", "", ""))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == contact.id));
}

#[test]
fn find_or_create_segment_keeps_first_title() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::try_new(&conn).unwrap();

    let first = store.find_or_create_tag("random-user", "Random user").unwrap();
    let second = store.find_or_create_tag("random-user", "Other title").unwrap();
    assert_eq!(first, second);
    assert_eq!(second.title, "Random user");
    assert_eq!(second.kind, SegmentKind::Tag);

    let list = store
        .find_or_create_list("random-user", "Same slug, other table")
        .unwrap();
    assert_eq!(list.kind, SegmentKind::List);
    assert_eq!(store.count_segments(SegmentKind::Tag).unwrap(), 1);
    assert_eq!(store.count_segments(SegmentKind::List).unwrap(), 1);
}

#[test]
fn attaching_segments_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::try_new(&conn).unwrap();
    let contact = store
        .create_contact(&NewContact::subscribed("ada@example.com", fields("Ada", "", "")))
        .unwrap();
    let tag = store.find_or_create_tag("random-user", "Random user").unwrap();
    let list = store
        .find_or_create_list("random-user-list", "Random user list")
        .unwrap();

    for _ in 0..2 {
        store.attach_tag(&contact, &tag).unwrap();
        store.attach_list(&contact, &list).unwrap();
    }

    assert_eq!(
        store
            .contact_segment_slugs(contact.id, SegmentKind::Tag)
            .unwrap(),
        vec!["random-user".to_string()]
    );
    assert_eq!(
        store
            .contact_segment_slugs(contact.id, SegmentKind::List)
            .unwrap(),
        vec!["random-user-list".to_string()]
    );
}

#[test]
fn attaching_a_list_as_tag_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::try_new(&conn).unwrap();
    let contact = store
        .create_contact(&NewContact::subscribed("ada@example.com", fields("Ada", "", "")))
        .unwrap();
    let list = store.find_or_create_list("vip", "VIP").unwrap();

    let err = store.attach_tag(&contact, &list).unwrap_err();
    assert!(matches!(
        err,
        RepoError::SegmentKindMismatch {
            expected: SegmentKind::Tag,
            actual: SegmentKind::List
        }
    ));
}

#[test]
fn list_all_contacts_walks_every_page_in_id_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::try_new(&conn).unwrap();
    for idx in 0..7 {
        store
            .create_contact(&NewContact::subscribed(
                format!("user{idx}@example.com"),
                fields(&format!("User{idx}"), "", ""),
            ))
            .unwrap();
    }

    let first_page = store.list_contacts_page(None, 3).unwrap();
    assert_eq!(first_page.len(), 3);
    let next_page = store
        .list_contacts_page(Some(first_page[2].id), 3)
        .unwrap();
    assert_eq!(next_page[0].email, "user3@example.com");

    for page_size in [1, 3, 7, 50] {
        let emails: Vec<String> = store
            .list_all_contacts(page_size)
            .map(|contact| contact.unwrap().email)
            .collect();
        assert_eq!(emails.len(), 7, "page_size={page_size}");
        assert_eq!(emails[0], "user0@example.com");
        assert_eq!(emails[6], "user6@example.com");
    }
}

#[test]
fn list_all_contacts_on_empty_store_yields_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::try_new(&conn).unwrap();
    assert_eq!(store.list_all_contacts(10).count(), 0);
}

#[test]
fn probe_reports_missing_schema() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteContactStore::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("contacts")));
    assert!(err.is_environment());

    conn.execute_batch(
        "CREATE TABLE contacts (id INTEGER PRIMARY KEY, email TEXT NOT NULL);",
    )
    .unwrap();
    let err = SqliteContactStore::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::MissingRequiredColumn {
            table: "contacts",
            column: "first_name"
        }
    ));
}
