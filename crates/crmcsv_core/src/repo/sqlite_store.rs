//! SQLite-backed contact store.
//!
//! # Responsibility
//! - Implement `ContactStore` over the `contacts`, `tags`, `lists` and
//!   link tables.
//! - Probe the schema on construction so a missing store is reported
//!   before any import or export work starts.
//!
//! # Invariants
//! - Email matching uses `COLLATE NOCASE`.
//! - Segment links are written with `INSERT OR IGNORE`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::model::contact::{Contact, ContactFields, ContactId, ContactStatus, NewContact};
use crate::model::segment::{Segment, SegmentKind};
use crate::repo::contact_store::{ContactStore, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const CONTACT_SELECT_SQL: &str = "SELECT
    id,
    email,
    first_name,
    last_name,
    phone,
    status
FROM contacts";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "contacts",
        &["id", "email", "first_name", "last_name", "phone", "status"],
    ),
    ("tags", &["id", "slug", "title"]),
    ("lists", &["id", "slug", "title"]),
    ("contact_tags", &["contact_id", "tag_id"]),
    ("contact_lists", &["contact_id", "list_id"]),
];

/// SQLite-backed contact store.
pub struct SqliteContactStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactStore<'conn> {
    /// Constructs a store from a migrated connection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the connection
    ///   does not carry the contact store schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_store_ready(conn)?;
        Ok(Self { conn })
    }

    /// Returns slugs of the segments of `kind` attached to a contact.
    pub fn contact_segment_slugs(
        &self,
        contact_id: ContactId,
        kind: SegmentKind,
    ) -> RepoResult<Vec<String>> {
        let (segment_table, link_table, link_column) = segment_tables(kind);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT s.slug
             FROM {link_table} l
             INNER JOIN {segment_table} s ON s.id = l.{link_column}
             WHERE l.contact_id = ?1
             ORDER BY s.slug ASC;"
        ))?;
        let mut rows = stmt.query([contact_id])?;
        let mut slugs = Vec::new();
        while let Some(row) = rows.next()? {
            slugs.push(row.get(0)?);
        }
        Ok(slugs)
    }

    pub fn count_contacts(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM contacts;", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    pub fn count_segments(&self, kind: SegmentKind) -> RepoResult<u64> {
        let (segment_table, _, _) = segment_tables(kind);
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {segment_table};"),
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CONTACT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_contact_row(row)?));
        }
        Ok(None)
    }

    fn find_or_create_segment(
        &self,
        kind: SegmentKind,
        slug: &str,
        default_title: &str,
    ) -> RepoResult<Segment> {
        let (segment_table, _, _) = segment_tables(kind);
        self.conn.execute(
            &format!("INSERT OR IGNORE INTO {segment_table} (slug, title) VALUES (?1, ?2);"),
            params![slug, default_title],
        )?;

        let segment = self
            .conn
            .query_row(
                &format!("SELECT id, slug, title FROM {segment_table} WHERE slug = ?1;"),
                [slug],
                |row| {
                    Ok(Segment {
                        id: row.get("id")?,
                        kind,
                        slug: row.get("slug")?,
                        title: row.get("title")?,
                    })
                },
            )
            .optional()?;

        segment.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "{} `{slug}` missing after insert",
                kind.as_str()
            ))
        })
    }

    fn attach_segment(
        &self,
        contact: &Contact,
        segment: &Segment,
        expected: SegmentKind,
    ) -> RepoResult<()> {
        if segment.kind != expected {
            return Err(RepoError::SegmentKindMismatch {
                expected,
                actual: segment.kind,
            });
        }

        let (_, link_table, link_column) = segment_tables(expected);
        self.conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {link_table} (contact_id, {link_column}) VALUES (?1, ?2);"
            ),
            params![contact.id, segment.id],
        )?;
        Ok(())
    }
}

impl ContactStore for SqliteContactStore<'_> {
    fn find_contact_by_email(&self, email: &str) -> RepoResult<Option<Contact>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONTACT_SELECT_SQL}
             WHERE email = ?1 COLLATE NOCASE
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([email])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_contact_row(row)?));
        }
        Ok(None)
    }

    fn create_contact(&self, contact: &NewContact) -> RepoResult<Contact> {
        contact.validate()?;

        let inserted = self.conn.execute(
            "INSERT INTO contacts (
                email,
                first_name,
                last_name,
                phone,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                contact.email.as_str(),
                contact.fields.first_name.as_str(),
                contact.fields.last_name.as_str(),
                contact.fields.phone.as_str(),
                contact.status.as_str(),
            ],
        );
        if let Err(err) = inserted {
            return Err(map_insert_error(err, &contact.email));
        }

        let id = self.conn.last_insert_rowid();
        self.get_contact(id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("contact {id} missing in read-back after insert"))
        })
    }

    fn update_contact(&self, contact: &Contact, fields: &ContactFields) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE contacts
             SET
                first_name = ?1,
                last_name = ?2,
                phone = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?4;",
            params![
                fields.first_name.as_str(),
                fields.last_name.as_str(),
                fields.phone.as_str(),
                contact.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(contact.id));
        }
        Ok(())
    }

    fn find_or_create_tag(&self, slug: &str, default_title: &str) -> RepoResult<Segment> {
        self.find_or_create_segment(SegmentKind::Tag, slug, default_title)
    }

    fn find_or_create_list(&self, slug: &str, default_title: &str) -> RepoResult<Segment> {
        self.find_or_create_segment(SegmentKind::List, slug, default_title)
    }

    fn attach_tag(&self, contact: &Contact, tag: &Segment) -> RepoResult<()> {
        self.attach_segment(contact, tag, SegmentKind::Tag)
    }

    fn attach_list(&self, contact: &Contact, list: &Segment) -> RepoResult<()> {
        self.attach_segment(contact, list, SegmentKind::List)
    }

    fn list_contacts_page(
        &self,
        after: Option<ContactId>,
        limit: u32,
    ) -> RepoResult<Vec<Contact>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONTACT_SELECT_SQL}
             WHERE id > ?1
             ORDER BY id ASC
             LIMIT ?2;"
        ))?;
        let mut rows = stmt.query(params![after.unwrap_or(0), i64::from(limit)])?;
        let mut contacts = Vec::new();
        while let Some(row) = rows.next()? {
            contacts.push(parse_contact_row(row)?);
        }
        Ok(contacts)
    }
}

fn parse_contact_row(row: &Row<'_>) -> RepoResult<Contact> {
    let status_text: String = row.get("status")?;
    let status = ContactStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid contact status `{status_text}` in contacts.status"
        ))
    })?;

    Ok(Contact {
        id: row.get("id")?,
        email: row.get("email")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        phone: row.get("phone")?,
        status,
    })
}

fn map_insert_error(err: rusqlite::Error, email: &str) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return RepoError::DuplicateEmail(email.to_string());
        }
    }
    RepoError::from(err)
}

fn segment_tables(kind: SegmentKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        SegmentKind::Tag => ("tags", "contact_tags", "tag_id"),
        SegmentKind::List => ("lists", "contact_lists", "list_id"),
    }
}

fn ensure_store_ready(conn: &Connection) -> RepoResult<()> {
    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
