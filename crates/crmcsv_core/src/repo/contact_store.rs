//! Contact store contract consumed by the importer and exporter.
//!
//! # Responsibility
//! - Define the narrow store interface (lookup, create, update, segment
//!   resolution and attachment, paged listing).
//! - Provide a lazy iterator over every contact built on paged listing.
//!
//! # Invariants
//! - `attach_tag`/`attach_list` are idempotent.
//! - `find_or_create_*` never creates a second segment for the same slug.
//! - Pages are ordered by ascending `ContactId`; `after` is exclusive.

use crate::db::DbError;
use crate::model::contact::{Contact, ContactFields, ContactId, ContactValidationError, NewContact};
use crate::model::segment::{Segment, SegmentKind};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Store error for contact and segment operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ContactValidationError),
    Db(DbError),
    NotFound(ContactId),
    DuplicateEmail(String),
    SegmentKindMismatch {
        expected: SegmentKind,
        actual: SegmentKind,
    },
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Whether this error means the store itself is absent or unusable,
    /// as opposed to a failure of one operation.
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            Self::MissingRequiredTable(_) | Self::MissingRequiredColumn { .. }
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "contact not found: {id}"),
            Self::DuplicateEmail(email) => {
                write!(f, "a contact with email `{email}` already exists")
            }
            Self::SegmentKindMismatch { expected, actual } => write!(
                f,
                "expected a {} segment, got a {} segment",
                expected.as_str(),
                actual.as_str()
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted contact data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "contact store is missing required table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "contact store table `{table}` is missing required column `{column}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ContactValidationError> for RepoError {
    fn from(value: ContactValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Contact store interface.
///
/// Every mutating call commits on its own; callers get per-call, not
/// per-batch, durability.
pub trait ContactStore {
    /// Finds the contact whose email matches under the store's case rules.
    fn find_contact_by_email(&self, email: &str) -> RepoResult<Option<Contact>>;
    /// Creates a contact and returns it as persisted.
    fn create_contact(&self, contact: &NewContact) -> RepoResult<Contact>;
    /// Overwrites the profile fields of an existing contact.
    fn update_contact(&self, contact: &Contact, fields: &ContactFields) -> RepoResult<()>;
    /// Returns the tag with `slug`, creating it with `default_title` if absent.
    fn find_or_create_tag(&self, slug: &str, default_title: &str) -> RepoResult<Segment>;
    /// Returns the list with `slug`, creating it with `default_title` if absent.
    fn find_or_create_list(&self, slug: &str, default_title: &str) -> RepoResult<Segment>;
    fn attach_tag(&self, contact: &Contact, tag: &Segment) -> RepoResult<()>;
    fn attach_list(&self, contact: &Contact, list: &Segment) -> RepoResult<()>;
    /// Returns up to `limit` contacts with id greater than `after`.
    fn list_contacts_page(
        &self,
        after: Option<ContactId>,
        limit: u32,
    ) -> RepoResult<Vec<Contact>>;

    /// Lazily walks every contact, fetching `page_size` rows at a time.
    fn list_all_contacts(&self, page_size: u32) -> ContactPages<'_, Self>
    where
        Self: Sized,
    {
        ContactPages::new(self, page_size)
    }
}

/// Lazy keyset-paginated sequence of contacts.
///
/// Holds at most one page in memory. Stops after the first error.
pub struct ContactPages<'s, S: ContactStore> {
    store: &'s S,
    page_size: u32,
    after: Option<ContactId>,
    buffered: std::vec::IntoIter<Contact>,
    exhausted: bool,
}

impl<'s, S: ContactStore> ContactPages<'s, S> {
    pub fn new(store: &'s S, page_size: u32) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            after: None,
            buffered: Vec::new().into_iter(),
            exhausted: false,
        }
    }
}

impl<S: ContactStore> Iterator for ContactPages<'_, S> {
    type Item = RepoResult<Contact>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(contact) = self.buffered.next() {
            return Some(Ok(contact));
        }
        if self.exhausted {
            return None;
        }

        match self.store.list_contacts_page(self.after, self.page_size) {
            Ok(page) => {
                if page.len() < self.page_size as usize {
                    self.exhausted = true;
                }
                if let Some(last) = page.last() {
                    self.after = Some(last.id);
                }
                self.buffered = page.into_iter();
                self.buffered.next().map(Ok)
            }
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}
