//! Contact domain model.
//!
//! # Responsibility
//! - Define the canonical contact record read back from the store.
//! - Define the profile fields written by import create/update paths.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused.
//! - `email` is non-blank for every persisted contact.
//! - Import updates touch profile fields only; `status` is set on create.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned stable identifier.
pub type ContactId = i64;

/// Subscription state of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    /// Default for contacts created by the importer.
    #[default]
    Subscribed,
    Pending,
    Unsubscribed,
    Bounced,
    Complained,
}

impl ContactStatus {
    /// Stable string stored in `contacts.status`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subscribed => "subscribed",
            Self::Pending => "pending",
            Self::Unsubscribed => "unsubscribed",
            Self::Bounced => "bounced",
            Self::Complained => "complained",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "subscribed" => Some(Self::Subscribed),
            "pending" => Some(Self::Pending),
            "unsubscribed" => Some(Self::Unsubscribed),
            "bounced" => Some(Self::Bounced),
            "complained" => Some(Self::Complained),
            _ => None,
        }
    }
}

/// Contact record as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub status: ContactStatus,
}

/// Profile fields overwritten on every reconciled row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFields {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Create request for a contact that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub email: String,
    pub fields: ContactFields,
    pub status: ContactStatus,
}

impl NewContact {
    /// Builds a create request with status `subscribed`.
    pub fn subscribed(email: impl Into<String>, fields: ContactFields) -> Self {
        Self {
            email: email.into(),
            fields,
            status: ContactStatus::Subscribed,
        }
    }

    /// Checks the invariants the store relies on before inserting.
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        if self.email.trim().is_empty() {
            return Err(ContactValidationError::BlankEmail);
        }
        Ok(())
    }
}

/// Validation failures for contact write requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactValidationError {
    BlankEmail,
}

impl Display for ContactValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankEmail => write!(f, "contact email must not be blank"),
        }
    }
}

impl Error for ContactValidationError {}

#[cfg(test)]
mod tests {
    use super::{ContactFields, ContactStatus, ContactValidationError, NewContact};

    #[test]
    fn status_strings_round_trip() {
        for status in [
            ContactStatus::Subscribed,
            ContactStatus::Pending,
            ContactStatus::Unsubscribed,
            ContactStatus::Bounced,
            ContactStatus::Complained,
        ] {
            assert_eq!(ContactStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ContactStatus::parse("SUBSCRIBED"), None);
    }

    #[test]
    fn new_contact_defaults_to_subscribed() {
        let contact = NewContact::subscribed("ada@example.com", ContactFields::default());
        assert_eq!(contact.status, ContactStatus::Subscribed);
        assert!(contact.validate().is_ok());
    }

    #[test]
    fn blank_email_fails_validation() {
        let contact = NewContact::subscribed("   ", ContactFields::default());
        assert_eq!(
            contact.validate().unwrap_err(),
            ContactValidationError::BlankEmail
        );
    }
}
