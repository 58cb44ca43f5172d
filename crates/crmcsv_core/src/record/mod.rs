//! CSV record shaping: from one uploaded row to one canonical contact.
//!
//! # Responsibility
//! - Pick the row layout from the discarded header row.
//! - Extract fields by position, apply the email policy, split names and
//!   resolve the phone fallback.
//!
//! # Invariants
//! - A derived row always carries a non-empty email.
//! - Under `EmailPolicy::Strict` the email also passes `is_email`.
//! - Name split happens on the first space only; the remainder is the last
//!   name and may be empty.
//! - Exported-layout profile fields are taken verbatim under either policy;
//!   only the email is gated.

pub mod sanitize;

use crate::model::contact::ContactFields;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub use sanitize::{is_email, sanitize_email, sanitize_text_field};

/// Header written by the exporter. Also recognised on import.
pub const EXPORT_HEADER: [&str; 4] = ["First Name", "Last Name", "Email", "Phone"];

/// How strictly uploaded fields are cleaned and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailPolicy {
    /// Sanitize every field and require a syntactically valid email.
    #[default]
    Strict,
    /// Use fields as uploaded; only an empty email skips the row.
    Lenient,
}

impl EmailPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

/// Column layout of the data rows in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLayout {
    /// `full name, (unused), email, work phone, mobile phone`.
    Positional,
    /// `first name, last name, email, phone`, as written by the exporter.
    Exported,
}

impl RowLayout {
    /// Chooses the layout from the header row. The header itself is never
    /// imported.
    pub fn detect(header: &StringRecord) -> Self {
        let matches_export = header.len() == EXPORT_HEADER.len()
            && header
                .iter()
                .zip(EXPORT_HEADER)
                .all(|(actual, expected)| {
                    actual
                        .trim_start_matches('\u{feff}')
                        .trim()
                        .eq_ignore_ascii_case(expected)
                });
        if matches_export {
            Self::Exported
        } else {
            Self::Positional
        }
    }

    /// Minimum number of fields a data row needs.
    pub fn min_fields(self) -> usize {
        match self {
            Self::Positional => 5,
            Self::Exported => EXPORT_HEADER.len(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positional => "positional",
            Self::Exported => "exported",
        }
    }
}

/// Canonical contact derived from one data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRow {
    pub email: String,
    pub fields: ContactFields,
}

/// Why a row was not reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    Malformed { field_count: usize, expected: usize },
    MissingEmail,
    InvalidEmail(String),
    Unreadable(String),
}

impl RowRejection {
    /// Stable short code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "malformed_row",
            Self::MissingEmail => "missing_email",
            Self::InvalidEmail(_) => "invalid_email",
            Self::Unreadable(_) => "unreadable_row",
        }
    }
}

impl Display for RowRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed {
                field_count,
                expected,
            } => write!(
                f,
                "malformed row: {field_count} field(s), expected at least {expected}"
            ),
            Self::MissingEmail => write!(f, "email is empty"),
            Self::InvalidEmail(value) => write!(f, "email `{value}` is not a valid address"),
            Self::Unreadable(details) => write!(f, "unreadable row: {details}"),
        }
    }
}

/// Derives the canonical contact for one data row.
pub fn derive_contact_row(
    record: &StringRecord,
    layout: RowLayout,
    policy: EmailPolicy,
) -> Result<ContactRow, RowRejection> {
    if record.len() < layout.min_fields() {
        return Err(RowRejection::Malformed {
            field_count: record.len(),
            expected: layout.min_fields(),
        });
    }

    let field = |index: usize| -> String {
        let raw = record.get(index).unwrap_or_default();
        match policy {
            EmailPolicy::Strict => sanitize_text_field(raw),
            EmailPolicy::Lenient => raw.to_string(),
        }
    };

    let email = resolve_email(record.get(2).unwrap_or_default(), policy)?;

    let fields = match layout {
        RowLayout::Positional => {
            let (first_name, last_name) = split_full_name(&field(0));
            ContactFields {
                first_name: clean_name_part(first_name, policy),
                last_name: clean_name_part(last_name, policy),
                phone: resolve_phone(&field(4), &field(3)),
            }
        }
        // Exported values were already accepted by the store once.
        RowLayout::Exported => {
            let raw = |index: usize| record.get(index).unwrap_or_default().to_string();
            ContactFields {
                first_name: raw(0),
                last_name: raw(1),
                phone: raw(3),
            }
        }
    };

    Ok(ContactRow { email, fields })
}

/// Splits a full name on its first space into `(first, last)`.
///
/// `"Ada"` yields an empty last name; `"Ada Marie Lovelace"` keeps
/// `"Marie Lovelace"` as the last name.
pub fn split_full_name(full_name: &str) -> (String, String) {
    match full_name.split_once(' ') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (full_name.to_string(), String::new()),
    }
}

/// Mobile phone wins when present, otherwise the work phone is used.
pub fn resolve_phone(mobile_phone: &str, work_phone: &str) -> String {
    if mobile_phone.is_empty() {
        work_phone.to_string()
    } else {
        mobile_phone.to_string()
    }
}

fn resolve_email(raw: &str, policy: EmailPolicy) -> Result<String, RowRejection> {
    match policy {
        EmailPolicy::Lenient => {
            if raw.is_empty() {
                Err(RowRejection::MissingEmail)
            } else {
                Ok(raw.to_string())
            }
        }
        EmailPolicy::Strict => {
            if raw.trim().is_empty() {
                return Err(RowRejection::MissingEmail);
            }
            let email = sanitize_email(raw);
            if email.is_empty() || !is_email(&email) {
                return Err(RowRejection::InvalidEmail(sanitize_text_field(raw)));
            }
            Ok(email)
        }
    }
}

fn clean_name_part(value: String, policy: EmailPolicy) -> String {
    match policy {
        EmailPolicy::Strict => sanitize_text_field(&value),
        EmailPolicy::Lenient => value,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        derive_contact_row, resolve_phone, split_full_name, EmailPolicy, RowLayout, RowRejection,
    };
    use csv::StringRecord;

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn name_split_keeps_remainder_as_last_name() {
        assert_eq!(
            split_full_name("Ada Lovelace"),
            ("Ada".to_string(), "Lovelace".to_string())
        );
        assert_eq!(split_full_name("Ada"), ("Ada".to_string(), String::new()));
        assert_eq!(
            split_full_name("Ada Marie Lovelace"),
            ("Ada".to_string(), "Marie Lovelace".to_string())
        );
    }

    #[test]
    fn phone_prefers_mobile_then_work() {
        assert_eq!(resolve_phone("555-1", "555-2"), "555-1");
        assert_eq!(resolve_phone("", "555-2"), "555-2");
        assert_eq!(resolve_phone("", ""), "");
    }

    #[test]
    fn layout_detects_export_header_case_insensitively() {
        assert_eq!(
            RowLayout::detect(&record(&["first name", " Last Name", "EMAIL", "Phone"])),
            RowLayout::Exported
        );
        assert_eq!(
            RowLayout::detect(&record(&["Name", "Company", "Email", "Work", "Mobile"])),
            RowLayout::Positional
        );
        assert_eq!(RowLayout::detect(&record(&["anything"])), RowLayout::Positional);
    }

    #[test]
    fn positional_row_is_sanitized_under_strict_policy() {
        let row = derive_contact_row(
            &record(&[" <i>Ada</i>  Lovelace ", "ACME", " ada@example.com ", "555-2", ""]),
            RowLayout::Positional,
            EmailPolicy::Strict,
        )
        .unwrap();
        assert_eq!(row.email, "ada@example.com");
        assert_eq!(row.fields.first_name, "Ada");
        assert_eq!(row.fields.last_name, "Lovelace");
        assert_eq!(row.fields.phone, "555-2");
    }

    #[test]
    fn lenient_policy_uses_raw_fields() {
        let row = derive_contact_row(
            &record(&["Ada  Lovelace", "", "not-an-email", "", " 555-1"]),
            RowLayout::Positional,
            EmailPolicy::Lenient,
        )
        .unwrap();
        assert_eq!(row.email, "not-an-email");
        assert_eq!(row.fields.first_name, "Ada");
        assert_eq!(row.fields.last_name, " Lovelace");
        assert_eq!(row.fields.phone, " 555-1");
    }

    #[test]
    fn rejections_cover_short_rows_and_bad_emails() {
        let short = derive_contact_row(
            &record(&["Ada", "", "ada@example.com"]),
            RowLayout::Positional,
            EmailPolicy::Strict,
        )
        .unwrap_err();
        assert_eq!(
            short,
            RowRejection::Malformed {
                field_count: 3,
                expected: 5
            }
        );

        let empty = derive_contact_row(
            &record(&["Ada", "", "  ", "", ""]),
            RowLayout::Positional,
            EmailPolicy::Strict,
        )
        .unwrap_err();
        assert_eq!(empty, RowRejection::MissingEmail);

        let invalid = derive_contact_row(
            &record(&["Ada", "", "ada@localhost", "", ""]),
            RowLayout::Positional,
            EmailPolicy::Strict,
        )
        .unwrap_err();
        assert_eq!(invalid.code(), "invalid_email");
    }

    #[test]
    fn exported_layout_maps_first_last_email_phone() {
        let row = derive_contact_row(
            &record(&["Ada", "Marie Lovelace", "ada@example.com", "555-1"]),
            RowLayout::Exported,
            EmailPolicy::Strict,
        )
        .unwrap();
        assert_eq!(row.fields.first_name, "Ada");
        assert_eq!(row.fields.last_name, "Marie Lovelace");
        assert_eq!(row.fields.phone, "555-1");
    }

    #[test]
    fn exported_layout_keeps_profile_fields_verbatim_under_strict_policy() {
        let row = derive_contact_row(
            &record(&["Ada", " Lovelace", " ada@example.com ", "555  0100"]),
            RowLayout::Exported,
            EmailPolicy::Strict,
        )
        .unwrap();
        assert_eq!(row.email, "ada@example.com");
        assert_eq!(row.fields.last_name, " Lovelace");
        assert_eq!(row.fields.phone, "555  0100");

        let invalid = derive_contact_row(
            &record(&["Ada", "", "ada@localhost", ""]),
            RowLayout::Exported,
            EmailPolicy::Strict,
        )
        .unwrap_err();
        assert_eq!(invalid.code(), "invalid_email");
    }
}
