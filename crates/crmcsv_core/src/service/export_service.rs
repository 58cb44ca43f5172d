//! CSV export use-case service.
//!
//! # Responsibility
//! - Stream every stored contact into a CSV document.
//! - Optionally prefix the document with attachment response headers.
//!
//! # Invariants
//! - Output always starts with `First Name,Last Name,Email,Phone`, even for
//!   an empty store.
//! - At most one store page is held in memory at a time.
//! - Fields are quoted only when they contain a delimiter, quote or line
//!   break.
//! - File exports are staged next to the target and renamed into place on
//!   success; a failed export leaves any previous file untouched.

use crate::config::ExportConfig;
use crate::record::EXPORT_HEADER;
use crate::repo::contact_store::{ContactStore, RepoError};
use csv::WriterBuilder;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tempfile::NamedTempFile;

/// Export failures.
#[derive(Debug)]
pub enum ExportError {
    Store(RepoError),
    Csv(csv::Error),
    Io(std::io::Error),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "failed to read contacts: {err}"),
            Self::Csv(err) => write!(f, "failed to write CSV: {err}"),
            Self::Io(err) => write!(f, "failed to write export: {err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Csv(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<RepoError> for ExportError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

impl From<csv::Error> for ExportError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Summary of one export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub contacts: u64,
}

/// Export service over any contact store.
pub struct ContactExportService<S: ContactStore> {
    store: S,
    config: ExportConfig,
}

impl<S: ContactStore> ContactExportService<S> {
    pub fn new(store: S, config: ExportConfig) -> Self {
        Self { store, config }
    }

    /// Response headers for serving the export as a download.
    pub fn attachment_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", "text/csv; charset=utf-8".to_string()),
            (
                "Content-Disposition",
                format!("attachment; filename={}", self.config.file_name),
            ),
            (
                "Cache-Control",
                "no-cache, no-store, must-revalidate".to_string(),
            ),
            ("Pragma", "no-cache".to_string()),
            ("Expires", "0".to_string()),
        ]
    }

    /// Writes the CSV document to `writer`.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<ExportSummary, ExportError> {
        let started_at = Instant::now();
        info!(
            "event=export_run module=export status=start page_size={}",
            self.config.page_size
        );

        match self.write_rows(writer) {
            Ok(summary) => {
                info!(
                    "event=export_run module=export status=ok contacts={} duration_ms={}",
                    summary.contacts,
                    started_at.elapsed().as_millis()
                );
                Ok(summary)
            }
            Err(err) => {
                error!(
                    "event=export_run module=export status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Writes attachment headers, a blank line, then the CSV document.
    pub fn export_attachment<W: Write>(&self, mut writer: W) -> Result<ExportSummary, ExportError> {
        for (name, value) in self.attachment_headers() {
            write!(writer, "{name}: {value}\r\n")?;
        }
        writer.write_all(b"\r\n")?;
        self.export_csv(writer)
    }

    /// Writes the CSV document to a file, replacing any existing file.
    pub fn export_file(&self, path: impl AsRef<Path>) -> Result<ExportSummary, ExportError> {
        self.export_to_path(path.as_ref(), false)
    }

    /// Writes the attachment stream (headers, blank line, CSV) to a file.
    pub fn export_attachment_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ExportSummary, ExportError> {
        self.export_to_path(path.as_ref(), true)
    }

    fn export_to_path(&self, path: &Path, attachment: bool) -> Result<ExportSummary, ExportError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        // Removed on drop unless persisted.
        let mut staged = NamedTempFile::new_in(dir)?;

        let summary = {
            let mut writer = BufWriter::new(staged.as_file_mut());
            let summary = if attachment {
                self.export_attachment(&mut writer)?
            } else {
                self.export_csv(&mut writer)?
            };
            writer.flush()?;
            summary
        };

        staged.persist(path).map_err(|err| {
            error!(
                "event=export_run module=export status=error error_code=persist_failed error={}",
                err.error
            );
            ExportError::Io(err.error)
        })?;
        Ok(summary)
    }

    fn write_rows<W: Write>(&self, writer: W) -> Result<ExportSummary, ExportError> {
        let mut csv_writer = WriterBuilder::new().from_writer(writer);
        csv_writer.write_record(EXPORT_HEADER)?;

        let mut contacts = 0;
        for contact in self.store.list_all_contacts(self.config.page_size) {
            let contact = contact?;
            csv_writer.write_record([
                contact.first_name.as_str(),
                contact.last_name.as_str(),
                contact.email.as_str(),
                contact.phone.as_str(),
            ])?;
            contacts += 1;
        }

        csv_writer.flush()?;
        Ok(ExportSummary { contacts })
    }
}
