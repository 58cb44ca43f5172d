//! CSV import use-case service.
//!
//! # Responsibility
//! - Resolve the target tag and list once per run.
//! - Walk data rows in file order and upsert one contact per valid row.
//! - Collect per-row outcomes and render operator notices.
//!
//! # Invariants
//! - Row 0 is always discarded; it only selects the row layout.
//! - A row yields exactly one outcome; a failed row never stops the batch.
//! - Every store call commits on its own. Rows reconciled before a failure
//!   or an interrupted read stay committed.
//! - Segment resolution failure aborts before any row is read.

use crate::config::{ImporterConfig, SegmentTarget};
use crate::model::contact::NewContact;
use crate::model::segment::{Segment, SegmentKind};
use crate::record::{derive_contact_row, ContactRow, RowLayout, RowRejection};
use crate::repo::contact_store::{ContactStore, RepoError, RepoResult};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Batch-level import failures. Row-level problems are outcomes, not errors.
#[derive(Debug)]
pub enum ImportError {
    /// The upload could not be opened.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The target tag or list could not be resolved or created.
    Setup {
        kind: SegmentKind,
        slug: String,
        source: RepoError,
    },
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to open the CSV file `{}`: {source}", path.display())
            }
            Self::Setup { kind, slug, source } => write!(
                f,
                "failed to retrieve or create {} `{slug}`: {source}",
                kind.as_str()
            ),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Setup { source, .. } => Some(source),
        }
    }
}

/// Result of one data row. `line` is the 1-based line in the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Created {
        line: u64,
        email: String,
    },
    Updated {
        line: u64,
        email: String,
    },
    Skipped {
        line: u64,
        reason: RowRejection,
    },
    Failed {
        line: u64,
        email: String,
        reason: String,
    },
}

impl RowOutcome {
    pub fn line(&self) -> u64 {
        match self {
            Self::Created { line, .. }
            | Self::Updated { line, .. }
            | Self::Skipped { line, .. }
            | Self::Failed { line, .. } => *line,
        }
    }

    fn status(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Severity of an operator notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// One human-readable status line shown after an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self.level {
            NoticeLevel::Success => "success",
            NoticeLevel::Error => "error",
            NoticeLevel::Info => "info",
        };
        write!(f, "[{label}] {}", self.message)
    }
}

/// Outcome counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Everything one import run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub layout: RowLayout,
    pub tag: Segment,
    pub list: Segment,
    pub outcomes: Vec<RowOutcome>,
    /// Set when reading stopped early on an I/O error.
    pub interrupted: Option<String>,
}

impl ImportReport {
    pub fn counts(&self) -> ImportCounts {
        let mut counts = ImportCounts::default();
        for outcome in &self.outcomes {
            match outcome {
                RowOutcome::Created { .. } => counts.created += 1,
                RowOutcome::Updated { .. } => counts.updated += 1,
                RowOutcome::Skipped { .. } => counts.skipped += 1,
                RowOutcome::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }

    /// Renders operator notices: one per created, updated or failed row,
    /// an interruption notice if any, and a closing summary. Skipped rows
    /// are only counted.
    pub fn notices(&self) -> Vec<Notice> {
        let mut notices: Vec<Notice> = self
            .outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                RowOutcome::Created { email, .. } => Some(Notice::new(
                    NoticeLevel::Success,
                    format!(
                        "Contact with email {email} imported and added to tag and list successfully."
                    ),
                )),
                RowOutcome::Updated { email, .. } => Some(Notice::new(
                    NoticeLevel::Success,
                    format!("Contact with email {email} updated successfully."),
                )),
                RowOutcome::Failed {
                    line,
                    email,
                    reason,
                } => Some(Notice::new(
                    NoticeLevel::Error,
                    format!("Failed to import contact with email {email} (line {line}): {reason}."),
                )),
                RowOutcome::Skipped { .. } => None,
            })
            .collect();

        if let Some(reason) = &self.interrupted {
            notices.push(Notice::new(
                NoticeLevel::Error,
                format!("Reading the CSV file stopped early: {reason}."),
            ));
        }

        let counts = self.counts();
        notices.push(Notice::new(
            NoticeLevel::Info,
            format!(
                "Import finished: {} created, {} updated, {} skipped, {} failed.",
                counts.created, counts.updated, counts.skipped, counts.failed
            ),
        ));
        notices
    }
}

/// Import service over any contact store.
pub struct ContactImportService<S: ContactStore> {
    store: S,
    config: ImporterConfig,
}

impl<S: ContactStore> ContactImportService<S> {
    pub fn new(store: S, config: ImporterConfig) -> Self {
        Self { store, config }
    }

    /// Opens `path` and imports it.
    ///
    /// # Errors
    /// - `ImportError::Io` when the file cannot be opened; the store is not
    ///   touched in that case.
    /// - `ImportError::Setup` when the tag or list cannot be resolved.
    pub fn import_file(&self, path: impl AsRef<Path>) -> Result<ImportReport, ImportError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| {
            error!(
                "event=import_run module=import status=error error_code=file_open_failed error={}",
                source
            );
            ImportError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        self.import_reader(BufReader::new(file))
    }

    /// Imports CSV content from any reader.
    pub fn import_reader<R: Read>(&self, reader: R) -> Result<ImportReport, ImportError> {
        let started_at = Instant::now();
        info!(
            "event=import_run module=import status=start policy={}",
            self.config.email_policy.as_str()
        );

        let tag = self.resolve_segment(SegmentKind::Tag, &self.config.tag)?;
        let list = self.resolve_segment(SegmentKind::List, &self.config.list)?;

        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut report = ImportReport {
            layout: RowLayout::Positional,
            tag,
            list,
            outcomes: Vec::new(),
            interrupted: None,
        };
        let mut header_seen = false;

        for result in csv_reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(err) if err.is_io_error() => {
                    warn!(
                        "event=import_run module=import status=interrupted rows={} error={}",
                        report.outcomes.len(),
                        err
                    );
                    report.interrupted = Some(err.to_string());
                    break;
                }
                Err(err) => {
                    let line = err.position().map_or(0, |position| position.line());
                    if !header_seen {
                        header_seen = true;
                        continue;
                    }
                    let outcome = RowOutcome::Skipped {
                        line,
                        reason: RowRejection::Unreadable(err.to_string()),
                    };
                    log_outcome(&outcome);
                    report.outcomes.push(outcome);
                    continue;
                }
            };

            if !header_seen {
                header_seen = true;
                report.layout = RowLayout::detect(&record);
                debug!(
                    "event=import_header module=import status=ok layout={}",
                    report.layout.as_str()
                );
                continue;
            }

            let outcome = self.process_record(&record, &report);
            log_outcome(&outcome);
            report.outcomes.push(outcome);
        }

        let counts = report.counts();
        info!(
            "event=import_run module=import status=ok layout={} created={} updated={} skipped={} failed={} duration_ms={}",
            report.layout.as_str(),
            counts.created,
            counts.updated,
            counts.skipped,
            counts.failed,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    fn resolve_segment(
        &self,
        kind: SegmentKind,
        target: &SegmentTarget,
    ) -> Result<Segment, ImportError> {
        let resolved = match kind {
            SegmentKind::Tag => self.store.find_or_create_tag(&target.slug, &target.title),
            SegmentKind::List => self.store.find_or_create_list(&target.slug, &target.title),
        };

        match resolved {
            Ok(segment) => {
                debug!(
                    "event=segment_resolve module=import status=ok kind={} id={}",
                    kind.as_str(),
                    segment.id
                );
                Ok(segment)
            }
            Err(source) => {
                error!(
                    "event=segment_resolve module=import status=error kind={} error={}",
                    kind.as_str(),
                    source
                );
                Err(ImportError::Setup {
                    kind,
                    slug: target.slug.clone(),
                    source,
                })
            }
        }
    }

    fn process_record(&self, record: &StringRecord, report: &ImportReport) -> RowOutcome {
        let line = record.position().map_or(0, |position| position.line());
        match derive_contact_row(record, report.layout, self.config.email_policy) {
            Ok(row) => self.reconcile(line, row, &report.tag, &report.list),
            Err(reason) => RowOutcome::Skipped { line, reason },
        }
    }

    fn reconcile(&self, line: u64, row: ContactRow, tag: &Segment, list: &Segment) -> RowOutcome {
        match self.upsert(&row, tag, list) {
            Ok(true) => RowOutcome::Created {
                line,
                email: row.email,
            },
            Ok(false) => RowOutcome::Updated {
                line,
                email: row.email,
            },
            Err(err) => RowOutcome::Failed {
                line,
                email: row.email,
                reason: err.to_string(),
            },
        }
    }

    /// Returns `true` when a contact was created, `false` when updated.
    fn upsert(&self, row: &ContactRow, tag: &Segment, list: &Segment) -> RepoResult<bool> {
        let (contact, created) = match self.store.find_contact_by_email(&row.email)? {
            Some(existing) => {
                self.store.update_contact(&existing, &row.fields)?;
                (existing, false)
            }
            None => {
                let new_contact = NewContact::subscribed(row.email.clone(), row.fields.clone());
                (self.store.create_contact(&new_contact)?, true)
            }
        };

        self.store.attach_tag(&contact, tag)?;
        self.store.attach_list(&contact, list)?;
        Ok(created)
    }
}

fn log_outcome(outcome: &RowOutcome) {
    match outcome {
        RowOutcome::Skipped { line, reason } => debug!(
            "event=import_row module=import status=skipped line={} reason={}",
            line,
            reason.code()
        ),
        RowOutcome::Failed { line, reason, .. } => warn!(
            "event=import_row module=import status=failed line={} error={}",
            line, reason
        ),
        other => debug!(
            "event=import_row module=import status={} line={}",
            other.status(),
            other.line()
        ),
    }
}
