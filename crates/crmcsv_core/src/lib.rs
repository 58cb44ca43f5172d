//! Contact CSV import/export core.
//! Reconciles uploaded CSV rows against a contact store and streams the
//! store back out as CSV.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod record;
pub mod repo;
pub mod service;

pub use config::{load_config, ConfigError, ExportConfig, ImporterConfig, SegmentTarget};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::contact::{Contact, ContactFields, ContactId, ContactStatus, NewContact};
pub use model::segment::{Segment, SegmentKind};
pub use record::{EmailPolicy, RowLayout, RowRejection, EXPORT_HEADER};
pub use repo::contact_store::{ContactPages, ContactStore, RepoError, RepoResult};
pub use repo::sqlite_store::SqliteContactStore;
pub use service::export_service::{ContactExportService, ExportError, ExportSummary};
pub use service::import_service::{
    ContactImportService, ImportCounts, ImportError, ImportReport, Notice, NoticeLevel, RowOutcome,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
