//! Contact store schema versions.
//!
//! # Responsibility
//! - Own the ordered list of schema steps for contacts, segments and their
//!   link tables.
//! - Bring an older store up to the schema this binary reads and writes.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly one.
//! - `PRAGMA user_version` equals the last applied step.
//! - A store written by a newer binary is rejected, never downgraded.
//! - Pending steps commit together; a failed step leaves the store on its
//!   previous version.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "contacts",
        sql: include_str!("0001_contacts.sql"),
    },
    SchemaStep {
        version: 2,
        name: "segments",
        sql: include_str!("0002_segments.sql"),
    },
];

/// Schema version this binary writes.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Upgrades the contact store schema on `conn` to `latest_version()`.
///
/// # Errors
/// - `DbError::UnsupportedSchemaVersion` when the store is newer than this
///   binary.
/// - `DbError::Sqlite` when a step fails; nothing is committed then.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let store_version = stored_version(conn)?;
    let latest = latest_version();

    if store_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: store_version,
            latest_supported: latest,
        });
    }
    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > store_version)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
        store_version,
        latest,
        pending
            .iter()
            .map(|step| step.name)
            .collect::<Vec<_>>()
            .join(",")
    );
    Ok(())
}

fn stored_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?;
    Ok(version)
}
