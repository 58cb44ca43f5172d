//! Repository layer: store contract and persistence implementation.
//!
//! # Responsibility
//! - Define the contact store contract consumed by import/export services.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NotFound`, `DuplicateEmail`,
//!   missing schema) in addition to DB transport errors.

pub mod contact_store;
pub mod sqlite_store;
