//! Domain records shaped for the contact store boundary.
//!
//! # Responsibility
//! - Define the contact record and the field set written on create/update.
//! - Define tag/list segments that contacts are attached to.
//!
//! # Invariants
//! - Every persisted contact is identified by a stable `ContactId`.
//! - Email is the only matching key used by the importer.

pub mod contact;
pub mod segment;
