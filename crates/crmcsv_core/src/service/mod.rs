//! Import and export use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into the two operator-facing runs.
//! - Keep CLI and other front ends decoupled from storage details.

pub mod export_service;
pub mod import_service;
