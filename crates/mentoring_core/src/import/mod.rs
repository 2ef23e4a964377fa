//! crates/mentoring_core/src/import/mod.rs
//!
//! Reading, checking and applying a user-supplied export document.
//!
//! The flow has three stages, each with its own failure kind:
//! 1. `parse_import` turns file text into JSON, or fails with `InvalidFile`.
//! 2. `validate` checks the document's shape and builds a preview. It never writes.
//! 3. `apply_import` writes the records as they are under a merge or replace
//!    policy. Once validation passes, only a store fault can stop it.

pub mod reconcile;
pub mod validate;

pub use reconcile::{apply_import, ImportPolicy, ImportSummary};
pub use validate::{validate, ImportPreview, ValidationReport};

use crate::ports::PortError;
use serde_json::Value;

/// Everything that can stop an import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The file text is not JSON. Raised before validation runs.
    #[error("Invalid JSON file: {0}")]
    InvalidFile(String),

    /// The document failed structural validation. Nothing was written.
    #[error("Import rejected: {}", .0.join(" "))]
    Rejected(Vec<String>),

    /// The store failed while the import was being written.
    #[error("Import failed while writing: {0}")]
    Storage(#[from] PortError),
}

/// Parses the raw text of an import file.
pub fn parse_import(text: &str) -> Result<Value, ImportError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    serde_json::from_str(text).map_err(|e| ImportError::InvalidFile(e.to_string()))
}

/// Parses and validates an import file in one step.
pub fn inspect(text: &str) -> Result<ValidationReport, ImportError> {
    let document = parse_import(text)?;
    Ok(validate(&document))
}
