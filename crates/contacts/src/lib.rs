//! Contact import and export.
//!
//! Two ways in: a CSV file with a header row ([`import::parse_csv`]), or
//! lines of pasted text with no header ([`import::parse_bulk_text`]). One
//! way out: a quoted CSV snapshot ([`export::to_csv`]). Parsing is pure;
//! persisting the records is the caller's job.

pub mod export;
pub mod import;

pub use export::{to_csv, ExportRow};
pub use import::{parse_bulk_text, parse_csv, ImportOutcome};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One contact parsed from an import source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub name: String,
    pub phone_number: String,
    pub segment: Option<String>,
}

/// Errors produced while parsing an import source.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The CSV header row has no recognizable name or phone column.
    #[error("could not find name and phone columns in the header row")]
    MissingColumns,
    /// The input contained no data rows at all.
    #[error("no contacts found in input")]
    Empty,
    /// Malformed CSV input, or a failed export write.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for import/export operations.
pub type Result<T> = std::result::Result<T, ImportError>;
