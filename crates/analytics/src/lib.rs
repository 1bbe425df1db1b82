//! Read-only messaging rollups for Tuma dashboards.
//!
//! Everything here is derived on demand from the user's rows: no caching,
//! no incremental state. Each call re-reads the store, which keeps the
//! numbers trivially consistent with what the repositories hold.

pub mod report;

pub use report::{AnalyticsReport, CategoryCount, MonthBucket};

use thiserror::Error;

/// Errors that can occur while computing a report.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Underlying store read failed.
    #[error("database error: {0}")]
    Database(#[from] database::DatabaseError),
}

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
