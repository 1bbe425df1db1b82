//! CSV export of stored customers.

use chrono::{DateTime, Utc};
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;

use crate::Result;

/// One customer row as it appears in the export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub name: String,
    pub phone_number: String,
    pub segment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Render rows as a CSV document.
///
/// Every field is quoted so phone numbers and free-text segments survive a
/// round trip through spreadsheet tools. Dates are day-first, matching the
/// app's default display format.
pub fn to_csv(rows: &[ExportRow]) -> Result<String> {
    let mut buf = Vec::new();
    {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(&mut buf);

        writer.write_record(["Name", "Phone Number", "Segment", "Created Date"])?;
        for row in rows {
            writer.write_record([
                row.name.as_str(),
                row.phone_number.as_str(),
                row.segment.as_deref().unwrap_or(""),
                &row.created_at.format("%d/%m/%Y").to_string(),
            ])?;
        }
        writer.flush().map_err(csv::Error::from)?;
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}
