//! CSV and pasted-text contact parsing.

use csv::ReaderBuilder;

use crate::{ContactRecord, ImportError, Result};

/// Result of a parse: the usable records plus how many rows were dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub contacts: Vec<ContactRecord>,
    /// Rows that had no name or no phone number.
    pub skipped: usize,
}

/// Column positions sniffed from the header row.
struct Columns {
    name: usize,
    phone: usize,
    segment: Option<usize>,
}

/// Parse a CSV file with a header row.
///
/// The header is matched loosely: any column containing "name" is the name,
/// any containing "phone" or "number" is the phone, and any containing
/// "segment" or "group" is the optional segment. Quoted fields with embedded
/// commas are handled by the CSV reader. Rows missing a name or phone are
/// counted as skipped rather than failing the whole import.
pub fn parse_csv(input: &str) -> Result<ImportOutcome> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let columns = sniff_columns(reader.headers()?)?;

    let mut contacts = Vec::new();
    let mut skipped = 0;
    let mut saw_rows = false;
    for record in reader.records() {
        let record = record?;
        saw_rows = true;

        let name = record.get(columns.name).unwrap_or("").trim();
        let phone = record.get(columns.phone).unwrap_or("").trim();
        if name.is_empty() || phone.is_empty() {
            skipped += 1;
            continue;
        }

        let segment = columns
            .segment
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        contacts.push(ContactRecord {
            name: name.to_string(),
            phone_number: phone.to_string(),
            segment,
        });
    }

    if !saw_rows {
        return Err(ImportError::Empty);
    }

    tracing::debug!(parsed = contacts.len(), skipped, "csv import parsed");
    Ok(ImportOutcome { contacts, skipped })
}

fn sniff_columns(headers: &csv::StringRecord) -> Result<Columns> {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    let name = lowered.iter().position(|h| h.contains("name"));
    let phone = lowered
        .iter()
        .position(|h| h.contains("phone") || h.contains("number"));
    let segment = lowered
        .iter()
        .position(|h| h.contains("segment") || h.contains("group"));

    match (name, phone) {
        (Some(name), Some(phone)) => Ok(Columns { name, phone, segment }),
        _ => Err(ImportError::MissingColumns),
    }
}

/// Parse pasted text with no header row.
///
/// Each non-empty line is `name, phone` or `name, phone, segment`; the
/// segment is `None` when the line has only two fields. Lines with fewer
/// than two fields are counted as skipped.
pub fn parse_bulk_text(input: &str) -> Result<ImportOutcome> {
    let mut contacts = Vec::new();
    let mut skipped = 0;
    let mut saw_rows = false;

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        saw_rows = true;

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let (name, phone) = match (fields.first(), fields.get(1)) {
            (Some(&name), Some(&phone)) if !name.is_empty() && !phone.is_empty() => (name, phone),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let segment = fields
            .get(2)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        contacts.push(ContactRecord {
            name: name.to_string(),
            phone_number: phone.to_string(),
            segment,
        });
    }

    if !saw_rows {
        return Err(ImportError::Empty);
    }

    tracing::debug!(parsed = contacts.len(), skipped, "bulk text import parsed");
    Ok(ImportOutcome { contacts, skipped })
}
