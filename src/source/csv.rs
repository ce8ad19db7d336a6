//! CSV record source

use csv::{ErrorKind, ReaderBuilder};
use std::path::Path;
use tracing::{debug, info};

use super::{SourceError, SourceResult};
use crate::Record;

/// Read every data row of a CSV file.
///
/// The header row supplies field names. Every row must have exactly one
/// value per header field and rows keep their file order. A file with only
/// a header (or nothing at all) yields no records.
///
/// # Errors
/// Returns an error if the file cannot be opened or any row is malformed
pub fn read_source<P: AsRef<Path>>(path: P) -> SourceResult<Vec<Record>> {
    let path = path.as_ref();
    info!("Reading CSV source: path={}", path.display());

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)
        .map_err(|e| map_csv_error(e, path))?;

    let headers = reader
        .headers()
        .map_err(|e| map_csv_error(e, path))?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| map_csv_error(e, path))?;
        records.push(Record::from_pairs(headers.iter().zip(row.iter())));
    }

    debug!(records = records.len(), fields = headers.len(), "CSV source read");
    Ok(records)
}

fn map_csv_error(err: csv::Error, path: &Path) -> SourceError {
    let line = err.position().map_or(0, |p| p.line());
    match err.into_kind() {
        ErrorKind::Io(e) => SourceError::IoError(format!("{}: {e}", path.display())),
        ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => SourceError::MalformedRow {
            line: pos.map_or(line, |p| p.line()),
            expected: expected_len,
            found: len,
        },
        other => SourceError::CsvError(format!("{}: {other:?}", path.display())),
    }
}
