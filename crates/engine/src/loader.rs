//! Dataset loader/validator.
//!
//! A bounded sample pass discovers column names and surfaces parse errors
//! cheaply before the full read commits. Column presence is the only
//! structural check; expected-but-absent columns are logged and the load
//! still proceeds. Value-level validation never happens here.

use crate::config::SourceKind;
use crate::diag::DiagnosticsSink;
use crate::error::ReconError;
use crate::model::Table;

/// Rows inspected during the sample pass.
pub const SAMPLE_ROWS: usize = 100;

/// Read a CSV source fully into memory, recording column discovery and
/// missing-column warnings on the way.
///
/// Failure means the source could not be parsed as tabular data at all.
/// The caller decides whether that is fatal (pre-balances) or merely
/// disables dependent metrics (optional sources).
pub fn validate(
    kind: SourceKind,
    csv_data: &str,
    sink: &dyn DiagnosticsSink,
) -> Result<Table, ReconError> {
    let columns = sample_pass(kind, csv_data, sink)?;

    let missing: Vec<&str> = kind
        .required_columns()
        .iter()
        .filter(|c| !columns.iter().any(|have| have == *c))
        .copied()
        .collect();
    if !missing.is_empty() {
        sink.record(&format!("Warning: Missing columns in {kind}: {}", missing.join(", ")));
    }

    let rows = full_read(kind, csv_data, sink)?;
    Ok(Table::new(kind.label(), columns, rows))
}

/// Read headers plus at most [`SAMPLE_ROWS`] records to discover the
/// column set and fail fast on unparseable data.
fn sample_pass(
    kind: SourceKind,
    csv_data: &str,
    sink: &dyn DiagnosticsSink,
) -> Result<Vec<String>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| parse_failure(kind, &e.to_string(), sink))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    sink.record(&format!("Columns in {kind}: {}", columns.join(", ")));

    for record in reader.records().take(SAMPLE_ROWS) {
        record.map_err(|e| parse_failure(kind, &e.to_string(), sink))?;
    }

    Ok(columns)
}

fn full_read(
    kind: SourceKind,
    csv_data: &str,
    sink: &dyn DiagnosticsSink,
) -> Result<Vec<Vec<String>>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| parse_failure(kind, &e.to_string(), sink))?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(rows)
}

fn parse_failure(kind: SourceKind, detail: &str, sink: &dyn DiagnosticsSink) -> ReconError {
    sink.record(&format!("Validation failed for {kind}: {detail}"));
    ReconError::SourceParse { source: kind.label().into(), detail: detail.into() }
}
