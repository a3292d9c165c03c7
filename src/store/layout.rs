//! Sheet layout: `Month | <term>... | Pull Date`, one row per period.

use super::StoreError;
use crate::domain::{CaptureTime, Dataset, Period, PullRecord, TimeParseError};
use calamine::{Data, Range};

pub const PERIOD_HEADER: &str = "Month";
pub const CAPTURE_HEADER: &str = "Pull Date";

static EMPTY_CELL: Data = Data::Empty;

pub fn header_row(terms: &[String]) -> Vec<String> {
    std::iter::once(PERIOD_HEADER.to_string())
        .chain(terms.iter().cloned())
        .chain(std::iter::once(CAPTURE_HEADER.to_string()))
        .collect()
}

/// A rendered cell: what gets written and how wide it displays.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn display_len(&self) -> usize {
        match self {
            CellValue::Text(text) => text.chars().count(),
            CellValue::Number(number) => number.to_string().chars().count(),
        }
    }
}

pub fn record_cells(record: &PullRecord) -> Vec<CellValue> {
    std::iter::once(CellValue::Text(record.period.to_string()))
        .chain(record.values.iter().copied().map(CellValue::Number))
        .chain(std::iter::once(CellValue::Text(record.pulled_at.to_string())))
        .collect()
}

/// Decodes a sheet written by [`header_row`] and [`record_cells`]. Also accepts
/// native spreadsheet dates in the period and capture columns.
pub fn decode_sheet(table: &str, range: &Range<Data>) -> Result<Dataset, StoreError> {
    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| StoreError::Header {
        table: table.to_string(),
        reason: "sheet is empty".to_string(),
    })?;
    let header: Vec<String> = header
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();
    let terms = parse_header(table, &header)?;
    let width = terms.len() + 2;

    let mut records = Vec::new();
    // Data starts on spreadsheet row 2.
    for (offset, row) in rows.enumerate() {
        let row_number = offset + 2;
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        let cell_error = |column: &str, reason: String| StoreError::Cell {
            table: table.to_string(),
            row: row_number,
            column: column.to_string(),
            reason,
        };
        let cell = |index: usize| row.get(index).unwrap_or(&EMPTY_CELL);

        let period = period_cell(cell(0)).map_err(|reason| cell_error(PERIOD_HEADER, reason))?;
        let values = terms
            .iter()
            .enumerate()
            .map(|(i, term)| value_cell(cell(i + 1)).map_err(|reason| cell_error(term.as_str(), reason)))
            .collect::<Result<Vec<_>, _>>()?;
        let pulled_at = capture_cell(cell(width - 1))
            .map_err(|reason| cell_error(CAPTURE_HEADER, reason))?;

        records.push(PullRecord {
            period,
            values,
            pulled_at,
        });
    }

    Ok(Dataset::new(terms, records))
}

fn parse_header(table: &str, header: &[String]) -> Result<Vec<String>, StoreError> {
    let header_error = |reason: String| StoreError::Header {
        table: table.to_string(),
        reason,
    };
    // Trailing blanks come from formatted-but-empty columns.
    let end = header
        .iter()
        .rposition(|name| !name.is_empty())
        .map_or(0, |last| last + 1);
    let header = &header[..end];

    match header {
        [first, terms @ .., last] if !terms.is_empty() => {
            if first != PERIOD_HEADER {
                return Err(header_error(format!(
                    "first column is '{first}', expected '{PERIOD_HEADER}'"
                )));
            }
            if last != CAPTURE_HEADER {
                return Err(header_error(format!(
                    "last column is '{last}', expected '{CAPTURE_HEADER}'"
                )));
            }
            if let Some(blank) = terms.iter().position(String::is_empty) {
                return Err(header_error(format!("column {} has no name", blank + 2)));
            }
            Ok(terms.to_vec())
        }
        _ => Err(header_error(format!(
            "expected '{PERIOD_HEADER}', at least one query column, and '{CAPTURE_HEADER}'"
        ))),
    }
}

fn period_cell(cell: &Data) -> Result<Period, String> {
    match cell {
        Data::String(text) | Data::DateTimeIso(text) => Period::parse(text),
        Data::DateTime(datetime) => Period::from_spreadsheet_serial(datetime.as_f64()),
        Data::Float(serial) => Period::from_spreadsheet_serial(*serial),
        Data::Int(serial) => Period::from_spreadsheet_serial(*serial as f64),
        Data::Empty => return Err("missing period".to_string()),
        other => return Err(format!("unsupported period cell {other:?}")),
    }
    .map_err(|err: TimeParseError| err.to_string())
}

fn value_cell(cell: &Data) -> Result<f64, String> {
    match cell {
        Data::Float(value) => Ok(*value),
        Data::Int(value) => Ok(*value as f64),
        Data::String(text) => text
            .trim()
            .parse()
            .map_err(|_| format!("'{text}' is not a number")),
        Data::Empty => Err("missing value".to_string()),
        other => Err(format!("unsupported value cell {other:?}")),
    }
}

fn capture_cell(cell: &Data) -> Result<CaptureTime, String> {
    match cell {
        Data::String(text) => CaptureTime::parse(text),
        Data::DateTimeIso(text) => CaptureTime::parse(&text.replacen('T', " ", 1)),
        Data::DateTime(datetime) => CaptureTime::from_spreadsheet_serial(datetime.as_f64()),
        Data::Float(serial) => CaptureTime::from_spreadsheet_serial(*serial),
        Data::Empty => return Err("missing pull date".to_string()),
        other => return Err(format!("unsupported pull date cell {other:?}")),
    }
    .map_err(|err: TimeParseError| err.to_string())
}
