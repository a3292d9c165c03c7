//! Cosmetic pass over a persisted table: bold centered header, sized columns.
//!
//! Formatting never changes row content, order, or count, and running it twice
//! leaves the table exactly as running it once.

use crate::domain::Dataset;
use crate::store::layout;
use crate::store::workbook::SheetStyle;
use crate::store::{DatasetStore, StoreError, WorkbookStore};
use rust_xlsxwriter::{Format, FormatAlign};
use thiserror::Error;

pub const MAX_COLUMN_WIDTH: f64 = 50.0;
const COLUMN_PADDING: usize = 2;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Nothing to format: table '{table}' does not exist")]
    Missing { table: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub trait Presenter: Send + Sync {
    fn format(&self, table: &str) -> Result<(), FormatError>;
}

/// Widest rendered cell per column plus padding, capped.
pub fn column_widths(dataset: &Dataset) -> Vec<f64> {
    let mut widths: Vec<usize> = layout::header_row(dataset.terms())
        .iter()
        .map(|name| name.chars().count())
        .collect();

    for record in dataset.rows() {
        for (col, cell) in layout::record_cells(record).iter().enumerate() {
            let len = cell.display_len();
            match widths.get_mut(col) {
                Some(width) => *width = (*width).max(len),
                None => widths.push(len),
            }
        }
    }

    widths
        .into_iter()
        .map(|len| ((len + COLUMN_PADDING) as f64).min(MAX_COLUMN_WIDTH))
        .collect()
}

pub fn header_format() -> Format {
    Format::new().set_bold().set_align(FormatAlign::Center)
}

#[derive(Debug, Clone)]
pub struct WorkbookPresenter {
    store: WorkbookStore,
}

impl WorkbookPresenter {
    pub fn new(store: WorkbookStore) -> Self {
        Self { store }
    }
}

impl Presenter for WorkbookPresenter {
    fn format(&self, table: &str) -> Result<(), FormatError> {
        let dataset = self
            .store
            .read(table)?
            .ok_or_else(|| FormatError::Missing {
                table: table.to_string(),
            })?;
        let style = SheetStyle {
            header_format: Some(header_format()),
            column_widths: column_widths(&dataset),
        };
        self.store.write_styled(table, &dataset, &style)?;
        Ok(())
    }
}
