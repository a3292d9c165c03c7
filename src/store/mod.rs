//! Store boundary: whole-table read and replace of a named dataset.

pub mod layout;
pub mod memory;
pub mod workbook;

pub use memory::MemoryStore;
pub use workbook::WorkbookStore;

use crate::domain::Dataset;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cannot open workbook {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },
    #[error("Workbook {path} has no sheet named '{table}'")]
    TableMissing { path: PathBuf, table: String },
    #[error("Unexpected header in '{table}': {reason}")]
    Header { table: String, reason: String },
    #[error("Bad cell in '{table}' at row {row}, column '{column}': {reason}")]
    Cell {
        table: String,
        row: usize,
        column: String,
        reason: String,
    },
    #[error(
        "Stored columns {stored:?} do not match the configured queries {configured:?}; \
         point the run at a different file or sheet"
    )]
    SchemaMismatch {
        stored: Vec<String>,
        configured: Vec<String>,
    },
    #[error("Cannot render workbook: {0}")]
    Render(#[from] rust_xlsxwriter::XlsxError),
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot replace {path}: {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Open { .. } => "Open",
            Self::TableMissing { .. } => "TableMissing",
            Self::Header { .. } => "Header",
            Self::Cell { .. } => "Cell",
            Self::SchemaMismatch { .. } => "SchemaMismatch",
            Self::Render(_) => "Render",
            Self::Io(_) => "Io",
            Self::Replace { .. } => "Replace",
        }
    }
}

pub trait DatasetStore: Send + Sync {
    /// Human-readable location of the backing storage, for logs.
    fn location(&self) -> String;

    /// `Ok(None)` means the table has never been written. Any other problem
    /// reading it is an error.
    fn read(&self, table: &str) -> Result<Option<Dataset>, StoreError>;

    /// Replaces the whole table. Readers see either the old or the new table.
    fn write(&self, table: &str, dataset: &Dataset) -> Result<(), StoreError>;
}
