use super::layout::{self, CellValue};
use super::{DatasetStore, StoreError};
use crate::domain::Dataset;
use calamine::{Reader, Xlsx, open_workbook};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Cosmetic settings applied when a sheet is rendered.
#[derive(Debug, Clone, Default)]
pub struct SheetStyle {
    pub header_format: Option<Format>,
    pub column_widths: Vec<f64>,
}

/// Persists datasets as a single-sheet `.xlsx` file.
#[derive(Debug, Clone)]
pub struct WorkbookStore {
    path: PathBuf,
}

impl WorkbookStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders `dataset` with `style` and swaps it in place of the current file.
    pub fn write_styled(
        &self,
        table: &str,
        dataset: &Dataset,
        style: &SheetStyle,
    ) -> Result<(), StoreError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(table)?;
        render_sheet(worksheet, dataset, style)?;
        let bytes = workbook.save_to_buffer()?;
        replace_file(&self.path, &bytes)
    }
}

impl DatasetStore for WorkbookStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self, table: &str) -> Result<Option<Dataset>, StoreError> {
        if !self.path.try_exists()? {
            debug!(path = %self.path.display(), "no workbook yet");
            return Ok(None);
        }

        let mut workbook: Xlsx<_> =
            open_workbook(&self.path).map_err(|source| StoreError::Open {
                path: self.path.clone(),
                source,
            })?;
        if !workbook.sheet_names().iter().any(|name| name == table) {
            return Err(StoreError::TableMissing {
                path: self.path.clone(),
                table: table.to_string(),
            });
        }
        let range = workbook
            .worksheet_range(table)
            .map_err(|source| StoreError::Open {
                path: self.path.clone(),
                source,
            })?;

        layout::decode_sheet(table, &range).map(Some)
    }

    fn write(&self, table: &str, dataset: &Dataset) -> Result<(), StoreError> {
        self.write_styled(table, dataset, &SheetStyle::default())
    }
}

fn render_sheet(
    worksheet: &mut Worksheet,
    dataset: &Dataset,
    style: &SheetStyle,
) -> Result<(), StoreError> {
    for (col, name) in layout::header_row(dataset.terms()).iter().enumerate() {
        let col = col as u16;
        match &style.header_format {
            Some(format) => worksheet.write_string_with_format(0, col, name, format)?,
            None => worksheet.write_string(0, col, name)?,
        };
    }

    for (index, record) in dataset.rows().iter().enumerate() {
        let row = index as u32 + 1;
        for (col, cell) in layout::record_cells(record).into_iter().enumerate() {
            let col = col as u16;
            match cell {
                CellValue::Text(text) => worksheet.write_string(row, col, text)?,
                CellValue::Number(number) => worksheet.write_number(row, col, number)?,
            };
        }
    }

    for (col, width) in style.column_widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }
    Ok(())
}

/// Writes next to the target and renames over it, so a crash never leaves a
/// half-written workbook behind.
fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staged = tempfile::Builder::new()
        .prefix(".trendpull-")
        .suffix(".xlsx")
        .tempfile_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| StoreError::Replace {
        path: path.to_path_buf(),
        source: err.error,
    })?;
    Ok(())
}
