//! Tabular previews for CSV and spreadsheet files.
//!
//! Only the first `limit` data rows are rendered. Columns are right-aligned
//! beneath their headers with a zero-based row index on the left.

use std::path::Path;

use calamine::{Reader, open_workbook_auto};

use crate::error::ExtractError;

/// Header row plus the previewed data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TablePreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TablePreview {
    /// Render as an aligned text grid.
    pub fn render(&self) -> String {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);

        fn cell(row: &[String], i: usize) -> &str {
            row.get(i).map(String::as_str).unwrap_or("")
        }

        let mut widths: Vec<usize> = (0..columns)
            .map(|i| cell(&self.headers, i).chars().count())
            .collect();
        for row in &self.rows {
            for (i, width) in widths.iter_mut().enumerate() {
                *width = (*width).max(cell(row, i).chars().count());
            }
        }
        let index_width = self.rows.len().saturating_sub(1).to_string().len();

        let mut lines = Vec::with_capacity(self.rows.len() + 1);

        let mut header = " ".repeat(index_width);
        for (i, width) in widths.iter().enumerate() {
            header.push_str(&format!("  {:>width$}", cell(&self.headers, i)));
        }
        lines.push(header.trim_end().to_string());

        for (n, row) in self.rows.iter().enumerate() {
            let mut line = format!("{n:<index_width$}");
            for (i, width) in widths.iter().enumerate() {
                line.push_str(&format!("  {:>width$}", cell(row, i)));
            }
            lines.push(line.trim_end().to_string());
        }

        lines.join("\n")
    }
}

/// Read the header and first `limit` records of a CSV file.
pub fn csv_preview(path: &Path, limit: usize) -> Result<TablePreview, ExtractError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records().take(limit) {
        rows.push(record?.iter().map(str::to_string).collect());
    }

    Ok(TablePreview { headers, rows })
}

/// Read the header and first `limit` rows of a workbook's first sheet.
pub fn spreadsheet_preview(path: &Path, limit: usize) -> Result<TablePreview, ExtractError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ExtractError::Spreadsheet("workbook has no sheets".into()))?
        .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(|c| c.to_string()).collect::<Vec<String>>());
    let headers = rows.next().unwrap_or_default();
    let rows = rows.take(limit).collect();

    Ok(TablePreview { headers, rows })
}
