//! CSV read/write for monthly frames, plain tables, and matrices.
//!
//! Frames are written with the month-end index as the first column
//! (`date`, ISO format) and missing values as empty fields.

use std::fs::{self, File};
use std::path::Path;

use tracing::info;

use crate::domain::{Cell, Column, ColumnData, MonthlyFrame, Table};
use crate::error::AppError;
use crate::ingest::monthly::{MonthEndIndex, to_month_end_index};

pub const INDEX_LABEL: &str = "date";

fn create_writer(path: &Path) -> Result<csv::Writer<File>, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::io(format!("Failed to create directory '{}': {e}", parent.display()))
        })?;
    }
    csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create CSV '{}': {e}", path.display())))
}

fn write_failed(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::io(format!("Failed to write CSV '{}': {e}", path.display()))
}

/// Write a frame with its index as the leading `date` column.
pub fn write_frame_csv(path: &Path, frame: &MonthlyFrame) -> Result<(), AppError> {
    let mut writer = create_writer(path)?;

    let mut header = vec![INDEX_LABEL.to_string()];
    header.extend(frame.columns.iter().map(|c| c.name.clone()));
    writer.write_record(&header).map_err(|e| write_failed(path, e))?;

    for (row, date) in frame.index.iter().enumerate() {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        record.extend(frame.columns.iter().map(|c| c.data.display(row)));
        writer.write_record(&record).map_err(|e| write_failed(path, e))?;
    }
    writer.flush().map_err(|e| write_failed(path, e))?;

    info!(path = %path.display(), rows = frame.len(), cols = frame.width(), "Saved");
    Ok(())
}

/// Write a table without an index.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<(), AppError> {
    let mut writer = create_writer(path)?;
    writer
        .write_record(table.column_names())
        .map_err(|e| write_failed(path, e))?;
    for row in 0..table.n_rows() {
        let record: Vec<String> = table.columns.iter().map(|c| c.data.display(row)).collect();
        writer.write_record(&record).map_err(|e| write_failed(path, e))?;
    }
    writer.flush().map_err(|e| write_failed(path, e))?;

    info!(path = %path.display(), rows = table.n_rows(), cols = table.columns.len(), "Saved");
    Ok(())
}

/// Write a square matrix with row and column labels (correlation output).
pub fn write_matrix_csv(path: &Path, names: &[String], matrix: &[Vec<f64>]) -> Result<(), AppError> {
    let mut writer = create_writer(path)?;

    let mut header = vec![String::new()];
    header.extend(names.iter().cloned());
    writer.write_record(&header).map_err(|e| write_failed(path, e))?;

    for (name, row) in names.iter().zip(matrix) {
        let mut record = vec![name.clone()];
        record.extend(row.iter().map(|v| crate::domain::format_float(*v)));
        writer.write_record(&record).map_err(|e| write_failed(path, e))?;
    }
    writer.flush().map_err(|e| write_failed(path, e))?;

    info!(path = %path.display(), size = names.len(), "Saved");
    Ok(())
}

/// Read a CSV whose first column is a date index.
///
/// Dates are mapped to month-end, rows are sorted, and duplicates resolve to
/// the last row. Columns whose non-empty values all parse become numeric.
pub fn read_frame_csv(path: &Path) -> Result<MonthlyFrame, AppError> {
    let mut table = read_table_csv(path)?;
    let Some(first) = table.columns.first_mut() else {
        return Err(AppError::no_data(format!("CSV '{}' has no columns", path.display())));
    };
    first.name = INDEX_LABEL.to_string();

    match to_month_end_index(table) {
        MonthEndIndex::Indexed { frame, .. } => Ok(frame),
        MonthEndIndex::Unindexed { reason, .. } => Err(AppError::no_data(format!(
            "CSV '{}' has no usable date index: {reason}",
            path.display()
        ))),
    }
}

/// Read a CSV with a header row into a table.
pub fn read_table_csv(path: &Path) -> Result<Table, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::missing_input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::missing_input(format!("Failed to read CSV headers '{}': {e}", path.display())))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut cells: Vec<Vec<Cell>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record
            .map_err(|e| AppError::missing_input(format!("Failed to parse CSV '{}': {e}", path.display())))?;
        for (c, column) in cells.iter_mut().enumerate() {
            column.push(Cell::text(record.get(c).unwrap_or("")));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| Column {
            name,
            data: infer_column(cells),
        })
        .collect();
    Ok(Table { columns })
}

fn infer_column(cells: Vec<Cell>) -> ColumnData {
    let all_numeric = cells
        .iter()
        .all(|c| c.is_empty() || c.as_number().is_some() || is_nan_text(c));
    if all_numeric {
        ColumnData::Numeric(cells.iter().map(|c| c.as_number().unwrap_or(f64::NAN)).collect())
    } else {
        ColumnData::Cells(cells)
    }
}

fn is_nan_text(cell: &Cell) -> bool {
    matches!(cell, Cell::Text(s) if s.trim().eq_ignore_ascii_case("nan"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn frame_written_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Monthly").join("macro_monthly.csv");

        let mut frame = MonthlyFrame::new(vec![d(2021, 1, 31), d(2021, 2, 28)]);
        frame.set_numeric("us10y", vec![1.08, f64::NAN]);
        write_frame_csv(&path, &frame).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "date,us10y\n2021-01-31,1.08\n2021-02-28,\n");

        let back = read_frame_csv(&path).unwrap();
        assert_eq!(back.index, frame.index);
        let v = back.numeric("us10y").unwrap();
        assert_eq!(v[0], 1.08);
        assert!(v[1].is_nan());
    }

    #[test]
    fn unnamed_index_column_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.csv");
        std::fs::write(&path, ",AAPL_ret\n2021-01-31,\n2021-02-28,0.05\n").unwrap();

        let frame = read_frame_csv(&path).unwrap();
        assert_eq!(frame.column_names(), vec!["AAPL_ret"]);
        assert_eq!(frame.numeric("AAPL_ret").unwrap()[1], 0.05);
    }

    #[test]
    fn missing_file_is_missing_input() {
        let err = read_frame_csv(Path::new("/nope/combined.csv")).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_MISSING_INPUT);
    }
}
