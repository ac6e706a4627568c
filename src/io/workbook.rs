//! Raw grid loading from spreadsheet workbooks and header-less CSV files.
//!
//! Nothing here interprets the cells. Workbook date cells are passed on as
//! their serial number and text is kept verbatim; header and date detection
//! happen in `ingest`.

use std::fs::File;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use tracing::info;

use crate::domain::{Cell, RawGrid};
use crate::error::AppError;

/// Sheet preferred when a workbook has several.
pub const PREFERRED_SHEET: &str = "tech_features_combined";

/// A loaded grid and the sheet it came from (`None` for CSV input).
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedGrid {
    pub sheet: Option<String>,
    pub grid: RawGrid,
}

/// Load `path` as a raw grid. CSV files are read directly; anything else
/// goes through the workbook reader.
pub fn load_grid(path: &Path, requested_sheet: Option<&str>) -> Result<LoadedGrid, AppError> {
    if !path.exists() {
        return Err(AppError::missing_input(format!(
            "Input workbook not found: '{}'",
            path.display()
        )));
    }

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        return Ok(LoadedGrid {
            sheet: None,
            grid: read_csv_grid(path)?,
        });
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| {
        AppError::missing_input(format!("Failed to open workbook '{}': {e}", path.display()))
    })?;

    let sheets = workbook.sheet_names();
    info!(sheets = ?sheets, "workbook sheets found");
    let sheet = choose_sheet(&sheets, requested_sheet).ok_or_else(|| match requested_sheet {
        Some(name) => AppError::config(format!(
            "Sheet '{name}' not found in '{}' (available: {})",
            path.display(),
            sheets.join(", ")
        )),
        None => AppError::missing_input(format!("Workbook '{}' has no sheets", path.display())),
    })?;
    if sheets.len() == 1 {
        info!(sheet = %sheet, "single sheet detected, treating it as the combined feature table");
    } else {
        info!(sheet = %sheet, "using sheet");
    }

    let range = workbook.worksheet_range(&sheet).map_err(|e| {
        AppError::missing_input(format!("Failed to read sheet '{sheet}': {e}"))
    })?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(data_to_cell).collect())
        .collect();

    Ok(LoadedGrid {
        sheet: Some(sheet),
        grid: RawGrid::new(rows),
    })
}

/// Pick the sheet to ingest: the requested one, the only one, the preferred
/// combined sheet, or the first.
pub fn choose_sheet(sheets: &[String], requested: Option<&str>) -> Option<String> {
    if let Some(name) = requested {
        return sheets.iter().find(|s| s.as_str() == name).cloned();
    }
    match sheets {
        [] => None,
        [only] => Some(only.clone()),
        _ => sheets
            .iter()
            .find(|s| s.as_str() == PREFERRED_SHEET)
            .or_else(|| sheets.first())
            .cloned(),
    }
}

/// Read a CSV without assuming a header row.
pub fn read_csv_grid(path: &Path) -> Result<RawGrid, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::missing_input(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| AppError::missing_input(format!("Failed to parse CSV '{}': {e}", path.display())))?;
        rows.push(
            record
                .iter()
                .map(|s| Cell::text(s.trim_start_matches('\u{feff}')))
                .collect(),
        );
    }
    Ok(RawGrid::new(rows))
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::text(s.as_str()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sheet_choice_prefers_combined_sheet() {
        assert_eq!(choose_sheet(&names(&["Data"]), None).as_deref(), Some("Data"));
        assert_eq!(
            choose_sheet(&names(&["Cover", "tech_features_combined"]), None).as_deref(),
            Some("tech_features_combined")
        );
        assert_eq!(choose_sheet(&names(&["Cover", "Data"]), None).as_deref(), Some("Cover"));
        assert_eq!(choose_sheet(&names(&["Cover", "Data"]), Some("Data")).as_deref(), Some("Data"));
        assert_eq!(choose_sheet(&names(&["Cover"]), Some("Missing")), None);
        assert_eq!(choose_sheet(&[], None), None);
    }

    #[test]
    fn missing_workbook_is_missing_input() {
        let err = load_grid(Path::new("/definitely/not/here.xlsx"), None).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_MISSING_INPUT);
    }

    #[test]
    fn csv_grid_keeps_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        std::fs::write(&path, "Ticker Report\ndate,AAPL\n2021-01-15,150.0\n").unwrap();

        let loaded = load_grid(&path, None).unwrap();
        assert_eq!(loaded.sheet, None);
        assert_eq!(loaded.grid.height(), 3);
        assert_eq!(loaded.grid.width(), 2);
        assert_eq!(loaded.grid.cell(1, 1), &Cell::text("AAPL"));
    }
}
