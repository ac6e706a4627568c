//! Spreadsheet ingestion: raw grid to month-end indexed frame.
//!
//! - header-row guessing and table extraction (`header`)
//! - date-encoding detection and month-end mapping (`dates`)
//! - numeric casting and month-end indexing (`monthly`)
//!
//! Each step is a pure function; `ingest_workbook` strings them together
//! and writes the result.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::AppError;
use crate::io::{load_grid, write_frame_csv, write_table_csv};

pub mod dates;
pub mod header;
pub mod monthly;

pub use dates::{DateEncoding, ParsedDates, parse_date_column, parse_text_date};
pub use header::{ExtractedTable, HeaderGuess, HeaderRule, extract_table, guess_header_row};
pub use monthly::{MonthEndIndex, cast_numeric_columns, to_month_end_index};

/// What an ingest run found and wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub sheet: Option<String>,
    pub header: HeaderGuess,
    pub dropped_headers: usize,
    pub numeric_columns: Vec<String>,
    pub index: IndexSummary,
    pub rows: usize,
    pub columns: Vec<String>,
    pub output: PathBuf,
}

/// How the month-end index was (or was not) built.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexSummary {
    Indexed {
        date_column: String,
        encoding: DateEncoding,
        unparsed_rows: usize,
        duplicate_rows: usize,
    },
    Unindexed {
        reason: String,
    },
}

impl IngestReport {
    /// Multi-line summary for the console.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(sheet) = &self.sheet {
            out.push_str(&format!("Sheet: {sheet}\n"));
        }
        out.push_str(&format!(
            "Header: row {} ({}), {} placeholder column(s) dropped\n",
            self.header.row,
            self.header.rule.label(),
            self.dropped_headers
        ));
        out.push_str(&format!("Numeric columns: {}\n", self.numeric_columns.len()));
        match &self.index {
            IndexSummary::Indexed {
                date_column,
                encoding,
                unparsed_rows,
                duplicate_rows,
            } => out.push_str(&format!(
                "Index: month-end from '{date_column}' ({}); {unparsed_rows} unparsed row(s) dropped, {duplicate_rows} same-month row(s) collapsed\n",
                encoding.label()
            )),
            IndexSummary::Unindexed { reason } => {
                out.push_str(&format!("Index: none ({reason}); table written as-is\n"))
            }
        }
        out.push_str(&format!("Rows: {} | Columns: {}\n", self.rows, self.columns.len()));
        out.push_str(&format!("Saved → {}\n", self.output.display()));
        out
    }
}

/// Load `input`, extract a clean table, index it by month-end, and write
/// the result to `output`.
///
/// A table without a usable date column is written without an index and a
/// warning is logged; only unreadable input or an empty grid is an error.
pub fn ingest_workbook(input: &Path, sheet: Option<&str>, output: &Path) -> Result<IngestReport, AppError> {
    let loaded = load_grid(input, sheet)?;
    let Some(extracted) = extract_table(&loaded.grid) else {
        return Err(AppError::no_data(format!(
            "No cells found in '{}'{}",
            input.display(),
            loaded.sheet.as_deref().map(|s| format!(" (sheet '{s}')")).unwrap_or_default()
        )));
    };
    info!(
        row = extracted.header.row,
        rule = extracted.header.rule.label(),
        "header row selected"
    );

    let ExtractedTable {
        header,
        mut table,
        dropped_headers,
    } = extracted;
    let numeric_columns = cast_numeric_columns(&mut table);

    let (index, rows, columns) = match to_month_end_index(table) {
        MonthEndIndex::Indexed {
            frame,
            date_column,
            encoding,
            unparsed_rows,
            duplicate_rows,
        } => {
            write_frame_csv(output, &frame)?;
            let columns = frame.column_names().into_iter().map(str::to_string).collect();
            let summary = IndexSummary::Indexed {
                date_column,
                encoding,
                unparsed_rows,
                duplicate_rows,
            };
            (summary, frame.len(), columns)
        }
        MonthEndIndex::Unindexed { table, reason } => {
            warn!(reason = %reason, "writing table without a month-end index");
            write_table_csv(output, &table)?;
            let columns = table.column_names().into_iter().map(str::to_string).collect();
            (IndexSummary::Unindexed { reason }, table.n_rows(), columns)
        }
    };

    Ok(IngestReport {
        sheet: loaded.sheet,
        header,
        dropped_headers,
        numeric_columns,
        index,
        rows,
        columns,
        output: output.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::io::read_frame_csv;

    #[test]
    fn csv_report_with_title_row() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("report.csv");
        fs::write(
            &input,
            "Ticker Report,,\n,,\ndate,AAPL,Unnamed: 2\n2021-01-15,150.0,\n2021-01-29,152.5,\n2021-02-26,121.0,\n",
        )
        .unwrap();
        let output = dir.path().join("Monthly").join("tech_features_combined.csv");

        let report = ingest_workbook(&input, None, &output).unwrap();
        assert_eq!(report.header.rule, HeaderRule::Token);
        assert_eq!(report.header.row, 1);
        assert_eq!(report.dropped_headers, 1);
        assert_eq!(report.columns, vec!["AAPL"]);
        assert_eq!(report.rows, 2);
        assert!(matches!(
            report.index,
            IndexSummary::Indexed {
                duplicate_rows: 1,
                ..
            }
        ));
        assert!(report.render().contains("Saved → "));

        let frame = read_frame_csv(&output).unwrap();
        assert_eq!(frame.numeric("AAPL").unwrap(), &[152.5, 121.0]);
    }

    #[test]
    fn missing_input_is_exit_one() {
        let dir = tempfile::tempdir().unwrap();
        let err = ingest_workbook(&dir.path().join("nope.xlsx"), None, &dir.path().join("out.csv")).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_MISSING_INPUT);
    }
}
