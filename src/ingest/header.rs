//! Header-row detection for raw spreadsheet grids.
//!
//! Precedence is explicit: a row carrying a known header token wins, then the
//! first row that looks like labels followed by data, then row 0.

use std::collections::HashMap;

use crate::domain::{Cell, Column, RawGrid, Table};
use crate::ingest::dates::parse_text_date;

/// Rows inspected from the top of the cleaned grid.
pub const MAX_HEADER_SCAN: usize = 12;

/// Case-folded cell values that mark a header row.
pub const HEADER_TOKENS: [&str; 4] = ["date", "month", "datetime", "internal (index)"];

const LABEL_FRACTION_MIN: f64 = 0.6;
const LOOKAHEAD_SCORE_MIN: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRule {
    /// A cell matched one of `HEADER_TOKENS`.
    Token,
    /// Label-like row followed by a numeric/date-like row.
    Heuristic,
    /// Nothing matched; row 0 is assumed.
    Default,
}

impl HeaderRule {
    pub fn label(self) -> &'static str {
        match self {
            HeaderRule::Token => "header token",
            HeaderRule::Heuristic => "label/data heuristic",
            HeaderRule::Default => "default (row 0)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderGuess {
    /// Row index within the grid with empty rows/columns removed.
    pub row: usize,
    pub rule: HeaderRule,
}

/// A clean table and how its header was found.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTable {
    pub header: HeaderGuess,
    pub table: Table,
    /// Header cells dropped as empty or placeholder names.
    pub dropped_headers: usize,
}

/// Guess the header row of `grid`. `None` only for a grid with no content.
pub fn guess_header_row(grid: &RawGrid) -> Option<HeaderGuess> {
    let grid = grid.without_empty_lines();
    if grid.height() == 0 {
        return None;
    }
    let scan = grid.height().min(MAX_HEADER_SCAN);

    if let Some(row) = (0..scan).find(|&r| has_header_token(&grid.rows[r])) {
        return Some(HeaderGuess {
            row,
            rule: HeaderRule::Token,
        });
    }

    let width = grid.width();
    let heuristic = (0..scan.saturating_sub(1)).find(|&r| {
        let labels = label_fraction(&grid.rows[r], width);
        let score = lookahead_score(&grid.rows[r + 1], width);
        labels > LABEL_FRACTION_MIN && score > LOOKAHEAD_SCORE_MIN
    });

    Some(match heuristic {
        Some(row) => HeaderGuess {
            row,
            rule: HeaderRule::Heuristic,
        },
        None => HeaderGuess {
            row: 0,
            rule: HeaderRule::Default,
        },
    })
}

/// Split `grid` into a named-column table below its guessed header.
///
/// Columns whose header is empty or an auto-generated placeholder are
/// dropped. Repeated names get `.1`, `.2`, ... suffixes.
pub fn extract_table(grid: &RawGrid) -> Option<ExtractedTable> {
    let header = guess_header_row(grid)?;
    let grid = grid.without_empty_lines();
    let width = grid.width();

    let names: Vec<String> = (0..width)
        .map(|c| grid.cell(header.row, c).to_display().trim().to_string())
        .collect();

    let body = &grid.rows[header.row + 1..];
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut columns = Vec::new();
    let mut dropped_headers = 0usize;

    for (c, name) in names.into_iter().enumerate() {
        if is_placeholder(&name) {
            dropped_headers += 1;
            continue;
        }
        let count = seen.entry(name.clone()).or_insert(0);
        let unique = if *count == 0 {
            name.clone()
        } else {
            format!("{name}.{count}")
        };
        *count += 1;

        let cells = body
            .iter()
            .map(|row| row.get(c).cloned().unwrap_or(Cell::Empty))
            .collect();
        columns.push(Column::cells(unique, cells));
    }

    Some(ExtractedTable {
        header,
        table: Table { columns },
        dropped_headers,
    })
}

/// Header names that carry no information.
pub fn is_placeholder(name: &str) -> bool {
    let folded = name.trim().to_lowercase();
    folded.is_empty()
        || folded.starts_with("unnamed")
        || matches!(folded.as_str(), "nan" | "none" | "null")
}

fn has_header_token(row: &[Cell]) -> bool {
    row.iter().any(|cell| {
        let folded = cell.to_display().trim().to_lowercase();
        HEADER_TOKENS.contains(&folded.as_str())
    })
}

/// Share of the row's cells that hold text.
fn label_fraction(row: &[Cell], width: usize) -> f64 {
    if width == 0 {
        return 0.0;
    }
    let labels = row.iter().filter(|c| c.is_text()).count();
    labels as f64 / width as f64
}

/// Mean of the numeric-like and date-like shares of a candidate first data row.
///
/// Numbers count toward both shares since any number is a valid timestamp.
fn lookahead_score(row: &[Cell], width: usize) -> f64 {
    if width == 0 {
        return 0.0;
    }
    let numeric = row.iter().filter(|c| c.as_number().is_some()).count();
    let dates = row
        .iter()
        .filter(|c| c.as_number().is_some() || matches!(c, Cell::Text(s) if parse_text_date(s).is_some()))
        .count();
    (numeric as f64 / width as f64 + dates as f64 / width as f64) / 2.0
}
