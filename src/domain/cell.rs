//! Raw spreadsheet cells and header-less grids.

/// One untyped spreadsheet cell.
///
/// Workbook dates arrive as `Number` (the spreadsheet serial); the date
/// normalizer decides later what a number means.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Build a text cell; blank strings become `Empty`.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(v) => v.is_nan(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Cell::Text(s) if !s.trim().is_empty())
    }

    /// Numeric reading of the cell (numbers, or text that parses as a float).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) if v.is_finite() => Some(*v),
            Cell::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// Cell rendered the way it should appear in a CSV or a header.
    pub fn to_display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(v) => format_number(*v),
        }
    }
}

/// Parse a trimmed float, rejecting NaN/inf spellings.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

pub fn format_number(v: f64) -> String {
    if !v.is_finite() {
        String::new()
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// A rectangular block of cells with no known header.
///
/// Rows may be ragged on input; `width()` is the longest row and missing
/// trailing cells read as `Empty`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    pub rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Convenience constructor from string rows (CSV sources, tests).
    pub fn from_strings<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|s| Cell::text(s.as_ref())).collect())
            .collect();
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }

    /// Drop rows and columns in which every cell is empty, and pad the
    /// remaining rows to a common width.
    pub fn without_empty_lines(&self) -> RawGrid {
        let width = self.width();
        let keep_cols: Vec<usize> = (0..width)
            .filter(|&c| (0..self.height()).any(|r| !self.cell(r, c).is_empty()))
            .collect();

        let rows = self
            .rows
            .iter()
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .map(|row| {
                keep_cols
                    .iter()
                    .map(|&c| row.get(c).cloned().unwrap_or(Cell::Empty))
                    .collect()
            })
            .collect();

        RawGrid { rows }
    }
}
