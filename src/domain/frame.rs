//! Named-column tables.
//!
//! `Table` is the clean result of header extraction (no index yet).
//! `MonthlyFrame` is a table keyed by month-end dates; its index is unique and
//! ascending, which every join below relies on.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::debug;

use super::cell::{Cell, format_number};

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Numeric values; NaN marks a missing value.
    Numeric(Vec<f64>),
    /// Values that did not qualify as numeric.
    Cells(Vec<Cell>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Cells(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(v) => v.get(row).is_none_or(|x| x.is_nan()),
            ColumnData::Cells(v) => v.get(row).is_none_or(Cell::is_empty),
        }
    }

    pub fn missing_fraction(&self) -> f64 {
        let n = self.len();
        if n == 0 {
            return 0.0;
        }
        let missing = (0..n).filter(|&i| self.is_missing(i)).count();
        missing as f64 / n as f64
    }

    /// Numeric view; non-numeric cells read as NaN.
    pub fn to_numeric(&self) -> Vec<f64> {
        match self {
            ColumnData::Numeric(v) => v.clone(),
            ColumnData::Cells(v) => v
                .iter()
                .map(|c| c.as_number().unwrap_or(f64::NAN))
                .collect(),
        }
    }

    pub fn display(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric(v) => v.get(row).map(|x| format_float(*x)).unwrap_or_default(),
            ColumnData::Cells(v) => v.get(row).map(Cell::to_display).unwrap_or_default(),
        }
    }

    /// Reindex by source positions; `None` produces a missing value.
    pub(crate) fn take(&self, positions: &[Option<usize>]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(
                positions
                    .iter()
                    .map(|p| p.and_then(|i| v.get(i).copied()).unwrap_or(f64::NAN))
                    .collect(),
            ),
            ColumnData::Cells(v) => ColumnData::Cells(
                positions
                    .iter()
                    .map(|p| p.and_then(|i| v.get(i).cloned()).unwrap_or(Cell::Empty))
                    .collect(),
            ),
        }
    }
}

/// CSV rendering of a float: shortest round-trip form, empty for missing.
pub fn format_float(v: f64) -> String {
    if v.is_finite() {
        format!("{v}")
    } else if v.is_nan() {
        String::new()
    } else {
        format_number(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn cells(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Cells(cells),
        }
    }
}

/// A clean table with named columns and no index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// A table indexed by month-end dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyFrame {
    pub index: Vec<NaiveDate>,
    pub columns: Vec<Column>,
}

impl MonthlyFrame {
    pub fn new(index: Vec<NaiveDate>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Single numeric column frame from sorted, unique `(date, value)` pairs.
    pub fn from_series(name: &str, series: &[(NaiveDate, f64)]) -> Self {
        let index = series.iter().map(|(d, _)| *d).collect();
        let values = series.iter().map(|(_, v)| *v).collect();
        Self {
            index,
            columns: vec![Column::numeric(name, values)],
        }
    }

    /// All-missing numeric column over `index`.
    pub fn placeholder(index: &[NaiveDate], name: &str) -> Self {
        Self {
            index: index.to_vec(),
            columns: vec![Column::numeric(name, vec![f64::NAN; index.len()])],
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Numeric column by name; `None` for missing or non-numeric columns.
    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Numeric(v)) => Some(v),
            _ => None,
        }
    }

    /// Insert or replace a numeric column. `values` must match the index length.
    pub fn set_numeric(&mut self, name: &str, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.index.len());
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(col) => col.data = ColumnData::Numeric(values),
            None => self.columns.push(Column::numeric(name, values)),
        }
    }

    pub fn select(&self, names: &[&str]) -> MonthlyFrame {
        let columns = names
            .iter()
            .filter_map(|n| self.column(n).cloned())
            .collect();
        MonthlyFrame {
            index: self.index.clone(),
            columns,
        }
    }

    /// Copy with every column name prefixed by `prefix`.
    pub fn prefixed(&self, prefix: &str) -> MonthlyFrame {
        let mut out = self.clone();
        for col in &mut out.columns {
            col.name = format!("{prefix}{}", col.name);
        }
        out
    }

    /// Keep rows where `mask` is true.
    pub fn retain_rows(&self, mask: &[bool]) -> MonthlyFrame {
        let positions: Vec<Option<usize>> = mask
            .iter()
            .enumerate()
            .filter(|(_, keep)| **keep)
            .map(|(i, _)| Some(i))
            .collect();
        self.reindexed(&positions, |i| self.index[i])
    }

    /// Drop the first `n` rows.
    pub fn skip_rows(&self, n: usize) -> MonthlyFrame {
        let mask: Vec<bool> = (0..self.len()).map(|i| i >= n).collect();
        self.retain_rows(&mask)
    }

    /// Drop rows in which every column is missing.
    pub fn drop_empty_rows(&self) -> MonthlyFrame {
        let mask: Vec<bool> = (0..self.len())
            .map(|row| self.columns.iter().any(|c| !c.data.is_missing(row)))
            .collect();
        self.retain_rows(&mask)
    }

    /// Index-aligned left join: keeps `self`'s index and pulls `other`'s
    /// columns by date. Columns whose name already exists are not duplicated.
    pub fn left_join(&self, other: &MonthlyFrame) -> MonthlyFrame {
        let lookup: HashMap<NaiveDate, usize> =
            other.index.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        let positions: Vec<Option<usize>> =
            self.index.iter().map(|d| lookup.get(d).copied()).collect();

        let mut out = self.clone();
        for col in &other.columns {
            if out.contains(&col.name) {
                debug!(column = %col.name, "left join: column already present, keeping the left one");
                continue;
            }
            out.columns.push(Column {
                name: col.name.clone(),
                data: col.data.take(&positions),
            });
        }
        out
    }

    /// Outer join on the union of all indexes (ascending). The first frame
    /// to provide a column name wins.
    pub fn outer_join(frames: &[MonthlyFrame]) -> MonthlyFrame {
        let index: Vec<NaiveDate> = frames
            .iter()
            .flat_map(|f| f.index.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut out = MonthlyFrame::new(index.clone());
        for frame in frames {
            let lookup: HashMap<NaiveDate, usize> =
                frame.index.iter().enumerate().map(|(i, d)| (*d, i)).collect();
            let positions: Vec<Option<usize>> =
                index.iter().map(|d| lookup.get(d).copied()).collect();
            for col in &frame.columns {
                if out.contains(&col.name) {
                    debug!(column = %col.name, "outer join: duplicate column skipped");
                    continue;
                }
                out.columns.push(Column {
                    name: col.name.clone(),
                    data: col.data.take(&positions),
                });
            }
        }
        out
    }

    /// Cross-sectional mean over `names`, ignoring missing values.
    pub fn row_mean(&self, names: &[&str]) -> Vec<f64> {
        let cols: Vec<Vec<f64>> = names
            .iter()
            .filter_map(|n| self.column(n).map(|c| c.data.to_numeric()))
            .collect();
        (0..self.len())
            .map(|row| {
                let vals: Vec<f64> = cols
                    .iter()
                    .filter_map(|c| c.get(row).copied())
                    .filter(|v| v.is_finite())
                    .collect();
                if vals.is_empty() {
                    f64::NAN
                } else {
                    vals.iter().sum::<f64>() / vals.len() as f64
                }
            })
            .collect()
    }

    /// First and last index dates.
    pub fn index_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.index.first()?, *self.index.last()?))
    }

    /// Missing fraction for every column, in column order.
    pub fn missing_fractions(&self) -> Vec<(String, f64)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.data.missing_fraction()))
            .collect()
    }

    fn reindexed(
        &self,
        positions: &[Option<usize>],
        date_at: impl Fn(usize) -> NaiveDate,
    ) -> MonthlyFrame {
        let index = positions.iter().flatten().map(|&i| date_at(i)).collect();
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                data: c.data.take(positions),
            })
            .collect();
        MonthlyFrame { index, columns }
    }
}
