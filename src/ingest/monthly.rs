//! Numeric casting and month-end indexing of extracted tables.

use tracing::{debug, warn};

use chrono::NaiveDateTime;

use crate::domain::{Cell, Column, ColumnData, MonthlyFrame, Table, month_end};
use crate::ingest::dates::{DateEncoding, ParsedDates, parse_date_column};

/// Column names (case-folded) tried as the date column before scanning.
pub const DATE_CANDIDATES: [&str; 5] = [
    "date",
    "datetime",
    "month",
    "internal (index)",
    "month-end timestamp; time index for monthly aggregation.",
];

/// Minimum share of parseable values for a text column to become numeric.
pub const NUMERIC_SHARE: f64 = 0.5;
const NUMERIC_MIN_COUNT: usize = 5;

/// Share of entries that must parse for an unnamed column to be used as dates.
const SCAN_PARSE_SHARE: f64 = 0.5;

/// Convert every text column where at least `max(5, n/2)` values parse as
/// numbers (capped at `n`). Returns the names of converted columns.
pub fn cast_numeric_columns(table: &mut Table) -> Vec<String> {
    let n = table.n_rows();
    let required = ((n as f64 * NUMERIC_SHARE).floor() as usize)
        .max(NUMERIC_MIN_COUNT)
        .min(n)
        .max(1);

    let mut cast = Vec::new();
    for col in &mut table.columns {
        let ColumnData::Cells(cells) = &col.data else {
            continue;
        };
        let values: Vec<f64> = cells
            .iter()
            .map(|c| c.as_number().unwrap_or(f64::NAN))
            .collect();
        let parsed = values.iter().filter(|v| !v.is_nan()).count();
        if parsed >= required {
            col.data = ColumnData::Numeric(values);
            cast.push(col.name.clone());
        }
    }
    cast
}

/// Result of month-end indexing.
#[derive(Debug, Clone, PartialEq)]
pub enum MonthEndIndex {
    Indexed {
        frame: MonthlyFrame,
        date_column: String,
        encoding: DateEncoding,
        /// Rows dropped because their date did not parse.
        unparsed_rows: usize,
        /// Rows dropped because a later row fell in the same month.
        duplicate_rows: usize,
    },
    /// No usable date column; the table is passed through unchanged.
    Unindexed { table: Table, reason: String },
}

/// Index `table` by month-end.
///
/// The date column is taken from `DATE_CANDIDATES` by name, or else the first
/// column in which more than half the entries parse. Rows with unparsed dates
/// are dropped, the date column is removed, rows are sorted, and when several
/// rows share a month the chronologically last one is kept.
pub fn to_month_end_index(table: Table) -> MonthEndIndex {
    if table.n_rows() == 0 {
        return MonthEndIndex::Unindexed {
            table,
            reason: "table has no rows".to_string(),
        };
    }

    let Some((pos, parsed)) = find_date_column(&table) else {
        warn!("no date-like column found; keeping table without a month-end index");
        return MonthEndIndex::Unindexed {
            table,
            reason: "no date-like column found".to_string(),
        };
    };
    let date_column = table.columns[pos].name.clone();
    debug!(column = %date_column, encoding = parsed.encoding.label(), "date column selected");

    // (month_end, timestamp, source row)
    let mut keyed: Vec<(chrono::NaiveDate, NaiveDateTime, usize)> = parsed
        .values
        .iter()
        .enumerate()
        .filter_map(|(row, v)| v.map(|dt| (month_end(dt.date()), dt, row)))
        .collect();
    let unparsed_rows = table.n_rows() - keyed.len();
    keyed.sort_by_key(|&(m, dt, row)| (m, dt, row));

    let mut index = Vec::new();
    let mut positions: Vec<Option<usize>> = Vec::new();
    for (m, _, row) in keyed.iter().copied() {
        if index.last() == Some(&m) {
            if let Some(last) = positions.last_mut() {
                *last = Some(row);
            }
        } else {
            index.push(m);
            positions.push(Some(row));
        }
    }
    let duplicate_rows = keyed.len() - index.len();

    let columns = table
        .columns
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != pos)
        .map(|(_, c)| Column {
            name: c.name.clone(),
            data: c.data.take(&positions),
        })
        .collect();

    MonthEndIndex::Indexed {
        frame: MonthlyFrame { index, columns },
        date_column,
        encoding: parsed.encoding,
        unparsed_rows,
        duplicate_rows,
    }
}

fn find_date_column(table: &Table) -> Option<(usize, ParsedDates)> {
    let named = DATE_CANDIDATES.iter().find_map(|cand| {
        table
            .columns
            .iter()
            .position(|c| c.name.trim().to_lowercase() == *cand)
    });

    if let Some(pos) = named {
        let parsed = parse_date_column(&column_cells(&table.columns[pos].data));
        if parsed.is_none() {
            warn!(column = %table.columns[pos].name, "could not parse any dates in the named date column");
        }
        return parsed.map(|p| (pos, p));
    }

    table.columns.iter().enumerate().find_map(|(pos, col)| {
        parse_date_column(&column_cells(&col.data))
            .filter(|p| p.parsed_fraction() > SCAN_PARSE_SHARE)
            .map(|p| (pos, p))
    })
}

fn column_cells(data: &ColumnData) -> Vec<Cell> {
    match data {
        ColumnData::Cells(cells) => cells.clone(),
        ColumnData::Numeric(values) => values
            .iter()
            .map(|v| if v.is_nan() { Cell::Empty } else { Cell::Number(*v) })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawGrid;
    use crate::ingest::header::extract_table;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn table(rows: Vec<Vec<&str>>) -> Table {
        extract_table(&RawGrid::from_strings(rows)).unwrap().table
    }

    #[test]
    fn single_row_report_is_indexed_at_month_end() {
        let mut t = table(vec![
            vec!["Ticker Report"],
            vec!["date", "AAPL"],
            vec!["2021-01-15", "150.0"],
        ]);
        cast_numeric_columns(&mut t);
        let MonthEndIndex::Indexed { frame, date_column, .. } = to_month_end_index(t) else {
            panic!("expected an indexed frame");
        };
        assert_eq!(date_column, "date");
        assert_eq!(frame.index, vec![d(2021, 1, 31)]);
        assert_eq!(frame.column_names(), vec!["AAPL"]);
        assert_eq!(frame.numeric("AAPL").unwrap(), &[150.0]);
    }

    #[test]
    fn last_row_in_a_month_survives_even_when_unsorted() {
        let mut t = table(vec![
            vec!["Date", "x"],
            vec!["2021-02-03", "3"],
            vec!["2021-01-20", "2"],
            vec!["2021-01-05", "1"],
            vec!["2021-02-25", "4"],
            vec!["2021-03-01", "5"],
        ]);
        cast_numeric_columns(&mut t);
        let MonthEndIndex::Indexed {
            frame,
            duplicate_rows,
            ..
        } = to_month_end_index(t)
        else {
            panic!("expected an indexed frame");
        };
        assert_eq!(frame.index, vec![d(2021, 1, 31), d(2021, 2, 28), d(2021, 3, 31)]);
        assert_eq!(frame.numeric("x").unwrap(), &[2.0, 4.0, 5.0]);
        assert_eq!(duplicate_rows, 2);
    }

    #[test]
    fn unnamed_serial_column_is_found_by_scanning() {
        let mut t = table(vec![
            vec!["when", "MSFT"],
            vec!["44197", "220"],
            vec!["44228", "231"],
            vec!["44256", "235"],
            vec!["44287", "250"],
            vec!["44317", "249"],
        ]);
        cast_numeric_columns(&mut t);
        let MonthEndIndex::Indexed {
            frame, encoding, ..
        } = to_month_end_index(t)
        else {
            panic!("expected an indexed frame");
        };
        assert_eq!(encoding, DateEncoding::SpreadsheetSerial);
        assert_eq!(frame.index[0], d(2021, 1, 31));
        assert_eq!(frame.column_names(), vec!["MSFT"]);
    }

    const EPOCH_SECONDS: [i64; 5] = [1_609_718_400, 1_611_100_800, 1_612_137_600, 1_614_297_600, 1_614_556_800];

    fn epoch_table(scale: i64) -> Table {
        let stamps: Vec<String> = EPOCH_SECONDS.iter().map(|s| (s * scale).to_string()).collect();
        let mut rows = vec![vec!["timestamp", "v"]];
        for (stamp, v) in stamps.iter().zip(["1", "2", "3", "4", "5"]) {
            rows.push(vec![stamp.as_str(), v]);
        }
        let mut t = table(rows);
        cast_numeric_columns(&mut t);
        t
    }

    fn assert_epoch_months(t: Table, expected: DateEncoding) {
        let MonthEndIndex::Indexed {
            frame,
            date_column,
            encoding,
            duplicate_rows,
            ..
        } = to_month_end_index(t)
        else {
            panic!("expected an indexed frame");
        };
        assert_eq!(date_column, "timestamp");
        assert_eq!(encoding, expected);
        assert_eq!(frame.index, vec![d(2021, 1, 31), d(2021, 2, 28), d(2021, 3, 31)]);
        assert_eq!(frame.column_names(), vec!["v"]);
        assert_eq!(frame.numeric("v").unwrap(), &[2.0, 4.0, 5.0]);
        assert_eq!(duplicate_rows, 2);
    }

    #[test]
    fn epoch_millis_column_becomes_month_end_index() {
        assert_epoch_months(epoch_table(1_000), DateEncoding::UnixMillis);
    }

    #[test]
    fn epoch_nanos_column_becomes_month_end_index() {
        assert_epoch_months(epoch_table(1_000_000_000), DateEncoding::UnixNanos);
    }

    #[test]
    fn no_date_column_passes_table_through() {
        let t = table(vec![vec!["a", "b"], vec!["x", "1"], vec!["y", "2"]]);
        assert!(matches!(to_month_end_index(t), MonthEndIndex::Unindexed { .. }));
    }

    #[test]
    fn sparse_text_column_stays_text() {
        let mut t = table(vec![
            vec!["date", "note", "v"],
            vec!["2021-01-31", "ok", "1"],
            vec!["2021-02-28", "", "2"],
            vec!["2021-03-31", "", "3"],
            vec!["2021-04-30", "", "4"],
            vec!["2021-05-31", "", "5"],
        ]);
        let cast = cast_numeric_columns(&mut t);
        assert_eq!(cast, vec!["v".to_string()]);
    }
}
