//! Cache-first downloads and the daily-close views (correlation, plot).

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::config::Settings;
use crate::data::{DatedSeries, DownloadSummary, HttpGet, PriceLoader, align_daily, download_series};
use crate::domain::{Cell, Column, Table, format_float};
use crate::error::AppError;
use crate::io::{write_matrix_csv, write_table_csv};
use crate::math::{correlation_matrix, pct_change};
use crate::plot::{PlotSeries, render_rebased_plot};

pub const MERGED_PRICES_FILE: &str = "tech_prices_merged.csv";
pub const DAILY_CORR_FILE: &str = "tech_close_daily_corr.csv";

/// FRED series into `fred_{ID}.csv`.
pub fn run_fred(settings: &Settings, http: &dyn HttpGet, ids: &[String]) -> Result<(Vec<DatedSeries>, DownloadSummary), AppError> {
    download_series(settings, http, ids)
}

/// Daily closes into `raw/{TICKER}_daily.csv`, plus a long-format merge
/// (`date,ticker,close`) at the cache root.
pub fn run_prices(settings: &Settings, http: &dyn HttpGet) -> Result<(DownloadSummary, PathBuf), AppError> {
    let loader = PriceLoader::new(settings, http)?;
    let (series, summary) = loader.daily(&settings.tickers)?;

    let mut dates = Vec::new();
    let mut tickers = Vec::new();
    let mut closes = Vec::new();
    for s in &series {
        for (date, close) in &s.points {
            dates.push(Cell::Text(date.to_string()));
            tickers.push(Cell::Text(s.key.clone()));
            closes.push(*close);
        }
    }
    let table = Table {
        columns: vec![
            Column::cells("date", dates),
            Column::cells("ticker", tickers),
            Column::numeric("close", closes),
        ],
    };
    let path = settings.cache_dir.join(MERGED_PRICES_FILE);
    write_table_csv(&path, &table)?;
    Ok((summary, path))
}

fn daily_closes(settings: &Settings, http: &dyn HttpGet) -> Result<(Vec<String>, Vec<NaiveDate>, Vec<Vec<f64>>), AppError> {
    let loader = PriceLoader::new(settings, http)?;
    let (series, _) = loader.daily(&settings.tickers)?;
    if series.is_empty() {
        return Err(AppError::no_data("No daily closes available for the requested tickers."));
    }
    let names = series.iter().map(|s| s.key.clone()).collect();
    let (dates, columns) = align_daily(&series);
    Ok((names, dates, columns))
}

#[derive(Debug, Clone)]
pub struct DailyCorrelation {
    pub names: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
    /// Days on which every ticker has a return.
    pub n_days: usize,
    pub path: PathBuf,
}

/// Close-to-close returns on days where every ticker has one, correlated.
pub fn run_corr(settings: &Settings, http: &dyn HttpGet) -> Result<DailyCorrelation, AppError> {
    let (names, _, closes) = daily_closes(settings, http)?;
    let returns: Vec<Vec<f64>> = closes.iter().map(|c| pct_change(c)).collect();
    let complete = complete_rows(&returns);
    let matrix = correlation_matrix(&complete, 2);

    let path = settings.cache_dir.join(DAILY_CORR_FILE);
    write_matrix_csv(&path, &names, &matrix)?;
    Ok(DailyCorrelation {
        names,
        matrix,
        n_days: complete.first().map(Vec::len).unwrap_or(0),
        path,
    })
}

/// Keep only positions where every column is finite.
fn complete_rows(columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = columns.first().map(Vec::len).unwrap_or(0);
    let rows: Vec<usize> = (0..n)
        .filter(|&i| columns.iter().all(|c| c[i].is_finite()))
        .collect();
    columns
        .iter()
        .map(|c| rows.iter().map(|&i| c[i]).collect())
        .collect()
}

/// Rebased ASCII chart of the tickers' daily closes.
pub fn run_plot(settings: &Settings, http: &dyn HttpGet, width: usize, height: usize) -> Result<String, AppError> {
    let (names, dates, closes) = daily_closes(settings, http)?;
    let series: Vec<PlotSeries> = names
        .into_iter()
        .zip(closes)
        .map(|(name, values)| PlotSeries::new(name, values))
        .collect();
    Ok(render_rebased_plot(&dates, &series, width, height))
}

/// One line per series: key, rows, date range, last value.
pub fn format_series_lines(series: &[DatedSeries]) -> String {
    let mut out = String::new();
    for s in series {
        let (Some(first), Some(last)) = (s.points.first(), s.points.last()) else {
            continue;
        };
        out.push_str(&format!(
            "{:<10} rows={:<6} {} .. {} last={}\n",
            s.key,
            s.len(),
            first.0,
            last.0,
            format_float(last.1)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_rows_drops_any_gap() {
        let cols = vec![vec![f64::NAN, 0.1, 0.2, 0.3], vec![f64::NAN, 0.05, f64::NAN, 0.1]];
        let kept = complete_rows(&cols);
        assert_eq!(kept, vec![vec![0.1, 0.3], vec![0.05, 0.1]]);
    }
}
