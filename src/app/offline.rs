//! Pipelines that work only from files already under `Monthly/`:
//! re-assembling the combined frame and the offline return model.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::app::pipeline::{AI_BASKET_FILE, COMBINED_FILE, MACRO_FILE, benchmark_file, features_file};
use crate::config::Settings;
use crate::domain::MonthlyFrame;
use crate::error::AppError;
use crate::features::{ensure_returns, find_price_column, is_return_column, return_column};
use crate::io::{read_frame_csv, write_frame_csv, write_matrix_csv};
use crate::math::{correlation_matrix, pct_change};

pub const CORR_FILE: &str = "ret_corr.csv";
pub const AVG_RET_COLUMN: &str = "avg_ret";

#[derive(Debug, Clone)]
pub struct RebuildOutput {
    pub combined: MonthlyFrame,
    pub sources: Vec<PathBuf>,
    pub path: PathBuf,
}

fn read_if_present(path: &Path) -> Result<Option<MonthlyFrame>, AppError> {
    if !path.exists() {
        debug!(path = %path.display(), "not found; skipped");
        return Ok(None);
    }
    read_frame_csv(path).map(Some)
}

/// Return columns of a per-ticker features file, deriving `{T}_ret` from a
/// ticker-like price column when the file has none.
fn ticker_returns(frame: &MonthlyFrame, ticker: &str) -> Option<MonthlyFrame> {
    let keep: Vec<&str> = frame.column_names().into_iter().filter(|n| is_return_column(n)).collect();
    if keep.is_empty() {
        let column = find_price_column(&frame.column_names(), ticker)?;
        let prices = frame.column(column)?.data.to_numeric();
        let mut derived = MonthlyFrame::new(frame.index.clone());
        derived.set_numeric(&return_column(ticker), pct_change(&prices));
        return Some(derived);
    }
    Some(frame.select(&keep))
}

/// Outer-join the benchmark, basket, macro, and per-ticker return frames into
/// `Monthly/tech_features_combined.csv`. The first frame to provide a column
/// name wins; rows with no values at all are dropped.
pub fn run_rebuild(settings: &Settings) -> Result<RebuildOutput, AppError> {
    let dir = settings.monthly_dir();
    let mut frames = Vec::new();
    let mut sources = Vec::new();

    let mut shared: Vec<String> = settings.benchmarks.iter().map(|b| benchmark_file(&b.name)).collect();
    shared.push(AI_BASKET_FILE.to_string());
    shared.push(MACRO_FILE.to_string());
    for file in &shared {
        let path = dir.join(file);
        if let Some(frame) = read_if_present(&path)? {
            frames.push(frame);
            sources.push(path);
        }
    }

    for ticker in &settings.tickers {
        let path = dir.join(features_file(ticker));
        let Some(frame) = read_if_present(&path)? else {
            continue;
        };
        match ticker_returns(&frame, ticker) {
            Some(returns) => {
                frames.push(returns);
                sources.push(path);
            }
            None => info!(ticker = %ticker, "no return or price column; skipped"),
        }
    }

    if frames.is_empty() {
        return Err(AppError::no_data(format!(
            "Found no usable frames in '{}'. Aborting.",
            dir.display()
        )));
    }

    let combined = MonthlyFrame::outer_join(&frames).drop_empty_rows();
    let path = dir.join(COMBINED_FILE);
    write_frame_csv(&path, &combined)?;
    Ok(RebuildOutput {
        combined,
        sources,
        path,
    })
}

#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub return_columns: Vec<String>,
    pub correlation: Vec<Vec<f64>>,
    pub correlation_path: PathBuf,
    /// The input frame with returns ensured and `avg_ret` appended.
    pub frame: MonthlyFrame,
}

/// Offline model on the combined file.
///
/// Missing input is exit 1; no return or price-like columns is exit 2; no
/// constructible return column is exit 3.
pub fn run_model(settings: &Settings, input: Option<&Path>, min_periods: usize) -> Result<ModelOutput, AppError> {
    let path = input.map(Path::to_path_buf).unwrap_or_else(|| settings.monthly_dir().join(COMBINED_FILE));
    if !path.exists() {
        return Err(AppError::missing_input(format!("Missing file: {}", path.display())));
    }
    let mut frame = read_frame_csv(&path)?;
    let ensured = ensure_returns(&mut frame, &settings.tickers)?;

    let columns: Vec<Vec<f64>> = ensured
        .columns
        .iter()
        .filter_map(|c| frame.column(c).map(|col| col.data.to_numeric()))
        .collect();
    let correlation = correlation_matrix(&columns, min_periods);
    let correlation_path = path
        .parent()
        .map(|p| p.join(CORR_FILE))
        .unwrap_or_else(|| PathBuf::from(CORR_FILE));
    write_matrix_csv(&correlation_path, &ensured.columns, &correlation)?;

    let names: Vec<&str> = ensured.columns.iter().map(String::as_str).collect();
    let avg = frame.row_mean(&names);
    frame.set_numeric(AVG_RET_COLUMN, avg);

    Ok(ModelOutput {
        return_columns: ensured.columns,
        correlation,
        correlation_path,
        frame,
    })
}
