//! Benchmark, basket, and per-ticker feature frames.
//!
//! Everything here is pure: closes and the macro frame go in, frames come out.
//! Writing files and printing diagnostics is left to the pipeline.

use chrono::NaiveDate;
use tracing::warn;

use crate::config::Benchmark;
use crate::domain::MonthlyFrame;
use crate::error::AppError;
use crate::features::lags::{make_lags, trim_leading};
use crate::features::macro_frame::BASE_COVARIATES;
use crate::features::returns::return_column;
use crate::math::pct_change;

pub const AI_BASKET_COLUMN: &str = "ai_basket_ret";

/// Rows of one close column, trimmed to the months where it has a value.
/// `None` when the column is absent or entirely missing.
fn close_rows(closes: &MonthlyFrame, ticker: &str) -> Option<MonthlyFrame> {
    let own = closes.select(&[ticker]).drop_empty_rows();
    (!own.is_empty()).then_some(own)
}

/// Month-over-month returns of `ticker`'s closes, as a single `name` column.
pub fn returns_frame(closes: &MonthlyFrame, ticker: &str, name: &str) -> Option<MonthlyFrame> {
    let own = close_rows(closes, ticker)?;
    let prices = own.numeric(ticker)?.to_vec();
    let mut out = MonthlyFrame::new(own.index.clone());
    out.set_numeric(name, pct_change(&prices));
    Some(out)
}

/// Return frame for each benchmark, in order.
///
/// A benchmark without closes becomes an all-missing column on `fallback_index`
/// with a warning; with `strict` it is an error instead.
pub fn benchmark_returns(
    closes: &MonthlyFrame,
    benchmarks: &[Benchmark],
    fallback_index: &[NaiveDate],
    strict: bool,
) -> Result<Vec<(Benchmark, MonthlyFrame)>, AppError> {
    let mut out = Vec::with_capacity(benchmarks.len());
    for bench in benchmarks {
        let column = bench.return_column();
        let frame = match returns_frame(closes, &bench.ticker, &column) {
            Some(frame) => frame,
            None if strict => {
                return Err(AppError::no_data(format!(
                    "No prices for benchmark {} ({column}); rerun without --strict-benchmarks to continue with an empty column.",
                    bench.ticker
                )));
            }
            None => {
                warn!(ticker = %bench.ticker, column = %column, "benchmark prices unavailable; using an empty column");
                MonthlyFrame::placeholder(fallback_index, &column)
            }
        };
        out.push((bench.clone(), frame));
    }
    Ok(out)
}

/// Equal-weight mean of the available members' monthly returns.
///
/// Members without closes are ignored; a month's mean uses whichever members
/// have a return that month. No members at all gives an all-missing column on
/// `fallback_index`.
pub fn ai_basket_returns(closes: &MonthlyFrame, members: &[String], fallback_index: &[NaiveDate]) -> MonthlyFrame {
    let frames: Vec<MonthlyFrame> = members
        .iter()
        .filter_map(|t| returns_frame(closes, t, &return_column(t)))
        .collect();
    if frames.is_empty() {
        warn!(members = ?members, "no AI basket member has prices; using an empty column");
        return MonthlyFrame::placeholder(fallback_index, AI_BASKET_COLUMN);
    }

    let joined = MonthlyFrame::outer_join(&frames);
    let names = joined.column_names();
    let mean = joined.row_mean(&names);
    let mut out = MonthlyFrame::new(joined.index.clone());
    out.set_numeric(AI_BASKET_COLUMN, mean);
    out
}

/// Feature frame for one ticker.
///
/// `{T}_ret` on the ticker's own months (all-missing on the macro index when
/// it has no closes), left-joined with the benchmark frames, then the macro
/// frame with lagged base covariates. The first `max(lags)` rows are dropped
/// when the frame is longer than that.
pub fn build_features(
    ticker: &str,
    closes: &MonthlyFrame,
    macro_frame: &MonthlyFrame,
    benchmarks: &[MonthlyFrame],
    lags: &[usize],
) -> MonthlyFrame {
    let ret_name = return_column(ticker);
    let mut frame = returns_frame(closes, ticker, &ret_name).unwrap_or_else(|| {
        warn!(ticker, "no prices; returns left empty on the macro calendar");
        MonthlyFrame::placeholder(&macro_frame.index, &ret_name)
    });

    for bench in benchmarks {
        frame = frame.left_join(bench);
    }
    frame = frame.left_join(&make_lags(macro_frame, &BASE_COVARIATES, lags));

    let max_lag = lags.iter().copied().max().unwrap_or(0);
    trim_leading(&frame, max_lag)
}

/// Per-ticker frames outer-joined with columns prefixed `{TICKER}.`.
pub fn combine_features(per_ticker: &[(String, MonthlyFrame)]) -> MonthlyFrame {
    let prefixed: Vec<MonthlyFrame> = per_ticker
        .iter()
        .map(|(ticker, frame)| frame.prefixed(&format!("{ticker}.")))
        .collect();
    MonthlyFrame::outer_join(&prefixed)
}
