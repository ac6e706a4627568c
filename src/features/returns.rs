//! Return columns: locating a ticker's price column and deriving `{TICKER}_ret`.

use tracing::{debug, warn};

use crate::domain::MonthlyFrame;
use crate::error::AppError;
use crate::math::{count_finite, pct_change};

pub const RET_SUFFIX: &str = "_ret";

/// Price candidates with fewer finite values than this are skipped.
pub const MIN_PRICE_VALUES: usize = 3;

pub fn return_column(ticker: &str) -> String {
    format!("{ticker}{RET_SUFFIX}")
}

pub fn is_return_column(name: &str) -> bool {
    name.ends_with(RET_SUFFIX)
}

/// Names of the return columns in `frame`, in column order.
pub fn return_columns(frame: &MonthlyFrame) -> Vec<String> {
    frame
        .column_names()
        .into_iter()
        .filter(|n| is_return_column(n))
        .map(str::to_string)
        .collect()
}

/// Column most likely to hold `ticker`'s price.
///
/// Matches are names equal to or containing the ticker (case-insensitive).
/// An exact match wins; otherwise the shortest name, earliest on ties.
pub fn find_price_column<'a>(names: &[&'a str], ticker: &str) -> Option<&'a str> {
    let wanted = ticker.to_uppercase();
    names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.to_uppercase().contains(&wanted))
        .min_by_key(|(i, n)| (n.to_uppercase() != wanted, n.chars().count(), *i))
        .map(|(_, n)| *n)
}

/// What `ensure_returns` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredReturns {
    /// Every `_ret` column after the call.
    pub columns: Vec<String>,
    /// `(ticker, source column)` pairs used for derivation; empty when the
    /// frame already had return columns.
    pub derived_from: Vec<(String, String)>,
}

/// Make sure `frame` has return columns.
///
/// A frame that already has any `_ret` column is left untouched. Otherwise a
/// price column is located per ticker and its percentage change is stored as
/// `{TICKER}_ret`.
pub fn ensure_returns(frame: &mut MonthlyFrame, tickers: &[String]) -> Result<EnsuredReturns, AppError> {
    let existing = return_columns(frame);
    if !existing.is_empty() {
        debug!(columns = ?existing, "return columns present; nothing to derive");
        return Ok(EnsuredReturns {
            columns: existing,
            derived_from: Vec::new(),
        });
    }

    let candidates: Vec<(String, String)> = {
        let names = frame.column_names();
        tickers
            .iter()
            .filter_map(|t| find_price_column(&names, t).map(|c| (t.clone(), c.to_string())))
            .collect()
    };
    if candidates.is_empty() {
        let preview: Vec<&str> = frame.column_names().into_iter().take(10).collect();
        return Err(AppError::config(format!(
            "No *_ret columns and no obvious price columns found. Available columns: {preview:?} ..."
        )));
    }

    let mut derived_from = Vec::new();
    for (ticker, column) in &candidates {
        let Some(prices) = frame.column(column).map(|c| c.data.to_numeric()) else {
            continue;
        };
        if count_finite(&prices) < MIN_PRICE_VALUES {
            warn!(ticker = %ticker, column = %column, "too few numeric prices; skipped");
            continue;
        }
        frame.set_numeric(&return_column(ticker), pct_change(&prices));
        derived_from.push((ticker.clone(), column.clone()));
    }

    let columns = return_columns(frame);
    if columns.is_empty() {
        return Err(AppError::no_data(format!(
            "Could not construct returns from candidate price columns. Candidates tried: {candidates:?}"
        )));
    }
    Ok(EnsuredReturns { columns, derived_from })
}
