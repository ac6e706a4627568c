//! Lagged covariates.

use crate::domain::MonthlyFrame;
use crate::math::shift;

pub fn lag_column(base: &str, lag: usize) -> String {
    format!("{base}_lag{lag}")
}

/// Copy of `frame` with `{base}_lag{L}` appended for every base column present.
///
/// Lags are positional: `x_lagL[i] = x[i - L]`. Missing bases are ignored.
pub fn make_lags(frame: &MonthlyFrame, bases: &[&str], lags: &[usize]) -> MonthlyFrame {
    let mut out = frame.clone();
    for base in bases {
        let Some(values) = frame.column(base).map(|c| c.data.to_numeric()) else {
            continue;
        };
        for &lag in lags {
            out.set_numeric(&lag_column(base, lag), shift(&values, lag));
        }
    }
    out
}

/// Drop the first `max_lag` rows, where lagged values are undefined.
///
/// Frames no longer than `max_lag` are returned unchanged.
pub fn trim_leading(frame: &MonthlyFrame, max_lag: usize) -> MonthlyFrame {
    if frame.len() > max_lag {
        frame.skip_rows(max_lag)
    } else {
        frame.clone()
    }
}
