//! Formatted terminal output: frame diagnostics, regression summaries,
//! correlation previews.
//!
//! Everything returns a `String`; callers decide where it goes.

use chrono::NaiveDate;

use crate::domain::MonthlyFrame;
use crate::fit::RegressionOutcome;
use crate::math::OlsSummary;

/// Number of columns listed in the missing-value section of a diagnostic.
pub const TOP_MISSING: usize = 8;

/// Shape, index range, and the most-missing columns of a frame.
pub fn format_diagnostics(name: &str, frame: &MonthlyFrame) -> String {
    let mut out = String::new();
    let range = match frame.index_range() {
        Some((first, last)) => format!("({first}, {last})"),
        None => "(empty)".to_string(),
    };
    out.push_str(&format!(
        "[Diag] {name}: shape=({}, {}), index={range}\n",
        frame.len(),
        frame.width()
    ));

    let mut missing = frame.missing_fractions();
    missing.sort_by(|a, b| b.1.total_cmp(&a.1));
    out.push_str("[Diag] Top NaN%:\n");
    for (column, frac) in missing.iter().take(TOP_MISSING) {
        out.push_str(&format!("  {:<32} {frac:>6.3}\n", truncate(column, 32)));
    }
    out
}

/// Regression result block for one ticker.
pub fn format_regression(ticker: &str, outcome: &RegressionOutcome) -> String {
    let mut out = format!("=== {ticker} OLS (enriched) ===\n");
    match outcome {
        RegressionOutcome::Skipped(reason) => {
            out.push_str(&format!("[info] {reason}\n"));
        }
        RegressionOutcome::Fitted(summary) => out.push_str(&format_ols_summary(summary)),
    }
    out
}

/// Coefficient table plus fit statistics.
pub fn format_ols_summary(fit: &OlsSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "n={} | df_resid={} | R^2={:.4} | adj R^2={:.4}\n",
        fit.n_obs, fit.df_resid, fit.r_squared, fit.adj_r_squared
    ));

    out.push_str(format!("{:<28} {:>12} {:>12} {:>9}", "term", "coef", "std_err", "t").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<28} {:-<12} {:-<12} {:-<9}", "", "", "", "").trim_end());
    out.push('\n');

    for (i, name) in fit.names.iter().enumerate() {
        out.push_str(
            format!(
                "{:<28} {:>12.6} {:>12.6} {:>9.3}",
                truncate(name, 28),
                fit.coef[i],
                fit.std_err[i],
                fit.t_stat[i],
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Last `n` dated values of a series, one per line.
pub fn format_tail(label: &str, index: &[NaiveDate], values: &[f64], n: usize) -> String {
    let mut out = format!("Last few rows of {label}:\n");
    let start = index.len().saturating_sub(n);
    for (date, value) in index.iter().zip(values).skip(start) {
        if value.is_finite() {
            out.push_str(&format!("{date}  {value:>10.6}\n"));
        } else {
            out.push_str(&format!("{date}  {:>10}\n", "NaN"));
        }
    }
    out
}

/// Square correlation matrix with truncated labels.
pub fn format_correlation(names: &[String], matrix: &[Vec<f64>]) -> String {
    let mut out = String::new();
    let mut header = format!("{:<10}", "");
    for name in names {
        header.push_str(&format!(" {:>9}", truncate(name, 9)));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    for (name, row) in names.iter().zip(matrix) {
        let mut line = format!("{:<10}", truncate(name, 10));
        for v in row {
            if v.is_finite() {
                line.push_str(&format!(" {v:>9.3}"));
            } else {
                line.push_str(&format!(" {:>9}", "NaN"));
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// `label: [a, b, ...]` with at most `max` names.
pub fn format_column_preview(label: &str, names: &[&str], max: usize) -> String {
    let shown: Vec<&str> = names.iter().take(max).copied().collect();
    let more = if names.len() > max { ", ..." } else { "" };
    format!("{label}: [{}{more}]", shown.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
