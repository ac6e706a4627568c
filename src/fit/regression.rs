//! Per-ticker OLS on the feature frame, with sample-size guardrails.
//!
//! The regression is advisory: an insufficient sample is an informational
//! skip, never an error.

use tracing::info;

use crate::domain::MonthlyFrame;
use crate::features::return_column;
use crate::math::{OlsSummary, fit_ols};

/// Result of a guarded regression.
#[derive(Debug, Clone, PartialEq)]
pub enum RegressionOutcome {
    Fitted(OlsSummary),
    Skipped(String),
}

/// Regression guardrails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegressionGuard {
    /// Minimum complete rows.
    pub min_rows: usize,
    /// At most this many covariates are used.
    pub max_covariates: usize,
}

/// The `max` columns other than `target` with the lowest missing fraction.
///
/// Ties keep column order.
pub fn select_covariates(frame: &MonthlyFrame, target: &str, max: usize) -> Vec<String> {
    let mut ranked: Vec<(String, f64)> = frame
        .missing_fractions()
        .into_iter()
        .filter(|(name, _)| name != target)
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.into_iter().take(max).map(|(name, _)| name).collect()
}

/// Fit `target ~ const + covariates` on rows where every selected column is
/// present.
///
/// Skips when fewer than `min_rows` complete rows remain or when
/// `n - k <= 1`, where `k` counts the target and the covariates.
pub fn fit_guarded(frame: &MonthlyFrame, target: &str, covariates: &[String], min_rows: usize) -> RegressionOutcome {
    let Some(y_all) = frame.column(target).map(|c| c.data.to_numeric()) else {
        return RegressionOutcome::Skipped(format!("{target} is not in the frame"));
    };
    let x_all: Vec<(String, Vec<f64>)> = covariates
        .iter()
        .filter_map(|name| frame.column(name).map(|c| (name.clone(), c.data.to_numeric())))
        .collect();

    let complete: Vec<usize> = (0..frame.len())
        .filter(|&row| y_all[row].is_finite() && x_all.iter().all(|(_, v)| v[row].is_finite()))
        .collect();

    let n = complete.len();
    let k = x_all.len() + 1;
    let resid_df = n as i64 - k as i64;
    if n < min_rows || resid_df <= 1 {
        let reason = format!("Not enough rows/df for {target}: n={n}, resid_df≈{resid_df}. Skipping.");
        info!(target, n, resid_df, "regression skipped");
        return RegressionOutcome::Skipped(reason);
    }

    let y: Vec<f64> = complete.iter().map(|&r| y_all[r]).collect();
    let x: Vec<(String, Vec<f64>)> = x_all
        .into_iter()
        .map(|(name, v)| (name, complete.iter().map(|&r| v[r]).collect()))
        .collect();

    match fit_ols(&y, &x) {
        Some(summary) => RegressionOutcome::Fitted(summary),
        None => RegressionOutcome::Skipped(format!("OLS solve failed for {target} (n={n}, k={k}).")),
    }
}

/// Regress `{ticker}_ret` on its best-populated covariates.
pub fn regress_ticker(frame: &MonthlyFrame, ticker: &str, guard: RegressionGuard) -> RegressionOutcome {
    let target = return_column(ticker);
    if !frame.contains(&target) {
        return RegressionOutcome::Skipped(format!("{target} is not in the frame"));
    }
    let covariates = select_covariates(frame, &target, guard.max_covariates);
    fit_guarded(frame, &target, &covariates, guard.min_rows)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::month_ends_between;

    fn frame(n: usize) -> MonthlyFrame {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let index = month_ends_between(start, start + chrono::Months::new(n as u32 - 1));
        let x: Vec<f64> = (0..n).map(|i| ((i * 7) % 11) as f64).collect();
        let z: Vec<f64> = (0..n).map(|i| ((i * 5) % 13) as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .zip(&z)
            .map(|(x, z)| 0.5 + 2.0 * x - 0.25 * z)
            .collect();
        let mut f = MonthlyFrame::new(index);
        f.set_numeric("AAPL_ret", y);
        f.set_numeric("x", x);
        f.set_numeric("z", z);
        f.set_numeric("sparse", (0..n).map(|i| if i % 2 == 0 { 1.0 } else { f64::NAN }).collect());
        f
    }

    #[test]
    fn covariates_ranked_by_completeness() {
        let picked = select_covariates(&frame(30), "AAPL_ret", 2);
        assert_eq!(picked, vec!["x", "z"]);
    }

    #[test]
    fn exact_relationship_is_recovered() {
        let guard = RegressionGuard {
            min_rows: 24,
            max_covariates: 2,
        };
        let RegressionOutcome::Fitted(fit) = regress_ticker(&frame(30), "AAPL", guard) else {
            panic!("expected a fit");
        };
        assert_eq!(fit.names, vec!["const", "x", "z"]);
        assert_eq!(fit.n_obs, 30);
        assert!((fit.coef[0] - 0.5).abs() < 1e-8);
        assert!((fit.coef[1] - 2.0).abs() < 1e-8);
        assert!((fit.coef[2] + 0.25).abs() < 1e-8);
        assert!((fit.r_squared - 1.0).abs() < 1e-10);
    }

    #[test]
    fn small_samples_are_skipped() {
        let guard = RegressionGuard {
            min_rows: 24,
            max_covariates: 3,
        };
        // `sparse` halves the complete rows: 15 < 24.
        match regress_ticker(&frame(30), "AAPL", guard) {
            RegressionOutcome::Skipped(reason) => assert!(reason.contains("n=15")),
            other => panic!("expected skip, got {other:?}"),
        }

        // n=4, k=3 leaves one residual degree of freedom.
        let covs = vec!["x".to_string(), "z".to_string()];
        assert!(matches!(
            fit_guarded(&frame(4), "AAPL_ret", &covs, 0),
            RegressionOutcome::Skipped(_)
        ));
    }

    #[test]
    fn missing_target_is_skipped() {
        let guard = RegressionGuard {
            min_rows: 1,
            max_covariates: 1,
        };
        assert!(matches!(regress_ticker(&frame(30), "MSFT", guard), RegressionOutcome::Skipped(_)));
    }
}
