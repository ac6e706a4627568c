//! Ordinary least squares.
//!
//! Regressions here are small (tens to a few hundred monthly rows, at most
//! ~20 regressors), so the solve goes through SVD, which also copes with
//! nearly collinear lag columns.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Progressively looser singular-value cutoffs.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fitted OLS model with the usual inference statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsSummary {
    /// Regressor names, `const` first.
    pub names: Vec<String>,
    pub coef: Vec<f64>,
    pub std_err: Vec<f64>,
    pub t_stat: Vec<f64>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub n_obs: usize,
    pub df_resid: usize,
}

pub const INTERCEPT: &str = "const";

/// Fit `y = b0 + X b` and compute standard errors from `s^2 (X'X)^+`.
///
/// `columns` are the regressors (without intercept), each of length `y.len()`.
/// Returns `None` when there are no residual degrees of freedom or the solve
/// fails.
pub fn fit_ols(y: &[f64], columns: &[(String, Vec<f64>)]) -> Option<OlsSummary> {
    let n = y.len();
    let p = columns.len() + 1;
    if n <= p {
        return None;
    }

    let x = DMatrix::from_fn(n, p, |r, c| if c == 0 { 1.0 } else { columns[c - 1].1[r] });
    let yv = DVector::from_column_slice(y);
    let beta = solve_least_squares(&x, &yv)?;

    let resid = &yv - &x * &beta;
    let ssr = resid.dot(&resid);
    let mean = yv.mean();
    let sst: f64 = yv.iter().map(|v| (v - mean).powi(2)).sum();
    let df_resid = n - p;
    let sigma2 = ssr / df_resid as f64;

    let xtx_inv = (x.transpose() * &x).pseudo_inverse(1e-12).ok()?;
    let std_err: Vec<f64> = (0..p)
        .map(|i| (sigma2 * xtx_inv[(i, i)]).max(0.0).sqrt())
        .collect();
    let t_stat = beta
        .iter()
        .zip(&std_err)
        .map(|(b, se)| if *se > 0.0 { b / se } else { f64::NAN })
        .collect();

    let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { f64::NAN };
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df_resid as f64;

    let mut names = vec![INTERCEPT.to_string()];
    names.extend(columns.iter().map(|(name, _)| name.clone()));

    Some(OlsSummary {
        names,
        coef: beta.iter().copied().collect(),
        std_err,
        t_stat,
        r_squared,
        adj_r_squared,
        n_obs: n,
        df_resid,
    })
}
