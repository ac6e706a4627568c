//! Pairwise correlation with missing values.

use crate::math::series::count_finite;

/// Pearson correlation over positions where both inputs are finite.
///
/// NaN when fewer than `min_periods` pairs remain or either side is constant.
pub fn pearson(a: &[f64], b: &[f64], min_periods: usize) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect();
    let n = pairs.len();
    if n < min_periods.max(2) {
        return f64::NAN;
    }

    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Correlation matrix of `columns` (pairwise-complete observations).
pub fn correlation_matrix(columns: &[Vec<f64>], min_periods: usize) -> Vec<Vec<f64>> {
    let k = columns.len();
    let mut out = vec![vec![f64::NAN; k]; k];
    for i in 0..k {
        for j in i..k {
            let r = if i == j {
                if count_finite(&columns[i]) >= min_periods.max(2) {
                    1.0
                } else {
                    f64::NAN
                }
            } else {
                pearson(&columns[i], &columns[j], min_periods)
            };
            out[i][j] = r;
            out[j][i] = r;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_and_inverse_correlation() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        let c = [4.0, 3.0, 2.0, 1.0];
        assert!((pearson(&a, &b, 1) - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &c, 1) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn min_periods_counts_complete_pairs() {
        let a = [1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0];
        let b = [1.0, 2.0, 3.0, 4.0, 5.0, 7.0];
        assert!(pearson(&a, &b, 6).is_nan());
        assert!(pearson(&a, &b, 5).is_finite());
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let cols = vec![vec![1.0, 2.0, 3.0], vec![3.0, 1.0, 2.0]];
        let m = correlation_matrix(&cols, 2);
        assert_eq!(m[0][0], 1.0);
        assert_eq!(m[0][1], m[1][0]);
    }
}
