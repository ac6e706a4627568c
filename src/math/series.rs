//! Positional series transforms on NaN-marked vectors.
//!
//! Each output has the input's length; positions without a defined value are
//! NaN. Missing inputs are not forward-filled.

/// Percentage change over `periods` positions: `x[i] / x[i - periods] - 1`.
///
/// Non-finite results (missing operands, division by zero) are NaN.
pub fn pct_change_n(values: &[f64], periods: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if periods == 0 || i < periods {
                return f64::NAN;
            }
            let r = values[i] / values[i - periods] - 1.0;
            if r.is_finite() { r } else { f64::NAN }
        })
        .collect()
}

/// One-period percentage change; the first value is undefined.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    pct_change_n(values, 1)
}

/// One-period first difference; the first value is undefined.
pub fn diff(values: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|i| if i == 0 { f64::NAN } else { values[i] - values[i - 1] })
        .collect()
}

/// Value `periods` positions earlier (lag).
pub fn shift(values: &[f64], periods: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| if i < periods { f64::NAN } else { values[i - periods] })
        .collect()
}

/// Values divided by the first finite value, times `base`.
pub fn rebase(values: &[f64], base: f64) -> Vec<f64> {
    let Some(first) = values.iter().copied().find(|v| v.is_finite() && *v != 0.0) else {
        return vec![f64::NAN; values.len()];
    };
    values.iter().map(|v| v / first * base).collect()
}

/// Number of finite values.
pub fn count_finite(values: &[f64]) -> usize {
    values.iter().filter(|v| v.is_finite()).count()
}
