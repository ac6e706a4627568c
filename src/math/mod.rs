//! Mathematical utilities: least squares, series transforms, correlation.

pub mod ols;
pub mod series;
pub mod stats;

pub use ols::*;
pub use series::*;
pub use stats::*;
