//! Input/output helpers.
//!
//! - raw grids from workbooks and header-less CSV (`workbook`)
//! - monthly frame / table / matrix CSV read and write (`frame_csv`)

pub mod frame_csv;
pub mod workbook;

pub use frame_csv::*;
pub use workbook::*;
