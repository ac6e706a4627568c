//! Domain types used throughout the pipelines.
//!
//! - raw spreadsheet cells and header-less grids (`cell`)
//! - named-column tables and month-end indexed frames (`frame`)
//! - month-end calendar helpers and resampling (`month`)

pub mod cell;
pub mod frame;
pub mod month;

pub use cell::*;
pub use frame::*;
pub use month::*;
