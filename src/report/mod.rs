//! Console reporting.

pub mod format;

pub use format::*;
