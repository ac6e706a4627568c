//! Terminal plots.

pub mod ascii;

pub use ascii::{PlotSeries, render_rebased_plot};
