//! Terminal charts for the dashboard series.

pub mod ascii;

pub use ascii::render_series_plot;
