//! `sales-dash` library crate.
//!
//! The binary (`dash`) is a thin wrapper around this library so that:
//!
//! - the ingestion core is testable without spawning processes
//! - the store and the core can be reused behind another front-end
//!
//! Data flow: [`io::row`] splits lines, [`io::schema`] validates them,
//! [`aggregate`] folds records into series and [`io::ingest`] commits the
//! result to a [`store::DatasetStore`].

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
pub mod store;
