//! Input/output helpers.
//!
//! - line splitting (`row`)
//! - header resolution + row validation (`schema`)
//! - end-to-end upload ingest (`ingest`)
//! - aggregate CSV export (`export`)

pub mod export;
pub mod ingest;
pub mod row;
pub mod schema;

pub use export::*;
pub use ingest::*;
