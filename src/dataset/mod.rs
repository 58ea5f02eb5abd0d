//! Dataset loading and preparation.
//!
//! Reads the customer CSV into a polars `DataFrame` and applies the
//! column cleanup the analysis expects.

pub mod frame;
pub mod loader;
pub mod prepare;
pub mod regions;

pub use loader::load_csv;
pub use prepare::{prepare, PrepareOptions};
