//! Analysis modules.
//!
//! Churn breakdowns by categorical feature plus the dataset summaries
//! that accompany them in a report.

pub mod aggregator;
pub mod summary;

pub use aggregator::*;
pub use summary::*;
