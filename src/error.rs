//! Errors raised while loading and aggregating tables.

use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while reading, preparing or aggregating a record table.
#[derive(Debug, Error)]
pub enum DataError {
    /// A column the operation needs is not in the table.
    #[error("column '{0}' not found in table")]
    MissingColumn(String),

    /// A churn cell holds something other than "yes" or "no".
    #[error("invalid churn label '{value}' in row {row}")]
    InvalidChurnLabel { row: usize, value: String },

    /// A column does not have the type the operation needs.
    #[error("column '{column}' has type {found}, expected {expected}")]
    UnexpectedType {
        column: String,
        expected: &'static str,
        found: String,
    },

    /// An index cell could not be read as a number.
    #[error("column '{column}' has no numeric value in row {row}")]
    NonNumeric { column: String, row: usize },

    #[error("dataframe operation failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DataError::MissingColumn("region".to_string());
        assert_eq!(err.to_string(), "column 'region' not found in table");

        let err = DataError::InvalidChurnLabel {
            row: 3,
            value: "maybe".to_string(),
        };
        assert!(err.to_string().contains("maybe"));
        assert!(err.to_string().contains("row 3"));

        let err = DataError::UnexpectedType {
            column: "state".to_string(),
            expected: "numeric",
            found: "str".to_string(),
        };
        assert_eq!(err.to_string(), "column 'state' has type str, expected numeric");
    }
}
