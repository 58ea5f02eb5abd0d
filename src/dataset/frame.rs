//! Column lookups and checks on the record `DataFrame`.

use crate::error::DataError;
use crate::models::{ChurnLabel, Value, CHURN_COLUMN};
use polars::prelude::*;

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| *c == name)
}

/// The named column, or `MissingColumn`.
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series, DataError> {
    if !has_column(df, name) {
        return Err(DataError::MissingColumn(name.to_string()));
    }
    Ok(df.column(name)?)
}

/// Fail on the first churn cell that is not exactly "yes" or "no".
///
/// Missing cells count as invalid: every row has to land in a class.
pub fn validate_churn(df: &DataFrame) -> Result<(), DataError> {
    let churn = require_column(df, CHURN_COLUMN)?.cast(&DataType::String)?;

    for (row, cell) in churn.str()?.into_iter().enumerate() {
        if cell.and_then(ChurnLabel::parse).is_none() {
            return Err(DataError::InvalidChurnLabel {
                row,
                value: cell.unwrap_or_default().to_string(),
            });
        }
    }
    Ok(())
}

/// A numeric column cast to `Float64`.
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Series, DataError> {
    let series = require_column(df, name)?;
    if !series.dtype().is_numeric() {
        return Err(DataError::UnexpectedType {
            column: name.to_string(),
            expected: "numeric",
            found: series.dtype().to_string(),
        });
    }
    Ok(series.cast(&DataType::Float64)?)
}

/// Cell `idx` of a column as a report value.
pub fn value_at(series: &Series, idx: usize) -> Result<Value, DataError> {
    Ok(Value::from(series.get(idx)?))
}
