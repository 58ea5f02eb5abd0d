//! CSV loading into a polars `DataFrame`.

use crate::error::DataError;
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Cells read as missing, in addition to empty fields.
pub const NA_TOKENS: [&str; 8] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Load a CSV file with a header row.
///
/// Column types are inferred over the whole file, so a column mixing
/// `1` and `1.0` is read as a single float column. Blank header cells
/// are named `Unnamed: <position>`.
pub fn load_csv(path: &Path) -> Result<DataFrame, DataError> {
    std::fs::metadata(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let null_values = NullValues::AllColumns(NA_TOKENS.iter().map(|t| t.to_string()).collect());
    let mut df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_null_values(Some(null_values))
        .finish()?
        .collect()?;

    name_blank_headers(&mut df)?;
    debug!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// The CSV reader names an empty header cell `column_<n>` (1-based).
fn name_blank_headers(df: &mut DataFrame) -> Result<(), DataError> {
    let renames: Vec<(String, String)> = df
        .get_column_names()
        .iter()
        .enumerate()
        .filter(|(i, name)| name.trim().is_empty() || **name == format!("column_{}", i + 1))
        .map(|(i, name)| (name.to_string(), format!("Unnamed: {}", i)))
        .collect();

    for (old, new) in renames {
        df.rename(&old, &new)?;
    }
    Ok(())
}
