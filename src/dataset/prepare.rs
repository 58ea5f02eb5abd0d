//! Cleanup applied to the raw `DataFrame` before analysis.

use crate::dataset::regions::region_for;
use crate::dataset::frame::{has_column, require_column};
use crate::error::DataError;
use crate::models::{IndexCheck, PreparationSummary};
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Column added by [`derive_region`].
pub const REGION_COLUMN: &str = "region";
pub const STATE_COLUMN: &str = "state";
pub const AREA_CODE_COLUMN: &str = "area_code";

/// Which preparation steps to run.
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// Leading index column written by the exporter.
    pub index_column: String,
    /// Drop the index column once checked.
    pub drop_index: bool,
    /// Add a `region` column derived from `state`.
    pub derive_region: bool,
    /// Reduce `area_code` values to their three-digit code.
    pub clean_area_code: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            index_column: "Unnamed: 0".to_string(),
            drop_index: true,
            derive_region: true,
            clean_area_code: true,
        }
    }
}

impl From<&crate::config::DatasetConfig> for PrepareOptions {
    fn from(config: &crate::config::DatasetConfig) -> Self {
        Self {
            index_column: config.index_column.clone(),
            drop_index: config.drop_index,
            derive_region: config.derive_region,
            clean_area_code: config.clean_area_code,
        }
    }
}

/// Compare a column against the 1-based row positions.
pub fn check_index_column(df: &DataFrame, column: &str) -> Result<IndexCheck, DataError> {
    let index = require_column(df, column)?.cast(&DataType::Float64)?;
    let mut offset_sum = 0.0;
    let mut sequential = true;

    for (row, cell) in index.f64()?.into_iter().enumerate() {
        let cell = cell.ok_or_else(|| DataError::NonNumeric {
            column: column.to_string(),
            row,
        })?;
        let offset = cell - (row + 1) as f64;
        offset_sum += offset;
        if offset != 0.0 {
            sequential = false;
        }
    }

    Ok(IndexCheck {
        column: column.to_string(),
        offset_sum,
        sequential,
    })
}

fn text_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked, DataError> {
    let series = require_column(df, name)?;
    series.str().map_err(|_| DataError::UnexpectedType {
        column: name.to_string(),
        expected: "text",
        found: series.dtype().to_string(),
    })
}

/// Add a `region` column mapped from `state`.
///
/// Returns the states that have no region; their rows get a missing value.
pub fn derive_region(df: &mut DataFrame) -> Result<Vec<String>, DataError> {
    let mut unmapped = BTreeSet::new();

    let regions: Vec<Option<&'static str>> = text_column(df, STATE_COLUMN)?
        .into_iter()
        .map(|state| {
            let state = state?;
            let region = region_for(state);
            if region.is_none() {
                unmapped.insert(state.to_string());
            }
            region.map(|r| r.as_str())
        })
        .collect();

    df.with_column(Series::new(REGION_COLUMN, regions))?;
    Ok(unmapped.into_iter().collect())
}

/// Keep only the trailing three characters of each `area_code`
/// ("area_code_415" becomes "415"). A column read as numbers is already
/// clean and is left alone; returns whether anything was rewritten.
pub fn clean_area_code(df: &mut DataFrame) -> Result<bool, DataError> {
    let codes = require_column(df, AREA_CODE_COLUMN)?;
    let Ok(codes) = codes.str() else {
        debug!("'{}' is {}, nothing to clean", AREA_CODE_COLUMN, codes.dtype());
        return Ok(false);
    };

    let cleaned: Vec<Option<String>> = codes
        .into_iter()
        .map(|code| {
            code.map(|code| {
                let start = code.char_indices().rev().nth(2).map_or(0, |(i, _)| i);
                code[start..].to_string()
            })
        })
        .collect();

    df.with_column(Series::new(AREA_CODE_COLUMN, cleaned))?;
    Ok(true)
}

/// Run the enabled preparation steps in order: index check and drop,
/// region derivation, area code cleanup. Steps whose source column is
/// absent are skipped.
pub fn prepare(
    mut df: DataFrame,
    options: &PrepareOptions,
) -> Result<(DataFrame, PreparationSummary), DataError> {
    let mut summary = PreparationSummary::default();

    if has_column(&df, &options.index_column) {
        let check = check_index_column(&df, &options.index_column)?;
        if check.sequential {
            debug!("'{}' is a plain row index", check.column);
        } else {
            warn!(
                "'{}' deviates from the row sequence (offset sum {})",
                check.column, check.offset_sum
            );
        }
        if options.drop_index {
            df = df.drop(&options.index_column)?;
            summary.index_dropped = true;
        }
        summary.index_check = Some(check);
    } else {
        debug!("No index column '{}'", options.index_column);
    }

    if options.derive_region {
        if has_column(&df, STATE_COLUMN) {
            summary.unmapped_states = derive_region(&mut df)?;
            summary.region_derived = true;
            if !summary.unmapped_states.is_empty() {
                warn!("States without a region: {:?}", summary.unmapped_states);
            }
        } else {
            warn!("Cannot derive regions: no '{}' column", STATE_COLUMN);
        }
    }

    if options.clean_area_code && has_column(&df, AREA_CODE_COLUMN) {
        summary.area_code_cleaned = clean_area_code(&mut df)?;
    }

    info!("Prepared {} rows x {} columns", df.height(), df.width());
    Ok((df, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> DataFrame {
        df!(
            "Unnamed: 0" => [1i64, 2, 3],
            "state" => ["KS", "NJ", "PR"],
            "area_code" => ["area_code_415", "area_code_408", "area_code_510"],
            "churn" => ["no", "yes", "no"]
        )
        .unwrap()
    }

    fn text_cells(df: &DataFrame, column: &str) -> Vec<Option<String>> {
        df.column(column)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|cell| cell.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_check_index_column() {
        let check = check_index_column(&raw_frame(), "Unnamed: 0").unwrap();
        assert!(check.sequential);
        assert_eq!(check.offset_sum, 0.0);

        let shifted = df!("idx" => [0i64, 1, 2]).unwrap();
        let check = check_index_column(&shifted, "idx").unwrap();
        assert!(!check.sequential);
        assert_eq!(check.offset_sum, -3.0);
    }

    #[test]
    fn test_check_quoted_index_column() {
        // Quoted row names are read as text.
        let quoted = df!("idx" => ["1", "2"]).unwrap();
        assert!(check_index_column(&quoted, "idx").unwrap().sequential);

        let broken = df!("idx" => ["1", "x"]).unwrap();
        assert!(matches!(
            check_index_column(&broken, "idx"),
            Err(DataError::NonNumeric { row: 1, .. })
        ));
    }

    #[test]
    fn test_derive_region() {
        let mut df = raw_frame();
        let unmapped = derive_region(&mut df).unwrap();

        assert_eq!(unmapped, vec!["PR".to_string()]);
        assert_eq!(
            text_cells(&df, "region"),
            vec![Some("midwest".to_string()), Some("northeast".to_string()), None]
        );
    }

    #[test]
    fn test_derive_region_needs_text_states() {
        let mut df = df!("state" => [1i64, 2]).unwrap();
        assert!(matches!(
            derive_region(&mut df),
            Err(DataError::UnexpectedType { expected: "text", .. })
        ));
    }

    #[test]
    fn test_clean_area_code() {
        let mut df = raw_frame();
        assert!(clean_area_code(&mut df).unwrap());
        assert_eq!(
            text_cells(&df, "area_code"),
            vec![Some("415".to_string()), Some("408".to_string()), Some("510".to_string())]
        );
    }

    #[test]
    fn test_clean_area_code_short_and_numeric_values() {
        let mut df = df!("area_code" => [Some("ab"), Some("415"), None]).unwrap();
        clean_area_code(&mut df).unwrap();
        assert_eq!(
            text_cells(&df, "area_code"),
            vec![Some("ab".to_string()), Some("415".to_string()), None]
        );

        let mut df = df!("area_code" => [415i64, 408]).unwrap();
        assert!(!clean_area_code(&mut df).unwrap());
        assert_eq!(df.column("area_code").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_prepare_runs_all_steps() {
        let (df, summary) = prepare(raw_frame(), &PrepareOptions::default()).unwrap();

        assert!(summary.index_dropped);
        assert!(summary.region_derived);
        assert!(summary.area_code_cleaned);
        assert!(summary.index_check.unwrap().sequential);
        assert_eq!(
            df.get_column_names(),
            &["state", "area_code", "churn", "region"]
        );
    }

    #[test]
    fn test_prepare_skips_absent_columns() {
        let df = df!("churn" => ["no"]).unwrap();
        let (df, summary) = prepare(df, &PrepareOptions::default()).unwrap();

        assert!(summary.index_check.is_none());
        assert!(!summary.region_derived);
        assert!(!summary.area_code_cleaned);
        assert_eq!(df.get_column_names(), &["churn"]);
    }
}
