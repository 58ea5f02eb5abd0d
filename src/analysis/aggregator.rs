//! Churn aggregation by categorical feature.
//!
//! Groups the record frame by (feature value, churn label), pads every
//! value with the churn labels it never occurred with, and returns the
//! rows sorted by key.

use crate::dataset::frame::{require_column, validate_churn, value_at};
use crate::error::DataError;
use crate::models::{BreakdownRow, ChurnBreakdown, ChurnLabel, Metric, MetricKind, CHURN_COLUMN};
use polars::prelude::*;
use tracing::debug;

const COUNT: &str = "count";
const PERCENT: &str = "percent";

/// Count rows per (feature value, churn label) that occur in the data.
///
/// Rows with a missing feature value are skipped.
pub fn count_pairs(df: &DataFrame, feature: &str) -> Result<DataFrame, DataError> {
    require_column(df, feature)?;
    validate_churn(df)?;

    let counts = df
        .clone()
        .lazy()
        .filter(col(feature).is_not_null())
        .group_by([col(feature), col(CHURN_COLUMN)])
        .agg([len().alias(COUNT)])
        .collect()?;
    Ok(counts)
}

/// Every (value, label) pair for the distinct values in `counts`.
fn churn_grid(counts: &DataFrame, feature: &str) -> Result<DataFrame, DataError> {
    let values = counts.column(feature)?.unique()?;
    let n = values.len();

    let mut keys = values.clone();
    for _ in 1..ChurnLabel::ALL.len() {
        keys.append(&values)?;
    }
    let labels: Vec<&str> = ChurnLabel::ALL
        .iter()
        .flat_map(|label| std::iter::repeat(label.as_str()).take(n))
        .collect();

    Ok(DataFrame::new(vec![keys, Series::new(CHURN_COLUMN, labels)])?)
}

/// Churn counts (or within-value proportions) per value of `feature`.
///
/// Every distinct value of the feature gets exactly one row per churn
/// label; combinations that never occur are reported as zero. With
/// `churn` set only rows for that label are kept. Output is sorted by
/// (value, churn) ascending.
pub fn group_by_feature(
    df: &DataFrame,
    feature: &str,
    churn: Option<ChurnLabel>,
    normalize: bool,
) -> Result<ChurnBreakdown, DataError> {
    let kind = MetricKind::from_normalize(normalize);
    let counts = count_pairs(df, feature)?;
    let grid = churn_grid(&counts, feature)?;

    let padding = grid.height() - counts.height();
    if padding > 0 {
        debug!(
            "Padding {} absent churn combinations for '{}'",
            padding, feature
        );
    }

    let keys = [col(feature), col(CHURN_COLUMN)];
    let mut frame = grid
        .lazy()
        .join(
            counts.lazy(),
            keys.clone(),
            keys,
            JoinArgs::new(JoinType::Left),
        )
        .with_column(col(COUNT).fill_null(lit(0u32)).cast(DataType::UInt64));

    if normalize {
        // Denominator is the row count of this feature value.
        let total = col(COUNT).sum().over([col(feature)]).cast(DataType::Float64);
        frame = frame.with_column((col(COUNT).cast(DataType::Float64) / total).alias(PERCENT));
    }
    if let Some(label) = churn {
        frame = frame.filter(col(CHURN_COLUMN).eq(lit(label.as_str())));
    }

    let out = frame
        .sort_by_exprs(
            [col(feature), col(CHURN_COLUMN)],
            SortMultipleOptions::default(),
        )
        .collect()?;

    let values = out.column(feature)?;
    let labels = out.column(CHURN_COLUMN)?.str()?;
    let counts = out.column(COUNT)?.u64()?;
    let percents = match kind {
        MetricKind::Percent => Some(out.column(PERCENT)?.f64()?),
        MetricKind::Count => None,
    };

    let mut rows = Vec::with_capacity(out.height());
    for i in 0..out.height() {
        let cell = labels.get(i);
        let churn = cell.and_then(ChurnLabel::parse).ok_or_else(|| {
            DataError::InvalidChurnLabel {
                row: i,
                value: cell.unwrap_or_default().to_string(),
            }
        })?;
        let metric = match percents {
            Some(percents) => Metric::Percent(percents.get(i).unwrap_or(0.0)),
            None => Metric::Count(counts.get(i).unwrap_or(0) as usize),
        };
        rows.push(BreakdownRow {
            value: value_at(values, i)?,
            churn,
            metric,
        });
    }

    Ok(ChurnBreakdown {
        feature: feature.to_string(),
        metric: kind,
        churn_filter: churn,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{prepare, PrepareOptions};
    use crate::models::Value;

    fn area_code_frame() -> DataFrame {
        df!(
            "area_code" => ["415", "415", "408", "510", "510", "415", "408"],
            "state" => ["KS", "OH", "NJ", "NJ", "KS", "KS", "OH"],
            "churn" => ["no", "yes", "no", "yes", "yes", "no", "no"]
        )
        .unwrap()
    }

    fn keys(breakdown: &ChurnBreakdown) -> Vec<(Value, ChurnLabel)> {
        breakdown
            .rows
            .iter()
            .map(|r| (r.value.clone(), r.churn))
            .collect()
    }

    #[test]
    fn test_area_code_fixture_order() {
        let breakdown = group_by_feature(&area_code_frame(), "area_code", None, false).unwrap();

        assert_eq!(
            keys(&breakdown),
            vec![
                (Value::from("408"), ChurnLabel::No),
                (Value::from("408"), ChurnLabel::Yes),
                (Value::from("415"), ChurnLabel::No),
                (Value::from("415"), ChurnLabel::Yes),
                (Value::from("510"), ChurnLabel::No),
                (Value::from("510"), ChurnLabel::Yes),
            ]
        );
        assert_eq!(breakdown.column_names(), ["area_code", "churn", "count"]);
    }

    #[test]
    fn test_prepared_area_codes_group_as_text() {
        let raw = df!(
            "area_code" => ["area_code_415", "area_code_408", "area_code_510", "area_code_415"],
            "churn" => ["no", "no", "yes", "yes"]
        )
        .unwrap();
        let (df, _) = prepare(raw, &PrepareOptions::default()).unwrap();

        let breakdown = group_by_feature(&df, "area_code", None, false).unwrap();
        let values: Vec<_> = breakdown.rows.iter().map(|r| r.value.clone()).collect();
        assert_eq!(
            values,
            ["408", "408", "415", "415", "510", "510"].map(Value::from).to_vec()
        );
        assert_eq!(
            breakdown.metric_for(&Value::from("408"), ChurnLabel::Yes),
            Some(Metric::Count(0))
        );
    }

    #[test]
    fn test_absent_pairs_are_zero() {
        let breakdown = group_by_feature(&area_code_frame(), "area_code", None, false).unwrap();

        assert_eq!(
            breakdown.metric_for(&Value::from("408"), ChurnLabel::Yes),
            Some(Metric::Count(0))
        );
        assert_eq!(
            breakdown.metric_for(&Value::from("510"), ChurnLabel::No),
            Some(Metric::Count(0))
        );
        assert_eq!(
            breakdown.metric_for(&Value::from("415"), ChurnLabel::No),
            Some(Metric::Count(2))
        );
    }

    #[test]
    fn test_two_rows_per_value() {
        let df = area_code_frame();
        for feature in ["area_code", "state"] {
            let breakdown = group_by_feature(&df, feature, None, false).unwrap();
            let distinct = df.column(feature).unwrap().n_unique().unwrap();
            assert_eq!(breakdown.rows.len(), 2 * distinct);
        }
    }

    #[test]
    fn test_counts_sum_to_value_rows() {
        let df = area_code_frame();
        let breakdown = group_by_feature(&df, "state", None, false).unwrap();
        let states: Vec<_> = df.column("state").unwrap().str().unwrap().into_iter().collect();

        for state in ["KS", "OH", "NJ"] {
            let raw = states.iter().filter(|s| **s == Some(state)).count();
            let summed: f64 = breakdown
                .rows
                .iter()
                .filter(|r| r.value == Value::from(state))
                .map(|r| r.metric.as_f64())
                .sum();
            assert_eq!(summed as usize, raw);
        }
    }

    #[test]
    fn test_normalized_within_value() {
        let breakdown = group_by_feature(&area_code_frame(), "area_code", None, true).unwrap();
        assert_eq!(breakdown.metric, MetricKind::Percent);
        assert_eq!(breakdown.column_names()[2], "percent");

        for row in &breakdown.rows {
            let p = row.metric.as_f64();
            assert!((0.0..=1.0).contains(&p));
        }

        let no = breakdown.metric_for(&Value::from("415"), ChurnLabel::No).unwrap();
        let yes = breakdown.metric_for(&Value::from("415"), ChurnLabel::Yes).unwrap();
        assert!((no.as_f64() - 2.0 / 3.0).abs() < 1e-12);
        assert!((no.as_f64() + yes.as_f64() - 1.0).abs() < 1e-12);
        assert_eq!(
            breakdown.metric_for(&Value::from("408"), ChurnLabel::Yes),
            Some(Metric::Percent(0.0))
        );
    }

    #[test]
    fn test_churn_filter() {
        let breakdown =
            group_by_feature(&area_code_frame(), "state", Some(ChurnLabel::Yes), true).unwrap();

        assert_eq!(breakdown.rows.len(), 3);
        assert!(breakdown.rows.iter().all(|r| r.churn == ChurnLabel::Yes));
        assert_eq!(breakdown.churn_filter, Some(ChurnLabel::Yes));
        let states: Vec<_> = breakdown.rows.iter().map(|r| r.value.to_string()).collect();
        assert_eq!(states, vec!["KS", "NJ", "OH"]);
        // KS: 1 of 3 rows churned; the proportion is taken before filtering.
        assert!((breakdown.rows[0].metric.as_f64() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_numeric_feature_sorts_numerically() {
        let df = df!(
            "account_length" => [100i64, 9, 25],
            "churn" => ["no", "yes", "no"]
        )
        .unwrap();
        let breakdown = group_by_feature(&df, "account_length", None, false).unwrap();
        let values: Vec<_> = breakdown.rows.iter().map(|r| r.value.clone()).collect();
        assert_eq!(
            values,
            [9, 9, 25, 25, 100, 100].map(Value::Int).to_vec()
        );
    }

    #[test]
    fn test_missing_feature_values_skipped() {
        let df = df!(
            "region" => [Some("west"), None, Some("south")],
            "churn" => ["no", "yes", "yes"]
        )
        .unwrap();
        let breakdown = group_by_feature(&df, "region", None, false).unwrap();
        assert_eq!(breakdown.rows.len(), 4);
        assert!(breakdown.rows.iter().all(|r| !r.value.is_missing()));
    }

    #[test]
    fn test_missing_columns() {
        assert!(matches!(
            group_by_feature(&area_code_frame(), "region", None, false),
            Err(DataError::MissingColumn(c)) if c == "region"
        ));

        let no_churn = df!("state" => ["KS"]).unwrap();
        assert!(matches!(
            group_by_feature(&no_churn, "state", None, false),
            Err(DataError::MissingColumn(c)) if c == "churn"
        ));
    }

    #[test]
    fn test_invalid_churn_label() {
        let df = df!("state" => ["KS", "OH"], "churn" => ["no", "maybe"]).unwrap();
        assert!(matches!(
            group_by_feature(&df, "state", None, false),
            Err(DataError::InvalidChurnLabel { row: 1, .. })
        ));
    }

    #[test]
    fn test_empty_frame() {
        let df = df!("state" => Vec::<&str>::new(), "churn" => Vec::<&str>::new()).unwrap();
        let breakdown = group_by_feature(&df, "state", None, true).unwrap();
        assert!(breakdown.rows.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let df = area_code_frame();
        let first = group_by_feature(&df, "state", None, true).unwrap();
        let second = group_by_feature(&df, "state", None, true).unwrap();
        assert_eq!(first, second);
    }
}
