//! Dataset-level summaries: class balance, value profiles, histograms
//! and joint distributions split by churn.

use crate::dataset::frame::{numeric_column, require_column, validate_churn, value_at};
use crate::error::DataError;
use crate::models::{
    Bin, ChurnDistribution, ChurnLabel, ClassShare, FeatureProfile, Histogram, HistogramSeries,
    JointGroup, JointSummary, Value, CHURN_COLUMN,
};
use polars::prelude::*;

const COUNT: &str = "count";
const BIN: &str = "bin";

/// Spread one cell per row of a frame grouped by churn into an array
/// indexed by label. Labels with no group stay at the default.
fn by_label<T: Copy + Default>(
    grouped: &DataFrame,
    cell: impl Fn(usize) -> Option<T>,
) -> Result<[T; 2], DataError> {
    let labels = grouped.column(CHURN_COLUMN)?.str()?;
    let mut out = [T::default(); 2];
    for (i, label) in labels.into_iter().enumerate() {
        if let Some(label) = label.and_then(ChurnLabel::parse) {
            out[label as usize] = cell(i).unwrap_or_default();
        }
    }
    Ok(out)
}

/// Count and proportion of each churn label.
pub fn churn_distribution(df: &DataFrame) -> Result<ChurnDistribution, DataError> {
    validate_churn(df)?;
    let total = df.height();

    let grouped = df
        .clone()
        .lazy()
        .group_by([col(CHURN_COLUMN)])
        .agg([len().cast(DataType::UInt64).alias(COUNT)])
        .collect()?;
    let counts = grouped.column(COUNT)?.u64()?;
    let counts = by_label(&grouped, |i| counts.get(i))?;

    let classes = ChurnLabel::ALL
        .into_iter()
        .map(|churn| {
            let count = counts[churn as usize] as usize;
            let proportion = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            };
            ClassShare {
                churn,
                count,
                proportion,
            }
        })
        .collect();

    Ok(ChurnDistribution { total, classes })
}

/// Distinct values of a column with their occurrence counts.
pub fn feature_profile(df: &DataFrame, feature: &str) -> Result<FeatureProfile, DataError> {
    require_column(df, feature)?;

    let counted = df
        .clone()
        .lazy()
        .filter(col(feature).is_not_null())
        .group_by([col(feature)])
        .agg([len().cast(DataType::UInt64).alias(COUNT)])
        .sort_by_exprs([col(feature)], SortMultipleOptions::default())
        .collect()?;

    let values = counted.column(feature)?;
    let counts = counted.column(COUNT)?.u64()?;
    let mut value_counts: Vec<(Value, usize)> = Vec::with_capacity(counted.height());
    for i in 0..counted.height() {
        value_counts.push((value_at(values, i)?, counts.get(i).unwrap_or(0) as usize));
    }
    // Stable, so ties stay in value order.
    value_counts.sort_by(|a, b| b.1.cmp(&a.1));

    Ok(FeatureProfile {
        feature: feature.to_string(),
        distinct: value_counts.len(),
        value_counts,
    })
}

/// Equal-width histogram of a numeric column, one series per churn label.
///
/// Bins span the range of the whole column. Each series is normalized by
/// its own sample count, so classes of very different size stay
/// comparable. With `cumulative` the probabilities are running sums.
pub fn churn_histogram(
    df: &DataFrame,
    feature: &str,
    bins: usize,
    cumulative: bool,
) -> Result<Histogram, DataError> {
    let values = numeric_column(df, feature)?;
    validate_churn(df)?;
    let bins = bins.max(1);

    let values = values.f64()?;
    let (edges, min) = match (values.min(), values.max()) {
        (Some(min), Some(max)) => {
            let max = if max > min { max } else { min + 1.0 };
            let width = (max - min) / bins as f64;
            let edges = (0..bins)
                .map(|i| Bin {
                    lower: min + width * i as f64,
                    upper: if i + 1 == bins {
                        max
                    } else {
                        min + width * (i + 1) as f64
                    },
                })
                .collect::<Vec<_>>();
            (edges, min)
        }
        _ => (Vec::new(), 0.0),
    };

    let mut counts = [vec![0usize; edges.len()], vec![0usize; edges.len()]];
    if let Some(first) = edges.first() {
        let width = first.upper - first.lower;
        let last = edges.len() as i64 - 1;
        // Values are at least `min`, so the integer cast floors.
        let index = ((col(feature).cast(DataType::Float64) - lit(min)) / lit(width))
            .cast(DataType::Int64);

        let binned = df
            .clone()
            .lazy()
            .filter(col(feature).is_not_null())
            .with_column(index.alias(BIN))
            .with_column(
                when(col(BIN).gt(lit(last)))
                    .then(lit(last))
                    .otherwise(col(BIN))
                    .alias(BIN),
            )
            .group_by([col(CHURN_COLUMN), col(BIN)])
            .agg([len().cast(DataType::UInt64).alias(COUNT)])
            .collect()?;

        let labels = binned.column(CHURN_COLUMN)?.str()?;
        let bin_ids = binned.column(BIN)?.i64()?;
        let bin_counts = binned.column(COUNT)?.u64()?;
        for i in 0..binned.height() {
            let (Some(label), Some(bin), Some(count)) = (
                labels.get(i).and_then(ChurnLabel::parse),
                bin_ids.get(i),
                bin_counts.get(i),
            ) else {
                continue;
            };
            counts[label as usize][bin.clamp(0, last) as usize] += count as usize;
        }
    }

    let series = ChurnLabel::ALL
        .into_iter()
        .map(|churn| {
            let counts = &counts[churn as usize];
            let samples: usize = counts.iter().sum();

            let mut probabilities: Vec<f64> = counts
                .iter()
                .map(|&c| {
                    if samples == 0 {
                        0.0
                    } else {
                        c as f64 / samples as f64
                    }
                })
                .collect();
            if cumulative {
                let mut running = 0.0;
                for p in &mut probabilities {
                    running += *p;
                    *p = running;
                }
            }

            HistogramSeries {
                churn,
                samples,
                probabilities,
            }
        })
        .collect();

    Ok(Histogram {
        feature: feature.to_string(),
        cumulative,
        bins: edges,
        series,
    })
}

/// Means and Pearson correlation of two numeric columns per churn label.
pub fn joint_summary(df: &DataFrame, x: &str, y: &str) -> Result<JointSummary, DataError> {
    numeric_column(df, x)?;
    numeric_column(df, y)?;
    validate_churn(df)?;

    let fx = col(x).cast(DataType::Float64);
    let fy = col(y).cast(DataType::Float64);
    let dx = fx.clone() - fx.clone().mean();
    let dy = fy.clone() - fy.clone().mean();

    let grouped = df
        .clone()
        .lazy()
        .filter(col(x).is_not_null().and(col(y).is_not_null()))
        .group_by([col(CHURN_COLUMN)])
        .agg([
            len().cast(DataType::UInt64).alias("samples"),
            fx.mean().alias("mean_x"),
            fy.mean().alias("mean_y"),
            (dx.clone() * dy.clone()).sum().alias("sxy"),
            (dx.clone() * dx).sum().alias("sxx"),
            (dy.clone() * dy).sum().alias("syy"),
        ])
        .collect()?;

    let float_column = |name: &str| -> Result<[f64; 2], DataError> {
        let values = grouped.column(name)?.f64()?;
        by_label(&grouped, |i| values.get(i))
    };
    let samples = grouped.column("samples")?.u64()?;
    let samples = by_label(&grouped, |i| samples.get(i))?;
    let mean_x = float_column("mean_x")?;
    let mean_y = float_column("mean_y")?;
    let sxy = float_column("sxy")?;
    let sxx = float_column("sxx")?;
    let syy = float_column("syy")?;

    let groups = ChurnLabel::ALL
        .into_iter()
        .map(|churn| {
            let i = churn as usize;
            let correlation = if sxx[i] > 0.0 && syy[i] > 0.0 {
                Some(sxy[i] / (sxx[i].sqrt() * syy[i].sqrt()))
            } else {
                None
            };
            JointGroup {
                churn,
                samples: samples[i] as usize,
                mean_x: mean_x[i],
                mean_y: mean_y[i],
                correlation,
            }
        })
        .collect();

    Ok(JointSummary {
        x: x.to_string(),
        y: y.to_string(),
        groups,
    })
}
