//! Data models for churn analysis.
//!
//! The record table itself is a polars `DataFrame`; this module holds the
//! churn label and every derived structure that ends up in a report.

use chrono::{DateTime, Utc};
use polars::prelude::AnyValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the column holding the churn label.
pub const CHURN_COLUMN: &str = "churn";

/// A feature value as it appears in report output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Missing,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    #[cfg(test)]
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<AnyValue<'_>> for Value {
    fn from(value: AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => Value::Missing,
            AnyValue::String(s) => Value::Text(s.to_string()),
            AnyValue::Boolean(b) => Value::Text(b.to_string()),
            AnyValue::Int8(i) => Value::Int(i.into()),
            AnyValue::Int16(i) => Value::Int(i.into()),
            AnyValue::Int32(i) => Value::Int(i.into()),
            AnyValue::Int64(i) => Value::Int(i),
            AnyValue::UInt8(u) => Value::Int(u.into()),
            AnyValue::UInt16(u) => Value::Int(u.into()),
            AnyValue::UInt32(u) => Value::Int(u.into()),
            AnyValue::UInt64(u) => match i64::try_from(u) {
                Ok(i) => Value::Int(i),
                Err(_) => Value::Float(u as f64),
            },
            AnyValue::Float32(f) => Value::Float(f.into()),
            AnyValue::Float64(f) => Value::Float(f),
            other => Value::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Churn label of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChurnLabel {
    No,
    Yes,
}

impl ChurnLabel {
    /// Every label, in output order.
    pub const ALL: [ChurnLabel; 2] = [ChurnLabel::No, ChurnLabel::Yes];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChurnLabel::No => "no",
            ChurnLabel::Yes => "yes",
        }
    }

    /// Read a label out of a churn cell.
    pub fn parse(cell: &str) -> Option<Self> {
        match cell {
            "no" => Some(ChurnLabel::No),
            "yes" => Some(ChurnLabel::Yes),
            _ => None,
        }
    }
}

impl fmt::Display for ChurnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which metric a breakdown carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Count,
    Percent,
}

impl MetricKind {
    pub fn from_normalize(normalize: bool) -> Self {
        if normalize {
            MetricKind::Percent
        } else {
            MetricKind::Count
        }
    }

    /// Name of the metric column in the output table.
    pub fn column_name(&self) -> &'static str {
        match self {
            MetricKind::Count => "count",
            MetricKind::Percent => "percent",
        }
    }
}

/// Metric of one aggregated row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Count(usize),
    Percent(f64),
}

impl Metric {
    pub fn as_f64(&self) -> f64 {
        match self {
            Metric::Count(c) => *c as f64,
            Metric::Percent(p) => *p,
        }
    }

    /// Full-precision text for machine-readable output. `Display` rounds
    /// percentages for reading.
    pub fn to_exact_string(&self) -> String {
        match self {
            Metric::Count(c) => c.to_string(),
            Metric::Percent(p) => p.to_string(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Count(c) => write!(f, "{}", c),
            Metric::Percent(p) => write!(f, "{:.4}", p),
        }
    }
}

/// One (feature value, churn label, metric) row of a breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub value: Value,
    pub churn: ChurnLabel,
    pub metric: Metric,
}

/// Churn counts or percentages per value of a categorical feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnBreakdown {
    /// Column the rows are grouped on.
    pub feature: String,
    /// Whether `metric` holds counts or within-value proportions.
    pub metric: MetricKind,
    /// Churn label the rows were restricted to, if any.
    pub churn_filter: Option<ChurnLabel>,
    /// Rows, sorted by (value, churn) unless reordered afterwards.
    pub rows: Vec<BreakdownRow>,
}

impl ChurnBreakdown {
    /// Column names of the tabular form: `[feature, "churn", metric]`.
    pub fn column_names(&self) -> [&str; 3] {
        [&self.feature, CHURN_COLUMN, self.metric.column_name()]
    }

    /// Rows reordered by metric, largest first. Ties keep their key order.
    pub fn sorted_by_metric_desc(&self) -> Self {
        let mut sorted = self.clone();
        sorted
            .rows
            .sort_by(|a, b| b.metric.as_f64().total_cmp(&a.metric.as_f64()));
        sorted
    }

    /// The first `n` and last `n` rows, without repeating any row.
    pub fn extremes(&self, n: usize) -> Vec<&BreakdownRow> {
        if self.rows.len() <= n * 2 {
            return self.rows.iter().collect();
        }
        self.rows[..n]
            .iter()
            .chain(self.rows[self.rows.len() - n..].iter())
            .collect()
    }

    /// Metric for a specific combination, if the row is present.
    #[cfg(test)]
    pub fn metric_for(&self, value: &Value, churn: ChurnLabel) -> Option<Metric> {
        self.rows
            .iter()
            .find(|r| &r.value == value && r.churn == churn)
            .map(|r| r.metric)
    }
}

/// Share of one churn class in the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassShare {
    pub churn: ChurnLabel,
    pub count: usize,
    pub proportion: f64,
}

/// Class balance of the churn column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChurnDistribution {
    pub total: usize,
    pub classes: Vec<ClassShare>,
}

impl ChurnDistribution {
    #[cfg(test)]
    pub fn share(&self, churn: ChurnLabel) -> Option<&ClassShare> {
        self.classes.iter().find(|c| c.churn == churn)
    }
}

/// Distinct values of a feature and how often each occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProfile {
    pub feature: String,
    pub distinct: usize,
    /// Ordered by count descending, then value ascending.
    pub value_counts: Vec<(Value, usize)>,
}

/// Half-open bin `[lower, upper)`; the last bin also includes `upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
}

/// Bin probabilities for one churn class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSeries {
    pub churn: ChurnLabel,
    /// Number of non-missing samples in this class.
    pub samples: usize,
    pub probabilities: Vec<f64>,
}

/// Per-class histogram of a numeric feature, each class normalized on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub feature: String,
    pub cumulative: bool,
    pub bins: Vec<Bin>,
    pub series: Vec<HistogramSeries>,
}

/// Joint statistics of two numeric columns within one churn class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointGroup {
    pub churn: ChurnLabel,
    pub samples: usize,
    pub mean_x: f64,
    pub mean_y: f64,
    /// Pearson correlation; `None` when either column has no variance.
    pub correlation: Option<f64>,
}

/// Joint distribution summary of two numeric columns split by churn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSummary {
    pub x: String,
    pub y: String,
    pub groups: Vec<JointGroup>,
}

/// Result of comparing a column against the sequence `1..=n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexCheck {
    pub column: String,
    /// Sum of `cell - position` over all rows.
    pub offset_sum: f64,
    /// True when every cell equals its 1-based row position.
    pub sequential: bool,
}

/// What the preparation pass did to the raw table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreparationSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_check: Option<IndexCheck>,
    pub index_dropped: bool,
    pub region_derived: bool,
    /// States that had no region mapping.
    pub unmapped_states: Vec<String>,
    pub area_code_cleaned: bool,
}

/// Metadata about the analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Path of the analyzed CSV file.
    pub data_path: String,
    pub analysis_date: DateTime<Utc>,
    pub rows: usize,
    pub columns: usize,
    pub duration_seconds: f64,
}

/// The complete exploratory analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub preparation: PreparationSummary,
    pub churn: ChurnDistribution,
    pub profiles: Vec<FeatureProfile>,
    pub breakdowns: Vec<ChurnBreakdown>,
    pub histograms: Vec<Histogram>,
    pub joints: Vec<JointSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from_any_value() {
        assert_eq!(Value::from(AnyValue::Null), Value::Missing);
        assert_eq!(Value::from(AnyValue::Int64(128)), Value::Int(128));
        assert_eq!(Value::from(AnyValue::UInt32(7)), Value::Int(7));
        assert_eq!(Value::from(AnyValue::Float64(265.1)), Value::Float(265.1));
        assert_eq!(Value::from(AnyValue::String("KS")), Value::from("KS"));
        assert_eq!(Value::Float(1.0).to_string(), "1");
    }

    #[test]
    fn test_churn_label() {
        assert!(ChurnLabel::No < ChurnLabel::Yes);
        assert_eq!(ChurnLabel::parse("yes"), Some(ChurnLabel::Yes));
        assert_eq!(ChurnLabel::parse("no"), Some(ChurnLabel::No));
        assert_eq!(ChurnLabel::parse("maybe"), None);
        assert_eq!(ChurnLabel::Yes.to_string(), "yes");
    }

    #[test]
    fn test_breakdown_extremes() {
        let rows = (0..6)
            .map(|i| BreakdownRow {
                value: Value::Int(i),
                churn: ChurnLabel::Yes,
                metric: Metric::Count(i as usize),
            })
            .collect();
        let breakdown = ChurnBreakdown {
            feature: "x".to_string(),
            metric: MetricKind::Count,
            churn_filter: Some(ChurnLabel::Yes),
            rows,
        };

        let extremes = breakdown.extremes(2);
        let values: Vec<_> = extremes.iter().map(|r| r.value.clone()).collect();
        assert_eq!(
            values,
            vec![Value::Int(0), Value::Int(1), Value::Int(4), Value::Int(5)]
        );

        let sorted = breakdown.sorted_by_metric_desc();
        assert_eq!(sorted.rows[0].value, Value::Int(5));
        assert_eq!(breakdown.column_names(), ["x", "churn", "count"]);
    }

    #[test]
    fn test_metric_display() {
        assert_eq!(Metric::Count(42).to_string(), "42");
        assert_eq!(Metric::Percent(0.25).to_string(), "0.2500");
        assert_eq!(Metric::Percent(2.0 / 3.0).to_string(), "0.6667");
        assert_eq!(Metric::Percent(2.0 / 3.0).to_exact_string(), "0.6666666666666666");
        assert_eq!(Metric::Count(42).to_exact_string(), "42");
    }
}
