//! Markdown, JSON and CSV report generation.
//!
//! The Markdown report stands in for the notebook's charts: every
//! breakdown and histogram is rendered as a table with ASCII bars.

use crate::config::ReportConfig;
use crate::models::{
    ChurnBreakdown, ChurnDistribution, FeatureProfile, Histogram, JointSummary, MetricKind,
    PreparationSummary, Report, ReportMetadata,
};
use anyhow::Result;

/// Value profiles list at most this many values.
const PROFILE_VALUES: usize = 10;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# ChurnLens Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report, options));
    output.push_str(&generate_preparation_section(&report.preparation));
    output.push_str(&generate_distribution_section(
        &report.churn,
        options.bar_width,
    ));
    output.push_str(&generate_breakdowns_section(&report.breakdowns, options));

    if options.include_profiles {
        output.push_str(&generate_profiles_section(&report.profiles));
    }

    output.push_str(&generate_histograms_section(
        &report.histograms,
        options.bar_width,
    ));
    output.push_str(&generate_joint_section(&report.joints));

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Horizontal bar proportional to `value / max`.
fn bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let filled = ((value / max) * width as f64).round() as usize;
    "█".repeat(filled.min(width))
}

fn anchor(title: &str) -> String {
    title.replace(' ', "-").to_lowercase()
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Data File:** `{}`\n", metadata.data_path));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Rows:** {}\n", metadata.rows));
    section.push_str(&format!("- **Columns:** {}\n", metadata.columns));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report, options: &ReportConfig) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Preparation](#preparation)\n");
    toc.push_str("- [Churn Distribution](#churn-distribution)\n");

    if !report.breakdowns.is_empty() {
        toc.push_str("- [Churn by Feature](#churn-by-feature)\n");
        for breakdown in &report.breakdowns {
            toc.push_str(&format!(
                "  - [{}](#{})\n",
                breakdown.feature,
                anchor(&breakdown.feature)
            ));
        }
    }
    if options.include_profiles && !report.profiles.is_empty() {
        toc.push_str("- [Feature Profiles](#feature-profiles)\n");
    }
    if !report.histograms.is_empty() {
        toc.push_str("- [Numeric Distributions](#numeric-distributions)\n");
    }
    if !report.joints.is_empty() {
        toc.push_str("- [Joint Distributions](#joint-distributions)\n");
    }

    toc.push('\n');
    toc
}

/// Generate the preparation section.
fn generate_preparation_section(prep: &PreparationSummary) -> String {
    let mut section = String::new();

    section.push_str("## Preparation\n\n");

    match prep.index_check {
        Some(ref check) if check.sequential => {
            section.push_str(&format!(
                "- `{}` matches the row sequence exactly; it is only an index.\n",
                check.column
            ));
        }
        Some(ref check) => {
            section.push_str(&format!(
                "- `{}` deviates from the row sequence (offset sum {}).\n",
                check.column, check.offset_sum
            ));
        }
        None => section.push_str("- No index column found.\n"),
    }
    if prep.index_dropped {
        section.push_str("- Index column dropped.\n");
    }
    if prep.region_derived {
        section.push_str("- `region` derived from `state` (US Census regions).\n");
        if !prep.unmapped_states.is_empty() {
            section.push_str(&format!(
                "- States without a region: {}\n",
                prep.unmapped_states.join(", ")
            ));
        }
    }
    if prep.area_code_cleaned {
        section.push_str("- `area_code` reduced to its three-digit code.\n");
    }
    section.push('\n');

    section
}

/// Generate the churn class distribution section.
fn generate_distribution_section(dist: &ChurnDistribution, width: usize) -> String {
    let mut section = String::new();

    section.push_str("## Churn Distribution\n\n");
    section.push_str("| Churn | Count | Share | |\n");
    section.push_str("|:---|---:|---:|:---|\n");
    for class in &dist.classes {
        section.push_str(&format!(
            "| {} | {} | {:.1}% | {} |\n",
            class.churn,
            class.count,
            class.proportion * 100.0,
            bar(class.proportion, 1.0, width)
        ));
    }
    section.push_str(&format!("| **Total** | **{}** | | |\n\n", dist.total));

    section
}

/// Generate the churn breakdown section.
fn generate_breakdowns_section(breakdowns: &[ChurnBreakdown], options: &ReportConfig) -> String {
    if breakdowns.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Churn by Feature\n\n");

    for breakdown in breakdowns {
        section.push_str(&generate_breakdown_block(breakdown, options));
    }

    section
}

/// Generate the block for a single breakdown.
fn generate_breakdown_block(breakdown: &ChurnBreakdown, options: &ReportConfig) -> String {
    let mut block = String::new();
    let [feature, churn, metric] = breakdown.column_names();

    block.push_str(&format!("### {}\n\n", breakdown.feature));
    if let Some(label) = breakdown.churn_filter {
        block.push_str(&format!("*Only churn = {} shown.*\n\n", label));
    }

    // Percentages are drawn against 1; counts against the largest count.
    let max = match breakdown.metric {
        MetricKind::Percent => 1.0,
        MetricKind::Count => breakdown
            .rows
            .iter()
            .map(|r| r.metric.as_f64())
            .fold(0.0, f64::max),
    };

    block.push_str(&format!("| {} | {} | {} | |\n", feature, churn, metric));
    block.push_str("|:---|:---|---:|:---|\n");
    for row in &breakdown.rows {
        block.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            row.value,
            row.churn,
            row.metric,
            bar(row.metric.as_f64(), max, options.bar_width)
        ));
    }
    block.push('\n');

    // A single-label breakdown reads best as a ranking.
    if breakdown.churn_filter.is_some() && breakdown.rows.len() > options.extremes * 2 {
        let ranked = breakdown.sorted_by_metric_desc();
        block.push_str(&format!(
            "**Highest and lowest {} by {}:**\n\n",
            breakdown.feature, metric
        ));
        for row in ranked.extremes(options.extremes) {
            block.push_str(&format!("- {}: {}\n", row.value, row.metric));
        }
        block.push('\n');
    }

    block
}

/// Generate the feature profiles section.
fn generate_profiles_section(profiles: &[FeatureProfile]) -> String {
    if profiles.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Feature Profiles\n\n");

    for profile in profiles {
        section.push_str(&format!(
            "### {} ({} distinct values)\n\n",
            profile.feature, profile.distinct
        ));
        section.push_str("| Value | Rows |\n");
        section.push_str("|:---|---:|\n");
        for (value, count) in profile.value_counts.iter().take(PROFILE_VALUES) {
            section.push_str(&format!("| {} | {} |\n", value, count));
        }
        if profile.value_counts.len() > PROFILE_VALUES {
            section.push_str(&format!(
                "| ... {} more | |\n",
                profile.value_counts.len() - PROFILE_VALUES
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the numeric histogram section.
fn generate_histograms_section(histograms: &[Histogram], width: usize) -> String {
    if histograms.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Numeric Distributions\n\n");
    section.push_str("Probabilities are computed within each churn class.\n\n");

    for hist in histograms {
        let kind = if hist.cumulative { " (cumulative)" } else { "" };
        section.push_str(&format!("### {}{}\n\n", hist.feature, kind));

        if hist.bins.is_empty() {
            section.push_str("*No numeric values.*\n\n");
            continue;
        }

        let mut header = String::from("| Bin |");
        let mut align = String::from("|:---|");
        for series in &hist.series {
            header.push_str(&format!(" {} (n={}) | |", series.churn, series.samples));
            align.push_str("---:|:---|");
        }
        section.push_str(&header);
        section.push('\n');
        section.push_str(&align);
        section.push('\n');

        for (i, bin) in hist.bins.iter().enumerate() {
            section.push_str(&format!("| {:.2} – {:.2} |", bin.lower, bin.upper));
            for series in &hist.series {
                let p = series.probabilities[i];
                section.push_str(&format!(" {:.3} | {} |", p, bar(p, 1.0, width)));
            }
            section.push('\n');
        }
        section.push('\n');
    }

    section
}

/// Generate the joint distribution section.
fn generate_joint_section(joints: &[JointSummary]) -> String {
    if joints.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Joint Distributions\n\n");

    for joint in joints {
        section.push_str(&format!("### {} vs {}\n\n", joint.x, joint.y));
        section.push_str(&format!(
            "| Churn | Samples | Mean {} | Mean {} | Correlation |\n",
            joint.x, joint.y
        ));
        section.push_str("|:---|---:|---:|---:|---:|\n");
        for group in &joint.groups {
            let corr = group
                .correlation
                .map_or_else(|| "n/a".to_string(), |c| format!("{:.4}", c));
            section.push_str(&format!(
                "| {} | {} | {:.2} | {:.2} | {} |\n",
                group.churn, group.samples, group.mean_x, group.mean_y, corr
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by ChurnLens*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render one breakdown as CSV with columns `[feature, churn, metric]`.
pub fn generate_breakdown_csv(breakdown: &ChurnBreakdown) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(breakdown.column_names())?;
    for row in &breakdown.rows {
        writer.write_record([
            row.value.to_string(),
            row.churn.to_string(),
            row.metric.to_exact_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
