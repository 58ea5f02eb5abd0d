//! ChurnLens - exploratory churn analysis for telecom customer data
//!
//! A CLI tool that loads a customer CSV, prepares a few derived
//! columns, and reports churn rates per feature value along with
//! per-class distributions of the numeric usage columns.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing file, bad column, invalid config, etc.)

mod analysis;
mod cli;
mod config;
mod dataset;
mod error;
mod models;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use dataset::PrepareOptions;
use models::{ChurnLabel, Report, ReportMetadata};
use polars::prelude::DataFrame;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration first: it can turn on verbose logging
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    info!("ChurnLens v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", config_source);
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_analysis(args, config) {
        error!("Analysis failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .churnlens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to choose features, histogram bins, and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings. `RUST_LOG` overrides
/// the level derived from flags and config.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config);
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: a tracing subscriber was already installed");
    }
}

/// Run the complete analysis workflow.
fn run_analysis(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let data_path = args
        .data
        .clone()
        .context("A data file is required (--data)")?;
    let churn_filter = args.churn_filter();

    // Step 1: Load and prepare the table
    println!("📥 Loading data: {}", data_path.display());
    let raw = dataset::load_csv(&data_path)
        .with_context(|| format!("Failed to load {}", data_path.display()))?;
    info!("Loaded {} rows", raw.height());

    let prepare_options = PrepareOptions::from(&config.dataset);
    let (table, preparation) =
        dataset::prepare(raw, &prepare_options).context("Failed to prepare dataset")?;

    // CSV output is a single breakdown; nothing else is computed.
    if args.format == OutputFormat::Csv {
        return write_single_breakdown(&table, &config, churn_filter, &args);
    }

    // Step 2: Churn balance and per-feature breakdowns
    println!("\n🔬 Analyzing churn...");
    let churn = analysis::churn_distribution(&table)?;
    print_distribution(&churn);

    let mut breakdowns = Vec::with_capacity(config.analysis.features.len());
    let mut profiles = Vec::new();
    for feature in &config.analysis.features {
        let breakdown = analysis::group_by_feature(
            &table,
            feature,
            churn_filter,
            config.analysis.normalize,
        )
        .with_context(|| format!("Failed to break down churn by '{}'", feature))?;
        debug!("{}: {} rows", feature, breakdown.rows.len());
        breakdowns.push(breakdown);

        if config.report.include_profiles {
            profiles.push(analysis::feature_profile(&table, feature)?);
        }
    }

    // Step 3: Numeric distributions
    let mut histograms = Vec::with_capacity(config.analysis.numeric_features.len());
    for feature in &config.analysis.numeric_features {
        let cumulative = config.analysis.cumulative_features.contains(feature);
        let histogram =
            analysis::churn_histogram(&table, feature, config.analysis.bins, cumulative)
                .with_context(|| format!("Failed to build histogram for '{}'", feature))?;
        histograms.push(histogram);
    }

    let mut joints = Vec::with_capacity(config.analysis.joint_pairs.len());
    for [x, y] in &config.analysis.joint_pairs {
        let joint = analysis::joint_summary(&table, x, y)
            .with_context(|| format!("Failed to summarize '{}' vs '{}'", x, y))?;
        joints.push(joint);
    }

    // Step 4: Build and save the report
    println!("\n📝 Generating report...");
    let report = Report {
        metadata: ReportMetadata {
            data_path: data_path.display().to_string(),
            analysis_date: Utc::now(),
            rows: table.height(),
            columns: table.width(),
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        preparation,
        churn,
        profiles,
        breakdowns,
        histograms,
        joints,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        _ => report::generate_markdown_report(&report, &config.report),
    };

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    println!("\n📊 Analysis Summary:");
    println!("   Rows analyzed: {}", report.metadata.rows);
    println!("   Features broken down: {}", report.breakdowns.len());
    println!("   Histograms: {}", report.histograms.len());
    println!("   Duration: {:.2}s", start_time.elapsed().as_secs_f64());
    println!("\n✅ Analysis complete! Report saved to: {}", output_path.display());

    Ok(())
}

/// Handle --format csv: write the breakdown of the single requested feature.
fn write_single_breakdown(
    table: &DataFrame,
    config: &Config,
    churn_filter: Option<ChurnLabel>,
    args: &Args,
) -> Result<()> {
    let feature = config
        .analysis
        .features
        .first()
        .context("--format csv needs a feature")?;

    let breakdown =
        analysis::group_by_feature(table, feature, churn_filter, config.analysis.normalize)
            .with_context(|| format!("Failed to break down churn by '{}'", feature))?;
    let content = report::generate_breakdown_csv(&breakdown)?;

    // The markdown default name makes no sense for CSV output.
    let output_path = match args.output {
        Some(ref path) => path.clone(),
        None => format!("churn_by_{}.csv", feature).into(),
    };
    std::fs::write(&output_path, content)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    println!(
        "\n✅ {} rows written to: {}",
        breakdown.rows.len(),
        output_path.display()
    );
    Ok(())
}

/// Print the churn class balance to the console.
fn print_distribution(churn: &models::ChurnDistribution) {
    println!("   Customers: {}", churn.total);
    for class in &churn.classes {
        println!(
            "   - churn = {}: {} ({:.1}%)",
            class.churn,
            class.count,
            class.proportion * 100.0
        );
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so it returns where the settings came
/// from instead of logging it.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, config_path.display().to_string()));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, CONFIG_FILE.to_string())),
        Ok(None) => Ok((Config::default(), "defaults".to_string())),
        Err(e) => {
            eprintln!("Warning: failed to load {}: {:#}", CONFIG_FILE, e);
            Ok((Config::default(), "defaults".to_string()))
        }
    }
}
