//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::Config;
use crate::models::ChurnLabel;
use clap::Parser;
use std::path::PathBuf;

/// ChurnLens - churn breakdowns for telecom customer datasets
///
/// Loads a customer CSV, cleans it up, and reports how churn varies
/// across categorical and numeric features. Markdown/JSON/CSV output.
///
/// Examples:
///   churnlens --data data/telecom_train.csv
///   churnlens --data data/telecom_train.csv --feature state --churn yes
///   churnlens --data data/telecom_train.csv --feature area_code --counts --format csv
///   churnlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// CSV file with one customer per row and a `churn` column
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "CHURNLENS_DATA",
        required_unless_present = "init_config"
    )]
    pub data: Option<PathBuf>,

    /// Categorical features to break churn down by (comma-separated)
    ///
    /// Overrides the feature list from the config file.
    /// Example: --feature state,international_plan
    #[arg(short, long = "feature", value_name = "FEATURES", value_delimiter = ',')]
    pub features: Option<Vec<String>>,

    /// Keep only rows for this churn label in breakdowns
    #[arg(long, value_name = "LABEL")]
    pub churn: Option<ChurnArg>,

    /// Report raw counts instead of within-value proportions
    #[arg(long)]
    pub counts: bool,

    /// Number of bins for numeric histograms
    #[arg(long, value_name = "NUM")]
    pub bins: Option<usize>,

    /// Skip numeric histograms and joint summaries
    #[arg(long)]
    pub no_histograms: bool,

    /// Output file path for the report
    ///
    /// Defaults to the config file setting (churn_report.md).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json, csv)
    ///
    /// csv writes a single breakdown table and needs exactly one --feature.
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .churnlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .churnlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
    /// CSV table of a single breakdown
    Csv,
}

/// Churn label accepted by --churn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ChurnArg {
    No,
    Yes,
}

impl From<ChurnArg> for ChurnLabel {
    fn from(arg: ChurnArg) -> Self {
        match arg {
            ChurnArg::No => ChurnLabel::No,
            ChurnArg::Yes => ChurnLabel::Yes,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Churn label to restrict breakdowns to, if any.
    pub fn churn_filter(&self) -> Option<ChurnLabel> {
        self.churn.map(ChurnLabel::from)
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match self.data {
            None => return Err("A data file is required (--data)".to_string()),
            Some(ref path) if !path.is_file() => {
                return Err(format!("Data file does not exist: {}", path.display()));
            }
            Some(_) => {}
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.bins == Some(0) {
            return Err("Bins must be at least 1".to_string());
        }

        if let Some(ref features) = self.features {
            if features.iter().any(|f| f.trim().is_empty()) {
                return Err("Feature names cannot be empty".to_string());
            }
        }

        if self.format == OutputFormat::Csv
            && self.features.as_ref().map(Vec::len) != Some(1)
        {
            return Err("--format csv needs exactly one --feature".to_string());
        }

        Ok(())
    }

    /// Returns the log level from the flags and the config file.
    /// `--quiet` wins over `verbose = true` in `[general]`.
    pub fn log_level(&self, config: &Config) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
