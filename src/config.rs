//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.churnlens.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".churnlens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dataset preparation settings.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "churn_report.md".to_string()
}

/// Dataset preparation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Name of the leading index column.
    #[serde(default = "default_index_column")]
    pub index_column: String,

    /// Drop the index column after checking it.
    #[serde(default = "default_true")]
    pub drop_index: bool,

    /// Derive a `region` column from `state`.
    #[serde(default = "default_true")]
    pub derive_region: bool,

    /// Strip the `area_code_` prefix from area codes.
    #[serde(default = "default_true")]
    pub clean_area_code: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            index_column: default_index_column(),
            drop_index: true,
            derive_region: true,
            clean_area_code: true,
        }
    }
}

fn default_index_column() -> String {
    "Unnamed: 0".to_string()
}

fn default_true() -> bool {
    true
}

/// Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Categorical features to break churn down by.
    #[serde(default = "default_features")]
    pub features: Vec<String>,

    /// Numeric features to draw per-churn histograms for.
    #[serde(default = "default_numeric_features")]
    pub numeric_features: Vec<String>,

    /// Numeric features whose histograms are cumulative.
    #[serde(default = "default_cumulative_features")]
    pub cumulative_features: Vec<String>,

    /// Column pairs summarized jointly.
    #[serde(default = "default_joint_pairs")]
    pub joint_pairs: Vec<[String; 2]>,

    /// Number of histogram bins.
    #[serde(default = "default_bins")]
    pub bins: usize,

    /// Report within-value proportions instead of raw counts.
    #[serde(default = "default_true")]
    pub normalize: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            features: default_features(),
            numeric_features: default_numeric_features(),
            cumulative_features: default_cumulative_features(),
            joint_pairs: default_joint_pairs(),
            bins: default_bins(),
            normalize: true,
        }
    }
}

fn default_features() -> Vec<String> {
    vec![
        "state",
        "region",
        "area_code",
        "international_plan",
        "voice_mail_plan",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_numeric_features() -> Vec<String> {
    vec![
        "account_length",
        "number_vmail_messages",
        "total_day_minutes",
        "total_day_calls",
        "total_day_charge",
        "total_eve_minutes",
        "total_eve_calls",
        "total_eve_charge",
        "total_night_minutes",
        "total_night_calls",
        "total_night_charge",
        "total_intl_minutes",
        "total_intl_calls",
        "total_intl_charge",
        "number_customer_service_calls",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_cumulative_features() -> Vec<String> {
    vec!["number_customer_service_calls".to_string()]
}

fn default_joint_pairs() -> Vec<[String; 2]> {
    vec![[
        "total_day_minutes".to_string(),
        "total_day_charge".to_string(),
    ]]
}

fn default_bins() -> usize {
    20
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Rows shown at each end of a ranked breakdown.
    #[serde(default = "default_extremes")]
    pub extremes: usize,

    /// Width of ASCII bars, in characters.
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,

    /// Include value profiles of the categorical features.
    #[serde(default = "default_true")]
    pub include_profiles: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            extremes: default_extremes(),
            bar_width: default_bar_width(),
            include_profiles: true,
        }
    }
}

fn default_extremes() -> usize {
    2
}

fn default_bar_width() -> usize {
    40
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if let Some(ref features) = args.features {
            self.analysis.features = features.clone();
        }

        if let Some(bins) = args.bins {
            self.analysis.bins = bins;
        }

        if args.counts {
            self.analysis.normalize = false;
        }

        if args.no_histograms {
            self.analysis.numeric_features.clear();
            self.analysis.joint_pairs.clear();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
