//! CLI argument parsing for cohortstat

use crate::config::PipelineConfig;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for the analysis report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

/// Pipeline stage to execute
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Build the four cohort tables from metadata and activity files
    Combine,
    /// Compare cohorts from previously written tables and render charts
    Analyze,
    /// Combine, then analyze
    Run,
}

#[derive(Parser, Debug)]
#[command(name = "cohortstat")]
#[command(version)]
#[command(about = "Movement statistics by sex and condition cohort, with two-group significance tests", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the metadata table and activity files
    #[arg(short = 'd', long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory for cohort tables and charts
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Significance level for the hypothesis test (default: 0.2)
    #[arg(long = "alpha", value_name = "ALPHA")]
    pub alpha: Option<f64>,

    /// Report format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Skip SVG chart rendering
    #[arg(long = "no-charts")]
    pub no_charts: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    #[command(subcommand)]
    pub stage: Stage,
}

impl Cli {
    /// Load the config file (or defaults) and apply command-line overrides
    pub fn resolve_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_toml(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config.input.data_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(alpha) = self.alpha {
            config.analysis.alpha = alpha;
        }
        if self.no_charts {
            config.output.render_charts = false;
        }

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
        Ok(config)
    }
}
