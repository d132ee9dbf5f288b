// Pipeline configuration
//
// Everything dataset-specific lives here instead of in the code: the subject
// id range, file naming, column positions, output names and the significance
// threshold. Loaded from TOML; every section falls back to its defaults.

use crate::cohort::{DirectorySource, SubjectRange};
use crate::metadata::MetadataLayout;
use crate::persistence::CohortFileNames;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Full configuration for the combine and analyze stages
///
/// # Example
/// ```
/// use cohortstat::config::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.subject_range.first, 1);
/// assert_eq!(config.subject_range.last, 108);
/// assert_eq!(config.analysis.alpha, 0.2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Inclusive range of numeric subject ids to scan
    pub subject_range: SubjectRange,

    /// Where the metadata table and raw activity files live
    pub input: InputConfig,

    /// Where cohort tables and charts are written
    pub output: OutputConfig,

    /// Group comparison settings
    pub analysis: AnalysisSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub data_dir: PathBuf,
    pub metadata_file: String,
    pub activity_prefix: String,
    pub activity_extension: String,

    /// Zero-padding width of the id in activity file names
    pub id_width: usize,

    /// Field delimiter shared by metadata and activity files
    pub delimiter: char,

    pub id_column: usize,
    pub sex_column: usize,
    pub condition_column: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            metadata_file: "patient_info.csv".to_string(),
            activity_prefix: "patient_activity_".to_string(),
            activity_extension: ".csv".to_string(),
            id_width: 2,
            delimiter: ';',
            id_column: 0,
            sex_column: 1,
            condition_column: 10,
        }
    }
}

impl InputConfig {
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(&self.metadata_file)
    }

    /// Delimiter as a byte; `validate` guarantees it is ASCII
    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            b';'
        }
    }

    pub fn layout(&self) -> MetadataLayout {
        MetadataLayout {
            delimiter: self.delimiter_byte(),
            id_column: self.id_column,
            sex_column: self.sex_column,
            condition_column: self.condition_column,
        }
    }

    pub fn source(&self) -> DirectorySource {
        DirectorySource::new(&self.data_dir)
            .with_naming(
                self.activity_prefix.clone(),
                self.activity_extension.clone(),
                self.id_width,
            )
            .with_delimiter(self.delimiter_byte())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub cohort_files: CohortFileNames,

    /// Write SVG charts during analysis
    pub render_charts: bool,

    pub scatter_chart: String,
    pub female_bar_chart: String,
    pub male_bar_chart: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            cohort_files: CohortFileNames::default(),
            render_charts: true,
            scatter_chart: "condition_vs_control_movement_scatter.svg".to_string(),
            female_bar_chart: "female_condition_vs_control.svg".to_string(),
            male_bar_chart: "male_condition_vs_control.svg".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Significance level for the t-test verdict and bar markers
    pub alpha: f64,

    /// Passed through to the t-test; does not change the formula
    pub equal_variances: bool,

    /// Display name of the condition group, e.g. "ADHD"
    pub condition_label: String,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            equal_variances: true,
            condition_label: "ADHD".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example TOML
    /// ```toml
    /// [subject_range]
    /// first = 1
    /// last = 108
    ///
    /// [input]
    /// data_dir = "data"
    /// delimiter = ";"
    ///
    /// [analysis]
    /// alpha = 0.05
    /// ```
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(content).context("Failed to parse TOML pipeline configuration")?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.subject_range.first > self.subject_range.last {
            return Err(format!(
                "subject_range.first ({}) must not exceed subject_range.last ({})",
                self.subject_range.first, self.subject_range.last
            ));
        }

        if !(self.analysis.alpha > 0.0 && self.analysis.alpha < 1.0) {
            return Err(format!(
                "alpha must be in (0, 1), got {}",
                self.analysis.alpha
            ));
        }

        if !self.input.delimiter.is_ascii() {
            return Err(format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.input.delimiter
            ));
        }

        if self.input.id_width > 10 {
            return Err(format!(
                "id_width must be <= 10, got {}",
                self.input.id_width
            ));
        }

        Ok(())
    }
}
