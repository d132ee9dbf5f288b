//! Cohort table persistence
//!
//! Each cohort is stored as a headerless two-column table (`mean,stdev`), one
//! row per subject in cohort order. Floats are written in shortest round-trip
//! form so reading an unmodified table reproduces the written pairs exactly.

use crate::cohort::{CohortKey, Cohorts};
use crate::stats::SubjectStatistic;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing or reading cohort tables
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write cohort table: {0}")]
    Write(String),

    #[error("Malformed cohort row at line {line}: {message}")]
    Malformed { line: u64, message: String },
}

/// Result type for persistence operations
pub type Result<T> = std::result::Result<T, PersistError>;

/// File names of the four cohort tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortFileNames {
    pub female_condition: String,
    pub male_condition: String,
    pub female_control: String,
    pub male_control: String,
}

impl Default for CohortFileNames {
    fn default() -> Self {
        Self {
            female_condition: "patient_activity_combined_f.csv".to_string(),
            male_condition: "patient_activity_combined_m.csv".to_string(),
            female_control: "patient_activity_c_combined_f.csv".to_string(),
            male_control: "patient_activity_c_combined_m.csv".to_string(),
        }
    }
}

impl CohortFileNames {
    pub fn file_name(&self, key: CohortKey) -> &str {
        match key {
            CohortKey::FemaleCondition => &self.female_condition,
            CohortKey::MaleCondition => &self.male_condition,
            CohortKey::FemaleControl => &self.female_control,
            CohortKey::MaleControl => &self.male_control,
        }
    }
}

/// Serialize a cohort to any writer
pub fn write_cohort_to_writer<W: Write>(writer: W, stats: &[SubjectStatistic]) -> Result<()> {
    let mut table = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    for stat in stats {
        table
            .serialize(stat)
            .map_err(|e| PersistError::Write(e.to_string()))?;
    }

    table.flush().map_err(|e| PersistError::Write(e.to_string()))
}

/// Write a cohort table to disk, replacing any existing file
pub fn write_cohort<P: AsRef<Path>>(path: P, stats: &[SubjectStatistic]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_cohort_to_writer(file, stats)
}

/// Parse a cohort table from any reader
///
/// Every row must hold exactly two finite numbers; anything else fails the
/// whole read.
pub fn read_cohort_from_reader<R: Read>(reader: R) -> Result<Vec<SubjectStatistic>> {
    let mut table = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut stats = Vec::new();
    for row in table.records() {
        let record = row.map_err(|e| PersistError::Malformed {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() != 2 {
            return Err(PersistError::Malformed {
                line,
                message: format!("expected 2 fields, found {}", record.len()),
            });
        }

        stats.push(SubjectStatistic {
            mean: parse_field(&record[0], line, "mean")?,
            stdev: parse_field(&record[1], line, "stdev")?,
        });
    }

    Ok(stats)
}

fn parse_field(field: &str, line: u64, name: &str) -> Result<f64> {
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(PersistError::Malformed {
            line,
            message: format!("invalid {} value '{}'", name, field),
        }),
    }
}

/// Read a cohort table from disk
pub fn read_cohort<P: AsRef<Path>>(path: P) -> Result<Vec<SubjectStatistic>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_cohort_from_reader(file)
}

/// Write all four cohort tables into `dir`
pub fn write_cohorts<P: AsRef<Path>>(dir: P, cohorts: &Cohorts, names: &CohortFileNames) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut written = Vec::with_capacity(CohortKey::ALL.len());
    for (key, stats) in cohorts.iter() {
        let path = dir.join(names.file_name(key));
        write_cohort(&path, stats)?;
        written.push(path);
    }
    Ok(written)
}

/// Read all four cohort tables back from `dir`
pub fn read_cohorts<P: AsRef<Path>>(dir: P, names: &CohortFileNames) -> Result<Cohorts> {
    let dir = dir.as_ref();
    let mut cohorts = Cohorts::new();
    for key in CohortKey::ALL {
        cohorts.set(key, read_cohort(dir.join(names.file_name(key)))?);
    }
    Ok(cohorts)
}
