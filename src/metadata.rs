//! Subject metadata table
//!
//! One delimited row per subject: an identifier, a sex code and a condition
//! code (0/1, blank = unknown). Unknown attributes stay `None`; they are never
//! defaulted, so such subjects fall outside every cohort.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while loading the metadata table
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Metadata file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse metadata: {0}")]
    Parse(String),
}

/// Subject sex, coded 0 = female, 1 = male
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Sex::Female),
            1 => Some(Sex::Male),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sex::Female => "Female",
            Sex::Male => "Male",
        }
    }
}

/// Condition status, coded 0 = control, 1 = condition present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Control,
    Positive,
}

impl Condition {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Condition::Control),
            1 => Some(Condition::Positive),
            _ => None,
        }
    }
}

/// One participant as described by the metadata table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub sex: Option<Sex>,
    pub condition: Option<Condition>,
}

/// Column layout of the metadata table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataLayout {
    pub delimiter: u8,
    pub id_column: usize,
    pub sex_column: usize,
    pub condition_column: usize,
}

impl Default for MetadataLayout {
    fn default() -> Self {
        Self {
            delimiter: b';',
            id_column: 0,
            sex_column: 1,
            condition_column: 10,
        }
    }
}

/// All subjects keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    subjects: BTreeMap<String, Subject>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the metadata table from disk
    pub fn from_path<P: AsRef<Path>>(path: P, layout: &MetadataLayout) -> Result<Self, MetadataError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => MetadataError::NotFound(path.to_path_buf()),
            _ => MetadataError::Io(e),
        })?;
        Self::from_reader(file, layout)
    }

    /// Parse the metadata table (header line first)
    ///
    /// Rows without an identifier are skipped. A later row with the same
    /// identifier replaces the earlier one.
    pub fn from_reader<R: Read>(reader: R, layout: &MetadataLayout) -> Result<Self, MetadataError> {
        let mut rows = csv::ReaderBuilder::new()
            .delimiter(layout.delimiter)
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut metadata = Metadata::new();
        for row in rows.records() {
            let record = row.map_err(|e| MetadataError::Parse(e.to_string()))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let id = match record.get(layout.id_column) {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => {
                    debug!("Skipping metadata line {}: no subject id", line);
                    continue;
                }
            };

            let sex = parse_code(record.get(layout.sex_column), line, "sex").and_then(Sex::from_code);
            let condition = parse_code(record.get(layout.condition_column), line, "condition")
                .and_then(Condition::from_code);

            if metadata
                .insert(Subject {
                    id: id.clone(),
                    sex,
                    condition,
                })
                .is_some()
            {
                debug!("Duplicate metadata row for subject {} (line {})", id, line);
            }
        }

        Ok(metadata)
    }

    /// Insert a subject, returning the one it replaced
    pub fn insert(&mut self, subject: Subject) -> Option<Subject> {
        self.subjects.insert(subject.id.clone(), subject)
    }

    pub fn get(&self, id: &str) -> Option<&Subject> {
        self.subjects.get(id)
    }

    /// Look up a subject by numeric identifier (decimal form, no padding)
    pub fn get_numeric(&self, id: u32) -> Option<&Subject> {
        self.subjects.get(&id.to_string())
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

/// Parse an optional 0/1 attribute code; blank means unknown
fn parse_code(field: Option<&str>, line: u64, name: &str) -> Option<i64> {
    let field = field.filter(|f| !f.is_empty())?;
    match field.parse::<i64>() {
        Ok(code) if code == 0 || code == 1 => Some(code),
        Ok(code) => {
            warn!("Line {}: unexpected {} code {}, treating as unknown", line, name, code);
            None
        }
        Err(_) => {
            warn!("Line {}: invalid {} code '{}', treating as unknown", line, name, field);
            None
        }
    }
}
