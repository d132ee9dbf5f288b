//! Raw movement file reader
//!
//! A subject's activity log is a delimited text file with one header line and
//! one row per time bucket. The second column carries the movement count for
//! that bucket; rows where it is blank are dropped rather than read as zero.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Ordered movement counts for one subject, one entry per non-empty bucket
pub type MovementSample = Vec<u64>;

/// Column holding the movement value in a raw activity row
const MOVEMENT_COLUMN: usize = 1;

/// Errors that can occur while reading a subject's movement file
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Movement file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read movement data: {0}")]
    Unreadable(String),

    #[error("Invalid movement value at line {line}: '{value}'")]
    Malformed { line: u64, value: String },
}

impl ReadError {
    /// True when the subject simply has no file on disk
    pub fn is_missing(&self) -> bool {
        matches!(self, ReadError::NotFound(_))
    }
}

/// Read a subject's movement file
///
/// A missing file is reported as [`ReadError::NotFound`] so the caller can
/// decide to treat it as "no data for this subject".
///
/// # Example
/// ```no_run
/// use cohortstat::record_reader::read_movement;
///
/// let sample = read_movement("patient_activity_01.csv", b';').unwrap_or_default();
/// println!("{} buckets", sample.len());
/// ```
pub fn read_movement<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<MovementSample, ReadError> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ReadError::NotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ReadError::Unreadable(format!("{}: {}", path.display(), e)));
        }
    };

    read_movement_from_reader(file, delimiter)
}

/// Read movement rows from any reader (header line first)
pub fn read_movement_from_reader<R: Read>(
    reader: R,
    delimiter: u8,
) -> Result<MovementSample, ReadError> {
    let mut rows = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut sample = MovementSample::new();
    for row in rows.records() {
        let record = row.map_err(|e| ReadError::Unreadable(e.to_string()))?;

        let value = match record.get(MOVEMENT_COLUMN) {
            Some(value) if !value.is_empty() => value,
            _ => continue,
        };

        let count = value.parse::<u64>().map_err(|_| ReadError::Malformed {
            line: record.position().map(|p| p.line()).unwrap_or(0),
            value: value.to_string(),
        })?;
        sample.push(count);
    }

    Ok(sample)
}
