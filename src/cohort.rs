//! Cohort builder
//!
//! Joins the metadata table with each subject's movement statistic and
//! partitions subjects into four disjoint sex x condition cohorts. Subjects are
//! visited in ascending numeric order, so every cohort is ordered by subject id.

use crate::metadata::{Condition, Metadata, Sex};
use crate::record_reader::{read_movement, MovementSample, ReadError};
use crate::stats::{describe, SubjectStatistic};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One of the four (sex, condition) cohorts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortKey {
    FemaleCondition,
    MaleCondition,
    FemaleControl,
    MaleControl,
}

impl CohortKey {
    pub const ALL: [CohortKey; 4] = [
        CohortKey::FemaleCondition,
        CohortKey::MaleCondition,
        CohortKey::FemaleControl,
        CohortKey::MaleControl,
    ];

    /// Cohort for a subject's attributes; `None` if either is unknown
    pub fn from_attributes(sex: Option<Sex>, condition: Option<Condition>) -> Option<Self> {
        match (sex?, condition?) {
            (Sex::Female, Condition::Positive) => Some(CohortKey::FemaleCondition),
            (Sex::Male, Condition::Positive) => Some(CohortKey::MaleCondition),
            (Sex::Female, Condition::Control) => Some(CohortKey::FemaleControl),
            (Sex::Male, Condition::Control) => Some(CohortKey::MaleControl),
        }
    }

    pub fn sex(self) -> Sex {
        match self {
            CohortKey::FemaleCondition | CohortKey::FemaleControl => Sex::Female,
            CohortKey::MaleCondition | CohortKey::MaleControl => Sex::Male,
        }
    }

    pub fn condition(self) -> Condition {
        match self {
            CohortKey::FemaleCondition | CohortKey::MaleCondition => Condition::Positive,
            CohortKey::FemaleControl | CohortKey::MaleControl => Condition::Control,
        }
    }

    /// Human-readable label, e.g. "ADHD Females" or "Control Males"
    pub fn label(self, condition_label: &str) -> String {
        let group = match self.condition() {
            Condition::Positive => condition_label,
            Condition::Control => "Control",
        };
        format!("{} {}s", group, self.sex().label())
    }
}

/// Inclusive range of numeric subject identifiers to scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRange {
    pub first: u32,
    pub last: u32,
}

impl Default for SubjectRange {
    fn default() -> Self {
        Self { first: 1, last: 108 }
    }
}

impl SubjectRange {
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> {
        self.first..=self.last
    }
}

/// Access to each subject's raw movement data
pub trait SubjectSource {
    fn movement(&self, id: u32) -> Result<MovementSample, ReadError>;
}

/// Subject files laid out in one directory as `<prefix><padded id><extension>`
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    prefix: String,
    extension: String,
    id_width: usize,
    delimiter: u8,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: "patient_activity_".to_string(),
            extension: ".csv".to_string(),
            id_width: 2,
            delimiter: b';',
        }
    }

    pub fn with_naming(mut self, prefix: impl Into<String>, extension: impl Into<String>, id_width: usize) -> Self {
        self.prefix = prefix.into();
        self.extension = extension.into();
        self.id_width = id_width;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// File name for a subject id, zero-padded to the configured width
    ///
    /// ```
    /// use cohortstat::cohort::DirectorySource;
    ///
    /// let source = DirectorySource::new(".");
    /// assert_eq!(source.file_name(7), "patient_activity_07.csv");
    /// assert_eq!(source.file_name(42), "patient_activity_42.csv");
    /// assert_eq!(source.file_name(108), "patient_activity_108.csv");
    /// ```
    pub fn file_name(&self, id: u32) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            id,
            self.extension,
            width = self.id_width
        )
    }

    pub fn path_for(&self, id: u32) -> PathBuf {
        self.dir.join(self.file_name(id))
    }
}

impl SubjectSource for DirectorySource {
    fn movement(&self, id: u32) -> Result<MovementSample, ReadError> {
        read_movement(self.path_for(id), self.delimiter)
    }
}

/// The four cohorts, each ordered by ascending subject id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cohorts {
    female_condition: Vec<SubjectStatistic>,
    male_condition: Vec<SubjectStatistic>,
    female_control: Vec<SubjectStatistic>,
    male_control: Vec<SubjectStatistic>,
}

impl Cohorts {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, key: CohortKey) -> &mut Vec<SubjectStatistic> {
        match key {
            CohortKey::FemaleCondition => &mut self.female_condition,
            CohortKey::MaleCondition => &mut self.male_condition,
            CohortKey::FemaleControl => &mut self.female_control,
            CohortKey::MaleControl => &mut self.male_control,
        }
    }

    pub fn get(&self, key: CohortKey) -> &[SubjectStatistic] {
        match key {
            CohortKey::FemaleCondition => &self.female_condition,
            CohortKey::MaleCondition => &self.male_condition,
            CohortKey::FemaleControl => &self.female_control,
            CohortKey::MaleControl => &self.male_control,
        }
    }

    pub fn push(&mut self, key: CohortKey, stat: SubjectStatistic) {
        self.slot_mut(key).push(stat);
    }

    /// Replace a cohort's contents
    pub fn set(&mut self, key: CohortKey, stats: Vec<SubjectStatistic>) {
        *self.slot_mut(key) = stats;
    }

    pub fn iter(&self) -> impl Iterator<Item = (CohortKey, &[SubjectStatistic])> {
        CohortKey::ALL.into_iter().map(move |key| (key, self.get(key)))
    }

    /// Number of subjects across all cohorts
    pub fn total(&self) -> usize {
        self.iter().map(|(_, stats)| stats.len()).sum()
    }
}

/// Counters describing one cohort build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Ids in range that have a metadata row
    pub considered: usize,
    /// Subjects placed into a cohort
    pub included: usize,
    /// Subjects with sex or condition unknown
    pub missing_attributes: usize,
    /// Subjects whose movement file was missing, unreadable or empty
    pub missing_data: usize,
}

/// Build all four cohorts in one pass
pub fn build_cohorts<S: SubjectSource + ?Sized>(
    metadata: &Metadata,
    source: &S,
    range: &SubjectRange,
) -> Cohorts {
    build_cohorts_with_stats(metadata, source, range).0
}

/// Build all four cohorts and report how many subjects were kept or skipped
pub fn build_cohorts_with_stats<S: SubjectSource + ?Sized>(
    metadata: &Metadata,
    source: &S,
    range: &SubjectRange,
) -> (Cohorts, BuildStats) {
    let mut cohorts = Cohorts::new();
    let mut stats = BuildStats::default();

    for id in range.ids() {
        let Some(subject) = metadata.get_numeric(id) else {
            continue;
        };
        stats.considered += 1;

        let Some(key) = CohortKey::from_attributes(subject.sex, subject.condition) else {
            debug!("Subject {} has unknown sex or condition, excluded", id);
            stats.missing_attributes += 1;
            continue;
        };

        let sample = match source.movement(id) {
            Ok(sample) => sample,
            Err(e) if e.is_missing() => {
                debug!("Subject {}: {}", id, e);
                MovementSample::new()
            }
            Err(e) => {
                warn!("Subject {}: {}, treating as no data", id, e);
                MovementSample::new()
            }
        };

        match describe(&sample) {
            Some(stat) => {
                debug!(
                    "Subject {} -> {:?} (n={}, mean={:.3}, stdev={:.3})",
                    id,
                    key,
                    sample.len(),
                    stat.mean,
                    stat.stdev
                );
                cohorts.push(key, stat);
                stats.included += 1;
            }
            None => {
                debug!("Subject {} has no movement data, excluded", id);
                stats.missing_data += 1;
            }
        }
    }

    info!(
        "Built cohorts: {} considered, {} included, {} without attributes, {} without data",
        stats.considered, stats.included, stats.missing_attributes, stats.missing_data
    );

    (cohorts, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Subject;
    use std::collections::HashMap;

    /// In-memory subject files
    #[derive(Default)]
    struct MemorySource {
        samples: HashMap<u32, MovementSample>,
    }

    impl MemorySource {
        fn with(mut self, id: u32, sample: &[u64]) -> Self {
            self.samples.insert(id, sample.to_vec());
            self
        }
    }

    impl SubjectSource for MemorySource {
        fn movement(&self, id: u32) -> Result<MovementSample, ReadError> {
            self.samples
                .get(&id)
                .cloned()
                .ok_or_else(|| ReadError::NotFound(PathBuf::from(format!("mem://{}", id))))
        }
    }

    fn subject(id: &str, sex: Option<Sex>, condition: Option<Condition>) -> Subject {
        Subject {
            id: id.to_string(),
            sex,
            condition,
        }
    }

    #[test]
    fn test_key_from_attributes() {
        assert_eq!(
            CohortKey::from_attributes(Some(Sex::Female), Some(Condition::Positive)),
            Some(CohortKey::FemaleCondition)
        );
        assert_eq!(
            CohortKey::from_attributes(Some(Sex::Male), Some(Condition::Control)),
            Some(CohortKey::MaleControl)
        );
        assert_eq!(CohortKey::from_attributes(None, Some(Condition::Control)), None);
        assert_eq!(CohortKey::from_attributes(Some(Sex::Male), None), None);
    }

    #[test]
    fn test_key_label() {
        assert_eq!(CohortKey::FemaleCondition.label("ADHD"), "ADHD Females");
        assert_eq!(CohortKey::MaleControl.label("ADHD"), "Control Males");
    }

    #[test]
    fn test_male_condition_subject_lands_in_one_cohort() {
        let mut metadata = Metadata::new();
        metadata.insert(subject("3", Some(Sex::Male), Some(Condition::Positive)));
        let source = MemorySource::default().with(3, &[1, 2, 3]);

        let cohorts = build_cohorts(&metadata, &source, &SubjectRange::default());

        assert_eq!(cohorts.get(CohortKey::MaleCondition).len(), 1);
        for key in [
            CohortKey::FemaleCondition,
            CohortKey::FemaleControl,
            CohortKey::MaleControl,
        ] {
            assert!(cohorts.get(key).is_empty(), "{:?} should be empty", key);
        }
    }

    #[test]
    fn test_cohort_order_is_ascending_id() {
        let mut metadata = Metadata::new();
        metadata.insert(subject("12", Some(Sex::Female), Some(Condition::Control)));
        metadata.insert(subject("2", Some(Sex::Female), Some(Condition::Control)));
        metadata.insert(subject("9", Some(Sex::Female), Some(Condition::Control)));
        let source = MemorySource::default()
            .with(12, &[12])
            .with(2, &[2])
            .with(9, &[9]);

        let cohorts = build_cohorts(&metadata, &source, &SubjectRange::default());
        let means: Vec<f64> = cohorts
            .get(CohortKey::FemaleControl)
            .iter()
            .map(|s| s.mean)
            .collect();
        assert_eq!(means, vec![2.0, 9.0, 12.0]);
    }

    #[test]
    fn test_missing_and_empty_data_excluded() {
        let mut metadata = Metadata::new();
        metadata.insert(subject("1", Some(Sex::Female), Some(Condition::Positive)));
        metadata.insert(subject("2", Some(Sex::Female), Some(Condition::Positive)));
        metadata.insert(subject("3", Some(Sex::Female), Some(Condition::Positive)));
        let source = MemorySource::default().with(1, &[4, 6]).with(3, &[]);

        let (cohorts, stats) = build_cohorts_with_stats(&metadata, &source, &SubjectRange::default());

        assert_eq!(cohorts.get(CohortKey::FemaleCondition).len(), 1);
        assert_eq!(stats.considered, 3);
        assert_eq!(stats.included, 1);
        assert_eq!(stats.missing_data, 2);
    }

    #[test]
    fn test_unknown_attributes_excluded() {
        let mut metadata = Metadata::new();
        metadata.insert(subject("5", None, Some(Condition::Positive)));
        metadata.insert(subject("6", Some(Sex::Male), None));
        let source = MemorySource::default().with(5, &[1]).with(6, &[1]);

        let (cohorts, stats) = build_cohorts_with_stats(&metadata, &source, &SubjectRange::default());

        assert_eq!(cohorts.total(), 0);
        assert_eq!(stats.missing_attributes, 2);
    }

    #[test]
    fn test_ids_outside_range_excluded() {
        let mut metadata = Metadata::new();
        metadata.insert(subject("1", Some(Sex::Male), Some(Condition::Control)));
        metadata.insert(subject("200", Some(Sex::Male), Some(Condition::Control)));
        metadata.insert(subject("abc", Some(Sex::Male), Some(Condition::Control)));
        let source = MemorySource::default().with(1, &[1]).with(200, &[1]);

        let cohorts = build_cohorts(&metadata, &source, &SubjectRange::new(1, 108));
        assert_eq!(cohorts.get(CohortKey::MaleControl).len(), 1);
    }

    #[test]
    fn test_file_name_padding() {
        let source = DirectorySource::new("/data");
        assert_eq!(source.file_name(1), "patient_activity_01.csv");
        assert_eq!(source.file_name(10), "patient_activity_10.csv");
        assert_eq!(
            source.path_for(5),
            PathBuf::from("/data/patient_activity_05.csv")
        );

        let custom = DirectorySource::new(".").with_naming("subj", ".txt", 3);
        assert_eq!(custom.file_name(7), "subj007.txt");
    }

    #[test]
    fn test_set_and_total() {
        let mut cohorts = Cohorts::new();
        cohorts.set(
            CohortKey::MaleControl,
            vec![
                SubjectStatistic { mean: 1.0, stdev: 0.0 },
                SubjectStatistic { mean: 2.0, stdev: 0.5 },
            ],
        );
        cohorts.push(CohortKey::FemaleControl, SubjectStatistic { mean: 3.0, stdev: 1.0 });
        assert_eq!(cohorts.total(), 3);
        assert_eq!(cohorts.iter().count(), 4);
    }
}
