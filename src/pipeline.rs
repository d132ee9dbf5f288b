//! Combine and analyze stages
//!
//! `combine` turns raw inputs into the four cohort tables; `analyze` reloads
//! those tables, compares the groups and renders the charts. The stages only
//! share the tables on disk, so `analyze` can be re-run on its own.

use crate::analysis::{analyze as analyze_cohorts, AnalysisReport};
use crate::chart::{render_bar_chart, render_scatter};
use crate::cohort::{build_cohorts_with_stats, BuildStats, Cohorts};
use crate::config::PipelineConfig;
use crate::metadata::{Metadata, Sex};
use crate::persistence::{read_cohorts, write_cohorts};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Load metadata, build the cohorts once and write the four tables
pub fn combine(config: &PipelineConfig) -> Result<Cohorts> {
    combine_with_stats(config).map(|(cohorts, _)| cohorts)
}

/// `combine`, also returning how many subjects were kept or skipped
pub fn combine_with_stats(config: &PipelineConfig) -> Result<(Cohorts, BuildStats)> {
    let metadata_path = config.input.metadata_path();
    let metadata = Metadata::from_path(&metadata_path, &config.input.layout())
        .with_context(|| format!("Failed to load metadata from {}", metadata_path.display()))?;
    info!("Loaded {} subjects from {}", metadata.len(), metadata_path.display());

    let source = config.input.source();
    let (cohorts, stats) = build_cohorts_with_stats(&metadata, &source, &config.subject_range);

    fs::create_dir_all(&config.output.dir).with_context(|| {
        format!("Failed to create output directory {}", config.output.dir.display())
    })?;
    let written = write_cohorts(&config.output.dir, &cohorts, &config.output.cohort_files)
        .context("Failed to write cohort tables")?;
    for path in &written {
        info!("Wrote {}", path.display());
    }

    Ok((cohorts, stats))
}

/// Reload the cohort tables, compare groups and render charts
pub fn analyze(config: &PipelineConfig) -> Result<AnalysisReport> {
    let cohorts = read_cohorts(&config.output.dir, &config.output.cohort_files)
        .context("Failed to read cohort tables (run `combine` first)")?;

    let report = analyze_cohorts(&cohorts, &config.analysis);

    if config.output.render_charts {
        render_charts(&report, config)?;
    }

    Ok(report)
}

/// Write the scatter chart and one bar chart per sex
pub fn render_charts(report: &AnalysisReport, config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let label = &config.analysis.condition_label;
    let mut charts = vec![(
        config.output.dir.join(&config.output.scatter_chart),
        render_scatter(&report.groups, label),
    )];

    for (sex, file) in [
        (Sex::Female, &config.output.female_bar_chart),
        (Sex::Male, &config.output.male_bar_chart),
    ] {
        if let Some(comparison) = report.comparison(sex) {
            charts.push((
                config.output.dir.join(file),
                render_bar_chart(comparison, label),
            ));
        }
    }

    let mut written = Vec::with_capacity(charts.len());
    for (path, svg) in charts {
        fs::write(&path, svg)
            .with_context(|| format!("Failed to write chart {}", path.display()))?;
        info!("Wrote {}", path.display());
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::CohortKey;
    use std::path::Path;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn config_for(dir: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.input.data_dir = dir.to_path_buf();
        config.output.dir = dir.join("out");
        config
    }

    #[test]
    fn test_combine_missing_metadata_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = combine(&config_for(dir.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to load metadata"));
    }

    #[test]
    fn test_analyze_without_tables_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = analyze(&config_for(dir.path())).unwrap_err();
        assert!(err.to_string().contains("run `combine` first"));
    }

    #[test]
    fn test_combine_then_analyze() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "patient_info.csv",
            "ID;SEX;AGE;ACC;ACC_TIME;ACC_DAYS;HRV;HRV_TIME;HRV_HOURS;CPT_II;ADHD\n\
             1;0;1;1;;;1;;;1;1\n\
             2;0;1;1;;;1;;;1;1\n\
             3;0;1;1;;;1;;;1;0\n\
             4;0;1;1;;;1;;;1;0\n",
        );
        write(dir.path(), "patient_activity_01.csv", "t;a\nx;10\nx;20\n");
        write(dir.path(), "patient_activity_02.csv", "t;a\nx;30\nx;40\n");
        write(dir.path(), "patient_activity_03.csv", "t;a\nx;1\nx;2\n");
        write(dir.path(), "patient_activity_04.csv", "t;a\nx;3\nx;5\n");

        let config = config_for(dir.path());
        let cohorts = combine(&config).unwrap();
        assert_eq!(cohorts.get(CohortKey::FemaleCondition).len(), 2);
        assert_eq!(cohorts.get(CohortKey::FemaleControl).len(), 2);

        let report = analyze(&config).unwrap();
        let female = report.comparison(Sex::Female).unwrap();
        assert!(female.significance.is_some());
        assert!(config.output.dir.join(&config.output.scatter_chart).exists());
        assert!(config.output.dir.join(&config.output.female_bar_chart).exists());
        assert!(config.output.dir.join(&config.output.male_bar_chart).exists());
    }

    #[test]
    fn test_combine_reports_build_counts() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "patient_info.csv",
            "ID;SEX;AGE;ACC;ACC_TIME;ACC_DAYS;HRV;HRV_TIME;HRV_HOURS;CPT_II;ADHD\n\
             1;1;1;1;;;1;;;1;1\n\
             2;;1;1;;;1;;;1;1\n\
             3;1;1;1;;;1;;;1;0\n",
        );
        write(dir.path(), "patient_activity_01.csv", "t;a\nx;10\n");

        let (cohorts, stats) = combine_with_stats(&config_for(dir.path())).unwrap();
        assert_eq!(cohorts.total(), 1);
        assert_eq!(
            stats,
            BuildStats {
                considered: 3,
                included: 1,
                missing_attributes: 1,
                missing_data: 1,
            }
        );
    }
}
