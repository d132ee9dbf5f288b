//! Group summaries and per-sex control vs condition comparisons
//!
//! Consumes the four reloaded cohorts and produces everything the charts and
//! the console report need: subject means, error bars, variance ratios and
//! significance verdicts. Groups too small for a statistic are reported with
//! a warning instead of aborting the analysis.

use crate::cohort::{CohortKey, Cohorts};
use crate::config::AnalysisSettings;
use crate::inference::{
    row_standard_error, significance_test, standard_error, variance_ratio, SignificanceTest,
};
use crate::metadata::{Condition, Sex};
use crate::stats::{mean, SubjectStatistic};
use serde::Serialize;
use tracing::{info, warn};

/// Everything derived from one cohort table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: CohortKey,

    /// Subject means in cohort order
    pub means: Vec<f64>,

    /// Mean of the subject means (None for an empty cohort)
    pub mean_of_means: Option<f64>,

    /// Standard error of the subject means (None below 2 subjects)
    pub standard_error: Option<f64>,

    /// Per-subject error bars
    pub row_standard_errors: Vec<f64>,
}

impl GroupSummary {
    pub fn from_cohort(key: CohortKey, stats: &[SubjectStatistic]) -> Self {
        let means: Vec<f64> = stats.iter().map(|s| s.mean).collect();
        Self {
            key,
            mean_of_means: mean(&means),
            standard_error: standard_error(&means).ok(),
            row_standard_errors: stats.iter().map(row_standard_error).collect(),
            means,
        }
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }
}

/// Control vs condition comparison within one sex
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SexComparison {
    pub sex: Sex,
    pub control: GroupSummary,
    pub condition: GroupSummary,

    /// Condition variance over control variance
    pub variance_ratio: Option<f64>,

    pub significance: Option<SignificanceTest>,

    /// Reasons a statistic could not be computed
    pub warnings: Vec<String>,
}

impl SexComparison {
    pub fn compare(sex: Sex, control: GroupSummary, condition: GroupSummary, settings: &AnalysisSettings) -> Self {
        let mut warnings = Vec::new();

        let variance_ratio = match variance_ratio(&control.means, &condition.means) {
            Ok(ratio) => {
                info!("Variance ratio {}s: {}", sex.label().to_lowercase(), ratio);
                Some(ratio)
            }
            Err(e) => {
                warn!("Variance ratio {}s unavailable: {}", sex.label().to_lowercase(), e);
                warnings.push(format!("variance ratio: {}", e));
                None
            }
        };

        let significance = match significance_test(
            &control.means,
            &condition.means,
            settings.equal_variances,
            settings.alpha,
        ) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Significance test {}s unavailable: {}", sex.label().to_lowercase(), e);
                warnings.push(format!("t-test: {}", e));
                None
            }
        };

        Self {
            sex,
            control,
            condition,
            variance_ratio,
            significance,
            warnings,
        }
    }

    /// Suffix for both bar labels, empty when no test could be run
    pub fn marker(&self) -> &'static str {
        self.significance.as_ref().map(|s| s.marker()).unwrap_or("")
    }
}

/// Full analysis of the four cohorts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub alpha: f64,
    pub condition_label: String,
    pub groups: Vec<GroupSummary>,
    pub comparisons: Vec<SexComparison>,
}

impl AnalysisReport {
    pub fn comparison(&self, sex: Sex) -> Option<&SexComparison> {
        self.comparisons.iter().find(|c| c.sex == sex)
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Cohort Summary ===\n");
        for group in &self.groups {
            report.push_str(&format!(
                "  {:<20} n={:<4} mean={:<10} se={}\n",
                group.key.label(&self.condition_label),
                group.len(),
                format_opt(group.mean_of_means),
                format_opt(group.standard_error)
            ));
        }

        for comparison in &self.comparisons {
            report.push_str(&format!(
                "\n=== {}s: Control vs {} ===\n",
                comparison.sex.label(),
                self.condition_label
            ));
            report.push_str(&format!(
                "Variance ratio {}s: {}\n",
                comparison.sex.label().to_lowercase(),
                format_opt(comparison.variance_ratio)
            ));
            if let Some(ref significance) = comparison.significance {
                report.push_str(&format!(
                    "t = {:.4}, df = {}\n{}\n",
                    significance.test.t_statistic, significance.test.df, significance
                ));
            }
            for warning in &comparison.warnings {
                report.push_str(&format!("Warning: {}\n", warning));
            }
        }

        report
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn format_opt(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_infinite() => "inf".to_string(),
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}

/// Summarize the four cohorts and compare control against condition per sex
pub fn analyze(cohorts: &Cohorts, settings: &AnalysisSettings) -> AnalysisReport {
    let groups: Vec<GroupSummary> = cohorts
        .iter()
        .map(|(key, stats)| GroupSummary::from_cohort(key, stats))
        .collect();

    let comparisons: Vec<SexComparison> = [Sex::Female, Sex::Male]
        .into_iter()
        .filter_map(|sex| {
            let find = |condition: Condition| {
                groups
                    .iter()
                    .find(|g| g.key.sex() == sex && g.key.condition() == condition)
                    .cloned()
            };
            let control = find(Condition::Control)?;
            let condition = find(Condition::Positive)?;
            Some(SexComparison::compare(sex, control, condition, settings))
        })
        .collect();

    AnalysisReport {
        alpha: settings.alpha,
        condition_label: settings.condition_label.clone(),
        groups,
        comparisons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Verdict;

    fn stats(means: &[f64]) -> Vec<SubjectStatistic> {
        means
            .iter()
            .map(|&mean| SubjectStatistic { mean, stdev: 1.0 })
            .collect()
    }

    fn sample_cohorts() -> Cohorts {
        let mut cohorts = Cohorts::new();
        cohorts.set(CohortKey::FemaleControl, stats(&[1.0, 2.0, 3.0]));
        cohorts.set(CohortKey::FemaleCondition, stats(&[4.0, 5.0, 6.0]));
        cohorts.set(CohortKey::MaleControl, stats(&[10.0, 12.0]));
        cohorts.set(CohortKey::MaleCondition, stats(&[11.0]));
        cohorts
    }

    #[test]
    fn test_group_summary() {
        let summary = GroupSummary::from_cohort(
            CohortKey::FemaleControl,
            &[
                SubjectStatistic { mean: 2.0, stdev: 1.0 },
                SubjectStatistic { mean: 4.0, stdev: 1.0 },
                SubjectStatistic { mean: 6.0, stdev: 1.0 },
            ],
        );
        assert_eq!(summary.means, vec![2.0, 4.0, 6.0]);
        assert_eq!(summary.mean_of_means, Some(4.0));
        assert!((summary.standard_error.unwrap() - 1.1547).abs() < 1e-4);
        assert_eq!(summary.row_standard_errors, vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_empty_group_summary() {
        let summary = GroupSummary::from_cohort(CohortKey::MaleCondition, &[]);
        assert!(summary.is_empty());
        assert_eq!(summary.mean_of_means, None);
        assert_eq!(summary.standard_error, None);
    }

    #[test]
    fn test_analyze_female_comparison() {
        let report = analyze(&sample_cohorts(), &AnalysisSettings::default());
        assert_eq!(report.groups.len(), 4);

        let female = report.comparison(Sex::Female).unwrap();
        assert_eq!(female.variance_ratio, Some(1.0));
        let significance = female.significance.as_ref().unwrap();
        assert_eq!(significance.verdict, Verdict::RejectNull);
        assert_eq!(female.marker(), "*");
        assert!(female.warnings.is_empty());
    }

    #[test]
    fn test_analyze_degenerate_group_warns() {
        let report = analyze(&sample_cohorts(), &AnalysisSettings::default());
        let male = report.comparison(Sex::Male).unwrap();
        assert_eq!(male.variance_ratio, None);
        assert!(male.significance.is_none());
        assert_eq!(male.warnings.len(), 2);
        assert_eq!(male.marker(), "");
    }

    #[test]
    fn test_report_string_mentions_verdict() {
        let report = analyze(&sample_cohorts(), &AnalysisSettings::default());
        let text = report.to_report_string();
        assert!(text.contains("Variance ratio females: 1.00"));
        assert!(text.contains("Reject the null hypothesis"));
        assert!(text.contains("ADHD Females"));
        assert!(text.contains("Warning: t-test"));
    }

    #[test]
    fn test_report_json() {
        let report = analyze(&sample_cohorts(), &AnalysisSettings::default());
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["alpha"], 0.2);
        assert_eq!(json["groups"].as_array().unwrap().len(), 4);
        assert_eq!(json["comparisons"][0]["sex"], "female");
    }
}
