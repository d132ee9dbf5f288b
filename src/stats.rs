//! Descriptive statistics for movement samples and mean-lists

use serde::{Deserialize, Serialize};

/// Summary of one subject's movement sample
///
/// `stdev` is the population standard deviation (divisor = count).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubjectStatistic {
    pub mean: f64,
    pub stdev: f64,
}

/// Reduce a movement sample to `(mean, population stdev)`
///
/// Returns `None` for an empty sample; such subjects carry no statistic.
///
/// # Example
/// ```
/// use cohortstat::stats::describe;
///
/// let stat = describe(&[10, 20, 30]).unwrap();
/// assert_eq!(stat.mean, 20.0);
/// assert!((stat.stdev - 8.1650).abs() < 1e-4);
/// assert!(describe(&[]).is_none());
/// ```
pub fn describe(sample: &[u64]) -> Option<SubjectStatistic> {
    if sample.is_empty() {
        return None;
    }

    let count = sample.len() as f64;
    let mean = sample.iter().map(|&x| x as f64).sum::<f64>() / count;
    let variance = sample
        .iter()
        .map(|&x| {
            let diff = x as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / count;

    Some(SubjectStatistic {
        mean,
        stdev: variance.sqrt(),
    })
}

/// Arithmetic mean, `None` when empty
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn sum_squared_deviations(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|x| (x - mean) * (x - mean)).sum()
}

/// Population variance (divisor = n), `None` when empty
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(sum_squared_deviations(values, m) / values.len() as f64)
}

/// Sample variance (divisor = n - 1), `None` for fewer than 2 values
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    Some(sum_squared_deviations(values, m) / (values.len() - 1) as f64)
}

/// Sample standard deviation (ddof = 1), `None` for fewer than 2 values
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}
