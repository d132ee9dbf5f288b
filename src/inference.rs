// Between-group inferential statistics
//
// Compares a control group's subject means against a condition group's:
// - standard error of a mean-list (ddof = 1)
// - variance ratio (condition over control) as an equal-variance heuristic
// - two-sample t-test with a two-tailed p-value from the Student-t CDF
//
// Every formula validates its inputs first; degenerate groups surface as
// `StatsError` instead of NaN or a division fault.

use crate::stats::{mean, sample_stdev, sample_variance, SubjectStatistic};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::fmt;
use thiserror::Error;

/// Errors raised for inputs a formula is undefined on
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("Both groups have zero variance")]
    ZeroVariance,

    #[error("Student-t distribution unavailable: {0}")]
    Distribution(String),
}

/// Round to two decimal places (infinities pass through)
///
/// Rounds the exact binary value half-to-even through the decimal formatter,
/// so `0.125` becomes `0.12` while `0.005` (stored slightly above) becomes
/// `0.01`. Scaling by 100 first would turn both into exact ties.
pub fn round2(value: f64) -> f64 {
    if value.is_finite() {
        format!("{:.2}", value).parse().unwrap_or(value)
    } else {
        value
    }
}

/// Decimal text that always carries a fractional part (`0.0`, `1.0`, `0.02`)
fn decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

fn require_two(values: &[f64]) -> Result<(), StatsError> {
    if values.len() < 2 {
        return Err(StatsError::InsufficientSamples {
            required: 2,
            actual: values.len(),
        });
    }
    Ok(())
}

/// Standard error of a mean-list: `sample_stdev / sqrt(n)`
///
/// # Example
/// ```
/// use cohortstat::inference::standard_error;
///
/// let se = standard_error(&[2.0, 4.0, 6.0]).unwrap();
/// assert!((se - 1.1547).abs() < 1e-4);
/// assert!(standard_error(&[5.0]).is_err());
/// ```
pub fn standard_error(values: &[f64]) -> Result<f64, StatsError> {
    require_two(values)?;
    let stdev = sample_stdev(values).ok_or(StatsError::InsufficientSamples {
        required: 2,
        actual: values.len(),
    })?;
    Ok(stdev / (values.len() as f64).sqrt())
}

/// Per-subject error bar: standard error of the persisted `[mean, stdev]` pair
///
/// The ddof = 1 stdev of two points is `|a - b| / sqrt(2)`, divided again by
/// `sqrt(2)`.
pub fn row_standard_error(stat: &SubjectStatistic) -> f64 {
    (stat.mean - stat.stdev).abs() / 2.0
}

/// Ratio of the treatment group's sample variance to the control group's
///
/// Argument order matters: swapping the groups inverts the ratio. The result
/// is rounded to two decimal places. A zero control variance against a
/// non-zero treatment variance yields `f64::INFINITY`.
pub fn variance_ratio(control: &[f64], treatment: &[f64]) -> Result<f64, StatsError> {
    require_two(control)?;
    require_two(treatment)?;

    let control_var = sample_variance(control).unwrap_or(0.0);
    let treatment_var = sample_variance(treatment).unwrap_or(0.0);

    if control_var == 0.0 {
        if treatment_var == 0.0 {
            return Err(StatsError::ZeroVariance);
        }
        return Ok(f64::INFINITY);
    }

    Ok(round2(treatment_var / control_var))
}

/// Result of a two-sample t-test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TTest {
    /// t-statistic, control minus treatment
    pub t_statistic: f64,

    /// Degrees of freedom (n1 + n2 - 2)
    pub df: f64,

    /// Two-tailed p-value rounded to two decimals
    pub p_value: f64,

    /// Two-tailed p-value before rounding
    pub raw_p_value: f64,

    /// Equal-variance flag as supplied by the caller
    pub equal_variances: bool,
}

/// Two-sample t-test between a control and a treatment mean-list
///
/// `t = (mean1 - mean2) / sqrt(s1²/n1 + s2²/n2)` with ddof = 1 stdevs and
/// `df = n1 + n2 - 2`. The `equal_variances` flag is recorded in the result
/// but both settings use the same standard error.
pub fn t_test(control: &[f64], treatment: &[f64], equal_variances: bool) -> Result<TTest, StatsError> {
    require_two(control)?;
    require_two(treatment)?;

    let n1 = control.len() as f64;
    let n2 = treatment.len() as f64;
    // require_two guarantees every value below exists
    let mean1 = mean(control).unwrap_or(0.0);
    let mean2 = mean(treatment).unwrap_or(0.0);
    let std1 = sample_stdev(control).unwrap_or(0.0);
    let std2 = sample_stdev(treatment).unwrap_or(0.0);
    let df = n1 + n2 - 2.0;

    let standard_error = (std1 * std1 / n1 + std2 * std2 / n2).sqrt();
    let (t_statistic, raw_p_value) = if standard_error == 0.0 {
        if mean1 == mean2 {
            return Err(StatsError::ZeroVariance);
        }
        let t = if mean1 > mean2 {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        };
        (t, 0.0)
    } else {
        let t = (mean1 - mean2) / standard_error;
        let dist = StudentsT::new(0.0, 1.0, df)
            .map_err(|e| StatsError::Distribution(e.to_string()))?;
        let p = 2.0 * (1.0 - dist.cdf(t.abs()));
        (t, p.clamp(0.0, 1.0))
    };

    Ok(TTest {
        t_statistic,
        df,
        p_value: round2(raw_p_value),
        raw_p_value,
        equal_variances,
    })
}

/// Hypothesis-test decision at a given alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// p < alpha: the group means differ significantly
    RejectNull,
    /// p >= alpha: no significant difference
    FailToReject,
}

/// t-test plus its verdict against alpha
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignificanceTest {
    pub test: TTest,
    pub alpha: f64,
    pub verdict: Verdict,
}

impl SignificanceTest {
    pub fn is_significant(&self) -> bool {
        self.verdict == Verdict::RejectNull
    }

    /// Bar-label suffix for this result
    pub fn marker(&self) -> &'static str {
        significance_marker(self.test.p_value, self.alpha)
    }
}

impl fmt::Display for SignificanceTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.verdict {
            Verdict::RejectNull => write!(
                f,
                "P value = {} < {} = alpha. Reject the null hypothesis. \
                 There is a statistically significant difference.",
                decimal(self.test.p_value),
                decimal(self.alpha)
            ),
            Verdict::FailToReject => write!(
                f,
                "P value = {} > {} = alpha. Fail to reject the null hypothesis. \
                 There is no statistically significant difference.",
                decimal(self.test.p_value),
                decimal(self.alpha)
            ),
        }
    }
}

/// Run the t-test and decide against `alpha`, logging the verdict
///
/// # Example
/// ```
/// use cohortstat::inference::{significance_test, Verdict};
///
/// let control = [1.0, 2.0, 3.0];
/// let treatment = [4.0, 5.0, 6.0];
/// let result = significance_test(&control, &treatment, true, 0.2).unwrap();
/// assert_eq!(result.verdict, Verdict::RejectNull);
/// assert_eq!(result.test.p_value, 0.02);
/// ```
pub fn significance_test(
    control: &[f64],
    treatment: &[f64],
    equal_variances: bool,
    alpha: f64,
) -> Result<SignificanceTest, StatsError> {
    let test = t_test(control, treatment, equal_variances)?;
    let verdict = if test.raw_p_value < alpha {
        Verdict::RejectNull
    } else {
        Verdict::FailToReject
    };

    let result = SignificanceTest {
        test,
        alpha,
        verdict,
    };
    tracing::info!("{}", result);
    Ok(result)
}

/// `"*"` when the rounded p-value is at most alpha, `" (n.s.)"` otherwise
pub fn significance_marker(p_value: f64, alpha: f64) -> &'static str {
    if p_value <= alpha {
        "*"
    } else {
        " (n.s.)"
    }
}
