use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;
use crate::model::PairedSeries;
use crate::stats::moments::{mean, sample_std_dev};
use crate::stats::rank::{Correlation, pearson, spearman, student_t_two_sided_p};

const MIN_INTERVAL_OBSERVATIONS: usize = 4;
/// Rounding slack, in units of machine epsilon scaled by the largest score.
const SPREAD_EPSILONS: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Negligible,
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl CorrelationStrength {
    pub fn from_coefficient(r: f64) -> Self {
        let magnitude = r.abs();
        if magnitude < 0.1 {
            Self::Negligible
        } else if magnitude < 0.3 {
            Self::Weak
        } else if magnitude < 0.5 {
            Self::Moderate
        } else if magnitude < 0.7 {
            Self::Strong
        } else {
            Self::VeryStrong
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Negligible => "negligible",
            Self::Weak => "weak",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
            Self::VeryStrong => "very strong",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
    None,
}

impl Direction {
    pub fn of(value: f64) -> Self {
        if value > 0.0 {
            Self::Positive
        } else if value < 0.0 {
            Self::Negative
        } else {
            Self::None
        }
    }
}

/// Strength and direction of the rank correlation, serialised as a phrase
/// such as `"very strong positive"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationLabel {
    pub strength: CorrelationStrength,
    pub direction: Direction,
}

impl CorrelationLabel {
    pub fn from_coefficient(r: f64) -> Self {
        Self {
            strength: CorrelationStrength::from_coefficient(r),
            direction: Direction::of(r),
        }
    }
}

impl fmt::Display for CorrelationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Positive => write!(f, "{} positive", self.strength.as_str()),
            Direction::Negative => write!(f, "{} negative", self.strength.as_str()),
            Direction::None => f.write_str(self.strength.as_str()),
        }
    }
}

impl Serialize for CorrelationLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Cohen's d bands for the paired difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectSize {
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectSize {
    pub fn from_cohens_d(d: f64) -> Self {
        let magnitude = d.abs();
        if magnitude < 0.2 {
            Self::Negligible
        } else if magnitude < 0.5 {
            Self::Small
        } else if magnitude < 0.8 {
            Self::Medium
        } else {
            Self::Large
        }
    }
}

/// Effect size read directly off the correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationEffect {
    Small,
    Medium,
    Large,
}

impl CorrelationEffect {
    pub fn from_coefficient(r: f64) -> Self {
        let magnitude = r.abs();
        if magnitude >= 0.5 {
            Self::Large
        } else if magnitude >= 0.3 {
            Self::Medium
        } else {
            Self::Small
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasDirection {
    AutomatedHigher,
    AutomatedLower,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub z_critical: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub mean: f64,
    pub std_dev: f64,
}

/// Descriptive agreement between the two series beyond rank order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgreementStats {
    pub automated: SeriesSummary,
    pub human: SeriesSummary,
    pub pearson: Correlation,
    pub mean_abs_difference: f64,
    pub std_difference: f64,
    pub exact_agreement_count: usize,
    pub close_agreement_count: usize,
    pub total_comparisons: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub observations: usize,
    pub correlation: f64,
    pub correlation_p_value: f64,
    pub correlation_defined: bool,
    pub interpretation: CorrelationLabel,
    pub significant: bool,
    pub correlation_effect: CorrelationEffect,
    /// Omitted when there are too few observations for the Fisher transform.
    pub confidence_interval: Option<ConfidenceInterval>,
    pub t_statistic: Option<f64>,
    pub t_p_value: Option<f64>,
    pub degrees_of_freedom: usize,
    pub difference_significant: bool,
    pub mean_difference: f64,
    pub cohens_d: Option<f64>,
    pub effect_size: EffectSize,
    pub bias: BiasDirection,
    pub agreement: AgreementStats,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairedComparisonAnalyzer {
    significance_level: f64,
    z_critical: f64,
    exact_tolerance: f64,
    close_tolerance: f64,
}

impl Default for PairedComparisonAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

struct PairedTest {
    t_statistic: Option<f64>,
    p_value: Option<f64>,
    cohens_d: Option<f64>,
}

impl PairedComparisonAnalyzer {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            significance_level: config.significance_level,
            z_critical: config.ci_z_critical,
            exact_tolerance: config.exact_agreement_tolerance,
            close_tolerance: config.close_agreement_tolerance,
        }
    }

    /// Validates the raw series, then compares them.
    pub fn compare_scores(
        &self,
        automated: Vec<f64>,
        human: Vec<f64>,
    ) -> AnalysisResult<ComparisonResult> {
        let series = PairedSeries::new(automated, human)?;
        Ok(self.compare(&series))
    }

    pub fn compare(&self, series: &PairedSeries) -> ComparisonResult {
        let n = series.len();
        let rank = spearman(series.automated(), series.human());
        if !rank.defined {
            debug!(observations = n, "rank correlation undefined for constant series");
        }

        let differences = series.differences();
        let mean_difference = mean(&differences);
        let spread = sample_std_dev(&differences);
        let tolerance = rounding_tolerance(series);
        let test = paired_t_test(mean_difference, spread, n, tolerance);

        let difference_significant = test
            .p_value
            .is_some_and(|p| p < self.significance_level);
        let bias = if !difference_significant {
            BiasDirection::None
        } else if mean_difference > 0.0 {
            BiasDirection::AutomatedHigher
        } else {
            BiasDirection::AutomatedLower
        };
        let effect_size = match test.cohens_d {
            Some(d) => EffectSize::from_cohens_d(d),
            None => EffectSize::Large,
        };

        ComparisonResult {
            observations: n,
            correlation: rank.coefficient,
            correlation_p_value: rank.p_value,
            correlation_defined: rank.defined,
            interpretation: CorrelationLabel::from_coefficient(rank.coefficient),
            significant: rank.p_value < self.significance_level,
            correlation_effect: CorrelationEffect::from_coefficient(rank.coefficient),
            confidence_interval: self.fisher_interval(rank.coefficient, n),
            t_statistic: test.t_statistic,
            t_p_value: test.p_value,
            degrees_of_freedom: n - 1,
            difference_significant,
            mean_difference,
            cohens_d: test.cohens_d,
            effect_size,
            bias,
            agreement: self.agreement_stats(series, &differences, spread),
        }
    }

    /// Fisher z interval around `r`; `None` for fewer than four observations.
    pub fn fisher_interval(&self, r: f64, n: usize) -> Option<ConfidenceInterval> {
        if n < MIN_INTERVAL_OBSERVATIONS {
            return None;
        }
        let z = r.clamp(-1.0, 1.0).atanh();
        let half_width = self.z_critical / ((n - 3) as f64).sqrt();
        Some(ConfidenceInterval {
            lower: (z - half_width).tanh(),
            upper: (z + half_width).tanh(),
            z_critical: self.z_critical,
        })
    }

    fn agreement_stats(
        &self,
        series: &PairedSeries,
        differences: &[f64],
        spread: f64,
    ) -> AgreementStats {
        let absolute = differences.iter().map(|d| d.abs()).collect::<Vec<f64>>();
        AgreementStats {
            automated: summarize(series.automated()),
            human: summarize(series.human()),
            pearson: pearson(series.automated(), series.human()),
            mean_abs_difference: mean(&absolute),
            std_difference: spread,
            exact_agreement_count: absolute
                .iter()
                .filter(|d| **d < self.exact_tolerance)
                .count(),
            close_agreement_count: absolute
                .iter()
                .filter(|d| **d <= self.close_tolerance)
                .count(),
            total_comparisons: differences.len(),
        }
    }
}

fn summarize(values: &[f64]) -> SeriesSummary {
    SeriesSummary {
        mean: mean(values),
        std_dev: sample_std_dev(values),
    }
}

/// Largest difference spread that is indistinguishable from rounding noise
/// for scores of this magnitude.
fn rounding_tolerance(series: &PairedSeries) -> f64 {
    let magnitude = series
        .automated()
        .iter()
        .chain(series.human())
        .fold(1.0_f64, |largest, value| largest.max(value.abs()));
    SPREAD_EPSILONS * f64::EPSILON * magnitude
}

fn paired_t_test(mean_difference: f64, spread: f64, n: usize, tolerance: f64) -> PairedTest {
    if spread <= tolerance {
        // Every difference is the same. No shift at all is a clean null
        // result. A constant non-zero shift is certain: the statistic and
        // Cohen's d diverge, so only the p-value is reported.
        return if mean_difference.abs() <= tolerance {
            PairedTest {
                t_statistic: Some(0.0),
                p_value: Some(1.0),
                cohens_d: Some(0.0),
            }
        } else {
            PairedTest {
                t_statistic: None,
                p_value: Some(0.0),
                cohens_d: None,
            }
        };
    }

    let t = mean_difference / (spread / (n as f64).sqrt());
    PairedTest {
        t_statistic: Some(t),
        p_value: Some(student_t_two_sided_p(t, (n - 1) as f64)),
        cohens_d: Some(mean_difference / spread),
    }
}
