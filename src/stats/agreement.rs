use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::stats::moments::population_variance;

const VARIANCE_WEIGHT: f64 = 0.4;
const RANGE_WEIGHT: f64 = 0.3;
const MODE_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgreementLevel {
    High,
    Moderate,
    Low,
}

impl AgreementLevel {
    pub const ALL: [AgreementLevel; 3] = [Self::High, Self::Moderate, Self::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Moderate => "MODERATE",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for AgreementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heuristic agreement of one item's ratings.
///
/// `raw_composite` is the unscaled weighted blend in [0, 1]; `composite` is
/// the same value multiplied by the calibration factor and is the number the
/// level is derived from. It is a same-direction diagnostic only and is not
/// comparable in magnitude to the corpus-wide reliability coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgreementResult {
    pub variance_agreement: f64,
    pub range_agreement: f64,
    pub mode_agreement: f64,
    pub raw_composite: f64,
    pub composite: f64,
    pub level: AgreementLevel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemAgreementScorer {
    variance_ceiling: f64,
    range_ceiling: f64,
    scale_factor: f64,
    high_threshold: f64,
    moderate_threshold: f64,
}

impl Default for ItemAgreementScorer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl ItemAgreementScorer {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            variance_ceiling: config.variance_ceiling,
            range_ceiling: config.range_ceiling,
            scale_factor: config.composite_scale_factor,
            high_threshold: config.high_threshold,
            moderate_threshold: config.moderate_threshold,
        }
    }

    /// Scores a rating column. A column with zero or one rating counts as
    /// full agreement.
    pub fn score(&self, ratings: &[i64]) -> AgreementResult {
        if ratings.len() <= 1 {
            return self.assemble(1.0, 1.0, 1.0);
        }

        let values = ratings.iter().map(|value| *value as f64).collect::<Vec<f64>>();
        let variance = population_variance(&values);
        let variance_agreement = (1.0 - variance / self.variance_ceiling).max(0.0);

        let min = ratings.iter().copied().min().unwrap_or_default();
        let max = ratings.iter().copied().max().unwrap_or_default();
        let range_agreement = (1.0 - (max - min) as f64 / self.range_ceiling).max(0.0);

        let mut counts = BTreeMap::<i64, usize>::new();
        for value in ratings {
            *counts.entry(*value).or_default() += 1;
        }
        let mode_count = counts.values().copied().max().unwrap_or_default();
        let mode_agreement = mode_count as f64 / ratings.len() as f64;

        self.assemble(variance_agreement, range_agreement, mode_agreement)
    }

    pub fn classify(&self, composite: f64) -> AgreementLevel {
        if composite >= self.high_threshold {
            AgreementLevel::High
        } else if composite >= self.moderate_threshold {
            AgreementLevel::Moderate
        } else {
            AgreementLevel::Low
        }
    }

    fn assemble(
        &self,
        variance_agreement: f64,
        range_agreement: f64,
        mode_agreement: f64,
    ) -> AgreementResult {
        let raw_composite = VARIANCE_WEIGHT * variance_agreement
            + RANGE_WEIGHT * range_agreement
            + MODE_WEIGHT * mode_agreement;
        let composite = raw_composite * self.scale_factor;

        AgreementResult {
            variance_agreement,
            range_agreement,
            mode_agreement,
            raw_composite,
            composite,
            level: self.classify(composite),
        }
    }
}
