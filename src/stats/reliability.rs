use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::model::RatingMatrix;
use crate::stats::agreement::{AgreementLevel, AgreementResult, ItemAgreementScorer};
use crate::stats::moments::{mean, population_variance};
use crate::stats::scale::ScaleStatistics;

const MIN_RATERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReliabilityLevel {
    Acceptable,
    Tentative,
    Insufficient,
    /// Every pairable rating carries the same value, so there is no
    /// expected disagreement to compare against.
    Undefined,
}

impl fmt::Display for ReliabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Acceptable => "ACCEPTABLE",
            Self::Tentative => "TENTATIVE",
            Self::Insufficient => "INSUFFICIENT",
            Self::Undefined => "UNDEFINED",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemDiagnostics {
    pub index: usize,
    pub label: String,
    pub ratings: Vec<i64>,
    pub statistics: ScaleStatistics,
    pub agreement: AgreementResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandCount {
    pub level: AgreementLevel,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub rank: usize,
    pub index: usize,
    pub label: String,
    pub composite: f64,
}

/// Spread of composite agreement across items (population standard deviation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompositeSpread {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReliabilityReport {
    pub rater_count: usize,
    pub item_count: usize,
    /// `None` when the matrix holds a single distinct rating value.
    pub coefficient: Option<f64>,
    pub level: ReliabilityLevel,
    /// Per-item diagnostics in matrix column order.
    pub items: Vec<ItemDiagnostics>,
    pub bands: Vec<BandCount>,
    pub spread: CompositeSpread,
    /// Every item by composite agreement, best first; ties keep column order.
    pub ranking: Vec<RankedItem>,
    pub best: Vec<RankedItem>,
    /// Tail of `ranking`, still best first, so the last entry is the lowest.
    pub worst: Vec<RankedItem>,
}

impl ReliabilityReport {
    pub fn band(&self, level: AgreementLevel) -> Option<&BandCount> {
        self.bands.iter().find(|band| band.level == level)
    }
}

pub struct ReliabilityAggregator<'a> {
    config: &'a AnalysisConfig,
    scorer: ItemAgreementScorer,
}

impl<'a> ReliabilityAggregator<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self {
            config,
            scorer: ItemAgreementScorer::from_config(config),
        }
    }

    pub fn classify(&self, coefficient: f64) -> ReliabilityLevel {
        if coefficient >= self.config.reliability_acceptable {
            ReliabilityLevel::Acceptable
        } else if coefficient >= self.config.reliability_tentative {
            ReliabilityLevel::Tentative
        } else {
            ReliabilityLevel::Insufficient
        }
    }

    pub fn analyze(&self, matrix: &RatingMatrix) -> AnalysisResult<ReliabilityReport> {
        if matrix.rater_count() < MIN_RATERS {
            return Err(AnalysisError::insufficient(
                "corpus reliability",
                "raters",
                MIN_RATERS,
                matrix.rater_count(),
            ));
        }
        if matrix.item_count() == 0 {
            return Err(AnalysisError::insufficient(
                "corpus reliability",
                "items",
                1,
                0,
            ));
        }

        let coefficient = ordinal_alpha(matrix);
        let level = match coefficient {
            Some(value) => self.classify(value),
            None => ReliabilityLevel::Undefined,
        };
        match coefficient {
            Some(value) => debug!(coefficient = value, %level, "computed ordinal reliability"),
            None => warn!("every rating has the same value, ordinal reliability is undefined"),
        }

        let scale = matrix.scale();
        let items = matrix
            .items()
            .map(|item| {
                let statistics = ScaleStatistics::describe(&item.label, &item.ratings, &scale)?;
                let agreement = self.scorer.score(&item.ratings);
                Ok(ItemDiagnostics {
                    index: item.index,
                    label: item.label,
                    ratings: item.ratings,
                    statistics,
                    agreement,
                })
            })
            .collect::<AnalysisResult<Vec<ItemDiagnostics>>>()?;

        let ranking = rank_items(&items);
        let take = self.config.ranking_size.min(ranking.len());
        let best = ranking[..take].to_vec();
        let worst = ranking[ranking.len() - take..].to_vec();

        Ok(ReliabilityReport {
            rater_count: matrix.rater_count(),
            item_count: matrix.item_count(),
            coefficient,
            level,
            bands: band_counts(&items),
            spread: composite_spread(&items),
            items,
            ranking,
            best,
            worst,
        })
    }
}

/// Krippendorff's alpha with the ordinal difference function, computed from
/// the coincidence matrix of all pairable ratings. Each item is one unit and
/// each rater row one coder. `None` when the expected disagreement is zero,
/// which happens whenever fewer than two distinct values are pairable.
pub fn ordinal_alpha(matrix: &RatingMatrix) -> Option<f64> {
    let mut domain = matrix
        .rows()
        .iter()
        .flatten()
        .copied()
        .collect::<Vec<i64>>();
    domain.sort_unstable();
    domain.dedup();
    if domain.len() < 2 {
        return None;
    }
    let position = domain
        .iter()
        .enumerate()
        .map(|(index, value)| (*value, index))
        .collect::<BTreeMap<i64, usize>>();

    let k = domain.len();
    let mut coincidences = vec![vec![0.0_f64; k]; k];
    for unit in 0..matrix.item_count() {
        let mut counts = vec![0.0_f64; k];
        let mut pairable = 0usize;
        for row in matrix.rows() {
            if let Some(&slot) = position.get(&row[unit]) {
                counts[slot] += 1.0;
                pairable += 1;
            }
        }
        if pairable < 2 {
            continue;
        }
        let weight = 1.0 / (pairable - 1) as f64;
        for c in 0..k {
            if counts[c] == 0.0 {
                continue;
            }
            for j in 0..k {
                let partners = if c == j { counts[j] - 1.0 } else { counts[j] };
                coincidences[c][j] += counts[c] * partners * weight;
            }
        }
    }

    let marginals = coincidences
        .iter()
        .map(|row| row.iter().sum::<f64>())
        .collect::<Vec<f64>>();
    let total = marginals.iter().sum::<f64>();

    let mut observed = 0.0;
    let mut expected = 0.0;
    for c in 0..k {
        for j in 0..k {
            if c == j {
                continue;
            }
            let distance = ordinal_distance(&marginals, c, j);
            observed += coincidences[c][j] * distance;
            expected += marginals[c] * marginals[j] * distance;
        }
    }
    expected /= total - 1.0;

    if expected <= 0.0 {
        return None;
    }

    Some(1.0 - observed / expected)
}

// Squared ordinal distance: marginal mass between the two ranks, counting
// the endpoints half.
fn ordinal_distance(marginals: &[f64], c: usize, k: usize) -> f64 {
    let (low, high) = if c <= k { (c, k) } else { (k, c) };
    let between = marginals[low..=high].iter().sum::<f64>();
    let value = between - (marginals[low] + marginals[high]) / 2.0;
    value * value
}

fn rank_items(items: &[ItemDiagnostics]) -> Vec<RankedItem> {
    let mut order = items.iter().collect::<Vec<&ItemDiagnostics>>();
    order.sort_by(|left, right| {
        right
            .agreement
            .composite
            .total_cmp(&left.agreement.composite)
    });
    order
        .into_iter()
        .enumerate()
        .map(|(position, item)| RankedItem {
            rank: position + 1,
            index: item.index,
            label: item.label.clone(),
            composite: item.agreement.composite,
        })
        .collect()
}

fn band_counts(items: &[ItemDiagnostics]) -> Vec<BandCount> {
    AgreementLevel::ALL
        .iter()
        .map(|level| {
            let count = items
                .iter()
                .filter(|item| item.agreement.level == *level)
                .count();
            BandCount {
                level: *level,
                count,
                percentage: if items.is_empty() {
                    0.0
                } else {
                    count as f64 / items.len() as f64 * 100.0
                },
            }
        })
        .collect()
}

fn composite_spread(items: &[ItemDiagnostics]) -> CompositeSpread {
    let composites = items
        .iter()
        .map(|item| item.agreement.composite)
        .collect::<Vec<f64>>();
    CompositeSpread {
        mean: mean(&composites),
        min: composites.iter().copied().fold(f64::INFINITY, f64::min),
        max: composites.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        std_dev: population_variance(&composites).sqrt(),
    }
}
