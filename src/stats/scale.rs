use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::stats::moments::{mean, percentile, sample_std_dev};

/// Closed ordinal rating scale `min..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrdinalScale {
    pub min: i64,
    pub max: i64,
}

impl Default for OrdinalScale {
    fn default() -> Self {
        Self { min: 1, max: 5 }
    }
}

impl OrdinalScale {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            min: config.scale_min,
            max: config.scale_max,
        }
    }

    pub fn values(&self) -> impl Iterator<Item = i64> {
        self.min..=self.max
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Converts a raw cell into a rating, rejecting non-integral values and
    /// values outside the scale. Nothing is clamped.
    pub fn rating(&self, value: f64, item: &str, rater: usize) -> AnalysisResult<i64> {
        let integral = value.is_finite() && value.fract() == 0.0;
        if integral && self.contains(value as i64) {
            return Ok(value as i64);
        }
        Err(self.invalid(value, item, rater))
    }

    pub fn check(&self, value: i64, item: &str, rater: usize) -> AnalysisResult<()> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(self.invalid(value as f64, item, rater))
        }
    }

    fn invalid(&self, value: f64, item: &str, rater: usize) -> AnalysisError {
        AnalysisError::InvalidScaleValue {
            value,
            item: item.to_string(),
            rater,
            min: self.min,
            max: self.max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueShare {
    pub value: i64,
    pub count: usize,
    pub percentage: f64,
}

/// Descriptive statistics of one rating column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleStatistics {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub mode: i64,
    pub min: i64,
    pub max: i64,
    pub range: i64,
    pub iqr: f64,
    /// Share of ratings at the mode, in percent.
    pub consensus_percentage: f64,
    pub distribution: Vec<ValueShare>,
}

impl ScaleStatistics {
    pub fn describe(label: &str, ratings: &[i64], scale: &OrdinalScale) -> AnalysisResult<Self> {
        if ratings.is_empty() {
            return Err(AnalysisError::insufficient(
                "scale statistics",
                "ratings",
                1,
                0,
            ));
        }
        for (rater, value) in ratings.iter().enumerate() {
            scale.check(*value, label, rater)?;
        }

        let count = ratings.len();
        let values = ratings.iter().map(|value| *value as f64).collect::<Vec<f64>>();
        let mut sorted = values.clone();
        sorted.sort_by(|left, right| left.total_cmp(right));

        let distribution = scale
            .values()
            .map(|value| {
                let hits = ratings.iter().filter(|rating| **rating == value).count();
                ValueShare {
                    value,
                    count: hits,
                    percentage: hits as f64 / count as f64 * 100.0,
                }
            })
            .collect::<Vec<ValueShare>>();

        // Ascending scan with strict `>` keeps the smallest value among ties.
        let mut mode = scale.min;
        let mut mode_count = 0usize;
        for share in &distribution {
            if share.count > mode_count {
                mode = share.value;
                mode_count = share.count;
            }
        }

        let min = ratings.iter().copied().min().unwrap_or(scale.min);
        let max = ratings.iter().copied().max().unwrap_or(scale.max);

        Ok(Self {
            count,
            mean: mean(&values),
            std_dev: sample_std_dev(&values),
            median: percentile(&sorted, 0.5),
            mode,
            min,
            max,
            range: max - min,
            iqr: percentile(&sorted, 0.75) - percentile(&sorted, 0.25),
            consensus_percentage: mode_count as f64 / count as f64 * 100.0,
            distribution,
        })
    }
}
