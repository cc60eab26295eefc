use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::stats::OrdinalScale;

pub const MANIFEST_VERSION: u32 = 1;

/// One rating item (survey column) and the ratings every rater gave it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingItem {
    pub index: usize,
    pub label: String,
    pub ratings: Vec<i64>,
}

/// Raters × items matrix of ordinal ratings. Rows are raters, columns are
/// items; every row has one rating per item label.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingMatrix {
    labels: Vec<String>,
    rows: Vec<Vec<i64>>,
    scale: OrdinalScale,
}

impl RatingMatrix {
    pub fn new(labels: Vec<String>, rows: Vec<Vec<i64>>, scale: OrdinalScale) -> AnalysisResult<Self> {
        for (rater, row) in rows.iter().enumerate() {
            ensure_row_width(rater, row.len(), labels.len())?;
            for (value, label) in row.iter().zip(&labels) {
                scale.check(*value, label, rater)?;
            }
        }
        Ok(Self {
            labels,
            rows,
            scale,
        })
    }

    /// Builds the matrix from decoded numeric cells, rejecting any value that
    /// is non-integral or outside the scale at the first occurrence.
    pub fn from_raw(labels: Vec<String>, raw_rows: Vec<Vec<f64>>, scale: OrdinalScale) -> AnalysisResult<Self> {
        let mut rows = Vec::with_capacity(raw_rows.len());
        for (rater, raw) in raw_rows.iter().enumerate() {
            ensure_row_width(rater, raw.len(), labels.len())?;
            let row = raw
                .iter()
                .zip(&labels)
                .map(|(value, label)| scale.rating(*value, label, rater))
                .collect::<AnalysisResult<Vec<i64>>>()?;
            rows.push(row);
        }
        Self::new(labels, rows, scale)
    }

    pub fn rater_count(&self) -> usize {
        self.rows.len()
    }

    pub fn item_count(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn rows(&self) -> &[Vec<i64>] {
        &self.rows
    }

    pub fn scale(&self) -> OrdinalScale {
        self.scale
    }

    pub fn item(&self, index: usize) -> Option<RatingItem> {
        let label = self.labels.get(index)?;
        Some(RatingItem {
            index,
            label: label.clone(),
            ratings: self.rows.iter().map(|row| row[index]).collect(),
        })
    }

    pub fn items(&self) -> impl Iterator<Item = RatingItem> + '_ {
        (0..self.item_count()).filter_map(|index| self.item(index))
    }
}

fn ensure_row_width(rater: usize, width: usize, expected: usize) -> AnalysisResult<()> {
    if width == expected {
        return Ok(());
    }
    Err(AnalysisError::validation(
        "rating matrix",
        format!("rater row {rater} has {width} ratings but there are {expected} items"),
    ))
}

/// Automated and human-aggregate scores for the same samples, in sample order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedSeries {
    automated: Vec<f64>,
    human: Vec<f64>,
}

impl PairedSeries {
    pub const MIN_OBSERVATIONS: usize = 2;

    pub fn new(automated: Vec<f64>, human: Vec<f64>) -> AnalysisResult<Self> {
        if automated.len() != human.len() {
            return Err(AnalysisError::validation(
                "paired series",
                format!(
                    "automated has {} scores but human has {}",
                    automated.len(),
                    human.len()
                ),
            ));
        }
        ensure_finite("automated series", &automated)?;
        ensure_finite("human series", &human)?;
        if automated.len() < Self::MIN_OBSERVATIONS {
            return Err(AnalysisError::insufficient(
                "paired comparison",
                "observations",
                Self::MIN_OBSERVATIONS,
                automated.len(),
            ));
        }
        Ok(Self { automated, human })
    }

    pub fn len(&self) -> usize {
        self.automated.len()
    }

    pub fn automated(&self) -> &[f64] {
        &self.automated
    }

    pub fn human(&self) -> &[f64] {
        &self.human
    }

    /// Element-wise `automated - human`.
    pub fn differences(&self) -> Vec<f64> {
        self.automated
            .iter()
            .zip(&self.human)
            .map(|(automated, human)| automated - human)
            .collect()
    }
}

fn ensure_finite(series: &str, values: &[f64]) -> AnalysisResult<()> {
    match values.iter().position(|value| !value.is_finite()) {
        None => Ok(()),
        Some(index) => Err(AnalysisError::validation(
            series,
            format!("entry {index} is {}, scores must be finite", values[index]),
        )),
    }
}

/// Envelope written around every JSON artifact.
#[derive(Debug, Serialize)]
pub struct AnalysisManifest<'a, T: Serialize> {
    pub manifest_version: u32,
    pub generated_at: String,
    pub command: &'static str,
    pub source_path: String,
    pub source_sha256: String,
    pub config: &'a AnalysisConfig,
    pub result: T,
}

#[cfg(test)]
mod tests {
    use super::{PairedSeries, RatingMatrix};
    use crate::error::AnalysisError;
    use crate::stats::OrdinalScale;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn items_are_columns_across_raters() {
        let matrix = RatingMatrix::new(
            labels(&["Q1_1", "Q1_2"]),
            vec![vec![5, 2], vec![4, 2], vec![5, 3]],
            OrdinalScale::default(),
        )
        .expect("valid matrix");

        assert_eq!(matrix.rater_count(), 3);
        assert_eq!(matrix.item_count(), 2);
        let second = matrix.item(1).expect("second item");
        assert_eq!(second.label, "Q1_2");
        assert_eq!(second.ratings, vec![2, 2, 3]);
        assert_eq!(matrix.items().count(), 2);
        assert!(matrix.item(2).is_none());
    }

    #[test]
    fn ragged_row_is_a_validation_error() {
        let err = RatingMatrix::new(
            labels(&["Q1_1", "Q1_2"]),
            vec![vec![5, 2], vec![4]],
            OrdinalScale::default(),
        )
        .expect_err("second row is short");
        assert!(matches!(err, AnalysisError::ValidationError { .. }));
    }

    #[test]
    fn raw_cells_reject_fractional_ratings() {
        let err = RatingMatrix::from_raw(
            labels(&["Q1_1", "Q2_1"]),
            vec![vec![3.0, 4.0], vec![2.0, 4.5]],
            OrdinalScale::default(),
        )
        .expect_err("4.5 is not an ordinal rating");
        assert_eq!(
            err,
            AnalysisError::InvalidScaleValue {
                value: 4.5,
                item: "Q2_1".to_string(),
                rater: 1,
                min: 1,
                max: 5,
            }
        );
    }

    #[test]
    fn paired_series_rejects_mismatched_lengths_first() {
        let err = PairedSeries::new(vec![1.0], vec![1.0, f64::NAN]).expect_err("length mismatch");
        assert!(matches!(err, AnalysisError::ValidationError { .. }));
    }

    #[test]
    fn paired_series_rejects_non_finite_scores() {
        let err = PairedSeries::new(vec![1.0, f64::INFINITY], vec![1.0, 2.0])
            .expect_err("infinite score");
        assert!(
            matches!(err, AnalysisError::ValidationError { ref series, .. } if series == "automated series")
        );

        let err =
            PairedSeries::new(vec![1.0, 2.0], vec![f64::NAN, 2.0]).expect_err("NaN score");
        assert!(
            matches!(err, AnalysisError::ValidationError { ref series, .. } if series == "human series")
        );
    }

    #[test]
    fn paired_series_needs_two_observations() {
        let err = PairedSeries::new(vec![3.0], vec![3.0]).expect_err("single observation");
        assert!(matches!(
            err,
            AnalysisError::InsufficientData {
                required: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn differences_are_automated_minus_human() {
        let series = PairedSeries::new(vec![3.0, 4.0], vec![2.0, 5.0]).expect("valid series");
        assert_eq!(series.differences(), vec![1.0, -1.0]);
    }
}
