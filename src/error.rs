use thiserror::Error;

/// Failures raised by the analysis core.
///
/// All of them are deterministic data problems detected before any statistic
/// is computed; callers should surface them rather than retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error(
        "rating {value} for item {item} (rater row {rater}) is outside the ordinal scale {min}..={max} or not integral"
    )]
    InvalidScaleValue {
        value: f64,
        item: String,
        rater: usize,
        min: i64,
        max: i64,
    },

    #[error("insufficient data for {statistic}: need at least {required} {unit}, found {found}")]
    InsufficientData {
        statistic: &'static str,
        unit: &'static str,
        required: usize,
        found: usize,
    },

    #[error("invalid {series}: {reason}")]
    ValidationError { series: String, reason: String },
}

impl AnalysisError {
    pub fn validation(series: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationError {
            series: series.into(),
            reason: reason.into(),
        }
    }

    pub fn insufficient(
        statistic: &'static str,
        unit: &'static str,
        required: usize,
        found: usize,
    ) -> Self {
        Self::InsufficientData {
            statistic,
            unit,
            required,
            found,
        }
    }
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::AnalysisError;

    #[test]
    fn invalid_scale_value_message_names_item_and_rater() {
        let err = AnalysisError::InvalidScaleValue {
            value: 6.0,
            item: "Q3_2".to_string(),
            rater: 4,
            min: 1,
            max: 5,
        };
        let message = err.to_string();
        assert!(message.contains("Q3_2"));
        assert!(message.contains("rater row 4"));
        assert!(message.contains("1..=5"));
    }

    #[test]
    fn insufficient_data_message_reports_counts() {
        let err = AnalysisError::insufficient("corpus reliability", "raters", 2, 1);
        assert_eq!(
            err.to_string(),
            "insufficient data for corpus reliability: need at least 2 raters, found 1"
        );
    }
}
