//! Numeric core: scale statistics, item agreement, corpus reliability and
//! paired comparison of an automated rater against a human baseline.
//!
//! Everything in here is a pure, synchronous transform over in-memory
//! slices. Input validation happens at construction of [`RatingMatrix`] /
//! [`PairedSeries`] or at component entry, before any statistic is computed.
//!
//! [`RatingMatrix`]: crate::model::RatingMatrix
//! [`PairedSeries`]: crate::model::PairedSeries

pub mod agreement;
pub mod moments;
pub mod paired;
pub mod rank;
pub mod reliability;
pub mod scale;

pub use agreement::AgreementLevel;
pub use paired::{ComparisonResult, PairedComparisonAnalyzer};
pub use reliability::{ReliabilityAggregator, ReliabilityLevel, ReliabilityReport};
pub use scale::{OrdinalScale, ScaleStatistics};
