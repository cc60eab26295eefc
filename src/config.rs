use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_LABEL_PATTERN: &str = r"^Q(\d+)_(\d+)$";

/// Calibration constants and thresholds shared by every analysis.
///
/// The defaults are the empirically chosen values the survey tooling has
/// always used; they are kept configurable instead of re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub scale_min: i64,
    pub scale_max: i64,
    pub variance_ceiling: f64,
    pub range_ceiling: f64,
    pub composite_scale_factor: f64,
    pub high_threshold: f64,
    pub moderate_threshold: f64,
    pub reliability_acceptable: f64,
    pub reliability_tentative: f64,
    pub significance_level: f64,
    pub ci_z_critical: f64,
    pub label_pattern: String,
    pub metric_names: BTreeMap<String, String>,
    pub exact_agreement_tolerance: f64,
    pub close_agreement_tolerance: f64,
    pub ranking_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let metric_names = [
            ("1", "comprehensibility"),
            ("2", "completeness"),
            ("3", "alignment"),
        ]
        .into_iter()
        .map(|(key, name)| (key.to_string(), name.to_string()))
        .collect();

        Self {
            scale_min: 1,
            scale_max: 5,
            variance_ceiling: 2.0,
            range_ceiling: 4.0,
            composite_scale_factor: 0.9,
            high_threshold: 0.700,
            moderate_threshold: 0.500,
            reliability_acceptable: 0.800,
            reliability_tentative: 0.667,
            significance_level: 0.05,
            ci_z_critical: 1.96,
            label_pattern: DEFAULT_LABEL_PATTERN.to_string(),
            metric_names,
            exact_agreement_tolerance: 0.1,
            close_agreement_tolerance: 0.5,
            ranking_size: 5,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;

        info!(path = %path.display(), "loaded analysis config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scale_min >= self.scale_max {
            bail!(
                "scale_min ({}) must be below scale_max ({})",
                self.scale_min,
                self.scale_max
            );
        }
        for (name, value) in [
            ("variance_ceiling", self.variance_ceiling),
            ("range_ceiling", self.range_ceiling),
            ("ci_z_critical", self.ci_z_critical),
        ] {
            if !(value.is_finite() && value > 0.0) {
                bail!("{name} must be a positive number, got {value}");
            }
        }
        if !(self.composite_scale_factor > 0.0 && self.composite_scale_factor <= 1.0) {
            bail!(
                "composite_scale_factor must be in (0, 1], got {}",
                self.composite_scale_factor
            );
        }
        if self.moderate_threshold > self.high_threshold {
            bail!(
                "moderate_threshold ({}) exceeds high_threshold ({})",
                self.moderate_threshold,
                self.high_threshold
            );
        }
        if self.reliability_tentative > self.reliability_acceptable {
            bail!(
                "reliability_tentative ({}) exceeds reliability_acceptable ({})",
                self.reliability_tentative,
                self.reliability_acceptable
            );
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            bail!(
                "significance_level must be in (0, 1), got {}",
                self.significance_level
            );
        }
        if self.exact_agreement_tolerance < 0.0 || self.close_agreement_tolerance < 0.0 {
            bail!("agreement tolerances must not be negative");
        }
        let pattern = self.label_regex()?;
        if pattern.captures_len() < 3 {
            bail!(
                "label_pattern must capture item and metric indexes: {}",
                self.label_pattern
            );
        }
        Ok(())
    }

    pub fn label_regex(&self) -> Result<Regex> {
        Regex::new(&self.label_pattern)
            .with_context(|| format!("failed to compile label_pattern {}", self.label_pattern))
    }

    pub fn metric_name(&self, metric: u32) -> String {
        self.metric_names
            .get(&metric.to_string())
            .cloned()
            .unwrap_or_else(|| format!("metric_{metric}"))
    }
}
