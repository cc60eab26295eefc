use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::CompareArgs;
use crate::commands::{load_config, write_report};
use crate::config::AnalysisConfig;
use crate::grouping::group_by_metric;
use crate::model::PairedSeries;
use crate::stats::{ComparisonResult, PairedComparisonAnalyzer};
use crate::table::{ScoreTable, read_scores};

#[derive(Debug, Clone, Serialize)]
pub struct MetricComparison {
    pub metric: Option<u32>,
    pub name: String,
    pub labels: Vec<String>,
    pub comparison: ComparisonResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub overall: ComparisonResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub by_metric: Vec<MetricComparison>,
    /// Metric groups left out for having fewer than two samples.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_groups: Vec<String>,
}

pub fn run(args: CompareArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let table = read_scores(&args.scores_path, &args.columns())?;

    let report = analyze(&table, &config, args.by_metric)
        .with_context(|| format!("paired comparison failed for {}", args.scores_path.display()))?;

    log_comparison("all", &report.overall);
    for group in &report.by_metric {
        log_comparison(&group.name, &group.comparison);
    }

    if let Some(report_path) = &args.report_path {
        write_report(report_path, "compare", &args.scores_path, &config, &report)?;
    }

    Ok(())
}

pub(crate) fn analyze(
    table: &ScoreTable,
    config: &AnalysisConfig,
    by_metric: bool,
) -> Result<ComparisonReport> {
    let analyzer = PairedComparisonAnalyzer::from_config(config);
    let overall = analyzer.compare(&table.series()?);

    let mut report = ComparisonReport {
        overall,
        by_metric: Vec::new(),
        skipped_groups: Vec::new(),
    };
    if !by_metric {
        return Ok(report);
    }

    for group in group_by_metric(&table.labels, config)? {
        if group.len() < PairedSeries::MIN_OBSERVATIONS {
            warn!(
                metric = %group.name,
                samples = group.len(),
                "skipping metric group with too few samples"
            );
            report.skipped_groups.push(group.name);
            continue;
        }

        let comparison = analyzer
            .compare_scores(group.select(&table.automated), group.select(&table.human))
            .with_context(|| format!("invalid scores in metric group {}", group.name))?;
        let labels = group
            .positions
            .iter()
            .map(|position| table.labels[*position].clone())
            .collect();

        report.by_metric.push(MetricComparison {
            metric: group.metric,
            name: group.name,
            labels,
            comparison,
        });
    }

    Ok(report)
}

fn log_comparison(scope: &str, result: &ComparisonResult) {
    if !result.correlation_defined {
        warn!(
            scope,
            "one series is constant, rank correlation reported as 0 with p = 1"
        );
    }

    info!(
        scope,
        samples = result.observations,
        correlation = result.correlation,
        p_value = result.correlation_p_value,
        interpretation = %result.interpretation,
        significant = result.significant,
        "rank correlation"
    );

    match &result.confidence_interval {
        Some(interval) => info!(
            scope,
            lower = interval.lower,
            upper = interval.upper,
            "correlation confidence interval"
        ),
        None => warn!(
            scope,
            samples = result.observations,
            "too few samples for a correlation confidence interval"
        ),
    }

    match (result.t_statistic, result.t_p_value) {
        (Some(t), Some(p)) => info!(
            scope,
            t_statistic = t,
            p_value = p,
            mean_difference = result.mean_difference,
            effect_size = ?result.effect_size,
            bias = ?result.bias,
            "paired difference"
        ),
        _ => warn!(
            scope,
            mean_difference = result.mean_difference,
            bias = ?result.bias,
            "every sample differs by the same amount, treating the shift as certain"
        ),
    }

    info!(
        scope,
        mean_abs_difference = result.agreement.mean_abs_difference,
        exact = result.agreement.exact_agreement_count,
        close = result.agreement.close_agreement_count,
        total = result.agreement.total_comparisons,
        "score agreement"
    );
}
