use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::DescribeArgs;
use crate::commands::{load_config, write_report};
use crate::config::AnalysisConfig;
use crate::grouping::group_by_metric;
use crate::model::RatingMatrix;
use crate::stats::{OrdinalScale, ScaleStatistics};
use crate::stats::moments::mean;
use crate::table::read_survey;

#[derive(Debug, Clone, Serialize)]
pub struct ItemDescription {
    pub index: usize,
    pub label: String,
    pub statistics: ScaleStatistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricDescription {
    pub metric: Option<u32>,
    pub name: String,
    pub items: Vec<ItemDescription>,
    pub mean_of_means: f64,
    pub mean_std_dev: f64,
    pub mean_consensus_percentage: f64,
    /// Up to `ranking_size` labels by standard deviation, highest first.
    /// Ties keep item order.
    pub most_variable: Vec<String>,
    /// Same length as `most_variable`, lowest standard deviation first.
    pub least_variable: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DescribeReport {
    pub rater_count: usize,
    pub item_count: usize,
    pub metrics: Vec<MetricDescription>,
}

pub fn run(args: DescribeArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let matrix = read_survey(&args.survey_path, OrdinalScale::from_config(&config))?;

    let report = describe(&matrix, &config)
        .with_context(|| format!("failed to describe {}", args.survey_path.display()))?;

    for metric in &report.metrics {
        info!(
            metric = %metric.name,
            items = metric.items.len(),
            mean = metric.mean_of_means,
            std_dev = metric.mean_std_dev,
            consensus = metric.mean_consensus_percentage,
            "metric summary"
        );
        info!(
            metric = %metric.name,
            most_variable = ?metric.most_variable,
            least_variable = ?metric.least_variable,
            "metric variability"
        );
        for item in &metric.items {
            debug!(
                item = %item.label,
                mean = item.statistics.mean,
                median = item.statistics.median,
                mode = item.statistics.mode,
                range = item.statistics.range,
                "item statistics"
            );
        }
    }

    if let Some(report_path) = &args.report_path {
        write_report(report_path, "describe", &args.survey_path, &config, &report)?;
    }

    Ok(())
}

pub(crate) fn describe(matrix: &RatingMatrix, config: &AnalysisConfig) -> Result<DescribeReport> {
    if matrix.rater_count() == 1 {
        warn!("single rater row, every item has zero spread");
    }

    let scale = matrix.scale();
    let mut metrics = Vec::new();
    for group in group_by_metric(matrix.labels(), config)? {
        let items = group
            .positions
            .iter()
            .filter_map(|position| matrix.item(*position))
            .map(|item| {
                let statistics = ScaleStatistics::describe(&item.label, &item.ratings, &scale)?;
                Ok(ItemDescription {
                    index: item.index,
                    label: item.label,
                    statistics,
                })
            })
            .collect::<Result<Vec<ItemDescription>>>()?;

        let take = config.ranking_size.min(items.len());
        metrics.push(MetricDescription {
            metric: group.metric,
            mean_of_means: mean_of(&items, |stats| stats.mean),
            mean_std_dev: mean_of(&items, |stats| stats.std_dev),
            mean_consensus_percentage: mean_of(&items, |stats| stats.consensus_percentage),
            most_variable: by_spread(&items, take, true),
            least_variable: by_spread(&items, take, false),
            name: group.name,
            items,
        });
    }

    Ok(DescribeReport {
        rater_count: matrix.rater_count(),
        item_count: matrix.item_count(),
        metrics,
    })
}

fn mean_of(items: &[ItemDescription], field: fn(&ScaleStatistics) -> f64) -> f64 {
    mean(&items.iter().map(|item| field(&item.statistics)).collect::<Vec<f64>>())
}

fn by_spread(items: &[ItemDescription], take: usize, descending: bool) -> Vec<String> {
    let mut ordered = items.iter().collect::<Vec<&ItemDescription>>();
    if descending {
        ordered.sort_by(|a, b| b.statistics.std_dev.total_cmp(&a.statistics.std_dev));
    } else {
        ordered.sort_by(|a, b| a.statistics.std_dev.total_cmp(&b.statistics.std_dev));
    }
    ordered
        .into_iter()
        .take(take)
        .map(|item| item.label.clone())
        .collect()
}
