use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::config::AnalysisConfig;

pub const UNGROUPED: &str = "ungrouped";

/// Item and metric indexes recovered from a label such as `Q12_3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LabelToken {
    pub item: u32,
    pub metric: u32,
}

/// Positions (in the original label order) that share a metric index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricGroup {
    pub metric: Option<u32>,
    pub name: String,
    pub positions: Vec<usize>,
}

impl MetricGroup {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Picks this group's entries out of a sequence aligned with the labels.
    pub fn select<T: Copy>(&self, values: &[T]) -> Vec<T> {
        self.positions
            .iter()
            .filter_map(|position| values.get(*position).copied())
            .collect()
    }
}

pub fn parse_label(pattern: &Regex, label: &str) -> Result<Option<LabelToken>> {
    let Some(captures) = pattern.captures(label.trim()) else {
        return Ok(None);
    };

    let item = captures
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or_default()
        .parse::<u32>()
        .with_context(|| format!("failed to parse item index from label {label}"))?;
    let metric = captures
        .get(2)
        .map(|m| m.as_str())
        .unwrap_or_default()
        .parse::<u32>()
        .with_context(|| format!("failed to parse metric index from label {label}"))?;

    Ok(Some(LabelToken { item, metric }))
}

/// Groups labels by metric index. Groups come out in metric order with
/// members in item order; labels the pattern does not recognise land in a
/// trailing `ungrouped` group in their original order.
pub fn group_by_metric<S: AsRef<str>>(
    labels: &[S],
    config: &AnalysisConfig,
) -> Result<Vec<MetricGroup>> {
    let pattern = config.label_regex()?;

    let mut by_metric = BTreeMap::<u32, Vec<(u32, usize)>>::new();
    let mut ungrouped = Vec::new();
    for (position, label) in labels.iter().enumerate() {
        match parse_label(&pattern, label.as_ref())? {
            Some(token) => by_metric
                .entry(token.metric)
                .or_default()
                .push((token.item, position)),
            None => ungrouped.push(position),
        }
    }

    let mut groups = by_metric
        .into_iter()
        .map(|(metric, mut members)| {
            members.sort();
            MetricGroup {
                metric: Some(metric),
                name: config.metric_name(metric),
                positions: members.into_iter().map(|(_, position)| position).collect(),
            }
        })
        .collect::<Vec<MetricGroup>>();

    if !ungrouped.is_empty() {
        groups.push(MetricGroup {
            metric: None,
            name: UNGROUPED.to_string(),
            positions: ungrouped,
        });
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::{LabelToken, UNGROUPED, group_by_metric, parse_label};
    use crate::config::AnalysisConfig;

    #[test]
    fn parses_item_and_metric() {
        let pattern = AnalysisConfig::default().label_regex().expect("pattern");
        assert_eq!(
            parse_label(&pattern, "Q12_3").expect("parse"),
            Some(LabelToken { item: 12, metric: 3 })
        );
        assert_eq!(parse_label(&pattern, "Q12").expect("parse"), None);
        assert_eq!(parse_label(&pattern, "notes").expect("parse"), None);
    }

    #[test]
    fn groups_follow_metric_then_item_order() {
        let labels = ["Q2_1", "Q1_2", "Q1_1", "Q10_1", "comment", "Q3_4"];
        let groups = group_by_metric(&labels, &AnalysisConfig::default()).expect("groups");

        let summary = groups
            .iter()
            .map(|group| (group.name.as_str(), group.positions.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                ("comprehensibility", vec![2, 0, 3]),
                ("completeness", vec![1]),
                ("metric_4", vec![5]),
                (UNGROUPED, vec![4]),
            ]
        );
        assert_eq!(groups[0].metric, Some(1));
        assert_eq!(groups[3].metric, None);
    }

    #[test]
    fn select_follows_group_positions() {
        let labels = ["Q1_2", "Q1_1", "Q2_2"];
        let groups = group_by_metric(&labels, &AnalysisConfig::default()).expect("groups");
        let scores = [0.5, 1.5, 2.5];
        assert_eq!(groups[0].select(&scores), vec![1.5]);
        assert_eq!(groups[1].select(&scores), vec![0.5, 2.5]);
    }

    #[test]
    fn custom_pattern_and_names() {
        let mut config = AnalysisConfig {
            label_pattern: r"^item-(\d+)-m(\d+)$".to_string(),
            ..AnalysisConfig::default()
        };
        config
            .metric_names
            .insert("7".to_string(), "fluency".to_string());

        let groups = group_by_metric(&["item-1-m7", "item-2-m7"], &config).expect("groups");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "fluency");
        assert_eq!(groups[0].len(), 2);
    }
}
