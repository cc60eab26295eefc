use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use serde_json::Value;

use super::{compare, describe, reliability};
use crate::cli::{CompareArgs, ConfigSource, DescribeArgs, ReliabilityArgs};
use crate::config::AnalysisConfig;
use crate::stats::{AgreementLevel, OrdinalScale, ReliabilityLevel};
use crate::table::{ScoreColumns, parse_scores, parse_survey};

const SURVEY: &str = "Q1_1\tQ2_1\tQ1_2\tQ2_2\n\
                      5\t4\t2\t3\n\
                      5\t4\t2\t3\n\
                      5\t3\t2\t3\n\
                      4\t4\t2\t3\n";

const SCORES: &str = "Question\tAI_Result\tAverage_Developer_Result\n\
                      Q1_1\t4.0\t4.2\n\
                      Q2_1\t3.0\t2.8\n\
                      Q3_1\t5.0\t4.6\n\
                      Q4_1\t2.0\t2.4\n\
                      Q1_2\t3.5\t3.0\n\
                      Q2_2\t4.5\t4.0\n\
                      Q1_3\t3.0\t3.0\n\
                      notes\t1.0\t1.5\n";

fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn read_json(path: &Path) -> Value {
    let raw = fs::read_to_string(path).expect("read report");
    serde_json::from_str(&raw).expect("report is json")
}

fn no_config() -> ConfigSource {
    ConfigSource { config_path: None }
}

#[test]
fn reliability_report_on_consistent_survey() {
    let config = AnalysisConfig::default();
    let matrix = parse_survey(SURVEY, OrdinalScale::from_config(&config)).expect("survey");
    let report = reliability::analyze(&matrix, &config).expect("report");

    assert_eq!(report.rater_count, 4);
    assert_eq!(report.item_count, 4);
    let alpha = report.coefficient.expect("ratings vary");
    assert!(alpha > 0.8, "alpha = {alpha}");
    assert_eq!(report.level, ReliabilityLevel::Acceptable);
    assert_eq!(report.band(AgreementLevel::High).map(|band| band.count), Some(4));
    assert_eq!(report.items[2].agreement.raw_composite, 1.0);
}

#[test]
fn reliability_command_writes_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let survey_path = write_fixture(dir.path(), "survey.tsv", SURVEY);
    let report_path = dir.path().join("out").join("reliability.json");

    reliability::run(ReliabilityArgs {
        survey_path: survey_path.clone(),
        config: no_config(),
        report_path: Some(report_path.clone()),
    })
    .expect("reliability run");

    let manifest = read_json(&report_path);
    assert_eq!(manifest["manifest_version"], 1);
    assert_eq!(manifest["command"], "reliability");
    assert_eq!(manifest["source_path"], survey_path.display().to_string());
    assert_eq!(manifest["source_sha256"].as_str().map(str::len), Some(64));
    assert_eq!(manifest["config"]["scale_max"], 5);
    assert_eq!(manifest["result"]["level"], "ACCEPTABLE");
    assert_eq!(manifest["result"]["items"].as_array().map(Vec::len), Some(4));
}

#[test]
fn reliability_command_reports_unanimous_survey_as_undefined() {
    let dir = tempfile::tempdir().expect("tempdir");
    let survey_path = write_fixture(dir.path(), "survey.tsv", "Q1_1\n5\n5\n5\n");
    let report_path = dir.path().join("reliability.json");

    reliability::run(ReliabilityArgs {
        survey_path,
        config: no_config(),
        report_path: Some(report_path.clone()),
    })
    .expect("unanimous survey still reports");

    let manifest = read_json(&report_path);
    assert!(manifest["result"]["coefficient"].is_null());
    assert_eq!(manifest["result"]["level"], "UNDEFINED");
    assert_eq!(manifest["result"]["items"][0]["agreement"]["raw_composite"], 1.0);
}

#[test]
fn reliability_command_rejects_single_rater() {
    let dir = tempfile::tempdir().expect("tempdir");
    let survey_path = write_fixture(dir.path(), "survey.tsv", "Q1_1\tQ2_1\n4\t5\n");

    let err = reliability::run(ReliabilityArgs {
        survey_path,
        config: no_config(),
        report_path: None,
    })
    .expect_err("one rater");
    assert!(format!("{err:#}").contains("insufficient data"));
}

#[test]
fn reliability_command_surfaces_scale_violations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let survey_path = write_fixture(dir.path(), "survey.tsv", "Q1_1\n4\n7\n");

    let err = reliability::run(ReliabilityArgs {
        survey_path,
        config: no_config(),
        report_path: None,
    })
    .expect_err("7 is off scale");
    let message = format!("{err:#}");
    assert!(message.contains("Q1_1"), "{message}");
    assert!(message.contains("rater row 1"), "{message}");
}

#[test]
fn compare_groups_by_metric_and_skips_small_groups() {
    let config = AnalysisConfig::default();
    let table = parse_scores(SCORES, &ScoreColumns::default()).expect("scores");
    let report = compare::analyze(&table, &config, true).expect("comparison");

    assert_eq!(report.overall.observations, 8);
    let names = report
        .by_metric
        .iter()
        .map(|group| group.name.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(names, vec!["comprehensibility", "completeness"]);
    assert_eq!(report.skipped_groups, vec!["alignment", "ungrouped"]);

    let comprehensibility = &report.by_metric[0];
    assert_eq!(comprehensibility.labels, vec!["Q1_1", "Q2_1", "Q3_1", "Q4_1"]);
    assert_relative_eq!(comprehensibility.comparison.correlation, 1.0);
    assert_eq!(report.by_metric[1].comparison.observations, 2);
    assert_eq!(report.by_metric[1].comparison.correlation_p_value, 1.0);
}

#[test]
fn compare_without_grouping_reports_overall_only() {
    let table = parse_scores(SCORES, &ScoreColumns::default()).expect("scores");
    let report = compare::analyze(&table, &AnalysisConfig::default(), false).expect("comparison");
    assert!(report.by_metric.is_empty());
    assert!(report.skipped_groups.is_empty());

    let json = serde_json::to_value(&report).expect("serialize");
    assert!(json.get("by_metric").is_none());
    assert!(json["overall"]["interpretation"].is_string());
}

#[test]
fn compare_command_writes_manifest_with_custom_columns() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scores_path = write_fixture(
        dir.path(),
        "scores.tsv",
        "id\tmodel\tpanel\na\t1\t1.5\nb\t2\t2\nc\t4\t3.5\nd\t5\t4.5\n",
    );
    let report_path = dir.path().join("compare.json");

    compare::run(CompareArgs {
        scores_path,
        automated_column: "model".to_string(),
        human_column: "panel".to_string(),
        label_column: "id".to_string(),
        by_metric: false,
        config: no_config(),
        report_path: Some(report_path.clone()),
    })
    .expect("compare run");

    let manifest = read_json(&report_path);
    assert_eq!(manifest["command"], "compare");
    assert_eq!(manifest["result"]["overall"]["observations"], 4);
    assert_eq!(manifest["result"]["overall"]["correlation"], 1.0);
}

#[test]
fn compare_command_rejects_mismatched_series() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scores_path = write_fixture(
        dir.path(),
        "scores.tsv",
        "AI_Result\tAverage_Developer_Result\n3\t3\n",
    );

    let err = compare::run(CompareArgs {
        scores_path,
        automated_column: "AI_Result".to_string(),
        human_column: "Average_Developer_Result".to_string(),
        label_column: "Question".to_string(),
        by_metric: false,
        config: no_config(),
        report_path: None,
    })
    .expect_err("a single sample");
    assert!(format!("{err:#}").contains("insufficient data"));
}

#[test]
fn describe_groups_items_by_metric() {
    let config = AnalysisConfig::default();
    let matrix = parse_survey(SURVEY, OrdinalScale::from_config(&config)).expect("survey");
    let report = describe::describe(&matrix, &config).expect("describe");

    assert_eq!(report.metrics.len(), 2);
    let first = &report.metrics[0];
    assert_eq!(first.name, "comprehensibility");
    let labels = first
        .items
        .iter()
        .map(|item| item.label.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(labels, vec!["Q1_1", "Q2_1"]);
    assert_relative_eq!(first.mean_of_means, (4.75 + 3.75) / 2.0);
    assert_relative_eq!(first.mean_consensus_percentage, 75.0);

    // Both items have a standard deviation of 0.5, so item order decides.
    assert_eq!(first.most_variable, vec!["Q1_1", "Q2_1"]);
    assert_eq!(first.least_variable, vec!["Q1_1", "Q2_1"]);

    let second = &report.metrics[1];
    assert_eq!(second.mean_std_dev, 0.0);
    assert_relative_eq!(second.mean_consensus_percentage, 100.0);
}

#[test]
fn describe_ranks_items_by_spread_within_metric() {
    let survey = "Q1_1\tQ2_1\tQ3_1\tQ4_1\tQ5_1\tQ1_2\n\
                  5\t1\t3\t2\t4\t3\n\
                  5\t5\t4\t2\t4\t1\n\
                  5\t1\t3\t2\t4\t3\n\
                  5\t5\t4\t3\t4\t1\n";
    let config = AnalysisConfig {
        ranking_size: 3,
        ..AnalysisConfig::default()
    };
    let matrix = parse_survey(survey, OrdinalScale::from_config(&config)).expect("survey");
    let report = describe::describe(&matrix, &config).expect("describe");

    let first = &report.metrics[0];
    assert_eq!(first.items.len(), 5);
    assert_eq!(first.most_variable, vec!["Q2_1", "Q3_1", "Q4_1"]);
    assert_eq!(first.least_variable, vec!["Q1_1", "Q5_1", "Q4_1"]);

    let second = &report.metrics[1];
    assert_eq!(second.most_variable, vec!["Q1_2"]);
    assert_eq!(second.least_variable, vec!["Q1_2"]);
}

#[test]
fn describe_command_honours_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let survey_path = write_fixture(dir.path(), "survey.tsv", SURVEY);
    let config_path = write_fixture(
        dir.path(),
        "config.json",
        r#"{ "metric_names": { "1": "clarity", "2": "coverage" } }"#,
    );
    let report_path = dir.path().join("describe.json");

    describe::run(DescribeArgs {
        survey_path,
        config: ConfigSource {
            config_path: Some(config_path),
        },
        report_path: Some(report_path.clone()),
    })
    .expect("describe run");

    let manifest = read_json(&report_path);
    assert_eq!(manifest["result"]["metrics"][0]["name"], "clarity");
    assert_eq!(manifest["result"]["metrics"][1]["name"], "coverage");
    assert_eq!(
        manifest["result"]["metrics"][0]["most_variable"],
        serde_json::json!(["Q1_1", "Q2_1"])
    );
    assert_eq!(manifest["config"]["metric_names"]["1"], "clarity");
}

#[test]
fn invalid_config_file_fails_before_loading_data() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = write_fixture(dir.path(), "config.json", r#"{ "scale_min": 5 }"#);

    let err = describe::run(DescribeArgs {
        survey_path: dir.path().join("missing.tsv"),
        config: ConfigSource {
            config_path: Some(config_path),
        },
        report_path: None,
    })
    .expect_err("scale_min equals scale_max");
    assert!(format!("{err:#}").contains("scale_min"));
}
