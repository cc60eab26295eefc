use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::table::{DEFAULT_AUTOMATED_COLUMN, DEFAULT_HUMAN_COLUMN, DEFAULT_LABEL_COLUMN, ScoreColumns};

#[derive(Parser, Debug)]
#[command(
    name = "rateragree",
    version,
    about = "Inter-rater reliability and automated-vs-human agreement analysis"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Corpus reliability coefficient and per-item agreement for a survey table.
    Reliability(ReliabilityArgs),
    /// Paired comparison of automated scores against the human aggregate.
    Compare(CompareArgs),
    /// Descriptive statistics for every survey item, grouped by metric.
    Describe(DescribeArgs),
    /// Print the effective analysis configuration as JSON.
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConfigSource {
    /// JSON file overriding the default calibration constants.
    #[arg(long)]
    pub config_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ReliabilityArgs {
    #[arg(long)]
    pub survey_path: PathBuf,

    #[command(flatten)]
    pub config: ConfigSource,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[arg(long)]
    pub scores_path: PathBuf,

    #[arg(long, default_value = DEFAULT_AUTOMATED_COLUMN)]
    pub automated_column: String,

    #[arg(long, default_value = DEFAULT_HUMAN_COLUMN)]
    pub human_column: String,

    #[arg(long, default_value = DEFAULT_LABEL_COLUMN)]
    pub label_column: String,

    /// Also compare each metric group parsed from the label column.
    #[arg(long, default_value_t = false)]
    pub by_metric: bool,

    #[command(flatten)]
    pub config: ConfigSource,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

impl CompareArgs {
    pub fn columns(&self) -> ScoreColumns {
        ScoreColumns {
            automated: self.automated_column.clone(),
            human: self.human_column.clone(),
            label: self.label_column.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DescribeArgs {
    #[arg(long)]
    pub survey_path: PathBuf,

    #[command(flatten)]
    pub config: ConfigSource,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub config: ConfigSource,
}
