use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::ReliabilityArgs;
use crate::commands::{load_config, write_report};
use crate::config::AnalysisConfig;
use crate::model::RatingMatrix;
use crate::stats::{AgreementLevel, OrdinalScale, ReliabilityAggregator, ReliabilityReport};
use crate::table::read_survey;

pub fn run(args: ReliabilityArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let matrix = read_survey(&args.survey_path, OrdinalScale::from_config(&config))?;

    let report = analyze(&matrix, &config)
        .with_context(|| format!("reliability analysis failed for {}", args.survey_path.display()))?;
    log_report(&report);

    if let Some(report_path) = &args.report_path {
        write_report(report_path, "reliability", &args.survey_path, &config, &report)?;
    }

    Ok(())
}

pub(crate) fn analyze(matrix: &RatingMatrix, config: &AnalysisConfig) -> Result<ReliabilityReport> {
    if matrix.rater_count() == 1 {
        warn!("a single rater row cannot measure agreement between raters");
    }
    Ok(ReliabilityAggregator::new(config).analyze(matrix)?)
}

fn log_report(report: &ReliabilityReport) {
    info!(
        raters = report.rater_count,
        items = report.item_count,
        coefficient = ?report.coefficient,
        level = %report.level,
        "corpus reliability"
    );

    for level in AgreementLevel::ALL {
        if let Some(band) = report.band(level) {
            info!(
                level = %level,
                items = band.count,
                percentage = band.percentage,
                "item agreement band"
            );
        }
    }
    info!(
        mean = report.spread.mean,
        min = report.spread.min,
        max = report.spread.max,
        std_dev = report.spread.std_dev,
        "composite agreement spread"
    );

    for ranked in &report.best {
        info!(rank = ranked.rank, item = %ranked.label, composite = ranked.composite, "highest agreement");
    }
    for ranked in &report.worst {
        info!(rank = ranked.rank, item = %ranked.label, composite = ranked.composite, "lowest agreement");
    }
}
