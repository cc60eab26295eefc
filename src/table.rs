use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::error::{AnalysisError, AnalysisResult};
use crate::model::{PairedSeries, RatingMatrix};
use crate::stats::OrdinalScale;

pub const DEFAULT_AUTOMATED_COLUMN: &str = "AI_Result";
pub const DEFAULT_HUMAN_COLUMN: &str = "Average_Developer_Result";
pub const DEFAULT_LABEL_COLUMN: &str = "Question";

/// Header names used to pick the paired columns out of a scores table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreColumns {
    pub automated: String,
    pub human: String,
    pub label: String,
}

impl Default for ScoreColumns {
    fn default() -> Self {
        Self {
            automated: DEFAULT_AUTOMATED_COLUMN.to_string(),
            human: DEFAULT_HUMAN_COLUMN.to_string(),
            label: DEFAULT_LABEL_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreTable {
    pub labels: Vec<String>,
    pub automated: Vec<f64>,
    pub human: Vec<f64>,
}

impl ScoreTable {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn series(&self) -> AnalysisResult<PairedSeries> {
        PairedSeries::new(self.automated.clone(), self.human.clone())
    }
}

pub fn read_survey(path: &Path, scale: OrdinalScale) -> Result<RatingMatrix> {
    let text = read_text(path)?;
    let matrix = parse_survey(&text, scale)
        .with_context(|| format!("failed to load survey table {}", path.display()))?;

    info!(
        path = %path.display(),
        raters = matrix.rater_count(),
        items = matrix.item_count(),
        "loaded survey table"
    );
    Ok(matrix)
}

/// Parses a tab-separated survey: a header of item labels followed by one
/// row of ratings per rater. Blank lines are skipped.
pub fn parse_survey(text: &str, scale: OrdinalScale) -> AnalysisResult<RatingMatrix> {
    let mut lines = data_lines(text);
    let Some(header) = lines.next() else {
        return Err(AnalysisError::validation("survey table", "missing header row"));
    };
    let labels = split_cells(header)
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<String>>();
    if let Some(position) = labels.iter().position(|label| label.is_empty()) {
        return Err(AnalysisError::validation(
            "survey table",
            format!("header column {position} has no item label"),
        ));
    }

    let mut rows = Vec::new();
    for (rater, line) in lines.enumerate() {
        let cells = split_cells(line);
        if cells.len() != labels.len() {
            return Err(AnalysisError::validation(
                "survey table",
                format!(
                    "rater row {rater} has {} cells but the header has {} items",
                    cells.len(),
                    labels.len()
                ),
            ));
        }
        let row = cells
            .iter()
            .zip(&labels)
            .map(|(cell, label)| parse_number(cell, "survey table", label, rater))
            .collect::<AnalysisResult<Vec<f64>>>()?;
        rows.push(row);
    }

    RatingMatrix::from_raw(labels, rows, scale)
}

pub fn read_scores(path: &Path, columns: &ScoreColumns) -> Result<ScoreTable> {
    let text = read_text(path)?;
    let table = parse_scores(&text, columns)
        .with_context(|| format!("failed to load scores table {}", path.display()))?;

    info!(
        path = %path.display(),
        samples = table.len(),
        automated = %columns.automated,
        human = %columns.human,
        "loaded scores table"
    );
    Ok(table)
}

/// Parses a tab-separated scores table and pulls the automated and human
/// columns by header name. Without a label column, rows are labelled by
/// their position.
pub fn parse_scores(text: &str, columns: &ScoreColumns) -> AnalysisResult<ScoreTable> {
    let mut lines = data_lines(text);
    let Some(header) = lines.next() else {
        return Err(AnalysisError::validation("scores table", "missing header row"));
    };
    let header = split_cells(header);
    let automated_at = column_position(&header, &columns.automated)?;
    let human_at = column_position(&header, &columns.human)?;
    let label_at = header.iter().position(|name| *name == columns.label);

    let mut table = ScoreTable {
        labels: Vec::new(),
        automated: Vec::new(),
        human: Vec::new(),
    };
    for (row, line) in lines.enumerate() {
        let cells = split_cells(line);
        let cell = |position: usize, name: &str| -> AnalysisResult<f64> {
            let raw = cells.get(position).copied().unwrap_or_default();
            parse_number(raw, "scores table", name, row)
        };
        table.automated.push(cell(automated_at, &columns.automated)?);
        table.human.push(cell(human_at, &columns.human)?);
        let label = label_at
            .and_then(|position| cells.get(position))
            .filter(|label| !label.is_empty())
            .map(|label| label.to_string())
            .unwrap_or_else(|| format!("row_{row}"));
        table.labels.push(label);
    }

    Ok(table)
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn data_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
}

fn split_cells(line: &str) -> Vec<&str> {
    line.split('\t').map(str::trim).collect()
}

fn column_position(header: &[&str], name: &str) -> AnalysisResult<usize> {
    header.iter().position(|column| *column == name).ok_or_else(|| {
        AnalysisError::validation(
            "scores table",
            format!("column {name} not found in header [{}]", header.join(", ")),
        )
    })
}

fn parse_number(cell: &str, table: &str, column: &str, row: usize) -> AnalysisResult<f64> {
    if cell.is_empty() {
        return Err(AnalysisError::validation(
            table,
            format!("row {row} column {column} is blank"),
        ));
    }
    cell.parse::<f64>().map_err(|_| {
        AnalysisError::validation(
            table,
            format!("row {row} column {column} is not a number: {cell:?}"),
        )
    })
}
