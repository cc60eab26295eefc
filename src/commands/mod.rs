pub mod compare;
pub mod config;
pub mod describe;
pub mod reliability;

#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::ConfigSource;
use crate::config::AnalysisConfig;
use crate::model::{AnalysisManifest, MANIFEST_VERSION};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub(crate) fn load_config(source: &ConfigSource) -> Result<AnalysisConfig> {
    AnalysisConfig::load(source.config_path.as_deref())
}

/// Wraps `result` in a manifest tied to the source table it was computed from.
pub(crate) fn write_report<T: Serialize>(
    report_path: &Path,
    command: &'static str,
    source_path: &Path,
    config: &AnalysisConfig,
    result: T,
) -> Result<()> {
    let manifest = AnalysisManifest {
        manifest_version: MANIFEST_VERSION,
        generated_at: now_utc_string(),
        command,
        source_path: source_path.display().to_string(),
        source_sha256: sha256_file(source_path)?,
        config,
        result,
    };
    write_json_pretty(report_path, &manifest)?;

    info!(command, path = %report_path.display(), "wrote report");
    Ok(())
}
