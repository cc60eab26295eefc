use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ConfigArgs;
use crate::commands::load_config;

pub fn run(args: ConfigArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let rendered =
        serde_json::to_string_pretty(&config).context("failed to serialize analysis config")?;

    info!(
        source = %args
            .config
            .config_path
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "defaults".to_string()),
        "effective analysis config"
    );
    println!("{rendered}");
    Ok(())
}
