//! CLI command handler: resolve settings (file, then flags), install Ctrl+C, run.

use anyhow::{Context, Result};
use log::debug;
use std::sync::Arc;

use crate::engine::arg_parser::Cli;
use crate::pipeline::{CancelFlag, SystemExecutor, run_pipeline};
use crate::types::{PipelineConfig, RunSummary};
use crate::utils::{PipelineSettings, load_default_toml, load_toml, setup_logging};

/// Layer the config file under the CLI flags and resolve.
pub fn setup_config(cli: &Cli) -> Result<PipelineConfig> {
    let file = match &cli.config {
        Some(path) => Some(load_toml(path)?),
        None => {
            let cwd = std::env::current_dir().context("read working directory")?;
            load_default_toml(&cwd)?
        }
    };
    let base = file.map(|f| f.pipeline).unwrap_or_default();
    let settings: PipelineSettings = base.merge(cli.settings());
    Ok(settings.resolve()?)
}

/// Run the pipeline for `cli`. Returns the summary; fatal errors carry context for the user.
pub fn handle_run(cli: &Cli) -> Result<RunSummary> {
    // Collaborators (e.g. the aws CLI) inherit credentials from a local .env.
    let env_file = dotenvy::dotenv().ok();
    let config = setup_config(cli).context("invalid configuration")?;
    setup_logging(config.verbose);
    if let Some(path) = env_file {
        debug!("Loaded environment from {}", path.display());
    }

    let cancel = CancelFlag::new();
    cancel
        .install_ctrlc_handler()
        .context("set Ctrl+C handler")?;
    let executor = Arc::new(SystemExecutor::new(cancel.clone()));
    let summary = run_pipeline(config, executor, cancel).context("pipeline run aborted")?;
    Ok(summary)
}
