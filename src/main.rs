//! deidflow CLI: stage, de-identify, upload and clean up slide files in batches.

use anyhow::Result;
use clap::Parser;
use deidflow::engine::arg_parser::Cli;
use deidflow::engine::handle_run;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> Result<ExitCode> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let summary = handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(if summary.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
