use log::{debug, info, warn};
use rayon::prelude::*;
use std::sync::Arc;

use kdam::Animation;

use crate::engine::progress::{
    ProgressBarConfig, create_progress_bar, progress_callback, refresh_bar,
};
use crate::error::{LedgerError, RunError};
use crate::pipeline::batch::partition;
use crate::pipeline::cancel::CancelFlag;
use crate::pipeline::discover::{discover, find_collisions};
use crate::pipeline::ledger::OutcomeLedger;
use crate::pipeline::process::ProcessExecutor;
use crate::pipeline::runner::{BatchReport, PipelineRunner};
use crate::types::{PipelineConfig, ResumePolicy, RunSummary};
use crate::utils::Colors;

/// Create the scratch and output directories if missing.
fn prepare_dirs(config: &PipelineConfig) -> Result<(), RunError> {
    for dir in [&config.local_dir, &config.output_dir] {
        std::fs::create_dir_all(dir).map_err(|source| RunError::Prepare {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Main orchestrator: discover → (resume filter) → partition → run batches on a pool of
/// `batch_workers` threads → summary.
///
/// Fatal errors (config, discovery, ledger) are returned; per-file failures are in the ledger and
/// counted in the summary. Interrupt handling is the caller's job: raise `cancel` to stop.
pub fn run_pipeline(
    config: PipelineConfig,
    executor: Arc<dyn ProcessExecutor>,
    cancel: CancelFlag,
) -> Result<RunSummary, RunError> {
    config.validate()?;
    debug!("{} CONFIG:{:#?}", env!("CARGO_PKG_NAME").to_uppercase(), config);
    let config = Arc::new(config);

    let discoverer = discover(&config.input_dir, &config.extension)?;
    let mut files = discoverer.collect_all()?;
    let collisions = find_collisions(&files);
    for (later, first) in &collisions {
        warn!(
            "{} maps to the same local names as {}; it will be recorded as failed",
            later.display(),
            first.display()
        );
    }
    prepare_dirs(&config)?;
    let ledger = Arc::new(OutcomeLedger::open(&config.log_file)?);

    let mut summary = RunSummary {
        discovered: files.len(),
        ..Default::default()
    };
    if config.resume == ResumePolicy::SkipSucceeded {
        let done = ledger.succeeded_sources()?;
        files.retain(|f| !done.contains(&f.full_path.display().to_string()));
        summary.skipped = summary.discovered - files.len();
        if summary.skipped > 0 {
            info!(
                "Skipping {} files already recorded as successful in {}",
                summary.skipped,
                ledger.path().display()
            );
        }
    }

    let total = files.len();
    let batches = partition(files, config.batch_size)?;
    summary.batches = batches.len();
    info!(
        "Processing {} files in {} batches of up to {}",
        total,
        batches.len(),
        config.batch_size
    );

    let bar = (config.verbose && total > 0).then(|| {
        create_progress_bar(ProgressBarConfig::new(total, "Processing", Animation::Classic))
    });
    let runner = PipelineRunner::new(Arc::clone(&config), executor, ledger, cancel.clone())
        .with_collisions(collisions)
        .with_progress(progress_callback(&bar));

    let results: Vec<Result<BatchReport, LedgerError>> = if config.batch_workers > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.batch_workers)
            .thread_name(|i| format!("batch-worker-{i}"))
            .build()?;
        pool.install(|| {
            batches
                .par_iter()
                .with_max_len(1)
                .map(|b| runner.run_batch(b))
                .collect()
        })
    } else {
        let mut results = Vec::with_capacity(batches.len());
        for batch in &batches {
            let result = runner.run_batch(batch);
            let fatal = result.is_err();
            results.push(result);
            if fatal {
                break;
            }
        }
        results
    };
    if let Some(bar) = &bar {
        refresh_bar(bar);
        eprintln!();
    }

    for result in results {
        let report = result?;
        summary.succeeded += report.succeeded;
        summary.failed += report.failed;
        summary.cleanup_warnings += report.cleanup_warnings;
    }
    summary.cancelled = cancel.is_cancelled();

    log_summary(&summary);
    Ok(summary)
}

fn log_summary(summary: &RunSummary) {
    info!(
        "{} | {} | {}",
        Colors::colorize(Colors::SUCCESS, &format!("Succeeded: {}", summary.succeeded)),
        Colors::colorize(Colors::FAILURE, &format!("Failed: {}", summary.failed)),
        Colors::colorize(Colors::SKIPPED, &format!("Skipped: {}", summary.skipped)),
    );
    if summary.cleanup_warnings > 0 {
        warn!(
            "{} local files could not be removed; see warnings above",
            summary.cleanup_warnings
        );
    }
    if summary.cancelled {
        let unprocessed = summary
            .discovered
            .saturating_sub(summary.skipped + summary.succeeded + summary.failed);
        warn!("Run cancelled; {} files were not started", unprocessed);
    }
}
