//! deidflow: batch pipeline that stages slide files locally, runs an external de-identification
//! tool on each, uploads the result, reclaims local storage, and records every outcome in an
//! append-only ledger.

pub mod disk_budget;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use error::*;
pub use types::*;

use std::sync::Arc;

use pipeline::{CancelFlag, ProcessExecutor, SystemExecutor};

/// Run the whole pipeline for `config` with real child processes.
///
/// Use [`pipeline::run_pipeline`] directly to supply your own [`ProcessExecutor`] (e.g. a test
/// fake) or a [`CancelFlag`] wired to your own interrupt handling.
pub fn run(config: PipelineConfig) -> Result<RunSummary, RunError> {
    let cancel = CancelFlag::new();
    let executor: Arc<dyn ProcessExecutor> = Arc::new(SystemExecutor::new(cancel.clone()));
    pipeline::run_pipeline(config, executor, cancel)
}
