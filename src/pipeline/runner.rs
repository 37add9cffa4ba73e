//! Per-file state machine and batch driver.
//!
//! Each file runs Stage → Transform → Upload, stopping at the first failure. Whatever local
//! artifacts exist are then released, and exactly one ledger entry is written. A file's failure
//! never stops the rest of its batch; only a ledger failure is fatal.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::disk_budget::{available_space, parallelism_for, per_worker_share};
use crate::error::{FileError, LedgerError, StagingError};
use crate::pipeline::cancel::CancelFlag;
use crate::pipeline::cleanup::{CleanupManager, CleanupReport};
use crate::pipeline::ledger::OutcomeLedger;
use crate::pipeline::naming::{remote_uri, stage_name};
use crate::pipeline::process::ProcessExecutor;
use crate::pipeline::staging::StagingManager;
use crate::pipeline::transform::TransformInvoker;
use crate::pipeline::upload::UploadManager;
use crate::types::{
    Batch, LedgerEntry, PipelineConfig, SourceFile, Stage, StagedFile, TransformOutput,
};

/// Called with `1` each time a file reaches a terminal state.
pub type ProgressFn = Arc<dyn Fn(usize) + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    Succeeded { remote_uri: String },
    Failed { stage: Stage, message: String },
    /// Cancelled before the file was claimed; nothing was written for it.
    NotStarted,
}

#[derive(Clone, Debug)]
pub struct FileReport {
    pub source: SourceFile,
    pub outcome: FileOutcome,
    pub cleanup_errors: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub index: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub not_started: usize,
    pub cleanup_warnings: usize,
}

impl BatchReport {
    fn add(&mut self, report: &FileReport) {
        match report.outcome {
            FileOutcome::Succeeded { .. } => self.succeeded += 1,
            FileOutcome::Failed { .. } => self.failed += 1,
            FileOutcome::NotStarted => self.not_started += 1,
        }
        self.cleanup_warnings += report.cleanup_errors;
    }
}

/// Local files a pipeline currently owns. Released explicitly at the terminal state, or on drop
/// if a panic unwinds past it.
struct LocalArtifacts<'a> {
    cleanup: &'a CleanupManager,
    staged: Option<StagedFile>,
    output: Option<TransformOutput>,
}

impl<'a> LocalArtifacts<'a> {
    fn new(cleanup: &'a CleanupManager) -> Self {
        Self {
            cleanup,
            staged: None,
            output: None,
        }
    }

    fn release(&mut self) -> CleanupReport {
        let output = self.output.take();
        match self.staged.take() {
            Some(staged) => self.cleanup.release(&staged, output.as_ref()),
            None => CleanupReport::default(),
        }
    }
}

impl Drop for LocalArtifacts<'_> {
    fn drop(&mut self) {
        if self.staged.is_some() {
            let _ = self.release();
        }
    }
}

/// Marks a staged name as owned by one pipeline for the duration of a file's run.
struct Claim<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    name: String,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
    }
}

pub struct PipelineRunner {
    config: Arc<PipelineConfig>,
    staging: StagingManager,
    transform: TransformInvoker,
    upload: UploadManager,
    cleanup: CleanupManager,
    ledger: Arc<OutcomeLedger>,
    cancel: CancelFlag,
    in_flight: Mutex<HashSet<String>>,
    /// Source path -> earlier source that owns the same local names.
    collisions: HashMap<PathBuf, PathBuf>,
    on_file_done: Option<ProgressFn>,
}

impl PipelineRunner {
    pub fn new(
        config: Arc<PipelineConfig>,
        executor: Arc<dyn ProcessExecutor>,
        ledger: Arc<OutcomeLedger>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            staging: StagingManager::new(Arc::clone(&config)),
            transform: TransformInvoker::new(Arc::clone(&config), Arc::clone(&executor)),
            upload: UploadManager::new(Arc::clone(&config), executor, cancel.clone()),
            cleanup: CleanupManager::new(),
            config,
            ledger,
            cancel,
            in_flight: Mutex::new(HashSet::new()),
            collisions: HashMap::new(),
            on_file_done: None,
        }
    }

    /// Files to fail at staging because an earlier file owns their local names.
    pub fn with_collisions(mut self, collisions: HashMap<PathBuf, PathBuf>) -> Self {
        self.collisions = collisions;
        self
    }

    pub fn with_progress(mut self, on_file_done: Option<ProgressFn>) -> Self {
        self.on_file_done = on_file_done;
        self
    }

    /// Drive one file to a terminal state and record it. Only a ledger failure is an error; it
    /// also raises the cancel flag so sibling pipelines wind down.
    pub fn run_file(&self, source: &SourceFile) -> Result<FileReport, LedgerError> {
        if self.cancel.is_cancelled() {
            return Ok(FileReport {
                source: source.clone(),
                outcome: FileOutcome::NotStarted,
                cleanup_errors: 0,
            });
        }
        let started = Instant::now();
        let mut artifacts = LocalArtifacts::new(&self.cleanup);
        let (result, cleanup) = match self.claim(source) {
            Ok(_claim) => {
                let result = self.advance(source, &mut artifacts);
                (result, artifacts.release())
            }
            Err(err) => (Err(FileError::from(err)), CleanupReport::default()),
        };
        let elapsed = started.elapsed();

        let (entry, outcome) = match result {
            Ok(uri) => {
                info!("{} -> {} ({:.1}s)", source.full_path.display(), uri, elapsed.as_secs_f64());
                (
                    LedgerEntry::success(source, uri.clone(), elapsed),
                    FileOutcome::Succeeded { remote_uri: uri },
                )
            }
            Err(err) => {
                let stage = err.stage();
                let message = err.to_string();
                warn!("{} failed at {}: {}", source.full_path.display(), stage, message);
                (
                    LedgerEntry::failure(source, stage, message.clone(), elapsed),
                    FileOutcome::Failed { stage, message },
                )
            }
        };
        if let Err(err) = self.ledger.record(&entry) {
            self.cancel.cancel();
            return Err(err);
        }
        if let Some(progress) = &self.on_file_done {
            progress(1);
        }
        Ok(FileReport {
            source: source.clone(),
            outcome,
            cleanup_errors: cleanup.errors.len(),
        })
    }

    /// Run every member of `batch`, sequentially or on a bounded pool when `file_parallelism`
    /// (capped by free local disk) allows. Failures are isolated per file.
    pub fn run_batch(&self, batch: &Batch) -> Result<BatchReport, LedgerError> {
        let available = (self.config.file_parallelism > 1)
            .then(|| available_space(&self.config.local_dir))
            .flatten();
        let available = per_worker_share(available, self.config.batch_workers);
        let parallelism = parallelism_for(self.config.file_parallelism, available, &batch.members);
        debug!(
            "Batch {}: {} files, parallelism {}",
            batch.index,
            batch.members.len(),
            parallelism
        );

        let results: Vec<Result<FileReport, LedgerError>> = match self.file_pool(parallelism) {
            Some(pool) => pool.install(|| {
                batch
                    .members
                    .par_iter()
                    .with_max_len(1)
                    .map(|m| self.run_file(m))
                    .collect()
            }),
            None => {
                let mut results = Vec::with_capacity(batch.members.len());
                for member in &batch.members {
                    let result = self.run_file(member);
                    let fatal = result.is_err();
                    results.push(result);
                    if fatal {
                        break;
                    }
                }
                results
            }
        };

        let mut report = BatchReport {
            index: batch.index,
            ..Default::default()
        };
        for result in results {
            report.add(&result?);
        }
        debug!("Batch {} done: {:?}", batch.index, report);
        Ok(report)
    }

    fn file_pool(&self, parallelism: usize) -> Option<rayon::ThreadPool> {
        if parallelism <= 1 {
            return None;
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .thread_name(|i| format!("file-worker-{i}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!("Cannot build file worker pool ({}); processing batch sequentially", e);
                None
            }
        }
    }

    fn claim(&self, source: &SourceFile) -> Result<Claim<'_>, StagingError> {
        let name = stage_name(source);
        if let Some(first) = self.collisions.get(&source.full_path) {
            return Err(StagingError::NameCollision {
                name,
                first: first.clone(),
            });
        }
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(name.clone()) {
            return Err(StagingError::AlreadyScheduled(name));
        }
        Ok(Claim {
            in_flight: &self.in_flight,
            name,
        })
    }

    /// Forward stages. Every artifact is handed to `artifacts` as soon as it exists.
    fn advance(
        &self,
        source: &SourceFile,
        artifacts: &mut LocalArtifacts<'_>,
    ) -> Result<String, FileError> {
        if self.cancel.is_cancelled() {
            return Err(StagingError::Cancelled.into());
        }
        let staged = self.staging.stage(source)?;
        artifacts.staged = Some(staged.clone());

        let output = self.transform.transform(&staged)?;
        artifacts.output = Some(output.clone());

        let remote = remote_uri(&self.config.remote_bucket_uri, source);
        let record = self.upload.upload(&output.local_output_path, &remote)?;
        debug!(
            "Uploaded {} in {} attempt(s)",
            record.remote_uri, record.attempts
        );
        Ok(record.remote_uri)
    }
}
