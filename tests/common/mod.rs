//! Shared fixtures: a scratch tree with input/local/output dirs and a ledger path.

#![allow(dead_code)]

use deidflow::pipeline::OutcomeLedger;
use deidflow::pipeline::mock::{MockExecutor, MockResponse};
use deidflow::utils::PipelineDefaults;
use deidflow::{LedgerEntry, PipelineConfig, ResumePolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Bucket used by every fixture config. Only upload arguments ever contain it.
pub const BUCKET: &str = "s3://bucket";

/// Index of `{output}` in the default transform arguments (after the program name).
pub const TRANSFORM_OUTPUT_ARG: usize = 3;

pub struct Fixture {
    pub dir: TempDir,
    pub input: PathBuf,
    pub local: PathBuf,
    pub output: PathBuf,
    pub ledger: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        let local = dir.path().join("local");
        let output = dir.path().join("output");
        std::fs::create_dir_all(&input).unwrap();
        let ledger = dir.path().join("logs").join("ledger.jsonl");
        Self {
            dir,
            input,
            local,
            output,
            ledger,
        }
    }

    /// Create `input/<rel>` with a little content.
    pub fn add(&self, rel: &str) -> PathBuf {
        let path = self.input.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("slide bytes for {rel}")).unwrap();
        path
    }

    pub fn config(&self, batch_size: usize) -> PipelineConfig {
        PipelineConfig {
            input_dir: self.input.clone(),
            local_dir: self.local.clone(),
            output_dir: self.output.clone(),
            remote_bucket_uri: BUCKET.to_string(),
            log_file: self.ledger.clone(),
            batch_size,
            timeout: Duration::from_secs(30),
            extension: "svs".to_string(),
            transform_command: PipelineDefaults::transform_command(),
            upload_command: PipelineDefaults::upload_command(),
            upload_attempts: 3,
            upload_backoff: Duration::from_millis(1),
            upload_timeout: None,
            batch_workers: 1,
            file_parallelism: 1,
            resume: ResumePolicy::Reprocess,
            verbose: false,
        }
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        OutcomeLedger::open(&self.ledger).unwrap().entries().unwrap()
    }

    /// Entry whose source path ends with `rel`.
    pub fn entry_for(&self, rel: &str) -> LedgerEntry {
        let matches: Vec<_> = self
            .entries()
            .into_iter()
            .filter(|e| Path::new(&e.source_path).ends_with(rel))
            .collect();
        assert_eq!(matches.len(), 1, "expected one entry for {rel}: {matches:?}");
        matches.into_iter().next().unwrap()
    }

    /// Files left in the scratch and output directories.
    pub fn leftovers(&self) -> Vec<PathBuf> {
        [&self.local, &self.output]
            .iter()
            .filter(|d| d.exists())
            .flat_map(|d| std::fs::read_dir(d).unwrap())
            .map(|e| e.unwrap().path())
            .collect()
    }
}

/// Transform writes its output; upload succeeds.
pub fn happy_executor() -> MockExecutor {
    MockExecutor::new()
        .on_program(
            "deidentify",
            MockResponse::Succeed {
                write_arg: Some(TRANSFORM_OUTPUT_ARG),
            },
        )
        .on_program("aws", MockResponse::Succeed { write_arg: None })
}
