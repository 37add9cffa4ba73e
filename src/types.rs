//! Public types for the deidflow pipeline: files moving through it, ledger records, config.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A discovered source file. Immutable once discovered.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceFile {
    /// Leaf name of the immediate parent directory.
    pub directory_prefix: String,
    /// Unmodified leaf name of the file.
    pub base_name: String,
    pub full_path: PathBuf,
}

/// An ordered slice of the discovered set; the unit of independent dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    pub index: usize,
    pub members: Vec<SourceFile>,
}

/// Local copy of a source file under `local_dir`. Owned by the pipeline for that file.
#[derive(Clone, Debug)]
pub struct StagedFile {
    pub source: SourceFile,
    pub local_path: PathBuf,
}

/// Artifact written by the transform under `output_dir`.
#[derive(Clone, Debug)]
pub struct TransformOutput {
    pub source: SourceFile,
    pub local_output_path: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    Failure,
}

/// Result of an upload. `attempts` counts invocations of the transfer command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadRecord {
    pub remote_uri: String,
    pub status: Status,
    pub attempts: u32,
}

/// Furthest pipeline stage a file reached. For failures, the stage that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Staged,
    Transformed,
    Uploaded,
    CleanedUp,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Staged => "staged",
            Stage::Transformed => "transformed",
            Stage::Uploaded => "uploaded",
            Stage::CleanedUp => "cleaned-up",
        };
        f.write_str(s)
    }
}

/// One terminal outcome for one file in one run. Serialized as a single JSON line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub source_path: String,
    pub stage_reached: Stage,
    pub status: Status,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub duration_secs: f64,
    #[serde(default)]
    pub remote_uri: Option<String>,
}

impl LedgerEntry {
    pub fn success(source: &SourceFile, remote_uri: String, elapsed: Duration) -> Self {
        Self {
            timestamp: Utc::now(),
            source_path: source.full_path.display().to_string(),
            stage_reached: Stage::CleanedUp,
            status: Status::Success,
            error_message: None,
            duration_secs: elapsed.as_secs_f64(),
            remote_uri: Some(remote_uri),
        }
    }

    pub fn failure(source: &SourceFile, stage: Stage, message: String, elapsed: Duration) -> Self {
        Self {
            timestamp: Utc::now(),
            source_path: source.full_path.display().to_string(),
            stage_reached: stage,
            status: Status::Failure,
            error_message: Some(message),
            duration_secs: elapsed.as_secs_f64(),
            remote_uri: None,
        }
    }
}

/// Whether a rerun consults the ledger and skips files that already succeeded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResumePolicy {
    #[default]
    Reprocess,
    SkipSucceeded,
}

/// Aggregate counts for a finished run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub skipped: usize,
    pub batches: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cleanup_warnings: usize,
    /// True when the run stopped early on Ctrl+C.
    pub cancelled: bool,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }
}

/// Resolved, immutable pipeline configuration. Passed explicitly to every component.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub local_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Normalized: has a scheme, no trailing slash.
    pub remote_bucket_uri: String,
    /// Outcome ledger path.
    pub log_file: PathBuf,
    pub batch_size: usize,
    /// Per-file transform bound.
    pub timeout: Duration,
    /// Lowercase, without leading dot.
    pub extension: String,
    /// Argument vector; `{input}`, `{output}`, `{log}` are substituted per argument.
    pub transform_command: Vec<String>,
    /// Argument vector; `{local}`, `{remote}` are substituted per argument.
    pub upload_command: Vec<String>,
    pub upload_attempts: u32,
    pub upload_backoff: Duration,
    pub upload_timeout: Option<Duration>,
    pub batch_workers: usize,
    pub file_parallelism: usize,
    pub resume: ResumePolicy,
    pub verbose: bool,
}

impl PipelineConfig {
    /// Check invariants that the settings layer cannot express in types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::NotPositive {
                name: "timeout",
                value: 0,
            });
        }
        for (name, value) in [
            ("upload_attempts", self.upload_attempts as u64),
            ("batch_workers", self.batch_workers as u64),
            ("file_parallelism", self.file_parallelism as u64),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        check_command("transform_command", &self.transform_command, &["{input}", "{output}"])?;
        check_command("upload_command", &self.upload_command, &["{local}", "{remote}"])?;
        Ok(())
    }
}

fn check_command(
    name: &'static str,
    argv: &[String],
    placeholders: &[&'static str],
) -> Result<(), ConfigError> {
    if argv.first().is_none_or(|p| p.trim().is_empty()) {
        return Err(ConfigError::EmptyCommand { name });
    }
    for &placeholder in placeholders {
        if !argv.iter().any(|a| a.contains(placeholder)) {
            return Err(ConfigError::MissingPlaceholder { name, placeholder });
        }
    }
    Ok(())
}
