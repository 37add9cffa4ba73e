//! Error taxonomy. Fatal kinds abort the run; file-local kinds are caught by the runner and
//! written to the ledger; cleanup errors only ever become warnings.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::Stage;

/// Invalid or missing configuration. Raised before any work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("batch_size must be at least 1 (got {0})")]
    InvalidBatchSize(usize),
    #[error("`{name}` must be at least 1 (got {value})")]
    NotPositive { name: &'static str, value: u64 },
    #[error("`{name}` command is empty")]
    EmptyCommand { name: &'static str },
    #[error("`{name}` command has no `{placeholder}` placeholder")]
    MissingPlaceholder {
        name: &'static str,
        placeholder: &'static str,
    },
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Input tree could not be enumerated. Fatal.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("input directory {0} does not exist")]
    Missing(PathBuf),
    #[error("input path {0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Failure from the process-invocation layer.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("failed waiting on `{program}`: {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },
    #[error("`{program}` timed out after {after:?} and was killed")]
    TimedOut { program: String, after: Duration },
    #[error("`{program}` was cancelled")]
    Cancelled { program: String },
}

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("source {0} vanished before staging")]
    SourceMissing(PathBuf),
    #[error("copy {from} -> {to} failed: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[error("{0} is already being processed in this run")]
    AlreadyScheduled(String),
    #[error("local name {name} is already taken by {first}")]
    NameCollision { name: String, first: PathBuf },
    #[error("run cancelled before staging")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("transform exited with {code}: {stderr}")]
    Failed { code: String, stderr: String },
    #[error("transform timed out after {0:?}")]
    TimedOut(Duration),
    #[error("transform reported success but produced no output at {0}")]
    MissingOutput(PathBuf),
    #[error(transparent)]
    Process(ProcessError),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload to {remote} failed after {attempts} attempt(s): {message}")]
    Failed {
        remote: String,
        attempts: u32,
        message: String,
    },
    #[error("upload source {0} does not exist")]
    SourceMissing(PathBuf),
    #[error(transparent)]
    Process(ProcessError),
}

#[derive(Debug, Error)]
#[error("cannot remove {path}: {source}")]
pub struct CleanupError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// The audit trail could not be written or read. Fatal.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot open ledger {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot append to ledger {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot encode ledger entry: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("ledger lock poisoned")]
    Poisoned,
}

/// A file-local failure, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl FileError {
    pub fn stage(&self) -> Stage {
        match self {
            FileError::Staging(_) => Stage::Staged,
            FileError::Transform(_) => Stage::Transformed,
            FileError::Upload(_) => Stage::Uploaded,
        }
    }
}

/// Anything that stops a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("cannot prepare {path}: {source}")]
    Prepare {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
