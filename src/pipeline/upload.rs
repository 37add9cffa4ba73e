//! Transfer a transform output to remote storage, retrying transient failures with exponential
//! backoff.

use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

use crate::engine::tools::{expand_args, tail};
use crate::error::{ProcessError, UploadError};
use crate::pipeline::cancel::CancelFlag;
use crate::pipeline::process::{ProcessExecutor, ProcessOutput};
use crate::types::{PipelineConfig, Status, UploadRecord};
use crate::utils::config::{ProcessConsts, RetryConsts};

/// Stderr fragments (lowercased) that mark a failure as not worth retrying. Checked first.
const PERMANENT_MARKERS: &[&str] = &[
    "accessdenied",
    "access denied",
    "forbidden",
    "(403)",
    "nosuchbucket",
    "invalidbucketname",
    "invalidaccesskeyid",
    "signaturedoesnotmatch",
    "expiredtoken",
    "unable to locate credentials",
];

/// Stderr fragments (lowercased) of network and throttling errors.
const TRANSIENT_MARKERS: &[&str] = &[
    "timed out",
    "timeout",
    "throttl",
    "slowdown",
    "slow down",
    "too many requests",
    "(429)",
    "(500)",
    "(503)",
    "service unavailable",
    "internalerror",
    "connection reset",
    "connection refused",
    "connection was closed",
    "could not connect",
    "temporarily unavailable",
    "broken pipe",
];

/// True when `stderr` looks like a network or throttling failure and not an authorization or
/// addressing one. Unrecognized errors are permanent.
pub fn is_transient(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    if PERMANENT_MARKERS.iter().any(|m| lower.contains(m)) {
        return false;
    }
    TRANSIENT_MARKERS.iter().any(|m| lower.contains(m))
}

enum Attempt {
    Done,
    Transient(String),
    Permanent(String),
    Aborted(ProcessError),
}

fn classify(result: Result<ProcessOutput, ProcessError>) -> Attempt {
    match result {
        Ok(out) if out.success() => Attempt::Done,
        Ok(out) => {
            let message = format!(
                "{}: {}",
                out.describe_status(),
                tail(&out.stderr, ProcessConsts::STDERR_TAIL_BYTES)
            );
            if is_transient(&out.stderr) {
                Attempt::Transient(message)
            } else {
                Attempt::Permanent(message)
            }
        }
        Err(err @ ProcessError::TimedOut { .. }) => Attempt::Transient(err.to_string()),
        Err(err) => Attempt::Aborted(err),
    }
}

pub struct UploadManager {
    config: Arc<PipelineConfig>,
    executor: Arc<dyn ProcessExecutor>,
    cancel: CancelFlag,
}

impl UploadManager {
    pub fn new(
        config: Arc<PipelineConfig>,
        executor: Arc<dyn ProcessExecutor>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            config,
            executor,
            cancel,
        }
    }

    /// Upload `local_output_path` to `remote_uri`, making at most `upload_attempts` attempts.
    pub fn upload(
        &self,
        local_output_path: &Path,
        remote_uri: &str,
    ) -> Result<UploadRecord, UploadError> {
        if !local_output_path.is_file() {
            return Err(UploadError::SourceMissing(local_output_path.to_path_buf()));
        }
        let (program, template) = self.config.upload_command.split_first().ok_or_else(|| {
            UploadError::Failed {
                remote: remote_uri.to_string(),
                attempts: 0,
                message: "upload command is empty".to_string(),
            }
        })?;
        let args = expand_args(
            template,
            &[("local", local_output_path), ("remote", Path::new(remote_uri))],
        );

        let max_attempts = self.config.upload_attempts.max(1);
        let mut delay = self.config.upload_backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!("Upload attempt {}/{} -> {}", attempt, max_attempts, remote_uri);
            let result = self
                .executor
                .execute(program, &args, self.config.upload_timeout);
            let message = match classify(result) {
                Attempt::Done => {
                    return Ok(UploadRecord {
                        remote_uri: remote_uri.to_string(),
                        status: Status::Success,
                        attempts: attempt,
                    });
                }
                Attempt::Aborted(err) => return Err(UploadError::Process(err)),
                Attempt::Permanent(message) => {
                    return Err(UploadError::Failed {
                        remote: remote_uri.to_string(),
                        attempts: attempt,
                        message,
                    });
                }
                Attempt::Transient(message) => message,
            };
            if attempt >= max_attempts {
                return Err(UploadError::Failed {
                    remote: remote_uri.to_string(),
                    attempts: attempt,
                    message,
                });
            }
            warn!(
                "Upload attempt {}/{} to {} failed ({}); retrying in {:?}",
                attempt, max_attempts, remote_uri, message, delay
            );
            if !self.cancel.sleep(delay) {
                return Err(UploadError::Process(ProcessError::Cancelled {
                    program: program.clone(),
                }));
            }
            delay = delay.saturating_mul(2).min(RetryConsts::MAX_BACKOFF);
        }
    }
}
