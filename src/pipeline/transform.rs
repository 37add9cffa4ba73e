//! Invoke the external de-identification command on a staged file.

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};

use crate::engine::tools::{expand_args, tail};
use crate::error::{ProcessError, TransformError};
use crate::pipeline::naming::output_name;
use crate::pipeline::process::ProcessExecutor;
use crate::types::{PipelineConfig, SourceFile, StagedFile, TransformOutput};
use crate::utils::config::ProcessConsts;

pub struct TransformInvoker {
    config: Arc<PipelineConfig>,
    executor: Arc<dyn ProcessExecutor>,
}

impl TransformInvoker {
    pub fn new(config: Arc<PipelineConfig>, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self { config, executor }
    }

    pub fn output_path(&self, source: &SourceFile) -> PathBuf {
        self.config.output_dir.join(output_name(source))
    }

    /// Run the transform with the configured timeout. Success requires exit 0 *and* an output
    /// artifact at the requested path; on any failure a partial artifact is removed.
    pub fn transform(&self, staged: &StagedFile) -> Result<TransformOutput, TransformError> {
        let output_path = self.output_path(&staged.source);
        let (program, template) = self
            .config
            .transform_command
            .split_first()
            .ok_or_else(|| TransformError::Failed {
                code: "none".to_string(),
                stderr: "transform command is empty".to_string(),
            })?;
        let args = expand_args(
            template,
            &[
                ("input", staged.local_path.as_path()),
                ("output", output_path.as_path()),
                ("log", self.config.log_file.as_path()),
            ],
        );

        let result = self
            .executor
            .execute(program, &args, Some(self.config.timeout))
            .map_err(|err| match err {
                ProcessError::TimedOut { after, .. } => TransformError::TimedOut(after),
                other => TransformError::Process(other),
            })
            .and_then(|out| {
                if !out.success() {
                    return Err(TransformError::Failed {
                        code: out.describe_status(),
                        stderr: tail(&out.stderr, ProcessConsts::STDERR_TAIL_BYTES).to_string(),
                    });
                }
                if !output_path.is_file() {
                    return Err(TransformError::MissingOutput(output_path.clone()));
                }
                Ok(())
            });

        match result {
            Ok(()) => {
                debug!("Transformed {}", output_path.display());
                Ok(TransformOutput {
                    source: staged.source.clone(),
                    local_output_path: output_path,
                })
            }
            Err(err) => {
                if output_path.exists()
                    && let Err(e) = std::fs::remove_file(&output_path)
                {
                    warn!(
                        "Could not remove partial transform output {}: {}",
                        output_path.display(),
                        e
                    );
                }
                Err(err)
            }
        }
    }
}
