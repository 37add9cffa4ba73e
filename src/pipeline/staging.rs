//! Copy a source file into the local scratch directory.

use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use crate::error::StagingError;
use crate::pipeline::naming::stage_name;
use crate::types::{PipelineConfig, SourceFile, StagedFile};

pub struct StagingManager {
    config: Arc<PipelineConfig>,
}

impl StagingManager {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    pub fn local_path(&self, source: &SourceFile) -> PathBuf {
        self.config.local_dir.join(stage_name(source))
    }

    /// Copy `source` to `local_dir/{prefix}_{name}`, overwriting a stale copy from an earlier
    /// run. The returned [`StagedFile`] must be handed to the cleanup manager when done.
    pub fn stage(&self, source: &SourceFile) -> Result<StagedFile, StagingError> {
        if !source.full_path.is_file() {
            return Err(StagingError::SourceMissing(source.full_path.clone()));
        }
        let local_path = self.local_path(source);
        debug!(
            "Staging {} -> {}",
            source.full_path.display(),
            local_path.display()
        );
        if let Err(err) = std::fs::copy(&source.full_path, &local_path) {
            // A partial copy (e.g. disk full) would otherwise leak.
            let _ = std::fs::remove_file(&local_path);
            if err.kind() == std::io::ErrorKind::NotFound && !source.full_path.exists() {
                return Err(StagingError::SourceMissing(source.full_path.clone()));
            }
            return Err(StagingError::Copy {
                from: source.full_path.clone(),
                to: local_path,
                source: err,
            });
        }
        Ok(StagedFile {
            source: source.clone(),
            local_path,
        })
    }
}
