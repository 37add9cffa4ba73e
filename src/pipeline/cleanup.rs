//! Release local storage held by a file's pipeline.

use std::io::ErrorKind;
use std::path::Path;

use log::{debug, warn};

use crate::error::CleanupError;
use crate::types::{StagedFile, TransformOutput};

/// Deletion failures from one release. Never changes the file's recorded outcome.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub errors: Vec<CleanupError>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CleanupManager;

impl CleanupManager {
    pub fn new() -> Self {
        Self
    }

    /// Delete the staged input and, when given, the transform output. Call once the file's
    /// outcome is known. Already-absent files are fine; other failures are logged as warnings.
    pub fn release(&self, staged: &StagedFile, output: Option<&TransformOutput>) -> CleanupReport {
        let mut report = CleanupReport::default();
        remove(&staged.local_path, &mut report);
        if let Some(output) = output {
            remove(&output.local_output_path, &mut report);
        }
        report
    }
}

fn remove(path: &Path, report: &mut CleanupReport) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(source) => {
            let err = CleanupError {
                path: path.to_path_buf(),
                source,
            };
            warn!("{}", err);
            report.errors.push(err);
        }
    }
}
