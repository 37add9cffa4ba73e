//! Fixed-size, order-preserving partitioning of discovered files.

use crate::error::ConfigError;
use crate::types::{Batch, SourceFile};

/// Split `files` into `ceil(N / batch_size)` consecutive batches. Only the last may be short.
pub fn partition(files: Vec<SourceFile>, batch_size: usize) -> Result<Vec<Batch>, ConfigError> {
    if batch_size == 0 {
        return Err(ConfigError::InvalidBatchSize(batch_size));
    }
    let mut batches = Vec::with_capacity(files.len().div_ceil(batch_size));
    let mut members = Vec::with_capacity(batch_size);
    for file in files {
        members.push(file);
        if members.len() == batch_size {
            batches.push(Batch {
                index: batches.len(),
                members: std::mem::replace(&mut members, Vec::with_capacity(batch_size)),
            });
        }
    }
    if !members.is_empty() {
        batches.push(Batch {
            index: batches.len(),
            members,
        });
    }
    Ok(batches)
}
