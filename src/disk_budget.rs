//! Free space of the local scratch directory, used to cap in-batch parallelism.

use log::debug;
use std::path::Path;
use sysinfo::Disks;

use crate::types::SourceFile;
use crate::utils::config::LOCAL_COPIES_PER_FILE;

/// Available bytes on the filesystem holding `path` (longest mount-point prefix), or `None`
/// when no disk matches.
pub fn available_space(path: &Path) -> Option<u64> {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())?;
    debug!(
        "Disk for {}: mount={}, available={} bytes",
        path.display(),
        disk.mount_point().display(),
        disk.available_space()
    );
    Some(disk.available_space())
}

/// The part of `available` one of `workers` concurrent batches may plan with. Batch workers
/// share the scratch filesystem, so each budgets against an equal slice.
pub fn per_worker_share(available: Option<u64>, workers: usize) -> Option<u64> {
    let workers = u64::try_from(workers.max(1)).unwrap_or(u64::MAX);
    available.map(|bytes| bytes / workers)
}

/// How many of `members` may be in flight at once given `available` bytes, capped at
/// `requested` and never below 1. Each in-flight file is budgeted at twice the largest member.
pub fn parallelism_for(requested: usize, available: Option<u64>, members: &[SourceFile]) -> usize {
    let requested = requested.max(1);
    let Some(available) = available else {
        return requested;
    };
    let largest = members
        .iter()
        .filter_map(|m| std::fs::metadata(&m.full_path).ok())
        .map(|m| m.len())
        .max()
        .unwrap_or(0);
    let per_file = largest.saturating_mul(LOCAL_COPIES_PER_FILE);
    if per_file == 0 {
        return requested;
    }
    let fits = usize::try_from(available / per_file).unwrap_or(usize::MAX);
    let effective = requested.min(fits).max(1);
    if effective < requested {
        debug!(
            "Capping file parallelism {} -> {} ({} bytes free, {} bytes per file)",
            requested, effective, available, per_file
        );
    }
    effective
}
