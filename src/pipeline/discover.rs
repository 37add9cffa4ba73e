//! Source discovery: files directly under the input root and one level down in each
//! subdirectory, filtered by extension, in path order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::{DirEntry, WalkDir};

use crate::engine::tools::{is_os_hidden_file, matches_extension, parent_leaf_name};
use crate::error::DiscoveryError;
use crate::pipeline::naming::{output_name, stage_name};
use crate::types::SourceFile;

/// Deepest level scanned below the root (root/<subdir>/<file>).
const MAX_DEPTH: usize = 2;

/// A validated input root. [`FileDiscoverer::iter`] re-walks the tree on every call.
#[derive(Clone, Debug)]
pub struct FileDiscoverer {
    root: PathBuf,
    extension: String,
}

/// Validate `input_dir` and return a discoverer for files ending in `.{extension}`.
pub fn discover(input_dir: &Path, extension: &str) -> Result<FileDiscoverer, DiscoveryError> {
    let meta = std::fs::metadata(input_dir).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            DiscoveryError::Missing(input_dir.to_path_buf())
        } else {
            DiscoveryError::Unreadable {
                path: input_dir.to_path_buf(),
                source,
            }
        }
    })?;
    if !meta.is_dir() {
        return Err(DiscoveryError::NotADirectory(input_dir.to_path_buf()));
    }
    let unreadable = |source| DiscoveryError::Unreadable {
        path: input_dir.to_path_buf(),
        source,
    };
    // Canonical root so root-level files get a real parent leaf name even for ".".
    let root = input_dir.canonicalize().map_err(unreadable)?;
    std::fs::read_dir(&root).map_err(unreadable)?;
    debug!("Discovering *.{} under {}", extension, root.display());
    Ok(FileDiscoverer {
        root,
        extension: extension.to_string(),
    })
}

impl FileDiscoverer {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazy walk in path order. Errors below the root are yielded, not skipped.
    pub fn iter(&self) -> impl Iterator<Item = Result<SourceFile, DiscoveryError>> + '_ {
        WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(MAX_DEPTH)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |r| match r {
                Ok(entry) => self.to_source(&entry).map(Ok),
                Err(err) => Some(Err(DiscoveryError::Walk(err))),
            })
    }

    /// Walk to completion.
    pub fn collect_all(&self) -> Result<Vec<SourceFile>, DiscoveryError> {
        let files = self.iter().collect::<Result<Vec<_>, _>>()?;
        debug!("Discovered {} files", files.len());
        Ok(files)
    }

    fn to_source(&self, entry: &DirEntry) -> Option<SourceFile> {
        let path = entry.path();
        if !entry.file_type().is_file()
            || is_os_hidden_file(path)
            || !matches_extension(path, &self.extension)
        {
            return None;
        }
        Some(SourceFile {
            directory_prefix: parent_leaf_name(path)?,
            base_name: entry.file_name().to_string_lossy().into_owned(),
            full_path: path.to_path_buf(),
        })
    }
}

/// Files whose staged or output name is already taken by an earlier file in `files`, mapped to
/// that earlier file. `A_B/x.svs` and `A/B_x.svs` both stage as `A_B_x.svs`.
pub fn find_collisions(files: &[SourceFile]) -> HashMap<PathBuf, PathBuf> {
    let mut staged: HashMap<String, &Path> = HashMap::new();
    let mut outputs: HashMap<String, &Path> = HashMap::new();
    let mut collisions = HashMap::new();
    for file in files {
        let (stage, output) = (stage_name(file), output_name(file));
        let taken = staged.get(&stage).or_else(|| outputs.get(&output)).copied();
        if let Some(first) = taken {
            debug!(
                "{} collides with {} on local names",
                file.full_path.display(),
                first.display()
            );
            collisions.insert(file.full_path.clone(), first.to_path_buf());
            continue;
        }
        staged.insert(stage, &file.full_path);
        outputs.insert(output, &file.full_path);
    }
    collisions
}
