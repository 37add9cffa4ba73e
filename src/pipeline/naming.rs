//! Local and remote names derived from a source file. Pure; no filesystem access.
//!
//! The parent directory's leaf name is folded into every name, so `A/slide1.svs` and
//! `B/slide1.svs` never collide in the shared scratch directories or the bucket.

use crate::types::SourceFile;

/// Infix marking a de-identified artifact.
pub const DEID_MARKER: &str = "DI";

/// `{directory_prefix}_{base_name}`
pub fn stage_name(source: &SourceFile) -> String {
    format!("{}_{}", source.directory_prefix, source.base_name)
}

/// `{directory_prefix}_DI_{base_name}`
pub fn output_name(source: &SourceFile) -> String {
    format!(
        "{}_{}_{}",
        source.directory_prefix, DEID_MARKER, source.base_name
    )
}

/// Destination object for a file's transform output. `bucket_uri` is already normalized.
pub fn remote_uri(bucket_uri: &str, source: &SourceFile) -> String {
    format!("{}/{}", bucket_uri, output_name(source))
}
