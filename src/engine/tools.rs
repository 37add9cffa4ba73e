//! Path, URI and argument utilities

use std::ffi::OsString;
use std::path::Path;

/// Check if a file should be excluded based on OS-specific junk files
pub fn is_os_hidden_file(path: &Path) -> bool {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        match name {
            // macOS
            ".DS_Store" | ".AppleDouble" | ".LSOverride" => true,
            // Windows
            "Thumbs.db" | "ehthumbs.db" | "Desktop.ini" => true,
            // Linux
            ".directory" => true,
            _ => {
                // macOS resource fork files start with ._
                name.starts_with("._")
            }
        }
    } else {
        false
    }
}

/// Case-insensitive extension check. `ext` is already normalized (lowercase, no dot).
pub fn matches_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Leaf name of `path`'s parent directory, e.g. `/data/A/slide1.svs` -> `A`.
pub fn parent_leaf_name(path: &Path) -> Option<String> {
    path.parent()?
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

/// Give a bare bucket an `s3://` scheme and drop trailing slashes.
pub fn normalize_bucket_uri(uri: &str) -> String {
    let uri = uri.trim().trim_end_matches('/');
    if uri.contains("://") {
        uri.to_string()
    } else {
        format!("s3://{uri}")
    }
}

/// Substitute `{name}` placeholders inside each argument. Arguments are never re-split, so paths
/// with spaces or shell metacharacters pass through intact.
pub fn expand_args(template: &[String], vars: &[(&str, &Path)]) -> Vec<OsString> {
    template
        .iter()
        .map(|arg| {
            let mut out = arg.clone();
            for (name, value) in vars {
                let key = format!("{{{name}}}");
                if out.contains(&key) {
                    out = out.replace(&key, &value.to_string_lossy());
                }
            }
            OsString::from(out)
        })
        .collect()
}

/// Last `max_bytes` of `text`, cut on a char boundary, trimmed.
pub fn tail(text: &str, max_bytes: usize) -> &str {
    let text = text.trim();
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
