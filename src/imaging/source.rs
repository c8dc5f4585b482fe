//! Locating the original image on disk.
//!
//! Requests may leave the extension off (`/photo.100x200`) and template
//! requests never carry the source extension at all. In that case the common
//! image extensions are tried in a fixed order, lowercase first, then
//! uppercase, so `Case` finds `Case.PNG` on a case-sensitive filesystem.

use std::path::{Path, PathBuf};

/// Extensions tried for a source path that has none, in order.
pub const CANDIDATE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Resolve `source` to an existing regular file.
///
/// A path with an extension is taken as-is. A path without one is tried with
/// each candidate extension. On failure the error lists every path tried.
pub fn resolve_source(source: &Path) -> Result<PathBuf, Vec<PathBuf>> {
    if source.extension().is_some() {
        return if source.is_file() {
            Ok(source.to_path_buf())
        } else {
            Err(vec![source.to_path_buf()])
        };
    }

    let attempted = candidates(source);
    match attempted.iter().find(|candidate| candidate.is_file()) {
        Some(found) => Ok(found.clone()),
        None => Err(attempted),
    }
}

fn candidates(source: &Path) -> Vec<PathBuf> {
    let lower = CANDIDATE_EXTENSIONS.iter().map(|ext| ext.to_string());
    let upper = CANDIDATE_EXTENSIONS.iter().map(|ext| ext.to_uppercase());
    lower
        .chain(upper)
        .map(|ext| source.with_extension(ext))
        .collect()
}
