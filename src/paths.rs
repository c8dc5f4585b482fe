//! Source and cache path derivation.
//!
//! Every derivative lives next to where its original would live, under a
//! different root, with the transform encoded in the file name:
//!
//! ```text
//! media/dir/hello.png  →  cache/dir/hello.100x200.png     (resize)
//! media/dir/hello      →  cache/dir/hello.100x200         (no extension)
//! media/dir/hello.*    →  cache/dir/hello.thumb.png       (template "thumb")
//! ```
//!
//! The cache naming is a durable on-disk contract: a cache can be primed or
//! inspected by hand using nothing but this convention.
//!
//! All functions here are pure. Nothing touches the filesystem, and `.` or
//! `..` segments are passed through untouched.

use std::path::{Path, PathBuf};

/// Source and cache locations for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Paths for a `WxH` resize.
///
/// The source keeps the request's extension verbatim (possibly empty); the
/// target inserts `.<width>x<height>` before it.
pub fn derive_for_resize(
    base_name: &str,
    extension: &str,
    width: u32,
    height: u32,
    source_root: &Path,
    cache_root: &Path,
) -> ResolvedPaths {
    ResolvedPaths {
        source: under_root(source_root, &format!("{base_name}{extension}")),
        target: under_root(
            cache_root,
            &format!("{base_name}.{width}x{height}{extension}"),
        ),
    }
}

/// Paths for a named template.
///
/// The source has no extension: the executor discovers it by probing the
/// usual image extensions.
pub fn derive_for_template(
    base_name: &str,
    extension: &str,
    template_name: &str,
    source_root: &Path,
    cache_root: &Path,
) -> ResolvedPaths {
    ResolvedPaths {
        source: under_root(source_root, base_name),
        target: under_root(cache_root, &format!("{base_name}.{template_name}{extension}")),
    }
}

/// Append a `/`-separated relative name to `root` one segment at a time.
///
/// `Path::join` with an absolute argument discards the root, so a name with a
/// leading slash would escape it. Empty segments are dropped instead.
fn under_root(root: &Path, name: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in name.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}

/// Rewrite a URL so it points at a derivative.
///
/// The descriptor (`100x300` or a template name) goes in front of the
/// extension of the last path segment:
///
/// - `"http://www.test.com/file.jpg"` → `"http://www.test.com/file.100x300.jpg"`
/// - `"/file"` → `"/file.100x300"`
/// - `"file.jpg"` → `"file.100x300.jpg"`
///
/// This is the inverse of request parsing and is what page templates use to
/// build image links.
pub fn sized_url(url: &str, descriptor: &str) -> String {
    let (dir, file) = match url.rfind('/') {
        Some(slash) => url.split_at(slash + 1),
        None => ("", url),
    };
    match file.rfind('.') {
        Some(dot) if dot > 0 => {
            let (stem, ext) = file.split_at(dot);
            format!("{dir}{stem}.{descriptor}{ext}")
        }
        _ => format!("{dir}{file}.{descriptor}"),
    }
}
