//! Warming the cache ahead of traffic.
//!
//! Priming walks the source root, turns every original into the request a
//! client would make for it, and pushes all of them through the cache in
//! parallel with [rayon](https://docs.rs/rayon):
//!
//! ```text
//! media/dir/hello.png  +  --size 100x200   →  cache/dir/hello.100x200.png
//! media/dir/hello.png  +  --template thumb →  cache/dir/hello.thumb.png
//! ```
//!
//! Already-cached derivatives count as hits, so priming twice is cheap.
//! A failure on one file is reported and counted; it does not stop the run.

use crate::cache::{CacheArtifact, CacheStats, ImageCache, ServeError};
use crate::imaging::{CANDIDATE_EXTENSIONS, ImageBackend};
use crate::request::{ImageRequest, Transform};
use rayon::prelude::*;
use std::path::{Component, Path};
use std::sync::mpsc::Sender;
use walkdir::WalkDir;

/// One request served during priming.
#[derive(Debug)]
pub struct PrimeEvent {
    pub request: ImageRequest,
    pub result: Result<CacheArtifact, ServeError>,
}

/// Requests for every original under `source_root`, sorted by path.
///
/// Only files with one of the usual image extensions (any case) are picked
/// up. Paths a client could not request are skipped: a `.` anywhere in the
/// name or its directories (this includes hidden files), or names that are
/// not valid UTF-8.
pub fn discover(
    source_root: &Path,
    transform: &Transform,
) -> Result<Vec<ImageRequest>, walkdir::Error> {
    let mut requests = Vec::new();
    for entry in WalkDir::new(source_root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(source_root) else {
            continue;
        };
        match request_for(relative, transform) {
            Some(request) => requests.push(request),
            None => tracing::debug!(path = %entry.path().display(), "skipping"),
        }
    }
    Ok(requests)
}

fn request_for(relative: &Path, transform: &Transform) -> Option<ImageRequest> {
    let extension = relative.extension()?.to_str()?;
    if !CANDIDATE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()) {
        return None;
    }
    let stem = relative.with_extension("");
    let mut segments = Vec::new();
    for component in stem.components() {
        match component {
            Component::Normal(s) => segments.push(s.to_str()?),
            _ => return None,
        }
    }
    if segments.iter().any(|s| s.contains('.')) {
        return None;
    }
    Some(ImageRequest {
        base_name: segments.join("/"),
        extension: format!(".{extension}"),
        transform: transform.clone(),
    })
}

/// Serve every request in parallel and tally the outcomes.
///
/// Each result is sent to `events`, if given, as soon as it is known.
pub fn prime<B: ImageBackend>(
    cache: &ImageCache<B>,
    requests: Vec<ImageRequest>,
    events: Option<Sender<PrimeEvent>>,
) -> CacheStats {
    requests
        .into_par_iter()
        .map(|request| {
            let result = cache.serve(&request);
            let mut stats = CacheStats::default();
            stats.record(&result);
            if let Some(tx) = &events {
                // A closed receiver just means nobody is listening.
                let _ = tx.send(PrimeEvent { request, result });
            }
            stats
        })
        .reduce(CacheStats::default, CacheStats::merge)
}
