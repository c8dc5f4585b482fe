//! The derivative cache.
//!
//! [`ImageCache`] answers one question per request: *where is the file for
//! this request?* If the derivative is already on disk that's the answer.
//! Otherwise it is generated from the original, published atomically, and
//! then it's the answer.
//!
//! # Design
//!
//! ## Cache keys
//!
//! The cache is **path-addressed**. The request itself names the file (see
//! [`paths`](crate::paths)), so a hit is a single `stat` with no index or
//! manifest to keep consistent. Entries never expire; deleting a file from
//! the cache root makes the next request regenerate it.
//!
//! ## Failures
//!
//! Every failure is returned as a tagged [`ServeError`] with full detail.
//! Collapsing them into a uniform "not found" is the HTTP layer's job, so
//! logs and the CLI still see the real cause.
//!
//! ## Concurrent misses
//!
//! Two requests for the same missing derivative are serialized on a
//! per-target lock: the first generates the file, the second then finds it
//! cached. Without the lock both would generate and the later rename would
//! win. The result would still be a complete file, with the CPU time spent
//! twice. Requests for different targets never wait on each other.

use crate::atomic::{AtomicWriter, Produced};
use crate::config::ServiceConfig;
use crate::imaging::{self, BackendError, ImageBackend, TransformError};
use crate::paths::{self, ResolvedPaths};
use crate::request::{ImageRequest, Transform};
use crate::templates::TemplateRepository;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("requested {width}x{height} exceeds the {max_width}x{max_height} limit")]
    SizeLimitExceeded {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
    #[error("unknown template: {0}")]
    TemplateNotFound(String),
    #[error("Source image not found: {}", display_paths(.attempted))]
    SourceNotFound { attempted: Vec<PathBuf> },
    #[error("Image processing failed: {0}")]
    Execution(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<TransformError> for ServeError {
    fn from(e: TransformError) -> Self {
        match e {
            TransformError::SourceNotFound { attempted } => Self::SourceNotFound { attempted },
            TransformError::Execution(e) => Self::Execution(e),
            TransformError::Io(e) => Self::Io(e),
        }
    }
}

/// A derivative that is on disk and ready to be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheArtifact {
    pub path: PathBuf,
    pub outcome: Produced,
}

/// Derivative cache over one source root and one cache root.
pub struct ImageCache<B> {
    source_root: PathBuf,
    cache_root: PathBuf,
    max_width: u32,
    max_height: u32,
    templates: TemplateRepository,
    backend: B,
    writer: AtomicWriter,
    in_flight: InFlight,
}

impl<B: ImageBackend> ImageCache<B> {
    pub fn new(config: &ServiceConfig, templates: TemplateRepository, backend: B) -> Self {
        Self {
            source_root: config.source_root.clone(),
            cache_root: config.cache_root.clone(),
            max_width: config.max_width,
            max_height: config.max_height,
            templates,
            backend,
            writer: AtomicWriter::new(),
            in_flight: InFlight::default(),
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn templates(&self) -> &TemplateRepository {
        &self.templates
    }

    /// Serve any request, dispatching on its transform.
    pub fn serve(&self, req: &ImageRequest) -> Result<CacheArtifact, ServeError> {
        match &req.transform {
            Transform::Dimensions { width, height } => {
                self.serve_resize(&req.base_name, &req.extension, *width, *height)
            }
            Transform::Template { name } => {
                self.serve_template(&req.base_name, &req.extension, name)
            }
        }
    }

    /// Serve `base_name` + `extension` resized to `width × height`.
    ///
    /// Sizes over the configured maximum are refused before anything touches
    /// the filesystem.
    pub fn serve_resize(
        &self,
        base_name: &str,
        extension: &str,
        width: u32,
        height: u32,
    ) -> Result<CacheArtifact, ServeError> {
        if width > self.max_width || height > self.max_height {
            return Err(ServeError::SizeLimitExceeded {
                width,
                height,
                max_width: self.max_width,
                max_height: self.max_height,
            });
        }
        let paths = paths::derive_for_resize(
            base_name,
            extension,
            width,
            height,
            &self.source_root,
            &self.cache_root,
        );
        self.ensure(&paths, |paths| {
            imaging::resize(
                &self.backend,
                &self.writer,
                &paths.source,
                &paths.target,
                width,
                height,
            )
        })
    }

    /// Serve `base_name` + `extension` with the named template applied.
    pub fn serve_template(
        &self,
        base_name: &str,
        extension: &str,
        template_name: &str,
    ) -> Result<CacheArtifact, ServeError> {
        let argument_string = self
            .templates
            .get(template_name)
            .map_err(|_| ServeError::TemplateNotFound(template_name.to_string()))?;
        let paths = paths::derive_for_template(
            base_name,
            extension,
            template_name,
            &self.source_root,
            &self.cache_root,
        );
        self.ensure(&paths, |paths| {
            imaging::execute_template(
                &self.backend,
                &self.writer,
                argument_string,
                &paths.source,
                &paths.target,
            )
        })
    }

    fn ensure<F>(&self, paths: &ResolvedPaths, generate: F) -> Result<CacheArtifact, ServeError>
    where
        F: FnOnce(&ResolvedPaths) -> Result<Produced, TransformError>,
    {
        // Hits skip the lock entirely.
        if paths.target.is_file() {
            tracing::debug!(target = %paths.target.display(), "cache hit");
            return Ok(self.artifact(paths, Produced::Cached));
        }

        let outcome = self.in_flight.run(&paths.target, || generate(paths))?;
        match outcome {
            Produced::Written => tracing::info!(
                source = %paths.source.display(),
                target = %paths.target.display(),
                "generated derivative"
            ),
            Produced::Cached => tracing::debug!(
                target = %paths.target.display(),
                "generated concurrently by another request"
            ),
        }
        Ok(self.artifact(paths, outcome))
    }

    fn artifact(&self, paths: &ResolvedPaths, outcome: Produced) -> CacheArtifact {
        CacheArtifact {
            path: paths.target.clone(),
            outcome,
        }
    }
}

/// Per-path locks for generation in progress.
///
/// Entries exist only while some thread holds or waits for them.
#[derive(Default)]
struct InFlight {
    slots: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl InFlight {
    fn run<T>(&self, key: &Path, f: impl FnOnce() -> T) -> T {
        let slot = self
            .slots
            .lock()
            .entry(key.to_path_buf())
            .or_default()
            .clone();

        let result = {
            let _guard = slot.lock();
            f()
        };

        let mut slots = self.slots.lock();
        // Nobody else can pick up the slot while the map is locked, so two
        // references (the map's and ours) means nobody else wants it.
        if Arc::strong_count(&slot) == 2 {
            slots.remove(key);
        }
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Summary of cache behaviour over a batch of requests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub generated: u32,
    pub failed: u32,
}

impl CacheStats {
    pub fn record(&mut self, result: &Result<CacheArtifact, ServeError>) {
        match result {
            Ok(CacheArtifact {
                outcome: Produced::Cached,
                ..
            }) => self.hits += 1,
            Ok(_) => self.generated += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.hits += other.hits;
        self.generated += other.generated;
        self.failed += other.failed;
        self
    }

    pub fn total(&self) -> u32 {
        self.hits + self.generated + self.failed
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed > 0 {
            write!(
                f,
                "{} cached, {} generated, {} failed ({} total)",
                self.hits,
                self.generated,
                self.failed,
                self.total()
            )
        } else if self.hits > 0 {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                self.hits,
                self.generated,
                self.total()
            )
        } else {
            write!(f, "{} generated", self.generated)
        }
    }
}
