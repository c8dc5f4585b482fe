//! High-level transform operations.
//!
//! These functions combine source lookup, argument building, atomic
//! publishing and backend execution:
//!
//! ```text
//! resolve source ─▶ AtomicWriter::produce(target, |tmp| backend.convert(src, args, tmp))
//!                                        └─▶ copy source permissions onto tmp, then rename
//! ```
//!
//! A target that already exists is returned untouched without even looking
//! for the source.

use super::backend::{BackendError, ImageBackend};
use super::params::{resize_args, template_args};
use super::source::resolve_source;
use crate::atomic::{AtomicWriter, Produced, TempFileStrategy};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source image not found: {}", display_paths(.attempted))]
    SourceNotFound { attempted: Vec<PathBuf> },
    #[error("Image processing failed: {0}")]
    Execution(#[from] BackendError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Run `args` against `source`, writing `temp_target`.
///
/// The backend is called as `<resolved source> <args...> <temp_target>`.
/// Returns the resolved source path (with any guessed extension).
pub fn execute(
    backend: &impl ImageBackend,
    args: &[String],
    source: &Path,
    temp_target: &Path,
) -> Result<PathBuf> {
    let source = resolve_source(source)
        .map_err(|attempted| TransformError::SourceNotFound { attempted })?;
    backend.convert(&source, args, temp_target)?;
    Ok(source)
}

/// Resize `source` into `target` at exactly `width × height`.
pub fn resize<S: TempFileStrategy>(
    backend: &impl ImageBackend,
    writer: &AtomicWriter<S>,
    source: &Path,
    target: &Path,
    width: u32,
    height: u32,
) -> Result<Produced> {
    run(backend, writer, &resize_args(width, height), source, target)
}

/// Apply a template's argument string to `source`, writing `target`.
pub fn execute_template<S: TempFileStrategy>(
    backend: &impl ImageBackend,
    writer: &AtomicWriter<S>,
    argument_string: &str,
    source: &Path,
    target: &Path,
) -> Result<Produced> {
    run(backend, writer, &template_args(argument_string), source, target)
}

fn run<S: TempFileStrategy>(
    backend: &impl ImageBackend,
    writer: &AtomicWriter<S>,
    args: &[String],
    source: &Path,
    target: &Path,
) -> Result<Produced> {
    let produced = writer.produce::<TransformError, _>(target, |tmp| {
        let resolved = execute(backend, args, source, tmp)?;
        copy_permissions(&resolved, tmp);
        Ok(())
    })?;
    Ok(produced)
}

/// Give `target` the permission bits of `source`.
///
/// Called on the temp file, so the published image never shows the temp
/// file's private mode. A failure only costs metadata and is logged instead
/// of returned.
fn copy_permissions(source: &Path, target: &Path) {
    let result = fs::metadata(source).and_then(|meta| fs::set_permissions(target, meta.permissions()));
    if let Err(e) = result {
        tracing::warn!(
            source = %source.display(),
            target = %target.display(),
            error = %e,
            "could not copy source permissions to cached image"
        );
    }
}
