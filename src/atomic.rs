//! Write-to-temp-then-rename file publishing.
//!
//! Readers of the cache only ever see a complete file or no file: content is
//! produced in a temporary file next to the target and moved into place with
//! a single rename. Whatever goes wrong before that rename, the temporary
//! file is removed and the target is left as it was. A crash between the two
//! steps can leave a stray temp file behind, never a truncated target.
//!
//! ## Temp file placement
//!
//! Temp files live in the target's own directory so the rename never
//! crosses filesystems. They keep the target's extension because ImageMagick
//! picks the output format from the file name.

use std::io;
use std::path::Path;
use tempfile::TempPath;

/// How [`AtomicWriter`] obtains a temporary path for a target.
///
/// The returned [`TempPath`] deletes its file when dropped, which is how
/// every failure path gets its cleanup.
pub trait TempFileStrategy: Send + Sync {
    fn create(&self, target: &Path) -> io::Result<TempPath>;
}

/// Default strategy: a uniquely named hidden file beside the target,
/// e.g. `cache/dir/.hello.100x200-a1B2c3.png`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiblingTempFile;

impl TempFileStrategy for SiblingTempFile {
    fn create(&self, target: &Path) -> io::Result<TempPath> {
        let dir = target.parent().unwrap_or(Path::new("."));
        let stem = target
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffix = target
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let file = tempfile::Builder::new()
            .prefix(&format!(".{stem}-"))
            .suffix(&suffix)
            .tempfile_in(dir)?;
        Ok(file.into_temp_path())
    }
}

/// Whether [`AtomicWriter::produce`] found the target or wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Produced {
    Cached,
    Written,
}

/// Publishes files atomically using a [`TempFileStrategy`].
#[derive(Debug, Clone, Default)]
pub struct AtomicWriter<S = SiblingTempFile> {
    strategy: S,
}

impl AtomicWriter<SiblingTempFile> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: TempFileStrategy> AtomicWriter<S> {
    pub fn with_strategy(strategy: S) -> Self {
        Self { strategy }
    }

    /// Make sure `target` exists, calling `write` to fill it if it doesn't.
    ///
    /// 1. An existing regular file at `target` is returned as
    ///    [`Produced::Cached`] before any temp file is created.
    /// 2. Missing parent directories are created.
    /// 3. `write` receives a temp path carrying the target's extension.
    /// 4. On success the temp file is renamed over `target`.
    ///
    /// Errors from `write` come back unchanged; I/O errors from the
    /// surrounding steps are converted with `From<io::Error>`. In both cases
    /// the temp file is gone by the time this returns.
    pub fn produce<E, F>(&self, target: &Path, write: F) -> Result<Produced, E>
    where
        F: FnOnce(&Path) -> Result<(), E>,
        E: From<io::Error>,
    {
        if target.is_file() {
            return Ok(Produced::Cached);
        }

        if let Some(parent) = target.parent() {
            // create_dir_all succeeds when a concurrent request got there first.
            std::fs::create_dir_all(parent)?;
        }

        let temp = self.strategy.create(target)?;
        write(&temp)?;
        temp.persist(target).map_err(|e| e.error)?;
        Ok(Produced::Written)
    }
}
