//! Turning a cached artifact into a response body.
//!
//! The content type comes straight from the file name: `image/` followed by
//! whatever follows the last `.`. No sniffing and no mapping table, so
//! `photo.jpg` is served as `image/jpg` and `photo.100x200` as
//! `image/100x200`. Clients of this service have always seen these values.

use std::fs;
use std::io;
use std::path::Path;

/// Reads a whole file into memory.
pub trait FileReader: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// [`FileReader`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl FileReader for FsReader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// `image/<text after the last '.'>` of the file name, or `image/<file name>`
/// when it has no dot.
pub fn content_type_for(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let subtype = match name.rsplit_once('.') {
        Some((_, after)) => after,
        None => name.as_ref(),
    };
    format!("image/{subtype}")
}

pub struct Renderer<R = FsReader> {
    reader: R,
}

impl Renderer {
    pub fn new() -> Self {
        Self { reader: FsReader }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: FileReader> Renderer<R> {
    pub fn with_reader(reader: R) -> Self {
        Self { reader }
    }

    pub fn render(&self, path: &Path) -> io::Result<RenderedImage> {
        Ok(RenderedImage {
            bytes: self.reader.read(path)?,
            content_type: content_type_for(path),
        })
    }
}

/// Render `path` from the local filesystem.
pub fn render(path: &Path) -> io::Result<RenderedImage> {
    Renderer::new().render(path)
}
