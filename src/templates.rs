//! Named ImageMagick command templates.
//!
//! A template file maps names to argument strings, one per line:
//!
//! ```text
//! thumb = -thumbnail 150x150^ -gravity center -extent 150x150
//! grey  = -colorspace Gray
//! ```
//!
//! A request for `photo.thumb.jpg` runs the `thumb` arguments against
//! `photo.*`. The file must be named exactly `imagemagick.templates`; the
//! configured directories are searched in order and the first hit wins.
//!
//! The repository is built once at startup and never mutated, so it can be
//! shared across request handlers without locking.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Exact file name searched for in each template directory.
pub const TEMPLATES_FILENAME: &str = "imagemagick.templates";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("imagemagick.templates not found. Searched: {}", display_dirs(.searched))]
    NotFound { searched: Vec<PathBuf> },
    #[error("{}:{line}: expected `name = arguments`, got {content:?}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        content: String,
    },
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Loaded template definitions, name → argument string.
#[derive(Debug, Clone, Default)]
pub struct TemplateRepository {
    templates: HashMap<String, String>,
}

impl TemplateRepository {
    /// A repository with no templates. Every lookup fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Find and parse the first templates file in `dirs`.
    ///
    /// Directories that don't exist are skipped rather than treated as errors.
    pub fn load(dirs: &[PathBuf]) -> Result<Self, TemplateError> {
        let path = find_templates_file(dirs).ok_or_else(|| TemplateError::NotFound {
            searched: dirs.to_vec(),
        })?;
        let contents = fs::read_to_string(&path)?;
        let repo = Self::parse(&path, &contents)?;
        tracing::info!(
            path = %path.display(),
            templates = repo.len(),
            "loaded image templates"
        );
        Ok(repo)
    }

    /// Parse template definitions. `path` is only used in error messages.
    ///
    /// Each line is split on its first `=`, both halves trimmed. Blank lines
    /// are skipped; any other line without `=` is an error. A name defined
    /// twice keeps its last definition.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, TemplateError> {
        let mut templates = HashMap::new();
        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (name, args) = line.split_once('=').ok_or_else(|| TemplateError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                content: line.to_string(),
            })?;
            templates.insert(name.trim().to_string(), args.trim().to_string());
        }
        Ok(Self { templates })
    }

    /// Argument string for `name`, verbatim.
    pub fn get(&self, name: &str) -> Result<&str, TemplateError> {
        self.templates
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Template names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn find_templates_file(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(TEMPLATES_FILENAME))
        .find(|candidate| candidate.is_file())
}
