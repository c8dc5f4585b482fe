//! Service configuration.
//!
//! Loaded from a single TOML file (`imageservice.toml` by default). Every key
//! is optional; a missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! source_root = "media"            # Originals, e.g. media/dir/hello.png
//! cache_root = "cache"             # Derivatives, e.g. cache/dir/hello.100x200.png
//! max_width = 2048                 # Larger requests are answered with 404
//! max_height = 2048
//! template_dirs = ["templates"]    # Searched in order for imagemagick.templates
//! convert_command = ["convert"]    # e.g. ["magick", "convert"] for ImageMagick 7
//! timeout_secs = 30                # Kill the image tool after this long
//! bind = "127.0.0.1:8080"          # HTTP listen address
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::ImageMagickBackend;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "imageservice.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings for the cache, the image tool, and the HTTP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Root directory of original images.
    pub source_root: PathBuf,
    /// Root directory of generated derivatives. Never cleaned up.
    pub cache_root: PathBuf,
    /// Largest width a request may ask for.
    pub max_width: u32,
    /// Largest height a request may ask for.
    pub max_height: u32,
    /// Directories searched, in order, for `imagemagick.templates`.
    pub template_dirs: Vec<PathBuf>,
    /// Image tool program followed by any leading arguments.
    pub convert_command: Vec<String>,
    /// Seconds before a running image tool is killed.
    pub timeout_secs: u64,
    /// Address the HTTP server listens on.
    pub bind: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("media"),
            cache_root: PathBuf::from("cache"),
            max_width: 2048,
            max_height: 2048,
            template_dirs: vec![PathBuf::from("templates")],
            convert_command: vec!["convert".to_string()],
            timeout_secs: 30,
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(ConfigError::Validation(
                "max_width and max_height must be positive".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be positive".into(),
            ));
        }
        if self.convert_command.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "convert_command must name a program".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The image tool described by `convert_command` and `timeout_secs`.
    pub fn backend(&self) -> ImageMagickBackend {
        ImageMagickBackend::with_command(&self.convert_command, self.timeout())
    }
}

/// Load and validate a config file.
///
/// Returns defaults if `path` doesn't exist; an unreadable or invalid file is
/// an error.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    if !path.exists() {
        return Ok(ServiceConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let config: ServiceConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// A documented stock config, as printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r#"# imageservice configuration
# All options are optional - defaults shown below.

# Directory holding the original images.
source_root = "media"

# Directory receiving generated images. Entries are never expired; delete
# files here to force regeneration.
cache_root = "cache"

# Requests larger than this are answered with 404.
max_width = 2048
max_height = 2048

# Directories searched, in order, for a file named imagemagick.templates.
# Each line of that file is `name = arguments`.
template_dirs = ["templates"]

# Image tool command. Use ["magick", "convert"] for ImageMagick 7.
convert_command = ["convert"]

# Seconds before a running image tool is killed.
timeout_secs = 30

# HTTP listen address.
bind = "127.0.0.1:8080"
"#
}
