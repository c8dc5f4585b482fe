//! Image transforms via an external tool.
//!
//! | Operation | Arguments |
//! |---|---|
//! | **Resize** | `-trim -resize WxH> -size WxH xc:white +swap -gravity center -composite` |
//! | **Template** | the template's argument string, split on whitespace |
//!
//! The module is split into:
//! - **Parameters**: argument lists for each transform
//! - **Source**: locating the original, with extension guessing
//! - **Backend**: [`ImageBackend`] trait + [`ImageMagickBackend`]
//! - **Operations**: High-level functions combining the above with atomic publishing

pub mod backend;
pub mod imagemagick;
pub mod operations;
mod params;
mod source;

pub use backend::{BackendError, ImageBackend};
pub use imagemagick::ImageMagickBackend;
pub use operations::{TransformError, execute, execute_template, resize};
pub use params::{resize_args, template_args};
pub use source::{CANDIDATE_EXTENSIONS, resolve_source};
