//! Request-path parsing.
//!
//! Two URL shapes are served, tried in this order:
//!
//! ```text
//! <name>.<W>x<H>[.<ext>]       resize, e.g. photos/hello.100x200.png
//! <name>.<template>[.<ext>]    template, e.g. photos/hello.thumb.png
//! ```
//!
//! `<name>` may contain `/` but never `.`, so a request cannot walk out of
//! the configured roots with `..`. `<W>`, `<H>` are decimal digits;
//! `<template>` and `<ext>` are word characters (`[A-Za-z0-9_]`).

use std::fmt;

/// What to do to the source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    Dimensions { width: u32, height: u32 },
    Template { name: String },
}

impl fmt::Display for Transform {
    /// The descriptor segment used in cache file names.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Dimensions { width, height } => write!(f, "{width}x{height}"),
            Transform::Template { name } => f.write_str(name),
        }
    }
}

/// A parsed image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Path-like name without extension, e.g. `dir/hello`.
    pub base_name: String,
    /// Empty, or the extension including its leading dot, e.g. `.png`.
    pub extension: String,
    pub transform: Transform,
}

impl fmt::Display for ImageRequest {
    /// The request path, without a leading `/`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.base_name, self.transform, self.extension)
    }
}

impl ImageRequest {
    pub fn resize(base_name: &str, extension: &str, width: u32, height: u32) -> Self {
        Self {
            base_name: base_name.to_string(),
            extension: extension.to_string(),
            transform: Transform::Dimensions { width, height },
        }
    }

    pub fn template(base_name: &str, extension: &str, name: &str) -> Self {
        Self {
            base_name: base_name.to_string(),
            extension: extension.to_string(),
            transform: Transform::Template {
                name: name.to_string(),
            },
        }
    }

    /// Parse a URL path (a leading `/` is ignored).
    ///
    /// Returns `None` for anything outside the grammar, including trailing
    /// dots and non-word extensions. A `<digits>x<digits>` descriptor is
    /// always a resize; if either side overflows `u32` the path is rejected
    /// rather than tried as a template name.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let (base_name, rest) = path.split_once('.')?;
        if base_name.is_empty() {
            return None;
        }

        let (descriptor, extension) = match rest.split_once('.') {
            Some((descriptor, ext)) => {
                if !is_word(ext) {
                    return None;
                }
                (descriptor, &rest[descriptor.len()..])
            }
            None => (rest, ""),
        };

        if is_dimensions(descriptor) {
            let (width, height) = parse_dimensions(descriptor)?;
            return Some(Self::resize(base_name, extension, width, height));
        }
        if is_word(descriptor) {
            return Some(Self::template(base_name, extension, descriptor));
        }
        None
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_dimensions(s: &str) -> bool {
    s.split_once('x')
        .is_some_and(|(w, h)| is_digits(w) && is_digits(h))
}

/// Parse `WxH`. Both sides must be plain digits that fit `u32`.
pub fn parse_dimensions(s: &str) -> Option<(u32, u32)> {
    if !is_dimensions(s) {
        return None;
    }
    let (w, h) = s.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resize_with_extension() {
        assert_eq!(
            ImageRequest::parse("/test.100x200.jpg"),
            Some(ImageRequest::resize("test", ".jpg", 100, 200))
        );
    }

    #[test]
    fn parses_resize_without_extension() {
        assert_eq!(
            ImageRequest::parse("/test.100x200"),
            Some(ImageRequest::resize("test", "", 100, 200))
        );
    }

    #[test]
    fn parses_nested_name() {
        let req = ImageRequest::parse("/dir1/dir2/hello.100x200.png").unwrap();
        assert_eq!(req.base_name, "dir1/dir2/hello");
        assert_eq!(req.extension, ".png");
    }

    #[test]
    fn keeps_case() {
        assert_eq!(
            ImageRequest::parse("/UpperCase.100x200.PNG"),
            Some(ImageRequest::resize("UpperCase", ".PNG", 100, 200))
        );
    }

    #[test]
    fn rejects_trailing_dot() {
        assert_eq!(ImageRequest::parse("/test.100x200."), None);
    }

    #[test]
    fn rejects_special_characters_in_extension() {
        assert_eq!(ImageRequest::parse("/test.100x200./"), None);
        assert_eq!(ImageRequest::parse("/test.100x200.p-g"), None);
    }

    #[test]
    fn rejects_extra_dots() {
        assert_eq!(ImageRequest::parse("/a.100x200.tar.gz"), None);
        assert_eq!(ImageRequest::parse("/../etc/passwd.1x1"), None);
    }

    #[test]
    fn rejects_missing_name_or_descriptor() {
        assert_eq!(ImageRequest::parse("/.100x200.png"), None);
        assert_eq!(ImageRequest::parse("/hello"), None);
        assert_eq!(ImageRequest::parse("/hello..png"), None);
    }

    #[test]
    fn parses_template() {
        assert_eq!(
            ImageRequest::parse("/photos/hello.thumb.png"),
            Some(ImageRequest::template("photos/hello", ".png", "thumb"))
        );
        assert_eq!(
            ImageRequest::parse("hello.TEST"),
            Some(ImageRequest::template("hello", "", "TEST"))
        );
    }

    #[test]
    fn oversized_number_is_rejected() {
        assert_eq!(ImageRequest::parse("/a.99999999999x1.png"), None);
        assert_eq!(ImageRequest::parse("/a.1x99999999999"), None);
        assert_eq!(parse_dimensions("4294967296x1"), None);
    }

    #[test]
    fn largest_u32_is_still_a_resize() {
        assert_eq!(
            ImageRequest::parse("/a.4294967295x1.png"),
            Some(ImageRequest::resize("a", ".png", u32::MAX, 1))
        );
    }

    #[test]
    fn leading_zeros_normalize_in_descriptor() {
        let req = ImageRequest::parse("/hello.0100x0200.png").unwrap();
        assert_eq!(req, ImageRequest::resize("hello", ".png", 100, 200));
        assert_eq!(req.to_string(), "hello.100x200.png");
    }

    #[test]
    fn descriptor_display() {
        assert_eq!(ImageRequest::resize("a", "", 100, 200).transform.to_string(), "100x200");
        assert_eq!(ImageRequest::template("a", "", "thumb").transform.to_string(), "thumb");
    }

    #[test]
    fn request_display_is_its_path() {
        for path in ["dir/hello.100x200.png", "hello.100x200", "a/b.thumb.PNG"] {
            assert_eq!(ImageRequest::parse(path).unwrap().to_string(), path);
        }
    }

    #[test]
    fn parse_dimensions_rejects_signs_and_spaces() {
        assert_eq!(parse_dimensions("100x200"), Some((100, 200)));
        assert_eq!(parse_dimensions("+100x200"), None);
        assert_eq!(parse_dimensions("100 x200"), None);
        assert_eq!(parse_dimensions("100X200"), None);
    }
}
