//! Argument lists for the image tool.
//!
//! These describe *what* ImageMagick should do; the
//! [`backend`](super::backend) decides how to run it. Keeping them as plain
//! token lists makes the built-in resize and the user-defined templates go
//! through exactly the same execution path.

/// Tokens for the built-in resize.
///
/// Trims borders, shrinks to fit inside `W×H` without ever enlarging
/// (`W×H>`), then centers the result on a white `W×H` canvas. The output is
/// always exactly the requested size.
pub fn resize_args(width: u32, height: u32) -> Vec<String> {
    let size = format!("{width}x{height}");
    vec![
        "-trim".to_string(),
        "-resize".to_string(),
        format!("{size}>"),
        "-size".to_string(),
        size,
        "xc:white".to_string(),
        "+swap".to_string(),
        "-gravity".to_string(),
        "center".to_string(),
        "-composite".to_string(),
    ]
}

/// Tokens for a template argument string, split on runs of whitespace.
///
/// Templates are conventionally written with two spaces between arguments;
/// any amount of whitespace separates tokens here. There is no quoting, so
/// a single argument can't contain spaces.
pub fn template_args(argument_string: &str) -> Vec<String> {
    argument_string
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
