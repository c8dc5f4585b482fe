//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>` or
//! `String`) for testability and a `print_*` wrapper that writes to stdout.
//! Format functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Fetch
//!
//! ```text
//! dir/hello.100x200.png
//!     Cache: cache/dir/hello.100x200.png (generated)
//! ```
//!
//! ## Prime
//!
//! ```text
//! dir/hello.100x200.png: generated
//! dir/world.100x200.png: cached
//! dir/broken.100x200.png: failed
//!     Source image not found: media/dir/broken.png
//! ```
//!
//! followed by a `Cache:` summary line from [`CacheStats`].

use crate::atomic::Produced;
use crate::cache::{CacheArtifact, CacheStats, ServeError};
use crate::prime::PrimeEvent;
use crate::request::ImageRequest;

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn outcome_label(outcome: &Produced) -> &'static str {
    match outcome {
        Produced::Cached => "cached",
        Produced::Written => "generated",
    }
}

// ============================================================================
// fetch
// ============================================================================

pub fn format_fetch_output(request: &ImageRequest, artifact: &CacheArtifact) -> Vec<String> {
    vec![
        request.to_string(),
        format!(
            "{}Cache: {} ({})",
            indent(1),
            artifact.path.display(),
            outcome_label(&artifact.outcome)
        ),
    ]
}

pub fn print_fetch_output(request: &ImageRequest, artifact: &CacheArtifact) {
    for line in format_fetch_output(request, artifact) {
        println!("{}", line);
    }
}

// ============================================================================
// prime
// ============================================================================

/// One header line per request, plus the error as context on failure.
pub fn format_prime_event(event: &PrimeEvent) -> Vec<String> {
    match &event.result {
        Ok(artifact) => vec![format!(
            "{}: {}",
            event.request,
            outcome_label(&artifact.outcome)
        )],
        Err(e) => vec![
            format!("{}: failed", event.request),
            format!("{}{}", indent(1), e),
        ],
    }
}

pub fn format_prime_summary(stats: &CacheStats) -> String {
    format!("Cache: {}", stats)
}

/// Human-readable reason for a failed request, for the CLI's error exit.
pub fn format_serve_error(request: &ImageRequest, error: &ServeError) -> String {
    format!("{}: {}", request, error)
}
