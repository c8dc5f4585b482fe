//! # imageservice
//!
//! On-demand image derivatives with a plain filesystem cache. A client asks
//! for an image at a size or through a named ImageMagick template; the first
//! request generates the file, every later one is a single `stat` and a read.
//!
//! # Architecture
//!
//! ```text
//! GET /dir/hello.100x200.png
//!   │
//!   ├─ request    parse path        → ImageRequest { "dir/hello", ".png", 100x200 }
//!   ├─ cache      size limit, lock  → paths: media/dir/hello.png → cache/dir/hello.100x200.png
//!   │   └─ imaging  guess source extension, run `convert`, publish atomically
//!   └─ render     read bytes        → 200, Content-Type: image/png
//! ```
//!
//! Any failure along the way is a `404` at the HTTP boundary and a tagged error
//! everywhere else.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`request`] | URL path grammar → [`request::ImageRequest`] |
//! | [`paths`] | Source and cache file naming, URL rewriting |
//! | [`templates`] | `imagemagick.templates` loading and lookup |
//! | [`atomic`] | Write-to-temp-then-rename publishing |
//! | [`imaging`] | External image tool: argument lists, source lookup, execution |
//! | [`cache`] | The orchestrator: limits, hits, generation, per-path locking |
//! | [`render`] | Artifact bytes + content type |
//! | [`server`] | axum router and listener |
//! | [`prime`] | Parallel cache warming over a source tree |
//! | [`config`] | `imageservice.toml` loading and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The File Name Is the Cache Key
//!
//! Derivatives are stored under names derived from the request
//! (`hello.100x200.png`, `hello.thumb.png`). There is no index to rebuild or
//! corrupt, a cache can be primed or pruned with ordinary shell tools, and a hit
//! costs one `stat`. The price is that changing an original does not invalidate
//! its derivatives; delete them to regenerate.
//!
//! ## ImageMagick as a Subprocess
//!
//! Templates are raw `convert` argument strings, so the service must run the
//! real tool. The backend sits behind the [`imaging::ImageBackend`] trait, which
//! keeps the cache logic testable without ImageMagick installed and bounds every
//! run with a timeout.
//!
//! ## Nothing Partial Is Ever Visible
//!
//! The tool writes to a temporary file beside the target, which is renamed into
//! place only after a successful exit. A crash, a timeout or a failed conversion
//! leaves no target and no temp file behind.

pub mod atomic;
pub mod cache;
pub mod config;
pub mod imaging;
pub mod output;
pub mod paths;
pub mod prime;
pub mod render;
pub mod request;
pub mod server;
pub mod templates;
