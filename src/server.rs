//! HTTP front end.
//!
//! Every `GET` path is treated as an image request:
//!
//! ```text
//! GET /dir/hello.100x200.png  →  cache.serve_resize("dir/hello", ".png", 100, 200)
//! GET /dir/hello.thumb.png    →  cache.serve_template("dir/hello", ".png", "thumb")
//! ```
//!
//! A hit answers `200` with the file and `Content-Type: image/<ext>`. Every
//! failure, whether a malformed path, an oversized request, a missing source
//! or a failed conversion, answers `404` with an empty body. The cause is
//! logged here and nowhere else reaches the client.
//!
//! Cache work is blocking (filesystem plus a child process) and runs on
//! tokio's blocking pool.
//!
//! The path is percent-decoded before matching, so `my%20photo.10x10.png`
//! finds `my photo.png`. A path that doesn't decode to UTF-8 is a 404. A
//! decoded `.` or `/` is still subject to the request grammar.

use crate::cache::{ImageCache, ServeError};
use crate::imaging::ImageBackend;
use crate::render::{self, RenderedImage};
use crate::request::ImageRequest;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Router serving images from `cache`.
pub fn router<B: ImageBackend + 'static>(cache: Arc<ImageCache<B>>) -> Router {
    Router::new()
        .fallback(get(serve_image::<B>))
        .layer(TraceLayer::new_for_http())
        .with_state(cache)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve<B: ImageBackend + 'static>(
    cache: Arc<ImageCache<B>>,
    addr: &str,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        source_root = %cache.source_root().display(),
        cache_root = %cache.cache_root().display(),
        templates = ?cache.templates().names(),
        "imageservice listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, router(cache))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn serve_image<B: ImageBackend + 'static>(
    State(cache): State<Arc<ImageCache<B>>>,
    uri: Uri,
) -> Response {
    let Ok(decoded) = percent_decode_str(uri.path()).decode_utf8() else {
        tracing::debug!(path = uri.path(), "request path is not UTF-8");
        return not_found();
    };
    let path: &str = &decoded;
    let Some(request) = ImageRequest::parse(path) else {
        tracing::debug!(path, "not an image request");
        return not_found();
    };

    let result = tokio::task::spawn_blocking(move || -> Result<RenderedImage, ServeError> {
        let artifact = cache.serve(&request)?;
        Ok(render::render(&artifact.path)?)
    })
    .await;

    match result {
        Ok(Ok(image)) => (
            [(header::CONTENT_TYPE, image.content_type)],
            image.bytes,
        )
            .into_response(),
        Ok(Err(e @ (ServeError::Execution(_) | ServeError::Io(_)))) => {
            tracing::warn!(path, error = %e, "image request failed");
            not_found()
        }
        Ok(Err(e)) => {
            tracing::debug!(path, error = %e, "image request refused");
            not_found()
        }
        Err(e) => {
            tracing::warn!(path, error = %e, "image worker did not complete");
            not_found()
        }
    }
}

fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}
