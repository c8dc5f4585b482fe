//! HTTP behaviour of the image router.
//!
//! The image tool is replaced by a shell script that copies its input to its
//! output, so the bytes served are the original's bytes.

#![cfg(unix)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use imageservice::cache::ImageCache;
use imageservice::config::ServiceConfig;
use imageservice::imaging::ImageMagickBackend;
use imageservice::server;
use imageservice::templates::TemplateRepository;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const COPY_FIRST_TO_LAST: &str = r#"for last; do :; done; cp "$1" "$last""#;

struct TestServer {
    _tmp: TempDir,
    config: ServiceConfig,
    router: axum::Router,
}

impl TestServer {
    fn new(script: &str) -> Self {
        Self::with_timeout(script, Duration::from_secs(10))
    }

    fn with_timeout(script: &str, timeout: Duration) -> Self {
        let tmp = TempDir::new().unwrap();
        let config = ServiceConfig {
            source_root: tmp.path().join("media"),
            cache_root: tmp.path().join("cache"),
            max_width: 1000,
            max_height: 1000,
            ..ServiceConfig::default()
        };
        let source = config.source_root.join("dir");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("hello.png"), b"original png").unwrap();
        fs::write(source.join("photo.jpg"), b"original jpg").unwrap();
        fs::write(source.join("my photo.png"), b"spaced png").unwrap();
        fs::write(source.join("café.png"), b"accented png").unwrap();

        let templates = TemplateRepository::parse(
            Path::new("imagemagick.templates"),
            "thumb = -thumbnail 100x100\n99999999999x5 = -flip\n",
        )
        .unwrap();
        let command: Vec<String> = ["sh", "-c", script, "fake-convert"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let backend = ImageMagickBackend::with_command(&command, timeout);
        let cache = Arc::new(ImageCache::new(&config, templates, backend));

        Self {
            _tmp: tmp,
            config,
            router: server::router(cache),
        }
    }

    fn copying() -> Self {
        Self::new(COPY_FIRST_TO_LAST)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        self.send(Method::GET, uri).await
    }

    async fn send(&self, method: Method, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let resp = self.router.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, body.to_vec())
    }
}

// =========================================================================
// Successful requests
// =========================================================================

#[tokio::test]
async fn resize_returns_image_with_content_type() {
    let server = TestServer::copying();

    let (status, content_type, body) = server.get("/dir/hello.100x200.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(body, b"original png");
    assert!(server.config.cache_root.join("dir/hello.100x200.png").is_file());
}

#[tokio::test]
async fn content_type_is_the_extension_verbatim() {
    let server = TestServer::copying();

    let (status, content_type, _) = server.get("/dir/photo.10x10.jpg").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/jpg"));
}

#[tokio::test]
async fn template_guesses_source_extension() {
    let server = TestServer::copying();

    let (status, content_type, body) = server.get("/dir/photo.thumb.jpg").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/jpg"));
    assert_eq!(body, b"original jpg");
    assert!(server.config.cache_root.join("dir/photo.thumb.jpg").is_file());
}

#[tokio::test]
async fn percent_encoded_names_are_decoded() {
    let server = TestServer::copying();

    let (status, content_type, body) = server.get("/dir/my%20photo.10x10.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(body, b"spaced png");
    assert!(server.config.cache_root.join("dir/my photo.10x10.png").is_file());

    let (status, _, body) = server.get("/dir/caf%C3%A9.thumb.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"accented png");
}

#[tokio::test]
async fn undecodable_or_dotted_encodings_are_not_found() {
    let server = TestServer::copying();

    for uri in ["/dir/bad%FF.10x10.png", "/%2E%2E/media/dir/hello.10x10.png"] {
        let (status, _, body) = server.get(uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert!(body.is_empty(), "{uri}");
    }
}

#[tokio::test]
async fn cached_image_is_served_without_the_tool() {
    let server = TestServer::new("exit 1");
    let cached = server.config.cache_root.join("dir/hello.50x50.png");
    fs::create_dir_all(cached.parent().unwrap()).unwrap();
    fs::write(&cached, b"primed").unwrap();

    let (status, _, body) = server.get("/dir/hello.50x50.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"primed");
}

// =========================================================================
// Everything else is 404 with an empty body
// =========================================================================

#[tokio::test]
async fn oversized_request_is_not_found() {
    let server = TestServer::copying();

    let (status, _, body) = server.get("/dir/hello.1001x10.png").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
    assert!(!server.config.cache_root.join("dir/hello.1001x10.png").exists());
}

#[tokio::test]
async fn overflowing_size_never_reaches_templates() {
    let server = TestServer::copying();

    let (status, _, body) = server.get("/dir/hello.99999999999x5.png").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
    assert!(!server.config.cache_root.join("dir/hello.99999999999x5.png").exists());
}

#[tokio::test]
async fn leading_zeros_share_the_canonical_artifact() {
    let server = TestServer::copying();

    let (status, _, body) = server.get("/dir/hello.0100x0200.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"original png");
    assert!(server.config.cache_root.join("dir/hello.100x200.png").is_file());
    assert!(!server.config.cache_root.join("dir/hello.0100x0200.png").exists());
}

#[tokio::test]
async fn missing_source_is_not_found() {
    let server = TestServer::copying();
    let (status, _, body) = server.get("/dir/nothing.10x10.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn unknown_template_is_not_found() {
    let server = TestServer::copying();
    let (status, _, _) = server.get("/dir/hello.nope.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_paths_are_not_found() {
    let server = TestServer::copying();

    for uri in [
        "/",
        "/dir/hello.png.",
        "/dir/hello.100x200.p-g",
        "/dir/hello.100x200.png.extra",
        "/../media/dir/hello.100x200.png",
    ] {
        let (status, _, body) = server.get(uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert!(body.is_empty(), "{uri}");
    }
}

#[tokio::test]
async fn failing_tool_is_not_found_and_leaves_nothing() {
    let server = TestServer::new("echo broken >&2; exit 1");

    let (status, _, body) = server.get("/dir/hello.100x200.png").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
    let dir = server.config.cache_root.join("dir");
    let leftovers: Vec<_> = fs::read_dir(&dir)
        .map(|entries| entries.collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn timed_out_tool_is_not_found() {
    let server = TestServer::with_timeout("exec sleep 5", Duration::from_millis(200));

    let (status, _, _) = server.get("/dir/hello.100x200.png").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!server.config.cache_root.join("dir/hello.100x200.png").exists());
}

#[tokio::test]
async fn post_is_rejected() {
    let server = TestServer::copying();
    let (status, _, _) = server.send(Method::POST, "/dir/hello.100x200.png").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn concurrent_requests_share_one_artifact() {
    let server = TestServer::new(r#"sleep 0.2; for last; do :; done; cp "$1" "$last""#);

    let (a, b, c) = tokio::join!(
        server.get("/dir/hello.20x20.png"),
        server.get("/dir/hello.20x20.png"),
        server.get("/dir/hello.20x20.png"),
    );

    for (status, _, body) in [a, b, c] {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"original png");
    }
    let names: Vec<_> = fs::read_dir(server.config.cache_root.join("dir"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("hello.20x20.png")]);
}
