//! Image tool backend trait and shared error type.
//!
//! The [`ImageBackend`] trait is the single seam between the cache and the
//! process that actually touches pixels. It takes the classic `convert`
//! calling convention, `<source> <args...> <output>`, and either leaves a
//! finished image at `output` or fails.
//!
//! The production implementation is
//! [`ImageMagickBackend`](super::imagemagick::ImageMagickBackend). Tests use
//! the recording [`MockBackend`](tests::MockBackend).

use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("{program} timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for image processing backends.
pub trait ImageBackend: Send + Sync {
    /// Run the tool as `<source> <args...> <output>`.
    fn convert(&self, source: &Path, args: &[String], output: &Path)
    -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::fs;

    /// Mock backend that records calls and copies the source to the output,
    /// so everything downstream sees a real file.
    #[derive(Default)]
    pub struct MockBackend {
        pub operations: Mutex<Vec<RecordedOp>>,
        pub fail_with: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedOp {
        pub source: String,
        pub args: Vec<String>,
        pub output: String,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// A backend whose every call fails without writing anything.
        pub fn failing(message: &str) -> Self {
            Self {
                operations: Mutex::new(Vec::new()),
                fail_with: Some(message.to_string()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn convert(
            &self,
            source: &Path,
            args: &[String],
            output: &Path,
        ) -> Result<(), BackendError> {
            self.operations.lock().push(RecordedOp {
                source: source.to_string_lossy().to_string(),
                args: args.to_vec(),
                output: output.to_string_lossy().to_string(),
            });
            if let Some(message) = &self.fail_with {
                return Err(BackendError::ProcessingFailed(message.clone()));
            }
            fs::copy(source, output)?;
            Ok(())
        }
    }

    #[test]
    fn mock_records_and_copies() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("in.png");
        let output = tmp.path().join("out.png");
        fs::write(&source, "pixels").unwrap();

        let backend = MockBackend::new();
        backend
            .convert(&source, &["-trim".to_string()], &output)
            .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "pixels");
        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].args, vec!["-trim"]);
        assert!(ops[0].source.ends_with("in.png"));
    }

    #[test]
    fn failing_mock_writes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("in.png");
        let output = tmp.path().join("out.png");
        fs::write(&source, "pixels").unwrap();

        let backend = MockBackend::failing("nope");
        let err = backend.convert(&source, &[], &output).unwrap_err();

        assert!(matches!(err, BackendError::ProcessingFailed(m) if m == "nope"));
        assert!(!output.exists());
        assert_eq!(backend.get_operations().len(), 1);
    }
}
