//! ImageMagick backend: runs `convert` (or a configured equivalent) as a
//! child process.
//!
//! The command is configurable as a list so both ImageMagick 6 (`convert`)
//! and 7 (`magick convert`) work:
//!
//! ```text
//! ["convert"]            →  convert <source> <args...> <output>
//! ["magick", "convert"]  →  magick convert <source> <args...> <output>
//! ```
//!
//! The child gets no stdin and no stdout. Its stderr is collected and
//! attached to the error when it exits non-zero. A child still running at
//! the deadline is killed and reported as [`BackendError::TimedOut`].

use super::backend::{BackendError, ImageBackend};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct ImageMagickBackend {
    program: String,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl ImageMagickBackend {
    pub fn new() -> Self {
        Self::with_command(&["convert".to_string()], Duration::from_secs(30))
    }

    /// Backend running `command[0]` with `command[1..]` placed before the
    /// source path.
    ///
    /// An empty `command` falls back to `convert`; config validation rejects
    /// that case before it gets here.
    pub fn with_command(command: &[String], timeout: Duration) -> Self {
        let (program, leading_args) = match command.split_first() {
            Some((program, rest)) => (program.clone(), rest.to_vec()),
            None => ("convert".to_string(), Vec::new()),
        };
        Self {
            program,
            leading_args,
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for ImageMagickBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for ImageMagickBackend {
    fn convert(
        &self,
        source: &Path,
        args: &[String],
        output: &Path,
    ) -> Result<(), BackendError> {
        tracing::debug!(
            program = %self.program,
            source = %source.display(),
            output = %output.display(),
            ?args,
            "running image tool"
        );

        let mut child = Command::new(&self.program)
            .args(&self.leading_args)
            .arg(source)
            .args(args)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BackendError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Drain stderr on its own thread so a chatty child can't block on a
        // full pipe while we poll.
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            })
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BackendError::TimedOut {
                    program: self.program.clone(),
                    timeout: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(BackendError::Failed {
                program: self.program.clone(),
                status,
                stderr: stderr.trim().to_string(),
            })
        }
    }
}
