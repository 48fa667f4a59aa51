//! Single-line shell command capture.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Command, Stdio};

use thiserror::Error;

/// Failures running a shell command.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The shell could not be started.
    #[error("failed to run '{command}': {source}")]
    Spawn {
        /// Command line.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading the command's output failed.
    #[error("failed to read output of '{command}': {source}")]
    Read {
        /// Command line.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The command exited unsuccessfully.
    #[error("'{command}' exited with status {}", code.map_or_else(|| "signal".to_owned(), |code| code.to_string()))]
    Status {
        /// Command line.
        command: String,
        /// Exit code, absent when terminated by a signal.
        code: Option<i32>,
    },
    /// The command printed nothing.
    #[error("'{command}' produced no output")]
    EmptyOutput {
        /// Command line.
        command: String,
    },
}

/// Runs a shell command line and captures its first output line.
#[cfg_attr(test, mockall::automock)]
pub trait ShellRunner {
    /// Runs `command` and returns its first line of standard output, without
    /// the line terminator, reading at most `limit` bytes.
    ///
    /// # Errors
    ///
    /// Fails when the command cannot run, exits unsuccessfully or prints
    /// nothing.
    fn first_line(&self, command: &str, limit: usize) -> Result<String, ShellError>;
}

/// [`ShellRunner`] that executes through `sh -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl ShellRunner for SystemShell {
    fn first_line(&self, command: &str, limit: usize) -> Result<String, ShellError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ShellError::Spawn {
                command: command.to_owned(),
                source,
            })?;

        let read_error = |source| ShellError::Read {
            command: command.to_owned(),
            source,
        };
        let mut line = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            reader
                .by_ref()
                .take(u64::try_from(limit).unwrap_or(u64::MAX))
                .read_until(b'\n', &mut line)
                .map_err(read_error)?;
            // Drain the remainder so the child never blocks on a full pipe.
            io::copy(&mut reader, &mut io::sink()).map_err(read_error)?;
        }

        let status = child.wait().map_err(|source| ShellError::Spawn {
            command: command.to_owned(),
            source,
        })?;
        if !status.success() {
            return Err(ShellError::Status {
                command: command.to_owned(),
                code: status.code(),
            });
        }

        let decoded = String::from_utf8_lossy(&line);
        let text = decoded.trim_end_matches(['\n', '\r']);
        if text.is_empty() {
            return Err(ShellError::EmptyOutput {
                command: command.to_owned(),
            });
        }
        Ok(text.to_owned())
    }
}
