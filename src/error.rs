//! Build error taxonomy.
//!
//! Every pipeline failure is terminal for the current build; no stage
//! retries. Errors carry the failing path or command so the final message
//! names what broke.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// The working directory could not be created, entered or removed.
    #[error("working directory {}: {source}", .path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An external command failed to launch or exited non-zero.
    #[error("`{command}` failed{}{}", code_suffix(.code), stderr_suffix(.stderr))]
    Process {
        command: String,
        /// Exit code, if the process ran at all.
        code: Option<i32>,
        stderr: String,
    },

    /// A copy/mkdir/read/write failed while materializing the manifest.
    #[error("{}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The archive container could not be written.
    #[error("cannot write archive {}: {message}", .path.display())]
    ArchiveWrite { path: PathBuf, message: String },

    /// The archive container could not be opened or parsed.
    #[error("cannot read archive {}: {message}", .path.display())]
    ArchiveRead { path: PathBuf, message: String },

    /// The application manifest is missing or does not describe a
    /// packageable project.
    #[error("application manifest {}: {message}", .path.display())]
    Project { path: PathBuf, message: String },
}

impl BuildError {
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BuildError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn archive_write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        BuildError::ArchiveWrite {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn archive_read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        BuildError::ArchiveRead {
            path: path.into(),
            message: message.into(),
        }
    }
}

fn code_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {code})"),
        None => " to start".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}
