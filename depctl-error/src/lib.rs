use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type HostResult<T> = Result<T, HostError>;
pub type DepctlResult<T> = Result<T, DepctlError>;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command failed: {program} (exit={code:?}): {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command timed out: {program} after {timeout_secs}s")]
    CommandTimeout { program: String, timeout_secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum DepctlError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error in {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("Environment detection failed: {0}")]
    Detection(String),

    #[error("Install failed for {package}: {reason}")]
    Install { package: String, reason: String },

    #[error("Fatal: {0}")]
    Fatal(String),
}

impl DepctlError {
    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn install(package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Install {
            package: package.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that must stop the whole run.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Fatal(_))
    }
}
