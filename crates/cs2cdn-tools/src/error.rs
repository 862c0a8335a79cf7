//! Error types for tool execution and provisioning

use crate::runner::CommandOutput;
use reqwest::StatusCode;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors from running an external command.
///
/// `Failed` and `Timeout` keep whatever output was captured before the
/// process ended.
#[derive(Debug, Error)]
pub enum RunError {
    /// The process could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The process exited unsuccessfully
    #[error("Command execution failed: {command} exited with {status}")]
    Failed {
        /// Rendered command line
        command: String,
        /// Exit status of the process
        status: ExitStatus,
        /// Output captured before exit
        output: CommandOutput,
    },

    /// The deadline elapsed before the process exited
    #[error("Command timed out after {}s: {command}", .deadline.as_secs())]
    Timeout {
        /// Rendered command line
        command: String,
        /// Deadline that elapsed
        deadline: Duration,
        /// Output captured before the process was killed
        output: CommandOutput,
    },

    /// Waiting on the process failed
    #[error("Failed waiting for {command}: {source}")]
    Wait {
        /// Rendered command line
        command: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The output file for redirected stdout could not be created
    #[error("Failed to create output file {path}: {source}")]
    OutputFile {
        /// Output file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    /// Output captured before the failure, if the process ran at all.
    pub fn output(&self) -> Option<&CommandOutput> {
        match self {
            Self::Failed { output, .. } | Self::Timeout { output, .. } => Some(output),
            _ => None,
        }
    }

    /// `true` if the failure was a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors from provisioning external tools.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Unexpected HTTP status
    #[error("Request to {url} failed with status {status}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// Response status
        status: StatusCode,
    },

    /// Release descriptor could not be decoded
    #[error("Failed to decode release JSON for {repo}: {source}")]
    InvalidRelease {
        /// `owner/name` of the repository
        repo: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// No release asset ends with the platform suffix
    #[error("Asset with suffix {suffix} not found in latest release of {repo}")]
    AssetNotFound {
        /// `owner/name` of the repository
        repo: String,
        /// Platform-resolved asset suffix
        suffix: String,
    },

    /// Archive could not be read
    #[error("Failed to read zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Archive entry would be written outside the tools directory
    #[error("Illegal file path in archive: {0}")]
    IllegalPath(String),

    /// Filesystem operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being operated on
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Tool executable still missing after provisioning
    #[error("Executable for {tool} not found at {path}")]
    MissingExecutable {
        /// Tool name
        tool: String,
        /// Expected executable path
        path: PathBuf,
    },
}

impl ProvisionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;
