//! Error types for the pipeline and its configuration

use crate::pipeline::Stage;
use cs2cdn_tools::{ProvisionError, RunError};
use cs2cdn_vpk::ListingError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is present but unusable
    #[error("Invalid {field}: {reason}")]
    InvalidValue {
        /// Offending option
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Missing required configuration value
    #[error("Missing required configuration: {0}")]
    MissingRequired(&'static str),
}

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Tool provisioning failed
    #[error("Failed to ensure tools: {0}")]
    Provision(#[from] ProvisionError),

    /// An external command failed
    #[error("{stage} failed: {source}")]
    Command {
        /// Stage that ran the command
        stage: Stage,
        /// Underlying command error
        #[source]
        source: RunError,
    },

    /// No manifest file appeared in the data directory
    #[error("No manifest file found in {}", .dir.display())]
    ManifestNotFound {
        /// Directory that was searched
        dir: PathBuf,
    },

    /// A manifest file name did not carry an identity
    #[error("Unexpected manifest file format: {}", .path.display())]
    UnexpectedManifestName {
        /// Offending file
        path: PathBuf,
    },

    /// Directory listing resolution failed
    #[error("Failed to generate segment list: {0}")]
    Listing(#[from] ListingError),

    /// The published-URL manifest is not a JSON string map
    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        /// Manifest path
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem operation failed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path being operated on
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn command(stage: Stage) -> impl FnOnce(RunError) -> Self {
        move |source| Self::Command { stage, source }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
