//! Error types for directory listing resolution

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving a VPK directory listing.
///
/// Malformed lines and unparseable `fnumber` tokens are not errors; they are
/// logged and skipped by the resolver.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The listing could not be opened
    #[error("Failed to open directory listing {path}: {source}")]
    Open {
        /// Path to the listing file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading from the listing failed part way through
    #[error("Failed to read directory listing: {0}")]
    Read(#[source] std::io::Error),

    /// The segment list could not be written
    #[error("Failed to write segment list {path}: {source}")]
    Write {
        /// Path to the output file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The filter prefix was empty
    #[error("Path prefix must not be empty")]
    EmptyPrefix,
}

/// Result type for listing operations
pub type Result<T> = std::result::Result<T, ListingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ListingError::EmptyPrefix;
        assert_eq!(err.to_string(), "Path prefix must not be empty");

        let err = ListingError::Open {
            path: PathBuf::from("dir.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to open directory listing dir.txt: missing"
        );
    }
}
