//! External tooling for the CS2 CDN pipeline
//!
//! - [`runner`]: spawn DepotDownloader and Source2Viewer-CLI, capturing or
//!   streaming their output
//! - [`provision`]: make sure both tools exist locally, fetching missing ones
//!   from their latest GitHub release
//! - [`release`]: minimal GitHub release index client
//! - [`platform`]: host OS and architecture naming for asset selection

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod platform;
pub mod provision;
pub mod release;
pub mod runner;

pub use error::{ProvisionError, Result, RunError};
pub use platform::{Arch, OsFamily, Platform};
pub use provision::{Provisioner, ToolSpec, extract_zip};
pub use release::{Asset, GITHUB_API, Release, ReleaseClient};
pub use runner::{
    CommandOutput, CommandRunner, Invocation, OutputSink, OutputStream, ProcessRunner,
    TracingSink,
};
