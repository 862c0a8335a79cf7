//! Counter-Strike 2 econ image CDN pipeline
//!
//! Watches depot 2347770 of app 730 for a new manifest, downloads only the
//! VPK segments that hold `panorama/images/econ` entries, extracts the
//! images and merges their public URLs into `cdn.json`.
//!
//! The building blocks live in the sibling crates:
//! - `cs2cdn-vpk` resolves the VPK directory listing into segment files
//! - `cs2cdn-tools` runs and provisions DepotDownloader and
//!   Source2Viewer-CLI
//!
//! This crate wires them into a [`Pipeline`] configured by [`Cli`].

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod commands;
pub mod config;
pub mod error;
pub mod identity;
pub mod pipeline;
pub mod publish;
pub mod rename;

pub use commands::ToolCommands;
pub use config::{Cli, Command, DEFAULT_BASE_URL, PipelineConfig};
pub use error::{ConfigError, PipelineError, Result};
pub use identity::{IdentityStore, ManifestFile, find_manifest, manifest_id};
pub use pipeline::{Pipeline, RunOutcome, Stage, provisioner};
pub use publish::{CdnManifest, publish_directory};
pub use rename::{strip_png_suffixes, stripped_name};
