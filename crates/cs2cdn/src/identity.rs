//! Manifest identity tracking
//!
//! DepotDownloader writes `manifest_<depot>_<id>.txt` into its download
//! directory. The `<id>` part identifies the depot revision; the last one
//! processed is kept in a single-line file and compared on the next run.

use crate::error::{PipelineError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// A manifest file found in the download directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    /// File location
    pub path: PathBuf,
    /// Identity token parsed from the file name
    pub id: String,
}

/// Extract the identity from a manifest file name.
///
/// `manifest_2347770_5002689339188222421.txt` yields
/// `5002689339188222421` for depot `2347770`.
pub fn manifest_id(file_name: &str, depot_id: u32) -> Option<&str> {
    let rest = file_name.strip_prefix(&format!("manifest_{depot_id}_"))?;
    let id = rest.strip_suffix(".txt").unwrap_or(rest);

    if id.is_empty() || id.contains(['_', '/', '\\']) {
        None
    } else {
        Some(id)
    }
}

/// Locate the manifest for `depot_id` in `dir`.
///
/// When several manifests are present the most recently modified one wins;
/// ties are broken by file name.
///
/// # Errors
///
/// Returns [`PipelineError::ManifestNotFound`] when no file matches and
/// [`PipelineError::UnexpectedManifestName`] when the newest match carries no
/// usable identity.
pub fn find_manifest(dir: &Path, depot_id: u32) -> Result<ManifestFile> {
    let prefix = format!("manifest_{depot_id}_");
    let entries = fs::read_dir(dir).map_err(|source| match source.kind() {
        ErrorKind::NotFound => PipelineError::ManifestNotFound {
            dir: dir.to_path_buf(),
        },
        _ => PipelineError::io(dir, source),
    })?;

    let mut newest: Option<(SystemTime, String, PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|source| PipelineError::io(dir, source))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&prefix) {
            continue;
        }

        let metadata = entry
            .metadata()
            .map_err(|source| PipelineError::io(entry.path(), source))?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        debug!("Found manifest candidate {name}");
        let candidate = (modified, name, entry.path());
        if newest.as_ref().is_none_or(|current| candidate > *current) {
            newest = Some(candidate);
        }
    }

    let Some((_, name, path)) = newest else {
        return Err(PipelineError::ManifestNotFound {
            dir: dir.to_path_buf(),
        });
    };

    match manifest_id(&name, depot_id) {
        Some(id) => Ok(ManifestFile {
            id: id.to_string(),
            path,
        }),
        None => Err(PipelineError::UnexpectedManifestName { path }),
    }
}

/// Single-line store for the last processed manifest id
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    /// Store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored id with surrounding whitespace removed; empty when the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the file exists but cannot be read.
    pub fn read(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.trim().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(PipelineError::io(&self.path, source)),
        }
    }

    /// Replace the stored id.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the file cannot be written.
    pub fn write(&self, id: &str) -> Result<()> {
        fs::write(&self.path, id).map_err(|source| PipelineError::io(&self.path, source))
    }
}
