//! Published-URL manifest (`cdn.json`)
//!
//! A flat JSON object mapping each published file path to its public URL.
//! Entries are kept sorted so that rewriting an unchanged manifest produces
//! identical bytes.

use crate::error::{PipelineError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Path to URL map persisted as `cdn.json`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdnManifest {
    entries: BTreeMap<String, String>,
}

impl CdnManifest {
    /// Load the manifest at `path`; a missing or blank file yields an empty
    /// manifest.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Json`] if the file is not a JSON object of
    /// strings, or [`PipelineError::Io`] if it cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No manifest at {}, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(PipelineError::io(path, source)),
        };

        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        let entries = serde_json::from_str(&data).map_err(|source| PipelineError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { entries })
    }

    /// Write the manifest as JSON with two-space indentation.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            PipelineError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, json).map_err(|source| PipelineError::io(path, source))
    }

    /// Insert or replace one entry
    pub fn insert(&mut self, key: impl Into<String>, url: impl Into<String>) {
        self.entries.insert(key.into(), url.into());
    }

    /// Add every `.png` file under `root` (case-insensitive extension).
    ///
    /// The key is the walked path with `/` separators, starting at `root` as
    /// given; the value is `base_url` followed by the key. Returns the number
    /// of files visited. Unreadable entries are logged and skipped.
    pub fn add_directory(&mut self, root: &Path, base_url: &str) -> usize {
        let mut added = 0;

        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error accessing path: {e}");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_lowercase();
            if !name.ends_with(".png") {
                continue;
            }

            let key = entry.path().to_string_lossy().replace('\\', "/");
            let url = format!("{base_url}{key}");
            self.entries.insert(key, url);
            added += 1;
        }

        added
    }

    /// URL for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Merge every `.png` under `output_dir` into the manifest at
/// `manifest_path` and rewrite it. Returns the number of files published.
///
/// # Errors
///
/// See [`CdnManifest::load`] and [`CdnManifest::save`].
pub fn publish_directory(manifest_path: &Path, output_dir: &Path, base_url: &str) -> Result<usize> {
    let mut manifest = CdnManifest::load(manifest_path)?;
    let published = manifest.add_directory(output_dir, base_url);
    manifest.save(manifest_path)?;

    debug!(
        "Manifest {} now holds {} entries",
        manifest_path.display(),
        manifest.len()
    );
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BASE: &str = "https://cdn.example.com/repo@main/";

    #[test]
    fn test_load_missing_and_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cdn.json");
        assert!(CdnManifest::load(&path).unwrap().is_empty());

        fs::write(&path, "\n").unwrap();
        assert!(CdnManifest::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_load_rejects_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cdn.json");
        fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(
            CdnManifest::load(&path),
            Err(PipelineError::Json { .. })
        ));
    }

    #[test]
    fn test_save_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cdn.json");

        let mut manifest = CdnManifest::default();
        manifest.insert("static/b.png", format!("{BASE}static/b.png"));
        manifest.insert("static/a.png", format!("{BASE}static/a.png"));
        manifest.save(&path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\n  \"static/a.png\": \"https://cdn.example.com/repo@main/static/a.png\",\n  \"static/b.png\": \"https://cdn.example.com/repo@main/static/b.png\"\n}"
        );
    }

    #[test]
    fn test_escaped_input_is_rewritten_literally() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cdn.json");
        fs::write(&path, "{\n  \"static/a\\u0026b.png\": \"https://x/static/a\\u0026b.png\"\n}").unwrap();

        let manifest = CdnManifest::load(&path).unwrap();
        assert_eq!(manifest.get("static/a&b.png"), Some("https://x/static/a&b.png"));

        manifest.save(&path).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        assert_eq!(
            first,
            "{\n  \"static/a&b.png\": \"https://x/static/a&b.png\"\n}"
        );

        CdnManifest::load(&path).unwrap().save(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_add_directory_selects_png() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("static");
        let econ = root.join("panorama/images/econ");
        fs::create_dir_all(&econ).unwrap();
        fs::write(econ.join("ak47.png"), b"").unwrap();
        fs::write(econ.join("LOGO.PNG"), b"").unwrap();
        fs::write(econ.join("readme.txt"), b"").unwrap();

        let mut manifest = CdnManifest::default();
        assert_eq!(manifest.add_directory(&root, BASE), 2);

        let keys: Vec<&str> = manifest.iter().map(|(k, _)| k).collect();
        assert!(keys[0].ends_with("static/panorama/images/econ/LOGO.PNG"));
        assert!(keys[1].ends_with("static/panorama/images/econ/ak47.png"));
        for (key, url) in manifest.iter() {
            assert_eq!(url, format!("{BASE}{key}"));
        }
    }

    #[test]
    fn test_publish_keeps_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cdn.json");
        fs::write(&path, r#"{"static/old.png": "https://old.example.com/static/old.png"}"#).unwrap();

        let root = dir.path().join("static");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("new.png"), b"").unwrap();

        assert_eq!(publish_directory(&path, &root, BASE).unwrap(), 1);

        let manifest = CdnManifest::load(&path).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(
            manifest.get("static/old.png"),
            Some("https://old.example.com/static/old.png")
        );
    }

    #[test]
    fn test_publish_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cdn.json");
        let root = dir.path().join("static");
        fs::create_dir_all(root.join("econ")).unwrap();
        fs::write(root.join("econ/a.png"), b"").unwrap();
        fs::write(root.join("econ/b.png"), b"").unwrap();

        publish_directory(&path, &root, BASE).unwrap();
        let first = fs::read(&path).unwrap();
        publish_directory(&path, &root, BASE).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
    }
}
