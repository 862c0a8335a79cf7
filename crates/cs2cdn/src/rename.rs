//! Output file renaming
//!
//! Source2Viewer-CLI names decompiled textures `<name>_png.png`. Every
//! `_png` substring is dropped from the names of extracted `.png` files.

use crate::error::{PipelineError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Name with every `_png` removed, or `None` if nothing changes.
pub fn stripped_name(file_name: &str) -> Option<String> {
    if !file_name.ends_with(".png") || !file_name.contains("_png") {
        return None;
    }
    Some(file_name.replace("_png", ""))
}

/// Rename every `.png` file under `root`, returning how many were renamed.
///
/// Unreadable directory entries are logged and skipped. An existing file
/// with the target name is replaced.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if a rename fails.
pub fn strip_png_suffixes(root: &Path) -> Result<usize> {
    let mut renames: Vec<(PathBuf, PathBuf)> = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error accessing path: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if let Some(new_name) = stripped_name(&name) {
            renames.push((entry.path().to_path_buf(), entry.path().with_file_name(new_name)));
        }
    }

    for (from, to) in &renames {
        debug!("Renaming {} to {}", from.display(), to.display());
        fs::rename(from, to).map_err(|source| PipelineError::io(from, source))?;
    }

    Ok(renames.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stripped_name() {
        assert_eq!(
            stripped_name("ak47_png.png").as_deref(),
            Some("ak47.png")
        );
        assert_eq!(
            stripped_name("a_png_b_png.png").as_deref(),
            Some("a_b.png")
        );
        assert_eq!(stripped_name("ak47.png"), None);
        assert_eq!(stripped_name("ak47_png.vtex"), None);
        assert_eq!(stripped_name("ak47_png.PNG"), None);
    }

    #[test]
    fn test_strip_png_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("panorama/images/econ/weapons");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("ak47_png.png"), b"png").unwrap();
        fs::write(nested.join("m4a1.png"), b"png").unwrap();
        fs::write(nested.join("notes_png.txt"), b"txt").unwrap();

        let renamed = strip_png_suffixes(dir.path()).unwrap();

        assert_eq!(renamed, 1);
        assert!(nested.join("ak47.png").is_file());
        assert!(!nested.join("ak47_png.png").exists());
        assert!(nested.join("m4a1.png").is_file());
        assert!(nested.join("notes_png.txt").is_file());

        assert_eq!(strip_png_suffixes(dir.path()).unwrap(), 0);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(strip_png_suffixes(&dir.path().join("static")).unwrap(), 0);
    }
}
