//! VPK directory listing resolver
//!
//! Turns the text listing printed by `Source2Viewer-CLI --vpk_dir` into the
//! list of archive segment files that hold every entry under a path prefix.
//!
//! # Example
//!
//! ```
//! use cs2cdn_vpk::{SegmentTemplate, collect_fnumbers, segment_paths};
//! use std::io::Cursor;
//!
//! let listing = "\
//! a/b/img1.vtex CRC:0x1 metadata:0 fnumber=44 ofs:0x0
//! a/b/img2.vtex CRC:0x2 metadata:0 fnumber=44 ofs:0x10
//! c/d/x.vtex CRC:0x3 metadata:0 fnumber=7 ofs:0x0
//! ";
//!
//! let (fnumbers, _stats) = collect_fnumbers(Cursor::new(listing), "a/b")
//!     .expect("listing should parse");
//! let paths = segment_paths(&fnumbers, "base", &SegmentTemplate::default());
//! assert_eq!(paths, vec!["base/pak01_044.vpk"]);
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod entry;
pub mod error;
pub mod resolver;
pub mod segment;

pub use entry::{DirEntry, ListingLine, MIN_FIELDS, normalize_path};
pub use error::{ListingError, Result};
pub use resolver::{FNumberSet, ListingStats, collect_fnumbers, collect_fnumbers_from_file};
pub use segment::{SegmentTemplate, segment_paths, write_segment_list};

use std::path::Path;
use tracing::info;

/// Resolve a listing file into the segment list written to `out`.
///
/// Returns the segment paths. When nothing under `prefix` carries a usable
/// `fnumber` the returned list is empty and `out` is left untouched.
///
/// # Errors
///
/// Returns [`ListingError`] if the listing cannot be read, the prefix is
/// empty, or `out` cannot be written.
pub fn resolve_listing(
    listing: &Path,
    prefix: &str,
    base_dir: &str,
    template: &SegmentTemplate,
    out: &Path,
) -> Result<Vec<String>> {
    let (fnumbers, stats) = collect_fnumbers_from_file(listing, prefix)?;

    if fnumbers.is_empty() {
        info!(
            "No matching entries with an fnumber under '{}' ({} lines read)",
            prefix, stats.lines
        );
        return Ok(Vec::new());
    }

    let paths = segment_paths(&fnumbers, base_dir, template);
    write_segment_list(&paths, out)?;

    info!(
        "Resolved {} segment files from {} matched entries",
        paths.len(),
        stats.matched
    );

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_listing_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let listing = dir.path().join("vpkdir.txt");
        let out = dir.path().join("filelist.txt");
        std::fs::write(
            &listing,
            "--- header ---\n\
             panorama/images/econ/a_png.vtex_c CRC:0x1 metadata:0 fnumber=44 ofs:0x0\n\
             panorama/images/econ/b_png.vtex_c CRC:0x2 metadata:0 fnumber=187 ofs:0x0\n",
        )
        .unwrap();

        let paths = resolve_listing(
            &listing,
            "panorama/images/econ",
            "game/csgo",
            &SegmentTemplate::default(),
            &out,
        )
        .unwrap();

        assert_eq!(paths, vec!["game/csgo/pak01_044.vpk", "game/csgo/pak01_187.vpk"]);
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "game/csgo/pak01_044.vpk\ngame/csgo/pak01_187.vpk\n"
        );
    }

    #[test]
    fn test_resolve_listing_without_matches_leaves_output() {
        let dir = tempfile::tempdir().unwrap();
        let listing = dir.path().join("vpkdir.txt");
        let out = dir.path().join("filelist.txt");
        std::fs::write(&listing, "materials/a.vmat_c x y z fnumber=3\n").unwrap();

        let paths = resolve_listing(
            &listing,
            "panorama",
            "game/csgo",
            &SegmentTemplate::default(),
            &out,
        )
        .unwrap();

        assert!(paths.is_empty());
        assert!(!out.exists());
    }
}
