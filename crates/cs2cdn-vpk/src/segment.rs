//! Mapping segment numbers to physical archive files
//!
//! A multi-part VPK consists of `<name>_dir.vpk` plus numbered segments
//! `<name>_000.vpk`, `<name>_001.vpk`, ... The `fnumber` of an entry selects
//! the segment that stores its data.

use crate::entry::normalize_path;
use crate::error::{ListingError, Result};
use crate::resolver::FNumberSet;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Filename template for archive segments: `<stem><NNN>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTemplate {
    /// Text before the number, e.g. `pak01_`
    pub stem: String,
    /// Extension without the dot, e.g. `vpk`
    pub extension: String,
}

impl Default for SegmentTemplate {
    fn default() -> Self {
        Self::for_archive("pak01")
    }
}

impl SegmentTemplate {
    /// Template for the segments of the archive `<archive>_dir.vpk`.
    pub fn for_archive(archive: &str) -> Self {
        Self {
            stem: format!("{archive}_"),
            extension: "vpk".to_string(),
        }
    }

    /// Directory file name of the archive, e.g. `pak01_dir.vpk`.
    pub fn dir_file_name(&self) -> String {
        format!("{}dir.{}", self.stem, self.extension)
    }

    /// Segment file name; the number is zero padded to at least 3 digits.
    pub fn file_name(&self, fnumber: u32) -> String {
        format!("{}{:03}.{}", self.stem, fnumber, self.extension)
    }
}

/// Physical segment paths for every collected number, joined with
/// `base_dir`, deduplicated and sorted.
pub fn segment_paths(
    fnumbers: &FNumberSet,
    base_dir: &str,
    template: &SegmentTemplate,
) -> Vec<String> {
    fnumbers
        .iter()
        .map(|fnumber| join(base_dir, &template.file_name(fnumber)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn join(base_dir: &str, name: &str) -> String {
    if base_dir.is_empty() {
        return normalize_path(name);
    }
    normalize_path(&format!("{base_dir}/{name}"))
}

/// Write one path per line to `out`, truncating previous content.
///
/// # Errors
///
/// Returns [`ListingError::Write`] if the file cannot be created or written.
pub fn write_segment_list(paths: &[String], out: &Path) -> Result<()> {
    let to_error = |source| ListingError::Write {
        path: out.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(out).map_err(to_error)?);
    for path in paths {
        writeln!(writer, "{path}").map_err(to_error)?;
    }
    writer.flush().map_err(to_error)
}
