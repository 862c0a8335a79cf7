//! Prefix filtering and `fnumber` collection over a whole listing

use crate::entry::{ListingLine, normalize_path};
use crate::error::{ListingError, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// Unique, non-zero segment numbers collected from a listing.
///
/// Backed by an ordered set so iteration is ascending and output built from
/// it is reproducible between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FNumberSet(BTreeSet<u32>);

impl FNumberSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a segment number. Zero is the "not found" sentinel and is
    /// ignored. Returns `true` if the number was newly added.
    pub fn insert(&mut self, fnumber: u32) -> bool {
        fnumber != 0 && self.0.insert(fnumber)
    }

    /// Number of distinct segment numbers
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if no segment number was collected
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if `fnumber` is in the set
    pub fn contains(&self, fnumber: u32) -> bool {
        self.0.contains(&fnumber)
    }

    /// Iterate in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// Ascending list of the collected numbers
    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }
}

impl FromIterator<u32> for FNumberSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut set = Self::new();
        for fnumber in iter {
            set.insert(fnumber);
        }
        set
    }
}

/// Line counters from one pass over a listing. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingStats {
    /// Lines read, including structural ones
    pub lines: usize,
    /// Entries whose path matched the prefix
    pub matched: usize,
    /// Data lines with too few fields
    pub skipped_malformed: usize,
    /// Matched entries without a usable `fnumber`
    pub skipped_no_fnumber: usize,
}

/// Collect the segment numbers of every entry under `prefix`.
///
/// Blank lines, `---` lines and lines with fewer than five fields are
/// skipped. Both the entry path and `prefix` are normalized before a purely
/// lexical prefix comparison, so `a/b/`, `a/b` and `a\b` select the same
/// entries.
///
/// # Errors
///
/// Returns [`ListingError::EmptyPrefix`] for an empty prefix and
/// [`ListingError::Read`] if the reader fails.
pub fn collect_fnumbers<R: BufRead>(
    mut reader: R,
    prefix: &str,
) -> Result<(FNumberSet, ListingStats)> {
    if prefix.trim().is_empty() {
        return Err(ListingError::EmptyPrefix);
    }
    let prefix = normalize_path(prefix);

    let mut fnumbers = FNumberSet::new();
    let mut stats = ListingStats::default();
    let mut buf = Vec::with_capacity(512);

    loop {
        buf.clear();
        if reader
            .read_until(b'\n', &mut buf)
            .map_err(ListingError::Read)?
            == 0
        {
            break;
        }
        stats.lines += 1;

        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(['\n', '\r']);

        let entry = match ListingLine::classify(line) {
            ListingLine::Structural => continue,
            ListingLine::Malformed => {
                stats.skipped_malformed += 1;
                continue;
            }
            ListingLine::Entry(entry) => entry,
        };

        if !entry.normalized_path().starts_with(&prefix) {
            continue;
        }
        stats.matched += 1;

        match entry.fnumber() {
            Some(fnumber) => {
                fnumbers.insert(fnumber);
            }
            None => {
                debug!("No valid fnumber found in line: {line}");
                stats.skipped_no_fnumber += 1;
            }
        }
    }

    info!(
        "Total matched lines: {} ({} distinct segments)",
        stats.matched,
        fnumbers.len()
    );

    Ok((fnumbers, stats))
}

/// [`collect_fnumbers`] over a listing file on disk.
///
/// # Errors
///
/// Returns [`ListingError::Open`] if the file cannot be opened, otherwise as
/// [`collect_fnumbers`].
pub fn collect_fnumbers_from_file(
    path: &Path,
    prefix: &str,
) -> Result<(FNumberSet, ListingStats)> {
    let file = File::open(path).map_err(|source| ListingError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    collect_fnumbers(BufReader::new(file), prefix)
}
