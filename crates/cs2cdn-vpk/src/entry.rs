//! Single-line parsing of the VPK directory listing
//!
//! `Source2Viewer-CLI --vpk_dir` prints one archive entry per line:
//!
//! ```text
//! --- Files in pak01_dir.vpk ---
//! panorama/images/econ/default_generated/ak47_png.vtex_c CRC:0x3e1c2d4f metadata:0 fnumber=44 ofs:0x1a2b sz:4096
//! ```
//!
//! Field 0 is the entry path. The remaining whitespace-separated fields are
//! metadata tokens, one of which may be `fnumber=<n>` naming the archive
//! segment that holds the entry.

use tracing::warn;

/// Lines starting with this marker are headers or summaries
const SEPARATOR: &str = "---";

/// Data lines with fewer fields are treated as malformed
pub const MIN_FIELDS: usize = 5;

const FNUMBER_KEY: &str = "fnumber=";

/// Classification of one listing line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingLine<'a> {
    /// Blank line or `---` header/summary
    Structural,
    /// Fewer than [`MIN_FIELDS`] fields
    Malformed,
    /// A parsed archive entry
    Entry(DirEntry<'a>),
}

impl<'a> ListingLine<'a> {
    /// Classify a raw listing line.
    pub fn classify(line: &'a str) -> Self {
        if line.starts_with(SEPARATOR) || line.trim().is_empty() {
            return Self::Structural;
        }

        match DirEntry::parse(line) {
            Some(entry) => Self::Entry(entry),
            None => Self::Malformed,
        }
    }
}

/// One archive entry from the listing. Borrowed from the line buffer and
/// discarded after the line is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry<'a> {
    line: &'a str,
    fields: Vec<&'a str>,
}

impl<'a> DirEntry<'a> {
    /// Split a data line into fields. Returns `None` for lines with fewer
    /// than [`MIN_FIELDS`] fields.
    pub fn parse(line: &'a str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < MIN_FIELDS {
            return None;
        }
        Some(Self { line, fields })
    }

    /// Raw entry path (field 0).
    pub fn path(&self) -> &'a str {
        self.fields[0]
    }

    /// Entry path in normalized form, see [`normalize_path`].
    pub fn normalized_path(&self) -> String {
        normalize_path(self.path())
    }

    /// Metadata fields after the path.
    pub fn fields(&self) -> &[&'a str] {
        &self.fields[1..]
    }

    /// Value of the first `fnumber=` token, unparsed.
    pub fn fnumber_token(&self) -> Option<&'a str> {
        self.fields()
            .iter()
            .find_map(|field| field.strip_prefix(FNUMBER_KEY))
    }

    /// Segment number of this entry.
    ///
    /// Only the first `fnumber=` token is considered. An unparseable value
    /// is logged and yields `None`, as does a missing token. `0` is the
    /// "not found" sentinel and also yields `None`.
    ///
    /// Values are segment file indexes and must fit a `u32`: negative
    /// numbers and values above `u32::MAX` count as unparseable. A leading
    /// `+` is accepted.
    pub fn fnumber(&self) -> Option<u32> {
        let token = self.fnumber_token()?;
        match token.parse::<u32>() {
            Ok(0) => None,
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Invalid fnumber '{}' in line: {}", token, self.line);
                None
            }
        }
    }
}

/// Normalize an archive path for prefix comparison.
///
/// Backslashes become forward slashes, then the path is cleaned lexically:
/// repeated separators and `.` segments are dropped, `..` removes the
/// preceding segment, and a trailing separator is removed. An empty result
/// becomes `.`.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let rooted = unified.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LINE: &str = "panorama/images/econ/ak47_png.vtex_c CRC:0x1 metadata:0 fnumber=44 ofs:0x0";

    #[test]
    fn test_classify_structural_lines() {
        assert_eq!(ListingLine::classify(""), ListingLine::Structural);
        assert_eq!(ListingLine::classify("   \t"), ListingLine::Structural);
        assert_eq!(
            ListingLine::classify("--- Files in pak01_dir.vpk ---"),
            ListingLine::Structural
        );
    }

    #[test]
    fn test_classify_short_line_is_malformed() {
        assert_eq!(
            ListingLine::classify("a/b/c.vtex fnumber=1 x y"),
            ListingLine::Malformed
        );
    }

    #[test]
    fn test_entry_fields() {
        let entry = DirEntry::parse(LINE).unwrap();
        assert_eq!(entry.path(), "panorama/images/econ/ak47_png.vtex_c");
        assert_eq!(entry.fields().len(), 5);
        assert_eq!(entry.fnumber_token(), Some("44"));
        assert_eq!(entry.fnumber(), Some(44));
    }

    #[test]
    fn test_first_fnumber_wins() {
        let entry = DirEntry::parse("a/b.vtex x y fnumber=3 fnumber=9").unwrap();
        assert_eq!(entry.fnumber(), Some(3));
    }

    #[test]
    fn test_invalid_first_fnumber_is_not_retried() {
        let entry = DirEntry::parse("a/b.vtex x y fnumber=abc fnumber=9").unwrap();
        assert_eq!(entry.fnumber(), None);
    }

    #[test]
    fn test_zero_and_missing_fnumber() {
        let zero = DirEntry::parse("a/b.vtex x y z fnumber=0").unwrap();
        assert_eq!(zero.fnumber(), None);

        let missing = DirEntry::parse("a/b.vtex x y z w").unwrap();
        assert_eq!(missing.fnumber_token(), None);
        assert_eq!(missing.fnumber(), None);
    }

    #[test]
    fn test_out_of_range_fnumber_is_invalid() {
        let entry = DirEntry::parse("a/b.vtex x y z fnumber=-4").unwrap();
        assert_eq!(entry.fnumber(), None);

        let entry = DirEntry::parse("a/b.vtex x y z fnumber=5000000000").unwrap();
        assert_eq!(entry.fnumber(), None);

        let entry = DirEntry::parse("a/b.vtex x y z fnumber=+7").unwrap();
        assert_eq!(entry.fnumber(), Some(7));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("a/b/"), "a/b");
        assert_eq!(normalize_path("a\\b"), "a/b");
        assert_eq!(normalize_path("a//b/./c"), "a/b/c");
        assert_eq!(normalize_path("a/b/../c"), "a/c");
        assert_eq!(normalize_path("../a"), "../a");
        assert_eq!(normalize_path("/../a"), "/a");
        assert_eq!(normalize_path(""), ".");
        assert_eq!(normalize_path("./"), ".");
    }
}
