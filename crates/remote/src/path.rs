//! Logical remote paths.
//!
//! A remote path is a project identifier followed by zero or more container
//! (or file) names. Paths are purely logical: they are how the pipeline
//! addresses the hierarchy and how it keys its container cache. The remote
//! service itself only ever sees names and parent identifiers.

use crate::error::{ErrorKind, Result};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Separator used when rendering and parsing logical paths.
pub const SEPARATOR: char = '/';

/// Validate a single entity name.
///
/// Names must be non-empty, must not be `.` or `..`, and must not contain
/// the path separator or NUL bytes.
///
/// # Examples
///
/// ```
/// use ferry_remote::path::validate_name;
/// assert!(validate_name("01").is_ok());
/// assert!(validate_name("P_20200101_scan.dcm").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("..").is_err());
/// assert!(validate_name("a/b").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<&str> {
    if name.is_empty() || name == "." || name == ".." || name.contains(SEPARATOR) || name.contains('\0') {
        exn::bail!(ErrorKind::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Normalise a user supplied remote prefix into its segments.
///
/// Surrounding whitespace is trimmed, leading/trailing separators and empty
/// segments are dropped. A prefix that normalises to nothing yields an empty
/// list (files go directly under the project).
///
/// # Examples
///
/// ```
/// use ferry_remote::path::parse_prefix;
/// assert_eq!(parse_prefix(" /studies//2020/ ").unwrap(), vec!["studies", "2020"]);
/// assert!(parse_prefix("  / ").unwrap().is_empty());
/// assert!(parse_prefix("a/../b").is_err());
/// ```
pub fn parse_prefix(raw: &str) -> Result<Vec<String>> {
    raw.trim()
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(|segment| validate_name(segment).map(str::to_string))
        .collect()
}

/// A logical, hierarchical remote path rooted at a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemotePath {
    segments: Vec<String>,
}
impl RemotePath {
    /// The path of the project itself.
    pub fn root(project: impl Into<String>) -> Self {
        Self { segments: vec![project.into()] }
    }

    /// Append one validated segment.
    pub fn join(&self, name: impl AsRef<str>) -> Result<Self> {
        let mut segments = self.segments.clone();
        segments.push(validate_name(name.as_ref())?.to_string());
        Ok(Self { segments })
    }

    /// Append every segment in order.
    pub fn join_all<I, S>(&self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(self.clone(), |path, name| path.join(name))
    }

    /// The containing path, or `None` for a project root.
    pub fn parent(&self) -> Option<Self> {
        match self.segments.len() {
            0 | 1 => None,
            n => Some(Self { segments: self.segments[..n - 1].to_vec() }),
        }
    }

    /// The final segment.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Whether this is a project root.
    pub fn is_root(&self) -> bool {
        self.segments.len() <= 1
    }

    /// Every path from the project root down to (and including) `self`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferry_remote::path::RemotePath;
    /// let path = RemotePath::root("proj").join_all(["a", "b"]).unwrap();
    /// let chain: Vec<String> = path.lineage().map(|p| p.to_string()).collect();
    /// assert_eq!(chain, vec!["proj", "proj/a", "proj/a/b"]);
    /// ```
    pub fn lineage(&self) -> impl Iterator<Item = RemotePath> + '_ {
        (1..=self.segments.len()).map(|n| Self { segments: self.segments[..n].to_vec() })
    }
}
impl Display for RemotePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert_eq!(validate_name("scan.dcm").unwrap(), "scan.dcm");
        assert_eq!(validate_name(".hidden").unwrap(), ".hidden");
        assert_eq!(validate_name("a b").unwrap(), "a b");
    }

    #[test]
    fn test_invalid_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name(".").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\0b").is_err());
    }

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(parse_prefix("studies").unwrap(), vec!["studies"]);
        assert_eq!(parse_prefix("/studies/").unwrap(), vec!["studies"]);
        assert_eq!(parse_prefix("a//b///c").unwrap(), vec!["a", "b", "c"]);
        assert!(parse_prefix("").unwrap().is_empty());
        assert!(parse_prefix("   ").unwrap().is_empty());
        assert!(parse_prefix("//").unwrap().is_empty());
    }

    #[test]
    fn test_prefix_rejects_traversal() {
        assert!(parse_prefix("..").is_err());
        assert!(parse_prefix("a/./b").is_err());
    }

    #[test]
    fn test_parent_and_name() {
        let root = RemotePath::root("syn123");
        assert!(root.is_root());
        assert_eq!(root.parent(), None);
        assert_eq!(root.name(), "syn123");

        let shard = root.join("studies").unwrap().join("01").unwrap();
        assert_eq!(shard.to_string(), "syn123/studies/01");
        assert_eq!(shard.name(), "01");
        assert_eq!(shard.parent().unwrap().to_string(), "syn123/studies");
        assert!(!shard.is_root());
    }

    #[test]
    fn test_join_rejects_invalid() {
        let root = RemotePath::root("p");
        assert!(root.join("a/b").is_err());
        assert!(root.join_all(["ok", ""]).is_err());
    }

    #[test]
    fn test_lineage_of_root() {
        let root = RemotePath::root("p");
        assert_eq!(root.lineage().collect::<Vec<_>>(), vec![root.clone()]);
    }
}
