//! Locations withheld from automatic matching.
use std::collections::HashSet;
use std::fmt::Debug;
use std::path::Path;

use crate::error::ConfigError;
use crate::model::ResourceLocation;

/// Answers "is this location excluded from automatic matching?".
pub trait ExcludePolicy: Debug + Send + Sync {
    /// Whether `location` must never be proposed as a match candidate.
    fn excludes(&self, location: &ResourceLocation) -> bool;
}

/// Excludes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverExclude;

impl ExcludePolicy for NeverExclude {
    fn excludes(&self, _location: &ResourceLocation) -> bool {
        false
    }
}

/// Excludes exactly the locations it was built from.
///
/// # Examples
///
/// ```
/// use infra_cli::config::exclude::{ExcludePolicy, InMemoryExcludeList};
///
/// let list = InMemoryExcludeList::parse(["basic.Bucket"]).unwrap();
/// assert!(list.excludes(&"basic.Bucket".parse().unwrap()));
/// assert!(!list.excludes(&"basic.Queue".parse().unwrap()));
/// assert!(InMemoryExcludeList::parse(["not-a-location"]).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryExcludeList {
    locations: HashSet<ResourceLocation>,
}

impl InMemoryExcludeList {
    /// Parse `Stack.LogicalId` entries.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedLocation`] for the first malformed entry.
    pub fn parse<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let locations = entries
            .into_iter()
            .map(|e| e.as_ref().trim().parse())
            .collect::<Result<_, _>>()?;
        Ok(Self { locations })
    }

    /// Read entries from an exclude file: one location per line, blank lines
    /// and `#` comments ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::MalformedLocation`] for a malformed line.
    pub fn read_file(path: &Path) -> Result<Vec<String>, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let entries: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
            .collect();
        Self::parse(&entries)?;
        Ok(entries)
    }

    /// Number of excluded locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl ExcludePolicy for InMemoryExcludeList {
    fn excludes(&self, location: &ResourceLocation) -> bool {
        self.locations.contains(location)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn never_exclude_excludes_nothing() {
        assert!(!NeverExclude.excludes(&ResourceLocation::new("basic", "Queue")));
    }

    #[test]
    fn parse_trims_whitespace() {
        let list = InMemoryExcludeList::parse(["  basic.Queue  "]).unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.excludes(&ResourceLocation::new("basic", "Queue")));
    }

    #[test]
    fn parse_reports_first_malformed_entry() {
        let err = InMemoryExcludeList::parse(["basic.Queue", "basic/Queue"]).unwrap_err();
        assert!(err.to_string().contains("basic/Queue"));
    }

    #[test]
    fn read_file_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exclude.txt");
        std::fs::write(&path, "# keep these\nbasic.Queue\n\nbucket-stack.Bucket\n").unwrap();
        let entries = InMemoryExcludeList::read_file(&path).unwrap();
        assert_eq!(entries, vec!["basic.Queue", "bucket-stack.Bucket"]);
    }

    #[test]
    fn read_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = InMemoryExcludeList::read_file(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
