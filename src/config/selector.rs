//! Stack-name selection by glob pattern.
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::ConfigError;

/// Restricts which stacks are visible to the matcher.
///
/// An empty pattern list selects every stack.
///
/// # Examples
///
/// ```
/// use infra_cli::config::selector::StackSelector;
///
/// let selector = StackSelector::new(&["*-gamma-stack".to_string()]).unwrap();
/// assert!(selector.matches("basic-gamma-stack"));
/// assert!(!selector.matches("basic-prod-stack"));
///
/// assert!(StackSelector::all().matches("anything"));
/// ```
#[derive(Debug, Clone)]
pub struct StackSelector {
    patterns: Vec<String>,
    set: Option<GlobSet>,
}

impl StackSelector {
    /// Compile `patterns`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSelector`] for the first pattern that is
    /// not a valid glob.
    pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
        if patterns.is_empty() {
            return Ok(Self::all());
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidSelector {
                pattern: pattern.clone(),
                message: e.kind().to_string(),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| ConfigError::InvalidSelector {
            pattern: patterns.join(" "),
            message: e.to_string(),
        })?;
        Ok(Self {
            patterns: patterns.to_vec(),
            set: Some(set),
        })
    }

    /// A selector that accepts every stack.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            patterns: Vec::new(),
            set: None,
        }
    }

    /// Whether `stack_name` is selected.
    #[must_use]
    pub fn matches(&self, stack_name: &str) -> bool {
        self.set.as_ref().is_none_or(|set| set.is_match(stack_name))
    }

    /// The patterns this selector was built from.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn patterns(p: &[&str]) -> Vec<String> {
        p.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn empty_selector_matches_everything() {
        let selector = StackSelector::new(&[]).unwrap();
        assert!(selector.matches("basic"));
        assert!(selector.patterns().is_empty());
    }

    #[test]
    fn any_pattern_may_match() {
        let selector = StackSelector::new(&patterns(&["basic", "bucket-*"])).unwrap();
        assert!(selector.matches("basic"));
        assert!(selector.matches("bucket-stack"));
        assert!(!selector.matches("basic-two"));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = StackSelector::new(&patterns(&["ok", "bad[pattern"])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidSelector { ref pattern, .. } if pattern == "bad[pattern"
        ));
    }
}
