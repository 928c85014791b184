//! Path filtering for watch events
//!
//! A [`PathMatcher`] decides which leaf files are interesting. Directories are
//! always walked regardless of the pattern and never produce events, so the
//! matcher only ever sees file paths.

use crate::ChangeEvent;
use regex::Regex;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid filter pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("extension list is empty")]
    NoExtensions,
}

/// Inclusion filter for leaf files
#[derive(Debug, Clone)]
pub struct PathMatcher {
    /// `None` accepts every file
    pattern: Option<Regex>,
    /// Also try the pattern against the whole path, not just the file name
    match_full_path: bool,
}

impl PathMatcher {
    /// Compile an inclusion pattern matched against file names
    pub fn new(pattern: &str) -> Result<Self, FilterError> {
        let pattern = Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            pattern: Some(pattern),
            match_full_path: false,
        })
    }

    /// Match files whose extension is one of `extensions` (without the dot)
    pub fn from_extensions<S: AsRef<str>>(extensions: &[S]) -> Result<Self, FilterError> {
        if extensions.is_empty() {
            return Err(FilterError::NoExtensions);
        }

        let alternatives: Vec<String> = extensions
            .iter()
            .map(|ext| regex::escape(ext.as_ref().trim_start_matches('.')))
            .collect();

        Self::new(&format!(r"^.*\.({})$", alternatives.join("|")))
    }

    /// Match every file
    pub fn any() -> Self {
        Self {
            pattern: None,
            match_full_path: false,
        }
    }

    /// Accept a path if either its file name or its full path matches
    pub fn match_full_path(mut self, enabled: bool) -> Self {
        self.match_full_path = enabled;
        self
    }

    /// The source pattern
    pub fn pattern(&self) -> &str {
        self.pattern.as_ref().map_or(".*", Regex::as_str)
    }

    /// Check whether a leaf file path is relevant
    pub fn matches(&self, path: &Path) -> bool {
        let Some(pattern) = &self.pattern else {
            return true;
        };

        if self.match_full_path && pattern.is_match(&path.to_string_lossy()) {
            return true;
        }

        path.file_name()
            .map(|name| pattern.is_match(&name.to_string_lossy()))
            .unwrap_or(false)
    }

    /// Check whether an event should reach the consumer
    ///
    /// Directory events never pass. Renames and moves pass if either the old or
    /// the new name matches, so `a.tmp -> a.java` counts.
    pub fn accepts(&self, event: &ChangeEvent) -> bool {
        !event.is_dir && event.paths().any(|path| self.matches(path))
    }
}
