//! File name selection.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

/// A caller-supplied predicate over base file names.
pub type FileFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Decides whether a candidate file is forwarded.
///
/// Only the base name is consulted, never the file system.
#[derive(Clone, Default)]
pub enum Selector {
    /// A custom predicate decides.
    Custom(FileFilter),

    /// The base name must match the pattern somewhere.
    Pattern(Regex),

    /// Every file is forwarded.
    #[default]
    AcceptAll,
}

impl Selector {
    /// Build a selector. A predicate wins over a pattern; with neither,
    /// everything is accepted.
    pub fn new(filter: Option<FileFilter>, pattern: Option<Regex>) -> Self {
        match (filter, pattern) {
            (Some(filter), _) => Self::Custom(filter),
            (None, Some(pattern)) => Self::Pattern(pattern),
            (None, None) => Self::AcceptAll,
        }
    }

    /// Check a base file name.
    pub fn accepts(&self, file_name: &str) -> bool {
        match self {
            Self::Custom(filter) => filter(file_name),
            Self::Pattern(pattern) => pattern.is_match(file_name),
            Self::AcceptAll => true,
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(_) => f.write_str("Custom(<fn>)"),
            Self::Pattern(pattern) => f.debug_tuple("Pattern").field(&pattern.as_str()).finish(),
            Self::AcceptAll => f.write_str("AcceptAll"),
        }
    }
}
