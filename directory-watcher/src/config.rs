//! Configuration types for directory watching.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for a watched directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Path to the directory.
    pub path: PathBuf,

    /// Whether files already present at start are reported.
    #[serde(default)]
    pub replay_existing: bool,

    /// Whether subdirectories are watched too.
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Whether to follow symbolic links while scanning.
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_recursive() -> bool {
    true
}

impl WatchConfig {
    /// Create a new watch config that only reports new files.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            replay_existing: false,
            recursive: true,
            follow_symlinks: false,
        }
    }

    /// Report files that already exist when watching starts.
    pub fn replay_existing(mut self, replay: bool) -> Self {
        self.replay_existing = replay;
        self
    }

    /// Set whether subdirectories are watched.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set whether symbolic links below the root are followed while scanning.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Maximum scan depth for the initial listing.
    pub(crate) fn max_depth(&self) -> usize {
        if self.recursive { usize::MAX } else { 1 }
    }
}
