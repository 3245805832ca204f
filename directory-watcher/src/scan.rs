//! Listing of files already present under a watch root.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

/// List every regular file below `root`, down to `max_depth` levels.
///
/// Unreadable entries are logged and skipped; a partial listing is more
/// useful to the watcher than none at all.
pub fn scan_existing(root: &Path, max_depth: usize, follow_links: bool) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(follow_links);

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry under {}: {e}", root.display()),
        }
    }

    debug!("Found {} existing files in {}", files.len(), root.display());
    files
}
